mod common;

use std::sync::Arc;

use common::{NewUser, UnreachableBackend, User, init_tracing};
use docbase::{
    memory::InMemoryStore,
    prelude::*,
};

#[tokio::test]
async fn repositories_share_the_store_backend() {
    init_tracing();
    let store = DocumentStore::new(InMemoryStore::builder().build().await.unwrap());

    let writer = BaseService::new(store.repository::<User>());
    let reader = store.repository::<User>();

    let alice = writer.create(NewUser::new("alice@example.com", "Alice")).await.unwrap();

    assert_eq!(reader.find_by_id(&alice.id).await.unwrap(), Some(alice));
    assert_eq!(store.list_collections().await.unwrap(), vec!["users".to_string()]);

    store.shutdown().await.unwrap();
}

#[tokio::test]
async fn indexes_are_declared_through_the_store() {
    init_tracing();
    let store = DocumentStore::new(InMemoryStore::new());
    store.add_index(User::collection_name(), "email", true).await.unwrap();

    let users = store.repository::<User>();
    users.create(NewUser::new("alice@example.com", "Alice")).await.unwrap();
    assert_eq!(
        users.create(NewUser::new("alice@example.com", "Alice")).await,
        Err(AppError::DuplicateKey)
    );

    store.drop_index(User::collection_name(), "email").await.unwrap();
    assert!(users.create(NewUser::new("alice@example.com", "Alice")).await.is_ok());
}

#[tokio::test]
async fn unique_indexes_reject_existing_duplicates() {
    init_tracing();
    let store = DocumentStore::new(InMemoryStore::new());
    let users = store.repository::<User>();

    users.create(NewUser::new("alice@example.com", "Alice")).await.unwrap();
    users.create(NewUser::new("alice@example.com", "Alice")).await.unwrap();

    let error = store.add_index(User::collection_name(), "email", true).await.unwrap_err();

    assert!(error.is_duplicate_key());
}

#[tokio::test]
async fn collections_can_be_created_and_dropped() {
    init_tracing();
    let store = DocumentStore::new(InMemoryStore::new());

    store.create_collection("audit").await.unwrap();
    store.repository::<User>().create(NewUser::new("alice@example.com", "Alice")).await.unwrap();

    let mut collections = store.list_collections().await.unwrap();
    collections.sort();
    assert_eq!(collections, vec!["audit".to_string(), "users".to_string()]);

    store.drop_collection(User::collection_name()).await.unwrap();
    assert_eq!(store.list_collections().await.unwrap(), vec!["audit".to_string()]);
    assert_eq!(store.repository::<User>().count(None).await.unwrap(), 0);
}

#[tokio::test]
async fn shared_backends_shut_down_cleanly() {
    init_tracing();
    let store = DocumentStore::new(Arc::new(InMemoryStore::new()));
    let users = store.repository::<User>();

    users.create(NewUser::new("alice@example.com", "Alice")).await.unwrap();

    store.shutdown().await.unwrap();
}

#[tokio::test]
async fn administrative_faults_are_reported_as_driver_errors() {
    init_tracing();
    let store = DocumentStore::new(UnreachableBackend);

    assert!(matches!(store.list_collections().await, Err(DriverError::Connection(_))));
    assert!(matches!(store.add_index("users", "email", true).await, Err(DriverError::Connection(_))));
}
