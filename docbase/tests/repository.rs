mod common;

use common::{Note, NewUser, UnreachableBackend, User, init_tracing, user_repository};
use docbase::{
    bson::{Uuid, doc},
    memory::InMemoryStore,
    prelude::*,
};

#[tokio::test]
async fn created_documents_can_be_found_by_id() {
    let users = user_repository().await;

    let alice = users.create(NewUser::new("alice@example.com", "Alice")).await.unwrap();

    assert_eq!(alice.email, "alice@example.com");
    assert_eq!(alice.name, "Alice");
    assert_eq!(
        users.find_one(Some(Filter::id(alice.id)), QueryOptions::default()).await.unwrap().as_ref(),
        Some(&alice)
    );
    assert_eq!(users.find_by_id(&alice.id).await.unwrap(), Some(alice));
}

#[tokio::test]
async fn absent_identities_are_not_errors() {
    let users = user_repository().await;
    let missing = Uuid::new();

    assert_eq!(users.find_by_id(&missing).await.unwrap(), None);
    assert_eq!(users.update(&missing, Update::new().set("name", "Nobody")).await.unwrap(), None);
    assert!(!users.delete(&missing).await.unwrap());
}

#[tokio::test]
async fn unique_violations_surface_as_duplicate_keys() {
    let users = user_repository().await;

    users.create(NewUser::new("alice@example.com", "Alice")).await.unwrap();
    let second = users.create(NewUser::new("alice@example.com", "Impostor")).await;

    assert_eq!(second, Err(AppError::DuplicateKey));
    assert_eq!(users.count(None).await.unwrap(), 1);
}

#[tokio::test]
async fn updates_cannot_break_unique_indexes() {
    let users = user_repository().await;

    users.create(NewUser::new("alice@example.com", "Alice")).await.unwrap();
    let bob = users.create(NewUser::new("bob@example.com", "Bob")).await.unwrap();

    let result = users.update(&bob.id, Update::new().set("email", "alice@example.com")).await;

    assert_eq!(result, Err(AppError::DuplicateKey));
    assert_eq!(users.find_by_id(&bob.id).await.unwrap(), Some(bob));
}

#[tokio::test]
async fn find_all_returns_every_document_once() {
    let users = user_repository().await;

    let mut created = Vec::new();
    for name in ["Alice", "Bob", "Carol"] {
        let email = format!("{}@example.com", name.to_lowercase());
        created.push(users.create(NewUser::new(&email, name)).await.unwrap());
    }

    let mut found = users.find_all(None, QueryOptions::default()).await.unwrap();
    found.sort_by(|a, b| a.name.cmp(&b.name));

    assert_eq!(found, created);
}

#[tokio::test]
async fn filters_and_options_narrow_results() {
    let users = user_repository().await;

    for (name, logins) in [("Alice", 3), ("Bob", 7), ("Carol", 5), ("Dave", 1)] {
        let mut user = NewUser::new(&format!("{}@example.com", name.to_lowercase()), name);
        user.logins = logins;
        users.create(user).await.unwrap();
    }

    let active = users
        .find_all(
            Some(Filter::gte("logins", 3)),
            QueryOptions::builder().sort("logins", SortDirection::Desc).limit(2).build(),
        )
        .await
        .unwrap();
    assert_eq!(active.iter().map(|u| u.name.as_str()).collect::<Vec<_>>(), vec!["Bob", "Carol"]);

    let first = users
        .find_one(None, QueryOptions::builder().sort("name", SortDirection::Asc).build())
        .await
        .unwrap();
    assert_eq!(first.map(|u| u.name), Some("Alice".to_string()));

    assert_eq!(users.count(Some(Filter::lt("logins", 5))).await.unwrap(), 2);
    assert_eq!(users.find_one(Some(Filter::eq("name", "Eve")), QueryOptions::default()).await.unwrap(), None);
}

#[tokio::test]
async fn repeated_updates_are_idempotent() {
    let users = user_repository().await;
    let alice = users.create(NewUser::new("alice@example.com", "Alice")).await.unwrap();

    let patch = Update::from(doc! { "name": "Alice Liddell" });
    let first = users.update(&alice.id, patch.clone()).await.unwrap();
    let second = users.update(&alice.id, patch).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(second.map(|u| u.name), Some("Alice Liddell".to_string()));
}

#[tokio::test]
async fn updates_return_the_post_update_document() {
    let users = user_repository().await;
    let alice = users.create(NewUser::new("alice@example.com", "Alice")).await.unwrap();

    let updated = users
        .update(&alice.id, Update::new().inc("logins", 1).set("name", "Al"))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(updated.id, alice.id);
    assert_eq!(updated.logins, 1);
    assert_eq!(updated.name, "Al");
}

#[tokio::test]
async fn overflowing_increments_leave_the_document_unchanged() {
    init_tracing();
    let users = user_repository().await;
    let mut heavy = NewUser::new("alice@example.com", "Alice");
    heavy.logins = i64::MAX;
    let alice = users.create(heavy).await.unwrap();

    let result = users.update(&alice.id, Update::new().inc("logins", 1_i64)).await;

    assert_eq!(result, Err(AppError::Database));
    assert_eq!(users.find_by_id(&alice.id).await.unwrap(), Some(alice));
}

#[tokio::test]
async fn found_documents_render_as_json() {
    let users = user_repository().await;
    let alice = users.create(NewUser::new("alice@example.com", "Alice")).await.unwrap();

    let found = users.find_by_id(&alice.id).await.unwrap().unwrap();
    let json = found.to_json().unwrap();

    assert_eq!(json["email"], "alice@example.com");
    assert_eq!(json["logins"], 0);
    assert_eq!(User::from_json(json).unwrap(), alice);
}

#[tokio::test]
async fn identities_are_immutable() {
    let users = user_repository().await;
    let alice = users.create(NewUser::new("alice@example.com", "Alice")).await.unwrap();

    let result = users.update(&alice.id, Update::new().set("id", Uuid::new())).await;

    assert_eq!(result, Err(AppError::Database));
}

#[tokio::test]
async fn deleted_documents_are_gone() {
    let users = user_repository().await;
    let alice = users.create(NewUser::new("alice@example.com", "Alice")).await.unwrap();

    assert!(users.delete(&alice.id).await.unwrap());
    assert_eq!(users.find_by_id(&alice.id).await.unwrap(), None);
    assert!(!users.delete(&alice.id).await.unwrap());
}

#[tokio::test]
async fn creation_payloads_must_not_carry_an_identity() {
    init_tracing();
    let notes = BaseRepository::<Note, _>::new(InMemoryStore::new());

    let note = notes.create(doc! { "text": "hello" }).await.unwrap();
    assert_eq!(note.text, "hello");

    let result = notes.create(doc! { "id": Uuid::new(), "text": "forged" }).await;
    assert_eq!(result, Err(AppError::Database));
    assert_eq!(notes.count(None).await.unwrap(), 1);
}

#[tokio::test]
async fn driver_faults_surface_as_database_errors() {
    init_tracing();
    let users = BaseRepository::<User, _>::new(UnreachableBackend);
    let id = Uuid::new();

    assert_eq!(users.create(NewUser::new("alice@example.com", "Alice")).await, Err(AppError::Database));
    assert_eq!(users.find_by_id(&id).await, Err(AppError::Database));
    assert_eq!(users.find_one(None, QueryOptions::default()).await, Err(AppError::Database));
    assert_eq!(users.find_all(None, QueryOptions::default()).await, Err(AppError::Database));
    assert_eq!(users.count(None).await, Err(AppError::Database));
    assert_eq!(users.update(&id, Update::new().set("name", "x")).await, Err(AppError::Database));
    assert_eq!(users.delete(&id).await, Err(AppError::Database));
}

#[tokio::test]
async fn repositories_can_be_shared_behind_pointers() {
    let users: std::sync::Arc<dyn Repository<User>> = std::sync::Arc::new(user_repository().await);

    let alice = users.create(NewUser::new("alice@example.com", "Alice")).await.unwrap();

    assert!(users.find_by_id(&alice.id).await.unwrap().is_some());
}
