#![allow(dead_code)]

use async_trait::async_trait;
use docbase::{
    bson::{Bson, Document as BsonDocument, Uuid},
    memory::InMemoryStore,
    prelude::*,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    #[serde(default)]
    pub logins: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
    pub email: String,
    pub name: String,
    pub logins: i64,
}

impl NewUser {
    pub fn new(email: &str, name: &str) -> Self {
        Self {
            email: email.to_string(),
            name: name.to_string(),
            logins: 0,
        }
    }
}

impl Document for User {
    type Create = NewUser;

    fn id(&self) -> &Uuid {
        &self.id
    }

    fn collection_name() -> &'static str {
        "users"
    }
}

/// A document whose creation payload is free-form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: Uuid,
    pub text: String,
}

impl Document for Note {
    type Create = BsonDocument;

    fn id(&self) -> &Uuid {
        &self.id
    }

    fn collection_name() -> &'static str {
        "notes"
    }
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A user repository over a fresh in-memory store with a unique index on `email`.
pub async fn user_repository() -> BaseRepository<User, InMemoryStore> {
    init_tracing();

    let store = InMemoryStore::new();
    store
        .add_index(User::collection_name(), "email", true)
        .await
        .expect("index creation should succeed on an empty collection");

    BaseRepository::new(store)
}

/// A backend whose every operation fails as if the server were unreachable.
#[derive(Debug, Clone, Default)]
pub struct UnreachableBackend;

fn unreachable() -> DriverError {
    DriverError::Connection("connection refused".to_string())
}

#[async_trait]
impl StoreBackend for UnreachableBackend {
    async fn insert_document(&self, _: BsonDocument, _: &str) -> DriverResult<Bson> {
        Err(unreachable())
    }

    async fn get_document(&self, _: Uuid, _: &str) -> DriverResult<Option<Bson>> {
        Err(unreachable())
    }

    async fn find_one_document(&self, _: Option<Expr>, _: QueryOptions, _: &str) -> DriverResult<Option<Bson>> {
        Err(unreachable())
    }

    async fn find_documents(&self, _: Option<Expr>, _: QueryOptions, _: &str) -> DriverResult<Vec<Bson>> {
        Err(unreachable())
    }

    async fn count_documents(&self, _: Option<Expr>, _: &str) -> DriverResult<u64> {
        Err(unreachable())
    }

    async fn update_document(&self, _: Uuid, _: Update, _: &str) -> DriverResult<Option<Bson>> {
        Err(unreachable())
    }

    async fn delete_document(&self, _: Uuid, _: &str) -> DriverResult<bool> {
        Err(unreachable())
    }

    async fn create_collection(&self, _: &str) -> DriverResult<()> {
        Err(unreachable())
    }

    async fn drop_collection(&self, _: &str) -> DriverResult<()> {
        Err(unreachable())
    }

    async fn list_collections(&self) -> DriverResult<Vec<String>> {
        Err(unreachable())
    }

    async fn add_index(&self, _: &str, _: &str, _: bool) -> DriverResult<()> {
        Err(unreachable())
    }

    async fn drop_index(&self, _: &str, _: &str) -> DriverResult<()> {
        Err(unreachable())
    }
}
