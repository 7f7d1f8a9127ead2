//! Generic, type-safe data access over JSON document databases.
//!
//! This crate is the entry point of the docbase project. It re-exports the core
//! repository and service layers and gives access to the storage backends.
//!
//! # Features
//!
//! - **Generic repositories** - CRUD for any [`Document`](document::Document) type over any backend
//! - **Services** - Repository faults mapped to HTTP-facing errors (409 for duplicates, 500 otherwise)
//! - **Filters, sorting and pagination** - Composable predicates and [`page::PaginatedResult`]s
//! - **Explicit lifecycle** - Connect once, share the pool, shut down on exit
//!
//! # Quick Start
//!
//! ```ignore
//! use docbase::{prelude::*, memory::InMemoryStore};
//! use bson::Uuid;
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Debug, Clone, Serialize, Deserialize)]
//! pub struct User {
//!     pub id: Uuid,
//!     pub email: String,
//! }
//!
//! #[derive(Debug, Clone, Serialize, Deserialize)]
//! pub struct NewUser {
//!     pub email: String,
//! }
//!
//! impl Document for User {
//!     type Create = NewUser;
//!
//!     fn id(&self) -> &Uuid { &self.id }
//!     fn collection_name() -> &'static str { "users" }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = DocumentStore::new(InMemoryStore::builder().build().await?);
//!     store.add_index(User::collection_name(), "email", true).await?;
//!
//!     let users = BaseService::new(store.repository::<User>());
//!
//!     let alice = users.create(NewUser { email: "alice@example.com".into() }).await?;
//!
//!     // A second user with the same email is rejected with a 409.
//!     let conflict = users.create(NewUser { email: "alice@example.com".into() }).await;
//!     assert_eq!(conflict.unwrap_err().status_code(), 409);
//!
//!     let page = users
//!         .find_page(None, QueryOptions::default(), PaginationParams::new(1, 20))
//!         .await?;
//!     assert_eq!(page.data[0].id, alice.id);
//!
//!     store.shutdown().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Backends
//!
//! - [`memory`] - In-process storage for development and testing
//! - [`mongodb`] - MongoDB, bootstrapped from `DB_URL` (requires the `mongodb` feature)

pub mod prelude;

pub use docbase_core::{backend, document, error, page, query, repository, service, store, update};

// Re-export BSON types for convenience
pub use bson;

/// In-memory storage backend.
pub mod memory {
    pub use docbase_memory::{InMemoryStore, InMemoryStoreBuilder};
}

/// MongoDB storage backend and connection bootstrap.
///
/// This module is only available when the `mongodb` feature is enabled.
#[cfg(feature = "mongodb")]
pub mod mongodb {
    pub use docbase_mongodb::{
        ConnectionConfig, MongoDbStore, MongoDbStoreBuilder, PoolPolicy, connect, connect_from_env,
    };
}
