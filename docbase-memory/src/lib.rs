//! In-memory document storage backend for docbase.
//!
//! This crate provides a thread-safe, in-memory implementation of the `StoreBackend` trait.
//! It uses async-aware read-write locks for concurrent access and is ideal for development
//! and testing.
//!
//! # Features
//!
//! - **Thread-safe access** - Concurrent reads and writes using async-aware RwLock
//! - **Full query support** - Filtering, multi-key sorting, pagination and projection
//! - **Unique indexes** - Duplicate writes fail with the same error code MongoDB reports
//!
//! # Quick Start
//!
//! ```ignore
//! use docbase::{prelude::*, memory::InMemoryStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = DocumentStore::new(InMemoryStore::new());
//!     let users = store.repository::<User>();
//!
//!     let alice = users.create(NewUser { name: "Alice".into() }).await?;
//!     assert!(users.delete(alice.id()).await?);
//!
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as docbase_memory;

pub mod store;
pub mod evaluator;

pub use store::{InMemoryStore, InMemoryStoreBuilder};
