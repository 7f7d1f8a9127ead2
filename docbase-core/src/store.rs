//! Owned handle over a storage backend.
//!
//! A [`DocumentStore`] is opened once at process start, hands out repositories that
//! share its connection pool, and is shut down explicitly on exit.
//!
//! # Example
//!
//! ```ignore
//! use docbase::{prelude::*, memory::InMemoryStore};
//!
//! let store = DocumentStore::new(InMemoryStore::new());
//! store.add_index(User::collection_name(), "email", true).await?;
//!
//! let users = BaseService::new(store.repository::<User>());
//! // ...
//! store.shutdown().await?;
//! ```

use crate::{
    backend::StoreBackend,
    document::Document,
    error::DriverResult,
    repository::BaseRepository,
};

/// A document store bound to a specific backend implementation.
///
/// # Type Parameters
///
/// * `B` - The backend implementation type
#[derive(Debug)]
pub struct DocumentStore<B: StoreBackend> {
    backend: B,
}

impl<B: StoreBackend> DocumentStore<B> {
    /// Creates a new document store with the given backend.
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// Returns the underlying backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Creates a repository for the specified document type.
    ///
    /// The repository gets its own clone of the backend handle; clones share the
    /// same connection pool.
    pub fn repository<D: Document>(&self) -> BaseRepository<D, B>
    where
        B: Clone,
    {
        BaseRepository::new(self.backend.clone())
    }

    /// Creates a new collection with the given name.
    pub async fn create_collection(&self, name: &str) -> DriverResult<()> {
        self.backend.create_collection(name).await
    }

    /// Drops a collection with the given name.
    pub async fn drop_collection(&self, name: &str) -> DriverResult<()> {
        self.backend.drop_collection(name).await
    }

    /// Lists all collections in the store.
    pub async fn list_collections(&self) -> DriverResult<Vec<String>> {
        self.backend.list_collections().await
    }

    /// Adds an index to a field in a collection.
    ///
    /// Unique indexes are how uniqueness constraints are declared.
    pub async fn add_index(&self, collection: &str, field: &str, unique: bool) -> DriverResult<()> {
        self.backend
            .add_index(collection, field, unique)
            .await
    }

    /// Removes an index from a field in a collection.
    pub async fn drop_index(&self, collection: &str, field: &str) -> DriverResult<()> {
        self.backend.drop_index(collection, field).await
    }

    /// Shuts down the store and releases backend resources.
    ///
    /// Repositories created from this store keep their own handles; clones of a pooled
    /// backend stop working once the pool is closed.
    pub async fn shutdown(self) -> DriverResult<()> {
        self.backend.shutdown().await?;
        tracing::info!("document store shut down");

        Ok(())
    }
}
