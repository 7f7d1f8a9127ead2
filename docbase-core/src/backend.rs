//! Storage backend abstraction.
//!
//! [`StoreBackend`] is the seam between repositories and a concrete database driver.
//! Each method is a single round trip to the store. Backends report faults as
//! [`DriverError`](crate::error::DriverError)s and leave their translation to the
//! repository layer.
//!
//! Documents cross this seam as BSON. The identity of a stored document is
//! always exposed under [`ID_FIELD`](crate::document::ID_FIELD), whatever the backend
//! uses internally.
//!
//! # Examples
//!
//! ```ignore
//! use docbase::backend::StoreBackend;
//! use bson::doc;
//!
//! let backend = MyBackendImpl::new();
//!
//! let stored = backend.insert_document(doc! { "name": "Alice" }, "users").await?;
//! let id = stored.as_document().unwrap().get("id").cloned();
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use async_trait::async_trait;
use bson::{Bson, Document as BsonDocument, Uuid};
use std::{fmt::Debug, sync::Arc};

use crate::{
    document::ID_FIELD,
    error::{DriverError, DriverResult},
    query::{Expr, QueryOptions},
    update::Update,
};

/// Abstract interface for document storage backends.
///
/// # Thread Safety
///
/// All implementations must be thread-safe and support concurrent access from multiple
/// async tasks. Backends are expected to be cheap to clone, sharing one connection pool
/// between clones.
///
/// # Error Handling
///
/// A unique-constraint violation must be reported as
/// [`DriverError::Server`](crate::error::DriverError::Server) with
/// [`DUPLICATE_KEY_CODE`](crate::error::DUPLICATE_KEY_CODE).
#[async_trait]
pub trait StoreBackend: Send + Sync + Debug {
    /// Inserts a new document, assigning it a fresh identity.
    ///
    /// The payload must not contain an identity field. Returns the stored document,
    /// identity included.
    async fn insert_document(
        &self,
        document: BsonDocument,
        collection: &str,
    ) -> DriverResult<Bson>;

    /// Retrieves a document by identity, or `None` if absent.
    async fn get_document(&self, id: Uuid, collection: &str) -> DriverResult<Option<Bson>>;

    /// Returns the first document matching the filter under the given options.
    async fn find_one_document(
        &self,
        filter: Option<Expr>,
        options: QueryOptions,
        collection: &str,
    ) -> DriverResult<Option<Bson>>;

    /// Returns every document matching the filter under the given options.
    ///
    /// A `None` filter matches every document in the collection.
    async fn find_documents(
        &self,
        filter: Option<Expr>,
        options: QueryOptions,
        collection: &str,
    ) -> DriverResult<Vec<Bson>>;

    /// Counts the documents matching the filter.
    async fn count_documents(&self, filter: Option<Expr>, collection: &str) -> DriverResult<u64>;

    /// Applies a partial update to one document and returns its post-update state,
    /// or `None` if no document has that identity.
    async fn update_document(
        &self,
        id: Uuid,
        update: Update,
        collection: &str,
    ) -> DriverResult<Option<Bson>>;

    /// Deletes one document by identity. Returns `true` iff it existed.
    async fn delete_document(&self, id: Uuid, collection: &str) -> DriverResult<bool>;

    /// Creates an empty collection.
    async fn create_collection(&self, name: &str) -> DriverResult<()>;

    /// Drops a collection and all its documents.
    async fn drop_collection(&self, name: &str) -> DriverResult<()>;

    /// Lists the names of all collections in the store.
    async fn list_collections(&self) -> DriverResult<Vec<String>>;

    /// Creates an ascending index on a field.
    ///
    /// With `unique` set, later writes that duplicate a value are rejected with
    /// [`DUPLICATE_KEY_CODE`](crate::error::DUPLICATE_KEY_CODE), and so is the index
    /// creation itself if existing documents already collide.
    ///
    /// Backends differ on documents that lack the field. MongoDB indexes them as
    /// `null`, so a unique index admits only one such document. The in-memory
    /// backend leaves them out of the index and admits any number.
    async fn add_index(&self, collection: &str, field: &str, unique: bool) -> DriverResult<()>;

    /// Removes the index on a field.
    async fn drop_index(&self, collection: &str, field: &str) -> DriverResult<()>;

    /// Cleanly shuts down the backend, closing its connections.
    ///
    /// The default implementation is a no-op.
    async fn shutdown(self) -> DriverResult<()>
    where
        Self: Sized,
    {
        Ok(())
    }
}

#[async_trait]
impl<B> StoreBackend for &B
where
    B: StoreBackend,
{
    async fn insert_document(
        &self,
        document: BsonDocument,
        collection: &str,
    ) -> DriverResult<Bson> {
        (*self).insert_document(document, collection).await
    }

    async fn get_document(&self, id: Uuid, collection: &str) -> DriverResult<Option<Bson>> {
        (*self).get_document(id, collection).await
    }

    async fn find_one_document(
        &self,
        filter: Option<Expr>,
        options: QueryOptions,
        collection: &str,
    ) -> DriverResult<Option<Bson>> {
        (*self)
            .find_one_document(filter, options, collection)
            .await
    }

    async fn find_documents(
        &self,
        filter: Option<Expr>,
        options: QueryOptions,
        collection: &str,
    ) -> DriverResult<Vec<Bson>> {
        (*self)
            .find_documents(filter, options, collection)
            .await
    }

    async fn count_documents(&self, filter: Option<Expr>, collection: &str) -> DriverResult<u64> {
        (*self).count_documents(filter, collection).await
    }

    async fn update_document(
        &self,
        id: Uuid,
        update: Update,
        collection: &str,
    ) -> DriverResult<Option<Bson>> {
        (*self).update_document(id, update, collection).await
    }

    async fn delete_document(&self, id: Uuid, collection: &str) -> DriverResult<bool> {
        (*self).delete_document(id, collection).await
    }

    async fn create_collection(&self, name: &str) -> DriverResult<()> {
        (*self).create_collection(name).await
    }

    async fn drop_collection(&self, name: &str) -> DriverResult<()> {
        (*self).drop_collection(name).await
    }

    async fn list_collections(&self) -> DriverResult<Vec<String>> {
        (*self).list_collections().await
    }

    async fn add_index(&self, collection: &str, field: &str, unique: bool) -> DriverResult<()> {
        (*self).add_index(collection, field, unique).await
    }

    async fn drop_index(&self, collection: &str, field: &str) -> DriverResult<()> {
        (*self).drop_index(collection, field).await
    }
}

#[async_trait]
impl<B> StoreBackend for Arc<B>
where
    B: StoreBackend,
{
    async fn insert_document(
        &self,
        document: BsonDocument,
        collection: &str,
    ) -> DriverResult<Bson> {
        (**self).insert_document(document, collection).await
    }

    async fn get_document(&self, id: Uuid, collection: &str) -> DriverResult<Option<Bson>> {
        (**self).get_document(id, collection).await
    }

    async fn find_one_document(
        &self,
        filter: Option<Expr>,
        options: QueryOptions,
        collection: &str,
    ) -> DriverResult<Option<Bson>> {
        (**self)
            .find_one_document(filter, options, collection)
            .await
    }

    async fn find_documents(
        &self,
        filter: Option<Expr>,
        options: QueryOptions,
        collection: &str,
    ) -> DriverResult<Vec<Bson>> {
        (**self)
            .find_documents(filter, options, collection)
            .await
    }

    async fn count_documents(&self, filter: Option<Expr>, collection: &str) -> DriverResult<u64> {
        (**self).count_documents(filter, collection).await
    }

    async fn update_document(
        &self,
        id: Uuid,
        update: Update,
        collection: &str,
    ) -> DriverResult<Option<Bson>> {
        (**self).update_document(id, update, collection).await
    }

    async fn delete_document(&self, id: Uuid, collection: &str) -> DriverResult<bool> {
        (**self).delete_document(id, collection).await
    }

    async fn create_collection(&self, name: &str) -> DriverResult<()> {
        (**self).create_collection(name).await
    }

    async fn drop_collection(&self, name: &str) -> DriverResult<()> {
        (**self).drop_collection(name).await
    }

    async fn list_collections(&self) -> DriverResult<Vec<String>> {
        (**self).list_collections().await
    }

    async fn add_index(&self, collection: &str, field: &str, unique: bool) -> DriverResult<()> {
        (**self).add_index(collection, field, unique).await
    }

    async fn drop_index(&self, collection: &str, field: &str) -> DriverResult<()> {
        (**self).drop_index(collection, field).await
    }

    async fn shutdown(self) -> DriverResult<()> {
        match Arc::try_unwrap(self) {
            Ok(backend) => backend.shutdown().await,
            // Other handles still share the backend.
            Err(_) => Ok(()),
        }
    }
}

/// Rejects creation payloads that carry an identity field.
///
/// Identities are assigned by the backend, so a payload containing `id` or `_id`
/// is an invalid document.
pub fn ensure_insertable(document: &BsonDocument) -> DriverResult<()> {
    match [ID_FIELD, "_id"].into_iter().find(|key| document.contains_key(*key)) {
        Some(key) => Err(DriverError::InvalidDocument(format!(
            "creation payload must not contain the identity field `{key}`"
        ))),
        None => Ok(()),
    }
}

/// Factory trait for creating backend instances.
#[async_trait]
pub trait StoreBackendBuilder {
    type Backend: StoreBackend;

    async fn build(self) -> DriverResult<Self::Backend>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    #[test]
    fn identity_fields_are_not_insertable() {
        assert!(ensure_insertable(&doc! { "name": "a" }).is_ok());
        assert!(matches!(
            ensure_insertable(&doc! { "id": "x", "name": "a" }),
            Err(DriverError::InvalidDocument(_))
        ));
        assert!(ensure_insertable(&doc! { "_id": 1 }).is_err());
    }
}
