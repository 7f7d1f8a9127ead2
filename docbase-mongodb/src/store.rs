use async_trait::async_trait;
use futures::TryStreamExt;
use bson::{Document, Bson, Uuid, doc};
use mongodb::{
    Client, Collection as MongoCollection, Database, IndexModel,
    error::{Error as MongoError, ErrorKind, WriteFailure},
    options::{ClientOptions, FindOptions, IndexOptions, ReturnDocument},
};
use docbase_core::{
    backend::{StoreBackend, StoreBackendBuilder, ensure_insertable},
    document::ID_FIELD,
    error::{DriverError, DriverResult},
    query::{Expr, QueryOptions},
    update::Update,
};

use crate::{
    connect::PoolPolicy,
    query::{MongoQueryTranslator, find_options, stored_field, update_document},
};


/// A [`StoreBackend`] over a MongoDB database.
///
/// Clones share the client's connection pool.
#[derive(Debug, Clone)]
pub struct MongoDbStore {
    client: Client,
    database: String,
}

impl MongoDbStore {
    pub fn new(client: Client, database: impl Into<String>) -> Self {
        Self { client, database: database.into() }
    }

    pub fn builder(dsn: &str, database: &str) -> MongoDbStoreBuilder {
        MongoDbStoreBuilder::new(dsn, database)
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn database_name(&self) -> &str {
        &self.database
    }

    pub(crate) fn database(&self) -> Database {
        self.client.database(&self.database)
    }

    fn get_collection(&self, collection_name: &str) -> MongoCollection<Document> {
        self.database().collection(collection_name)
    }

    /// Restores a stored document, exposing `_id` as the identity field.
    fn restore_document(document: Document) -> Bson {
        let mut restored = Document::new();

        if let Some(id) = document.get("_id") {
            restored.insert(ID_FIELD, id.clone());
        }
        for (key, value) in document {
            if key != "_id" {
                restored.insert(key, value);
            }
        }

        Bson::Document(restored)
    }

    async fn collect(&self, filter: Document, options: FindOptions, collection: &str) -> DriverResult<Vec<Bson>> {
        Ok(
            self.get_collection(collection)
                .find(filter)
                .with_options(options)
                .await
                .map_err(map_driver_error)?
                .try_collect::<Vec<Document>>()
                .await
                .map_err(map_driver_error)?
                .into_iter()
                .map(Self::restore_document)
                .collect()
        )
    }

    pub async fn shutdown(self) -> DriverResult<()> {
        self.client.shutdown().await;

        tracing::info!(database = %self.database, "mongodb client shut down");

        Ok(())
    }
}

/// Maps a driver error to a [`DriverError`], keeping the server's code when one was reported.
pub(crate) fn map_driver_error(error: MongoError) -> DriverError {
    match error.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(failure)) => DriverError::Server {
            code: failure.code,
            message: failure.message.clone(),
        },
        ErrorKind::Write(WriteFailure::WriteConcernError(failure)) => DriverError::Server {
            code: failure.code,
            message: failure.message.clone(),
        },
        ErrorKind::Command(failure) => DriverError::Server {
            code: failure.code,
            message: failure.message.clone(),
        },
        ErrorKind::Io(_)
        | ErrorKind::ServerSelection { .. }
        | ErrorKind::ConnectionPoolCleared { .. } => DriverError::Connection(error.to_string()),
        _ => DriverError::Backend(error.to_string()),
    }
}

#[async_trait]
impl StoreBackend for MongoDbStore {
    async fn insert_document(&self, document: Document, collection: &str) -> DriverResult<Bson> {
        ensure_insertable(&document)?;

        let mut stored = doc! { "_id": Uuid::new() };
        for (key, value) in document {
            stored.insert(key, value);
        }

        self.get_collection(collection)
            .insert_one(&stored)
            .await
            .map_err(map_driver_error)?;

        tracing::debug!(collection, "inserted document");

        Ok(Self::restore_document(stored))
    }

    async fn get_document(&self, id: Uuid, collection: &str) -> DriverResult<Option<Bson>> {
        Ok(
            self.get_collection(collection)
                .find_one(doc! { "_id": id })
                .await
                .map_err(map_driver_error)?
                .map(Self::restore_document)
        )
    }

    async fn find_one_document(&self, filter: Option<Expr>, options: QueryOptions, collection: &str) -> DriverResult<Option<Bson>> {
        let filter = MongoQueryTranslator::translate(filter.as_ref())?;
        let Some(options) = find_options(&QueryOptions { limit: Some(1), ..options }) else {
            return Ok(None);
        };

        Ok(
            self.collect(filter, options, collection)
                .await?
                .into_iter()
                .next()
        )
    }

    async fn find_documents(&self, filter: Option<Expr>, options: QueryOptions, collection: &str) -> DriverResult<Vec<Bson>> {
        let filter = MongoQueryTranslator::translate(filter.as_ref())?;

        match find_options(&options) {
            Some(options) => self.collect(filter, options, collection).await,
            None => Ok(Vec::new()),
        }
    }

    async fn count_documents(&self, filter: Option<Expr>, collection: &str) -> DriverResult<u64> {
        self.get_collection(collection)
            .count_documents(MongoQueryTranslator::translate(filter.as_ref())?)
            .await
            .map_err(map_driver_error)
    }

    async fn update_document(&self, id: Uuid, update: Update, collection: &str) -> DriverResult<Option<Bson>> {
        // MongoDB rejects empty update documents; an empty patch leaves the document as is.
        if update.is_empty() {
            return self.get_document(id, collection).await;
        }

        let updated = self.get_collection(collection)
            .find_one_and_update(doc! { "_id": id }, update_document(&update))
            .return_document(ReturnDocument::After)
            .await
            .map_err(map_driver_error)?;

        tracing::debug!(collection, %id, found = updated.is_some(), "updated document");

        Ok(updated.map(Self::restore_document))
    }

    async fn delete_document(&self, id: Uuid, collection: &str) -> DriverResult<bool> {
        let result = self.get_collection(collection)
            .delete_one(doc! { "_id": id })
            .await
            .map_err(map_driver_error)?;

        tracing::debug!(collection, %id, deleted = result.deleted_count, "deleted document");

        Ok(result.deleted_count == 1)
    }

    async fn create_collection(&self, name: &str) -> DriverResult<()> {
        self.database()
            .create_collection(name)
            .await
            .map_err(map_driver_error)
    }

    async fn drop_collection(&self, name: &str) -> DriverResult<()> {
        self.get_collection(name)
            .drop()
            .await
            .map_err(map_driver_error)
    }

    async fn list_collections(&self) -> DriverResult<Vec<String>> {
        self.database()
            .list_collection_names()
            .await
            .map_err(map_driver_error)
    }

    async fn add_index(&self, collection: &str, field: &str, unique: bool) -> DriverResult<()> {
        let key = stored_field(field);

        self.get_collection(collection)
            .create_index(
                IndexModel::builder()
                .keys(doc! { key: 1 })
                .options(
                    IndexOptions::builder()
                    .unique(unique)
                    .build()
                )
                .build()
            )
            .await
            .map_err(map_driver_error)?;

        Ok(())
    }

    async fn drop_index(&self, collection: &str, field: &str) -> DriverResult<()> {
        // Indexes created by `add_index` carry the server's default name.
        self.get_collection(collection)
            .drop_index(format!("{}_1", stored_field(field)))
            .await
            .map_err(map_driver_error)
    }

    async fn shutdown(self) -> DriverResult<()> {
        MongoDbStore::shutdown(self).await
    }
}

/// Builds a [`MongoDbStore`] from a connection string, applying [`PoolPolicy::DEFAULT`].
///
/// Unlike [`connect`](crate::connect::connect), building does not contact the server.
pub struct MongoDbStoreBuilder {
    dsn: String,
    database: String,
    pool: PoolPolicy,
}

impl MongoDbStoreBuilder {
    pub fn new(dsn: &str, database: &str) -> Self {
        Self {
            dsn: dsn.to_string(),
            database: database.to_string(),
            pool: PoolPolicy::DEFAULT,
        }
    }
}

#[async_trait]
impl StoreBackendBuilder for MongoDbStoreBuilder {
    type Backend = MongoDbStore;

    async fn build(self) -> DriverResult<Self::Backend> {
        let mut options = ClientOptions::parse(&self.dsn)
            .await
            .map_err(|e| DriverError::Initialization(e.to_string()))?;

        self.pool.apply(&mut options);

        Ok(MongoDbStore::new(
            Client::with_options(options)
                .map_err(|e| DriverError::Initialization(e.to_string()))?,
            self.database,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn restored_documents_expose_the_identity_first() {
        let id = Uuid::new();

        let restored = MongoDbStore::restore_document(doc! { "name": "a", "_id": id });

        let document = restored.as_document().unwrap();
        assert_eq!(document.keys().collect::<Vec<_>>(), vec!["id", "name"]);
        assert_eq!(document.get("id"), Some(&Bson::from(id)));
        assert!(!document.contains_key("_id"));
    }

    #[tokio::test]
    async fn builder_rejects_malformed_connection_strings() {
        let result = MongoDbStore::builder("not-a-uri", "test").build().await;

        assert!(matches!(result, Err(DriverError::Initialization(_))));
    }
}
