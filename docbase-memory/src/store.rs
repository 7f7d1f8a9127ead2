//! In-memory storage implementation for document stores.
//!
//! Documents are kept as BSON documents per collection behind an async-aware
//! read-write lock, in insertion order.

use std::{collections::HashMap, sync::Arc};
use async_trait::async_trait;
use mea::rwlock::RwLock;
use bson::{Bson, Document as BsonDocument, Uuid};

use docbase_core::{
    backend::{StoreBackend, StoreBackendBuilder, ensure_insertable},
    document::ID_FIELD,
    error::{DriverError, DriverResult, DUPLICATE_KEY_CODE, IMMUTABLE_FIELD_CODE},
    query::{Expr, QueryOptions},
    update::Update,
};

use crate::evaluator::{DocumentEvaluator, apply_update, compare_documents, same_value};

const INDEX_NOT_FOUND_CODE: i32 = 27;

#[derive(Debug, Default)]
struct CollectionState {
    documents: Vec<BsonDocument>,
    /// Indexed fields, mapped to whether the index is unique.
    indexes: HashMap<String, bool>,
}

impl CollectionState {
    fn position(&self, id: Uuid) -> Option<usize> {
        let id = Bson::from(id);

        self.documents
            .iter()
            .position(|document| document.get(ID_FIELD) == Some(&id))
    }

    fn unique_fields(&self) -> impl Iterator<Item = &str> {
        self.indexes
            .iter()
            .filter(|(_, unique)| **unique)
            .map(|(field, _)| field.as_str())
    }

    /// Checks `candidate` against every unique index, ignoring the document at `skip`.
    ///
    /// Documents without the indexed field are not constrained. Numbers are
    /// keyed by value, so `1` and `1i64` collide.
    fn check_unique(&self, collection: &str, candidate: &BsonDocument, skip: Option<usize>) -> DriverResult<()> {
        for field in self.unique_fields() {
            let Some(value) = candidate.get(field) else {
                continue;
            };

            let duplicate = self.documents
                .iter()
                .enumerate()
                .filter(|(index, _)| Some(*index) != skip)
                .filter_map(|(_, document)| document.get(field))
                .any(|existing| same_value(existing, value));

            if duplicate {
                return Err(duplicate_key(collection, field, value));
            }
        }

        Ok(())
    }

    fn select(&self, filter: Option<&Expr>, options: &QueryOptions) -> DriverResult<Vec<BsonDocument>> {
        let mut selected = Vec::new();

        for document in &self.documents {
            if DocumentEvaluator::matches(document, filter)? {
                selected.push(document);
            }
        }

        if !options.sort.is_empty() {
            selected.sort_by(|a, b| compare_documents(a, b, &options.sort));
        }

        Ok(
            selected
                .into_iter()
                .skip(options.offset.unwrap_or(0))
                .take(options.limit.unwrap_or(usize::MAX))
                .map(|document| project(document, options.projection.as_deref()))
                .collect()
        )
    }
}

fn project(document: &BsonDocument, projection: Option<&[String]>) -> BsonDocument {
    match projection {
        Some(fields) => document
            .iter()
            .filter(|(key, _)| key.as_str() == ID_FIELD || fields.iter().any(|field| field == *key))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect(),
        None => document.clone(),
    }
}

fn duplicate_key(collection: &str, field: &str, value: &Bson) -> DriverError {
    DriverError::Server {
        code: DUPLICATE_KEY_CODE,
        message: format!(
            "E11000 duplicate key error collection: {collection} index: {field}_1 dup key: {{ {field}: {value} }}"
        ),
    }
}

type StoreMap = HashMap<String, CollectionState>;


/// Thread-safe in-memory document storage backend.
///
/// Implements the full [`StoreBackend`] contract, unique indexes included, which makes
/// it suitable for development and tests. Queries scan every document in a collection.
///
/// # Thread Safety
///
/// `InMemoryStore` is cloneable and uses an `Arc`-wrapped internal state. Multiple clones
/// of the same instance share the same underlying data.
///
/// # Example
///
/// ```ignore
/// use docbase_memory::InMemoryStore;
/// use docbase::backend::StoreBackend;
/// use bson::doc;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = InMemoryStore::new();
///
///     let stored = store.insert_document(doc! { "name": "Alice" }, "users").await?;
///     assert_eq!(store.count_documents(None, "users").await?, 1);
///
///     Ok(())
/// }
/// ```
#[derive(Default, Clone, Debug)]
pub struct InMemoryStore {
    /// collection_name -> collection state
    store: Arc<RwLock<StoreMap>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory document store.
    pub fn new() -> Self {
        Self {
            store: Arc::new(RwLock::new(StoreMap::new())),
        }
    }

    /// Creates a builder for constructing an `InMemoryStore`.
    pub fn builder() -> InMemoryStoreBuilder {
        InMemoryStoreBuilder
    }
}


#[async_trait]
impl StoreBackend for InMemoryStore {
    async fn insert_document(&self, document: BsonDocument, collection: &str) -> DriverResult<Bson> {
        ensure_insertable(&document)?;

        let mut stored = BsonDocument::new();
        stored.insert(ID_FIELD, Uuid::new());
        for (key, value) in document {
            stored.insert(key, value);
        }

        let mut store = self.store.write().await;
        let state = store
            .entry(collection.to_string())
            .or_default();

        state.check_unique(collection, &stored, None)?;
        state.documents.push(stored.clone());

        tracing::debug!(collection, "inserted document");

        Ok(Bson::Document(stored))
    }

    async fn get_document(&self, id: Uuid, collection: &str) -> DriverResult<Option<Bson>> {
        let store = self.store.read().await;

        Ok(
            store
                .get(collection)
                .and_then(|state| state.position(id).map(|index| state.documents[index].clone()))
                .map(Bson::Document)
        )
    }

    async fn find_one_document(
        &self,
        filter: Option<Expr>,
        options: QueryOptions,
        collection: &str,
    ) -> DriverResult<Option<Bson>> {
        let options = QueryOptions { limit: Some(1), ..options };

        Ok(
            self.find_documents(filter, options, collection)
                .await?
                .into_iter()
                .next()
        )
    }

    async fn find_documents(
        &self,
        filter: Option<Expr>,
        options: QueryOptions,
        collection: &str,
    ) -> DriverResult<Vec<Bson>> {
        let store = self.store.read().await;
        let state = match store.get(collection) {
            Some(state) => state,
            None => return Ok(vec![]),
        };

        Ok(
            state
                .select(filter.as_ref(), &options)?
                .into_iter()
                .map(Bson::Document)
                .collect()
        )
    }

    async fn count_documents(&self, filter: Option<Expr>, collection: &str) -> DriverResult<u64> {
        let store = self.store.read().await;
        let state = match store.get(collection) {
            Some(state) => state,
            None => return Ok(0),
        };

        let mut count = 0;
        for document in &state.documents {
            if DocumentEvaluator::matches(document, filter.as_ref())? {
                count += 1;
            }
        }

        Ok(count)
    }

    async fn update_document(&self, id: Uuid, update: Update, collection: &str) -> DriverResult<Option<Bson>> {
        if let Some(field) = [ID_FIELD, "_id"].into_iter().find(|field| update.touches(field)) {
            return Err(DriverError::Server {
                code: IMMUTABLE_FIELD_CODE,
                message: format!("Performing an update on the path '{field}' would modify the immutable field '{field}'"),
            });
        }

        let mut store = self.store.write().await;
        let state = match store.get_mut(collection) {
            Some(state) => state,
            None => return Ok(None),
        };
        let index = match state.position(id) {
            Some(index) => index,
            None => return Ok(None),
        };

        let mut updated = state.documents[index].clone();
        apply_update(&mut updated, &update)?;
        state.check_unique(collection, &updated, Some(index))?;
        state.documents[index] = updated.clone();

        tracing::debug!(collection, %id, "updated document");

        Ok(Some(Bson::Document(updated)))
    }

    async fn delete_document(&self, id: Uuid, collection: &str) -> DriverResult<bool> {
        let mut store = self.store.write().await;
        let state = match store.get_mut(collection) {
            Some(state) => state,
            None => return Ok(false),
        };

        match state.position(id) {
            Some(index) => {
                state.documents.remove(index);
                tracing::debug!(collection, %id, "deleted document");

                Ok(true)
            },
            None => Ok(false),
        }
    }

    async fn create_collection(&self, name: &str) -> DriverResult<()> {
        self.store
            .write()
            .await
            .entry(name.to_string())
            .or_default();

        Ok(())
    }

    async fn drop_collection(&self, name: &str) -> DriverResult<()> {
        self.store.write().await.remove(name);

        Ok(())
    }

    async fn list_collections(&self) -> DriverResult<Vec<String>> {
        Ok(
            self.store
                .read()
                .await
                .keys()
                .cloned()
                .collect()
        )
    }

    async fn add_index(&self, collection: &str, field: &str, unique: bool) -> DriverResult<()> {
        let mut store = self.store.write().await;
        let state = store
            .entry(collection.to_string())
            .or_default();

        if unique {
            let values: Vec<&Bson> = state.documents
                .iter()
                .filter_map(|document| document.get(field))
                .collect();

            for (position, value) in values.iter().enumerate() {
                if values[..position].iter().any(|earlier| same_value(earlier, value)) {
                    return Err(duplicate_key(collection, field, value));
                }
            }
        }

        state.indexes.insert(field.to_string(), unique);

        Ok(())
    }

    async fn drop_index(&self, collection: &str, field: &str) -> DriverResult<()> {
        let removed = self.store
            .write()
            .await
            .get_mut(collection)
            .and_then(|state| state.indexes.remove(field));

        match removed {
            Some(_) => Ok(()),
            None => Err(DriverError::Server {
                code: INDEX_NOT_FOUND_CODE,
                message: format!("index not found with name [{field}_1]"),
            }),
        }
    }
}


/// Builder for constructing [`InMemoryStore`] instances.
///
/// ```ignore
/// use docbase_memory::InMemoryStore;
/// use docbase::backend::StoreBackendBuilder;
///
/// let store = InMemoryStore::builder().build().await.unwrap();
/// ```
#[derive(Default)]
pub struct InMemoryStoreBuilder;

#[async_trait]
impl StoreBackendBuilder for InMemoryStoreBuilder {
    type Backend = InMemoryStore;

    async fn build(self) -> DriverResult<Self::Backend> {
        Ok(InMemoryStore::new())
    }
}
