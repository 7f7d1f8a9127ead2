//! Generic data access over one collection.
//!
//! [`Repository`] is the contract consumed by services; [`BaseRepository`] implements it
//! for any [`Document`] type on top of any [`StoreBackend`]. Every operation is a single
//! backend round trip whose faults are logged and narrowed to an [`AppError`]:
//!
//! - a unique-constraint violation becomes [`AppError::DuplicateKey`],
//! - everything else becomes [`AppError::Database`].
//!
//! Absence is never an error: lookups return `None` and deletes return `false`.
//!
//! # Example
//!
//! ```ignore
//! use docbase::{prelude::*, memory::InMemoryStore};
//!
//! let users = BaseRepository::<User, _>::new(InMemoryStore::new());
//!
//! let alice = users.create(NewUser { name: "Alice".into() }).await?;
//! assert!(users.find_by_id(alice.id()).await?.is_some());
//! ```

use async_trait::async_trait;
use bson::{Bson, Document as BsonDocument, Uuid, ser::serialize_to_bson};
use std::{future::Future, marker::PhantomData, sync::Arc};

use crate::{
    backend::StoreBackend,
    document::{CreateDto, Document, DocumentExt},
    error::{AppError, AppResult, DriverError, DriverResult},
    query::{Expr, QueryOptions},
    update::Update,
};

/// CRUD contract over one collection of `T`.
///
/// Implemented by [`BaseRepository`]; services depend on this trait only, so any
/// implementation (a test double included) can be substituted.
#[async_trait]
pub trait Repository<T: Document>: Send + Sync {
    /// Persists a new document and returns it with its assigned identity.
    async fn create(&self, data: CreateDto<T>) -> AppResult<T>;

    /// Looks a document up by identity.
    async fn find_by_id(&self, id: &Uuid) -> AppResult<Option<T>>;

    /// Returns the first document matching the filter under the given options.
    async fn find_one(&self, filter: Option<Expr>, options: QueryOptions) -> AppResult<Option<T>>;

    /// Returns every document matching the filter under the given options.
    ///
    /// `find_all(None, QueryOptions::default())` returns the whole collection.
    async fn find_all(&self, filter: Option<Expr>, options: QueryOptions) -> AppResult<Vec<T>>;

    /// Counts the documents matching the filter.
    async fn count(&self, filter: Option<Expr>) -> AppResult<u64>;

    /// Applies a partial update and returns the post-update document, or `None`
    /// if no document has that identity.
    async fn update(&self, id: &Uuid, update: Update) -> AppResult<Option<T>>;

    /// Deletes a document. Returns `true` iff it existed.
    async fn delete(&self, id: &Uuid) -> AppResult<bool>;
}

/// [`Repository`] implementation backed by a [`StoreBackend`].
///
/// The backend handle is injected at construction; the repository never opens or
/// closes connections itself.
#[derive(Debug)]
pub struct BaseRepository<T, B> {
    backend: B,
    _document: PhantomData<fn() -> T>,
}

impl<T, B> BaseRepository<T, B>
where
    T: Document,
    B: StoreBackend,
{
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            _document: PhantomData,
        }
    }

    /// Returns the backend this repository delegates to.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Returns the name of the collection this repository manages.
    pub fn collection_name(&self) -> &'static str {
        T::collection_name()
    }

    /// Awaits a backend operation, translating any fault into an [`AppError`].
    async fn handle<R>(
        &self,
        operation: &'static str,
        future: impl Future<Output = DriverResult<R>> + Send,
    ) -> AppResult<R> {
        future.await.map_err(|error| {
            tracing::error!(
                collection = T::collection_name(),
                operation,
                %error,
                "repository operation failed",
            );

            AppError::from(&error)
        })
    }
}

impl<T, B: Clone> Clone for BaseRepository<T, B> {
    fn clone(&self) -> Self {
        Self {
            backend: self.backend.clone(),
            _document: PhantomData,
        }
    }
}

fn into_document(value: Bson) -> DriverResult<BsonDocument> {
    match value {
        Bson::Document(document) => Ok(document),
        other => Err(DriverError::InvalidDocument(format!(
            "expected a document, got {:?}",
            other.element_type()
        ))),
    }
}

#[async_trait]
impl<T, B> Repository<T> for BaseRepository<T, B>
where
    T: Document,
    B: StoreBackend,
{
    async fn create(&self, data: CreateDto<T>) -> AppResult<T> {
        self.handle("create", async move {
            let document = into_document(serialize_to_bson(&data)?)?;
            let stored = self
                .backend
                .insert_document(document, T::collection_name())
                .await?;

            T::from_bson(stored)
        })
        .await
    }

    async fn find_by_id(&self, id: &Uuid) -> AppResult<Option<T>> {
        self.handle("findById", async move {
            self.backend
                .get_document(*id, T::collection_name())
                .await?
                .map(T::from_bson)
                .transpose()
        })
        .await
    }

    async fn find_one(&self, filter: Option<Expr>, options: QueryOptions) -> AppResult<Option<T>> {
        self.handle("findOne", async move {
            self.backend
                .find_one_document(filter, options, T::collection_name())
                .await?
                .map(T::from_bson)
                .transpose()
        })
        .await
    }

    async fn find_all(&self, filter: Option<Expr>, options: QueryOptions) -> AppResult<Vec<T>> {
        self.handle("findAll", async move {
            self.backend
                .find_documents(filter, options, T::collection_name())
                .await?
                .into_iter()
                .map(T::from_bson)
                .collect::<DriverResult<Vec<T>>>()
        })
        .await
    }

    async fn count(&self, filter: Option<Expr>) -> AppResult<u64> {
        self.handle(
            "count",
            self.backend.count_documents(filter, T::collection_name()),
        )
        .await
    }

    async fn update(&self, id: &Uuid, update: Update) -> AppResult<Option<T>> {
        self.handle("update", async move {
            self.backend
                .update_document(*id, update, T::collection_name())
                .await?
                .map(T::from_bson)
                .transpose()
        })
        .await
    }

    async fn delete(&self, id: &Uuid) -> AppResult<bool> {
        self.handle(
            "delete",
            self.backend.delete_document(*id, T::collection_name()),
        )
        .await
    }
}

#[async_trait]
impl<T, R> Repository<T> for Arc<R>
where
    T: Document,
    R: Repository<T> + ?Sized,
{
    async fn create(&self, data: CreateDto<T>) -> AppResult<T> {
        (**self).create(data).await
    }

    async fn find_by_id(&self, id: &Uuid) -> AppResult<Option<T>> {
        (**self).find_by_id(id).await
    }

    async fn find_one(&self, filter: Option<Expr>, options: QueryOptions) -> AppResult<Option<T>> {
        (**self).find_one(filter, options).await
    }

    async fn find_all(&self, filter: Option<Expr>, options: QueryOptions) -> AppResult<Vec<T>> {
        (**self).find_all(filter, options).await
    }

    async fn count(&self, filter: Option<Expr>) -> AppResult<u64> {
        (**self).count(filter).await
    }

    async fn update(&self, id: &Uuid, update: Update) -> AppResult<Option<T>> {
        (**self).update(id, update).await
    }

    async fn delete(&self, id: &Uuid) -> AppResult<bool> {
        (**self).delete(id).await
    }
}

#[async_trait]
impl<T, R> Repository<T> for Box<R>
where
    T: Document,
    R: Repository<T> + ?Sized,
{
    async fn create(&self, data: CreateDto<T>) -> AppResult<T> {
        (**self).create(data).await
    }

    async fn find_by_id(&self, id: &Uuid) -> AppResult<Option<T>> {
        (**self).find_by_id(id).await
    }

    async fn find_one(&self, filter: Option<Expr>, options: QueryOptions) -> AppResult<Option<T>> {
        (**self).find_one(filter, options).await
    }

    async fn find_all(&self, filter: Option<Expr>, options: QueryOptions) -> AppResult<Vec<T>> {
        (**self).find_all(filter, options).await
    }

    async fn count(&self, filter: Option<Expr>) -> AppResult<u64> {
        (**self).count(filter).await
    }

    async fn update(&self, id: &Uuid, update: Update) -> AppResult<Option<T>> {
        (**self).update(id, update).await
    }

    async fn delete(&self, id: &Uuid) -> AppResult<bool> {
        (**self).delete(id).await
    }
}
