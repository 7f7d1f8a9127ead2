//! Service layer translating repository faults into HTTP-facing errors.
//!
//! [`BaseService`] wraps anything implementing [`Repository`] and mirrors its
//! operations, mapping [`AppError::DuplicateKey`](crate::error::AppError::DuplicateKey)
//! to [`HttpError::Conflict`] and every other fault to [`HttpError::InternalServer`].
//! Successful results, `None` and empty lists included, pass through unchanged; turning
//! absence into a [`HttpError::NotFound`] is up to the caller.

use async_trait::async_trait;
use bson::Uuid;
use std::{future::Future, marker::PhantomData};

use crate::{
    document::{CreateDto, Document},
    error::{AppError, AppResult, HttpError, HttpResult},
    page::{PaginatedResult, PaginationParams},
    query::{Expr, QueryOptions},
    repository::Repository,
    update::Update,
};

/// Operations exposed to request handlers for one document type.
#[async_trait]
pub trait Service<T: Document>: Send + Sync {
    async fn create(&self, data: CreateDto<T>) -> HttpResult<T>;

    async fn find_one(&self, filter: Option<Expr>, options: QueryOptions) -> HttpResult<Option<T>>;

    async fn find_by_id(&self, id: &Uuid) -> HttpResult<Option<T>>;

    async fn find_all(&self, filter: Option<Expr>, options: QueryOptions) -> HttpResult<Vec<T>>;

    async fn count(&self, filter: Option<Expr>) -> HttpResult<u64>;

    async fn update(&self, id: &Uuid, update: Update) -> HttpResult<Option<T>>;

    async fn delete(&self, id: &Uuid) -> HttpResult<bool>;

    /// Returns one page of matching documents along with pagination metadata.
    ///
    /// The offset and limit of `options` are replaced by the ones derived from `params`.
    async fn find_page(
        &self,
        filter: Option<Expr>,
        options: QueryOptions,
        params: PaginationParams,
    ) -> HttpResult<PaginatedResult<T>>;
}

/// [`Service`] implementation delegating to a [`Repository`].
#[derive(Debug)]
pub struct BaseService<T, R> {
    repository: R,
    _document: PhantomData<fn() -> T>,
}

impl<T, R> BaseService<T, R>
where
    T: Document,
    R: Repository<T>,
{
    pub fn new(repository: R) -> Self {
        Self {
            repository,
            _document: PhantomData,
        }
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    /// Awaits a repository operation, translating any fault into an [`HttpError`].
    async fn handle<V>(
        &self,
        operation: &'static str,
        future: impl Future<Output = AppResult<V>> + Send,
    ) -> HttpResult<V> {
        future.await.map_err(|error| {
            tracing::error!(
                model = T::collection_name(),
                operation,
                %error,
                "service operation failed",
            );

            HttpError::from(&error)
        })
    }
}

impl<T, R: Clone> Clone for BaseService<T, R> {
    fn clone(&self) -> Self {
        Self {
            repository: self.repository.clone(),
            _document: PhantomData,
        }
    }
}

#[async_trait]
impl<T, R> Service<T> for BaseService<T, R>
where
    T: Document,
    R: Repository<T>,
{
    async fn create(&self, data: CreateDto<T>) -> HttpResult<T> {
        self.handle("create", self.repository.create(data)).await
    }

    async fn find_one(&self, filter: Option<Expr>, options: QueryOptions) -> HttpResult<Option<T>> {
        self.handle("findOne", self.repository.find_one(filter, options))
            .await
    }

    async fn find_by_id(&self, id: &Uuid) -> HttpResult<Option<T>> {
        self.handle("findById", self.repository.find_by_id(id)).await
    }

    async fn find_all(&self, filter: Option<Expr>, options: QueryOptions) -> HttpResult<Vec<T>> {
        self.handle("findAll", self.repository.find_all(filter, options))
            .await
    }

    async fn count(&self, filter: Option<Expr>) -> HttpResult<u64> {
        self.handle("count", self.repository.count(filter)).await
    }

    async fn update(&self, id: &Uuid, update: Update) -> HttpResult<Option<T>> {
        self.handle("update", self.repository.update(id, update))
            .await
    }

    async fn delete(&self, id: &Uuid) -> HttpResult<bool> {
        self.handle("delete", self.repository.delete(id)).await
    }

    async fn find_page(
        &self,
        filter: Option<Expr>,
        options: QueryOptions,
        params: PaginationParams,
    ) -> HttpResult<PaginatedResult<T>> {
        self.handle("findPage", async move {
            let total = self.repository.count(filter.clone()).await?;
            let options = QueryOptions {
                offset: Some(params.offset()),
                limit: Some(params.limit()),
                ..options
            };
            let data = self.repository.find_all(filter, options).await?;

            Ok::<_, AppError>(PaginatedResult::new(data, &params, total))
        })
        .await
    }
}
