//! Convenient re-exports of commonly used types from docbase.
//!
//! ```ignore
//! use docbase::prelude::*;
//! ```

pub use docbase_core::{
    backend::{StoreBackend, StoreBackendBuilder},
    document::{CreateDto, Document, DocumentExt, parse_id},
    error::{AppError, AppResult, DriverError, DriverResult, HttpError, HttpErrorBody, HttpResult},
    page::{PaginatedResult, PaginationParams},
    query::{Expr, FieldOp, Filter, QueryOptions, QueryVisitor, Sort, SortDirection},
    repository::{BaseRepository, Repository},
    service::{BaseService, Service},
    store::DocumentStore,
    update::Update,
};
