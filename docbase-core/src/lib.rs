//! Generic repository and service layers over JSON document databases.
//!
//! This crate is the core of the docbase project and provides:
//!
//! - **Document traits** ([`document`]) - Identity, collection binding and creation DTOs
//! - **Store backend abstraction** ([`backend`]) - The driver seam implemented by storage backends
//! - **Filters and query options** ([`query`]) - Predicates, sorting, pagination and projection
//! - **Partial updates** ([`update`]) - Field-level modifications applied by identity
//! - **Repositories** ([`repository`]) - CRUD over one collection with driver faults narrowed to [`error::AppError`]
//! - **Services** ([`service`]) - Repository delegation with faults mapped to [`error::HttpError`]
//! - **Document store** ([`store`]) - Owned backend handle with an explicit shutdown
//! - **Error handling** ([`error`]) - The driver, application and HTTP error taxonomies
//! - **Pagination** ([`page`]) - Paginated results and parameters
//!
//! # Example
//!
//! ```ignore
//! use docbase::prelude::*;
//! use bson::Uuid;
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Debug, Clone, Serialize, Deserialize)]
//! pub struct User {
//!     pub id: Uuid,
//!     pub name: String,
//! }
//!
//! #[derive(Debug, Clone, Serialize, Deserialize)]
//! pub struct NewUser {
//!     pub name: String,
//! }
//!
//! impl Document for User {
//!     type Create = NewUser;
//!
//!     fn id(&self) -> &Uuid {
//!         &self.id
//!     }
//!
//!     fn collection_name() -> &'static str {
//!         "users"
//!     }
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as docbase_core;

pub mod backend;
pub mod document;
pub mod error;
pub mod page;
pub mod query;
pub mod repository;
pub mod service;
pub mod store;
pub mod update;
