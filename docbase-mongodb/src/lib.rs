//! MongoDB backend for docbase.
//!
//! Provides [`MongoDbStore`], a [`StoreBackend`](docbase_core::backend::StoreBackend)
//! over the official async driver, and the environment-driven [`connect`] bootstrap.
//!
//! Enable it through the `mongodb` feature of the facade crate:
//!
//! ```toml
//! [dependencies]
//! docbase = { version = "x.y.z", features = ["mongodb"] }
//! ```
//!
//! Documents keep their identity in `_id` as a BSON UUID; above this crate it is
//! always exposed as `id`. Every client uses [`PoolPolicy::DEFAULT`].
//!
//! # Example
//!
//! ```ignore
//! use docbase::mongodb::connect_from_env;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // DB_URL=mongodb://localhost:27017/app
//!     let store = connect_from_env().await?;
//!
//!     store.shutdown().await?;
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as docbase_mongodb;

pub mod connect;
pub mod query;
pub mod store;

pub use connect::{ConnectionConfig, PoolPolicy, connect, connect_from_env};
pub use store::{MongoDbStore, MongoDbStoreBuilder};
