//! Diesel ORM runtime infrastructure
//!
//! Provides a pooled SQL [`DataSource`](crate::runtime::resource::DataSource)
//! for flow steps configured with a relational resource.
//!
//! # Features
//!
//! - `postgres`, `mysql`, `sqlite`: select the Diesel backend; the module is
//!   only compiled when one of them is enabled

#[cfg(any(feature = "postgres", feature = "mysql", feature = "sqlite"))]
pub mod database;

#[cfg(any(feature = "postgres", feature = "mysql", feature = "sqlite"))]
pub use database::{DatabaseConfig, DbConnection, Pool, PooledConnection, PooledDataSource};
