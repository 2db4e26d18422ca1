//! Database adapters.
//!
//! # Examples
//!
//! ```rust
//! use unistore::db::{BackendType, Config};
//!
//! let config = Config::new("postgresql", "postgres://localhost/app");
//! assert_eq!(config.backend_type().unwrap(), BackendType::Postgres);
//! ```

pub use unistore_db::*;
