//! # Unistore
//!
//! One CRUD and transaction interface over relational databases (PostgreSQL,
//! MySQL, SQLite) and document stores (MongoDB).
//!
//! ## Feature Flags
//!
//! - `conf` (default) - load [`Config`] from TOML files and environment variables
//! - `integration-tests` - live-database suites backed by testcontainers
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use unistore::{Adapter, Context, new_adapter, record};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let ctx = Context::background();
//! let config = unistore::conf::load(None)?;
//! let adapter = new_adapter(&ctx, &config).await?;
//!
//! adapter.insert(&ctx, "people", &record! { "name" => "John Doe" }, None).await?;
//! let people = adapter.find(&ctx, "people", &record! {}, 10, 0, None).await?;
//! println!("{} people", people.len());
//!
//! adapter.close().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Organization
//!
//! - [`db`]: adapters, value model, translators, transactions
//! - [`conf`]: configuration loading

#[cfg(feature = "conf")]
pub mod conf;
pub mod db;

pub use unistore_db::{
	Adapter, AdapterRegistry, CancellationToken, Condition, Config, Context, DbError,
	ExecResult, Record, Result, Transaction, TransactionHandle, Value, new_adapter, record,
};

#[cfg(feature = "conf")]
pub use unistore_conf::ConfError;
