//! # unistore-db
//!
//! Uniform CRUD and transaction access to relational databases (PostgreSQL,
//! MySQL, SQLite) and document stores (MongoDB) through one [`Adapter`]
//! interface.
//!
//! ## Features
//!
//! - **Schema-less records**: [`Record`] and [`Condition`] map field names to
//!   [`Value`]s; conditions are equality-only conjunctions
//! - **Per-backend translation**: parameterized SQL with dialect-specific
//!   placeholders, or BSON filter and update documents
//! - **Transactions**: sqlx transactions and MongoDB sessions behind a
//!   commit/rollback [`Transaction`] handle that every operation accepts
//! - **Cancellation**: every operation takes a [`Context`] carrying a
//!   cancellation token and an optional deadline
//! - **Registry**: [`AdapterRegistry`] selects the adapter from the configured
//!   backend type
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use unistore_db::{Adapter, Config, Context, Transaction, new_adapter, record};
//!
//! # async fn example() -> unistore_db::Result<()> {
//! let ctx = Context::background();
//! let adapter = new_adapter(&ctx, &Config::new("mysql", "mysql://root@localhost/app")).await?;
//!
//! let mut tx = adapter.begin_transaction(&ctx).await?;
//! adapter
//!     .insert(&ctx, "people", &record! { "name" => "John Doe", "age" => 30 }, Some(&mut tx))
//!     .await?;
//! tx.commit(&ctx).await?;
//!
//! let updated = adapter
//!     .update(&ctx, "people", &record! { "age" => 31 }, &record! { "name" => "John Doe" }, None)
//!     .await?;
//! assert_eq!(updated, 1);
//!
//! adapter.close().await?;
//! # Ok(())
//! # }
//! ```

pub mod adapter;
pub mod config;
pub mod context;
pub mod document;
pub mod error;
pub mod factory;
pub mod relational;
pub mod transaction;
pub mod translate;
pub mod value;

pub use adapter::{Adapter, ExecResult};
pub use config::{BackendFamily, BackendType, Config};
pub use context::Context;
pub use document::DocumentAdapter;
pub use error::{DbError, Result};
pub use factory::{AdapterRegistry, new_adapter};
pub use relational::RelationalAdapter;
pub use transaction::{Transaction, TransactionHandle};
pub use value::{Condition, Record, Value, ValueKind};

pub use tokio_util::sync::CancellationToken;
