//! The uniform adapter interface
//!
//! An [`Adapter`] owns one connection pool (relational stores) or one client
//! (document stores) and exposes the same CRUD, raw passthrough and
//! transaction operations for every backend. Adapters are obtained from the
//! [factory](crate::factory) already connected.
//!
//! Every data operation takes an optional [`TransactionHandle`]: with
//! `Some(handle)` the operation runs inside that transaction, with `None` it
//! runs directly on the pool.

use async_trait::async_trait;
use uuid::Uuid;

use crate::config::{BackendType, Config};
use crate::context::Context;
use crate::error::Result;
use crate::transaction::TransactionHandle;
use crate::value::{Condition, Record, Value};

/// Outcome of a raw statement
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecResult {
	/// Rows changed by the statement
	pub rows_affected: u64,
	/// Generated key, where the driver reports one (MySQL, SQLite)
	pub last_insert_id: Option<i64>,
}

/// Backend-agnostic data access
///
/// # Examples
///
/// ```rust,no_run
/// use unistore_db::{Adapter, Config, Context, new_adapter, record};
///
/// # async fn example() -> unistore_db::Result<()> {
/// let ctx = Context::background();
/// let adapter = new_adapter(&ctx, &Config::new("postgres", "postgres://localhost/app")).await?;
///
/// adapter
///     .insert(&ctx, "people", &record! { "name" => "John Doe", "age" => 30 }, None)
///     .await?;
/// let people = adapter
///     .find(&ctx, "people", &record! { "name" => "John Doe" }, 10, 0, None)
///     .await?;
/// assert_eq!(people.len(), 1);
///
/// adapter.close().await?;
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait Adapter: Send + Sync {
	/// Identity used to match transaction handles to the adapter that opened them
	fn id(&self) -> Uuid;

	fn backend_type(&self) -> BackendType;

	fn is_connected(&self) -> bool;

	/// Establish and verify connectivity
	///
	/// Fails with `InvalidInput` when the adapter is already connected. After
	/// a failure the adapter stays unconnected.
	async fn connect(&self, ctx: &Context, config: &Config) -> Result<()>;

	/// Release the pool or client; idempotent
	async fn close(&self) -> Result<()>;

	/// Insert a single record into `target`
	async fn insert(
		&self,
		ctx: &Context,
		target: &str,
		record: &Record,
		tx: Option<&mut TransactionHandle>,
	) -> Result<()>;

	/// Apply `record` to every entity matching `condition`, returning the matched count
	///
	/// An empty condition matches every entity in `target`.
	async fn update(
		&self,
		ctx: &Context,
		target: &str,
		record: &Record,
		condition: &Condition,
		tx: Option<&mut TransactionHandle>,
	) -> Result<u64>;

	/// Remove every entity matching `condition`, returning the removed count
	///
	/// An empty condition removes every entity in `target`.
	async fn delete(
		&self,
		ctx: &Context,
		target: &str,
		condition: &Condition,
		tx: Option<&mut TransactionHandle>,
	) -> Result<u64>;

	/// Entities matching `condition` in backend order
	///
	/// `limit <= 0` means no limit; a negative `offset` is rejected.
	async fn find(
		&self,
		ctx: &Context,
		target: &str,
		condition: &Condition,
		limit: i64,
		offset: i64,
		tx: Option<&mut TransactionHandle>,
	) -> Result<Vec<Record>>;

	/// Pass a native statement straight to the driver
	async fn execute_raw(
		&self,
		ctx: &Context,
		statement: &str,
		args: &[Value],
		tx: Option<&mut TransactionHandle>,
	) -> Result<ExecResult>;

	/// Pass a native query straight to the driver
	async fn query_raw(
		&self,
		ctx: &Context,
		statement: &str,
		args: &[Value],
		tx: Option<&mut TransactionHandle>,
	) -> Result<Vec<Record>>;

	/// Open a backend-native transaction or session
	async fn begin_transaction(&self, ctx: &Context) -> Result<TransactionHandle>;
}
