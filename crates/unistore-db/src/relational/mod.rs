//! Relational adapter (PostgreSQL, MySQL, SQLite)
//!
//! One [`RelationalAdapter`] type serves every SQL dialect: statements are
//! produced by the [`SqlTranslator`] for the adapter's [`SqlDialect`] and run
//! on an sqlx pool, or on the sqlx transaction carried by a
//! [`TransactionHandle`].
//!
//! ## Example
//!
//! ```rust,no_run
//! use unistore_db::{Adapter, Config, Context, RelationalAdapter, record};
//! use unistore_db::translate::SqlDialect;
//!
//! # async fn example() -> unistore_db::Result<()> {
//! let ctx = Context::background();
//! let adapter = RelationalAdapter::new(SqlDialect::Sqlite);
//! adapter.connect(&ctx, &Config::new("sqlite", "sqlite://app.db?mode=rwc")).await?;
//!
//! let updated = adapter
//!     .update(&ctx, "people", &record! { "age" => 31 }, &record! { "name" => "John Doe" }, None)
//!     .await?;
//! # Ok(())
//! # }
//! ```

mod mysql;
mod postgres;
mod sqlite;

use async_trait::async_trait;
use parking_lot::RwLock;
use sqlx::{MySqlPool, PgPool, SqlitePool};
use uuid::Uuid;

use crate::adapter::{Adapter, ExecResult};
use crate::config::{BackendType, Config};
use crate::context::Context;
use crate::error::{DbError, Result};
use crate::transaction::{TransactionContext, TransactionHandle};
use crate::translate::{SqlDialect, SqlTranslator, Statement};
use crate::value::{Condition, Record, Value};

const RAW_TARGET: &str = "raw statement";

#[derive(Clone)]
enum RelationalPool {
	Postgres(PgPool),
	MySql(MySqlPool),
	Sqlite(SqlitePool),
}

impl RelationalPool {
	async fn close(&self) {
		match self {
			RelationalPool::Postgres(pool) => pool.close().await,
			RelationalPool::MySql(pool) => pool.close().await,
			RelationalPool::Sqlite(pool) => pool.close().await,
		}
	}
}

pub struct RelationalAdapter {
	id: Uuid,
	translator: SqlTranslator,
	pool: RwLock<Option<RelationalPool>>,
}

impl RelationalAdapter {
	/// Create an unconnected adapter for `dialect`
	pub fn new(dialect: SqlDialect) -> Self {
		Self {
			id: Uuid::new_v4(),
			translator: SqlTranslator::new(dialect),
			pool: RwLock::new(None),
		}
	}

	pub fn postgres() -> Self {
		Self::new(SqlDialect::Postgres)
	}

	pub fn mysql() -> Self {
		Self::new(SqlDialect::MySql)
	}

	pub fn sqlite() -> Self {
		Self::new(SqlDialect::Sqlite)
	}

	pub fn dialect(&self) -> SqlDialect {
		self.translator.dialect()
	}

	fn backend(&self) -> BackendType {
		self.dialect().backend_type()
	}

	fn pool(&self) -> Result<RelationalPool> {
		self.pool.read().clone().ok_or(DbError::NotConnected)
	}

	async fn open_pool(&self, config: &Config) -> std::result::Result<RelationalPool, sqlx::Error> {
		Ok(match self.dialect() {
			SqlDialect::Postgres => RelationalPool::Postgres(postgres::connect(config).await?),
			SqlDialect::MySql => RelationalPool::MySql(mysql::connect(config).await?),
			SqlDialect::Sqlite => RelationalPool::Sqlite(sqlite::connect(config).await?),
		})
	}

	fn foreign_transaction(&self) -> DbError {
		DbError::InvalidInput(format!(
			"transaction does not belong to a {} adapter",
			self.backend()
		))
	}

	async fn execute_statement(
		&self,
		ctx: &Context,
		operation: &'static str,
		target: &str,
		statement: &str,
		params: &[Value],
		tx: Option<&mut TransactionHandle>,
	) -> Result<ExecResult> {
		let pool = self.pool()?;
		let tx = match tx {
			Some(handle) => Some(handle.context_mut(self.id)?),
			None => None,
		};
		let backend = self.backend();
		tracing::debug!(
			%backend,
			operation,
			target,
			sql = statement,
			params = params.len(),
			in_transaction = tx.is_some(),
			"executing statement"
		);

		let result = ctx
			.run(async {
				let result = match (&pool, tx) {
					(RelationalPool::Postgres(pool), None) => {
						postgres::execute(pool, statement, params).await
					}
					(RelationalPool::Postgres(_), Some(TransactionContext::Postgres(tx))) => {
						postgres::execute(&mut **tx, statement, params).await
					}
					(RelationalPool::MySql(pool), None) => mysql::execute(pool, statement, params).await,
					(RelationalPool::MySql(_), Some(TransactionContext::MySql(tx))) => {
						mysql::execute(&mut **tx, statement, params).await
					}
					(RelationalPool::Sqlite(pool), None) => {
						sqlite::execute(pool, statement, params).await
					}
					(RelationalPool::Sqlite(_), Some(TransactionContext::Sqlite(tx))) => {
						sqlite::execute(&mut **tx, statement, params).await
					}
					(_, Some(_)) => return Err(self.foreign_transaction()),
				};
				result.map_err(|e| DbError::backend(backend, operation, target, e))
			})
			.await?;

		tracing::debug!(
			%backend,
			operation,
			target,
			rows_affected = result.rows_affected,
			"statement executed"
		);
		Ok(result)
	}

	async fn fetch_statement(
		&self,
		ctx: &Context,
		operation: &'static str,
		target: &str,
		statement: &str,
		params: &[Value],
		tx: Option<&mut TransactionHandle>,
	) -> Result<Vec<Record>> {
		let pool = self.pool()?;
		let tx = match tx {
			Some(handle) => Some(handle.context_mut(self.id)?),
			None => None,
		};
		let backend = self.backend();
		tracing::debug!(
			%backend,
			operation,
			target,
			sql = statement,
			params = params.len(),
			in_transaction = tx.is_some(),
			"executing query"
		);

		ctx.run(async {
			let result = match (&pool, tx) {
				(RelationalPool::Postgres(pool), None) => {
					postgres::fetch_all(pool, statement, params).await
				}
				(RelationalPool::Postgres(_), Some(TransactionContext::Postgres(tx))) => {
					postgres::fetch_all(&mut **tx, statement, params).await
				}
				(RelationalPool::MySql(pool), None) => mysql::fetch_all(pool, statement, params).await,
				(RelationalPool::MySql(_), Some(TransactionContext::MySql(tx))) => {
					mysql::fetch_all(&mut **tx, statement, params).await
				}
				(RelationalPool::Sqlite(pool), None) => sqlite::fetch_all(pool, statement, params).await,
				(RelationalPool::Sqlite(_), Some(TransactionContext::Sqlite(tx))) => {
					sqlite::fetch_all(&mut **tx, statement, params).await
				}
				(_, Some(_)) => return Err(self.foreign_transaction()),
			};
			result.map_err(|e| DbError::backend(backend, operation, target, e))
		})
		.await
	}

	async fn run(
		&self,
		ctx: &Context,
		operation: &'static str,
		target: &str,
		statement: Statement,
		tx: Option<&mut TransactionHandle>,
	) -> Result<u64> {
		self.execute_statement(ctx, operation, target, &statement.sql, &statement.params, tx)
			.await
			.map(|result| result.rows_affected)
	}
}

#[async_trait]
impl Adapter for RelationalAdapter {
	fn id(&self) -> Uuid {
		self.id
	}

	fn backend_type(&self) -> BackendType {
		self.backend()
	}

	fn is_connected(&self) -> bool {
		self.pool.read().is_some()
	}

	async fn connect(&self, ctx: &Context, config: &Config) -> Result<()> {
		let backend = self.backend();
		if let Ok(configured) = config.backend_type()
			&& configured != backend
		{
			return Err(DbError::InvalidInput(format!(
				"{} adapter cannot connect with a {} configuration",
				backend, configured
			)));
		}
		if self.is_connected() {
			return Err(DbError::InvalidInput("adapter is already connected".to_string()));
		}

		tracing::debug!(%backend, adapter = %self.id, "connecting");
		let pool = ctx
			.clone()
			.timeout(config.connect_timeout)
			.run(async {
				self.open_pool(config)
					.await
					.map_err(|e| DbError::connect(backend, e))
			})
			.await?;

		let raced = {
			let mut guard = self.pool.write();
			match guard.as_ref() {
				Some(_) => Some(pool),
				None => {
					*guard = Some(pool);
					None
				}
			}
		};
		if let Some(pool) = raced {
			pool.close().await;
			return Err(DbError::InvalidInput("adapter is already connected".to_string()));
		}

		tracing::debug!(%backend, adapter = %self.id, "connected");
		Ok(())
	}

	async fn close(&self) -> Result<()> {
		let pool = self.pool.write().take();
		if let Some(pool) = pool {
			pool.close().await;
			tracing::debug!(backend = %self.backend(), adapter = %self.id, "closed");
		}
		Ok(())
	}

	async fn insert(
		&self,
		ctx: &Context,
		target: &str,
		record: &Record,
		tx: Option<&mut TransactionHandle>,
	) -> Result<()> {
		let statement = self.translator.insert(target, record)?;
		self.run(ctx, "insert", target, statement, tx).await?;
		Ok(())
	}

	async fn update(
		&self,
		ctx: &Context,
		target: &str,
		record: &Record,
		condition: &Condition,
		tx: Option<&mut TransactionHandle>,
	) -> Result<u64> {
		let statement = self.translator.update(target, record, condition)?;
		self.run(ctx, "update", target, statement, tx).await
	}

	async fn delete(
		&self,
		ctx: &Context,
		target: &str,
		condition: &Condition,
		tx: Option<&mut TransactionHandle>,
	) -> Result<u64> {
		let statement = self.translator.delete(target, condition)?;
		self.run(ctx, "delete", target, statement, tx).await
	}

	async fn find(
		&self,
		ctx: &Context,
		target: &str,
		condition: &Condition,
		limit: i64,
		offset: i64,
		tx: Option<&mut TransactionHandle>,
	) -> Result<Vec<Record>> {
		let statement = self.translator.select(target, condition, limit, offset)?;
		self.fetch_statement(ctx, "find", target, &statement.sql, &statement.params, tx)
			.await
	}

	async fn execute_raw(
		&self,
		ctx: &Context,
		statement: &str,
		args: &[Value],
		tx: Option<&mut TransactionHandle>,
	) -> Result<ExecResult> {
		self.execute_statement(ctx, "execute_raw", RAW_TARGET, statement, args, tx)
			.await
	}

	async fn query_raw(
		&self,
		ctx: &Context,
		statement: &str,
		args: &[Value],
		tx: Option<&mut TransactionHandle>,
	) -> Result<Vec<Record>> {
		self.fetch_statement(ctx, "query_raw", RAW_TARGET, statement, args, tx)
			.await
	}

	async fn begin_transaction(&self, ctx: &Context) -> Result<TransactionHandle> {
		let pool = self.pool()?;
		let backend = self.backend();
		let context = ctx
			.run(async {
				let context = match &pool {
					RelationalPool::Postgres(pool) => pool.begin().await.map(TransactionContext::Postgres),
					RelationalPool::MySql(pool) => pool.begin().await.map(TransactionContext::MySql),
					RelationalPool::Sqlite(pool) => pool.begin().await.map(TransactionContext::Sqlite),
				};
				context.map_err(|e| DbError::backend(backend, "begin", RAW_TARGET, e))
			})
			.await?;
		Ok(TransactionHandle::new(self.id, backend, context))
	}
}

impl std::fmt::Debug for RelationalAdapter {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("RelationalAdapter")
			.field("id", &self.id)
			.field("dialect", &self.dialect())
			.field("connected", &self.is_connected())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::record;
	use rstest::rstest;

	#[rstest]
	#[tokio::test]
	async fn test_operations_require_connection() {
		// Arrange
		let adapter = RelationalAdapter::sqlite();
		let ctx = Context::background();

		// Act
		let result = adapter
			.find(&ctx, "people", &Record::new(), 0, 0, None)
			.await;

		// Assert
		assert!(matches!(result, Err(DbError::NotConnected)));
	}

	#[rstest]
	#[tokio::test]
	async fn test_empty_insert_fails_before_connection_check() {
		// Arrange
		let adapter = RelationalAdapter::postgres();

		// Act
		let result = adapter
			.insert(&Context::background(), "people", &Record::new(), None)
			.await;

		// Assert
		assert!(matches!(result, Err(DbError::InvalidInput(_))));
	}

	#[rstest]
	#[tokio::test]
	async fn test_close_without_connect_is_noop() {
		// Arrange
		let adapter = RelationalAdapter::mysql();

		// Act & Assert
		assert!(adapter.close().await.is_ok());
		assert!(adapter.close().await.is_ok());
		assert!(!adapter.is_connected());
	}

	#[rstest]
	#[tokio::test]
	async fn test_connect_rejects_mismatched_backend() {
		// Arrange
		let adapter = RelationalAdapter::postgres();
		let config = Config::new("mysql", "mysql://localhost/app");

		// Act
		let result = adapter.connect(&Context::background(), &config).await;

		// Assert
		assert!(matches!(result, Err(DbError::InvalidInput(_))));
		assert!(!adapter.is_connected());
	}

	#[rstest]
	#[case(SqlDialect::Postgres, BackendType::Postgres)]
	#[case(SqlDialect::MySql, BackendType::Mysql)]
	#[case(SqlDialect::Sqlite, BackendType::Sqlite)]
	fn test_backend_type_follows_dialect(#[case] dialect: SqlDialect, #[case] expected: BackendType) {
		assert_eq!(RelationalAdapter::new(dialect).backend_type(), expected);
	}

	#[rstest]
	fn test_adapters_have_distinct_ids() {
		assert_ne!(RelationalAdapter::sqlite().id(), RelationalAdapter::sqlite().id());
	}

	#[rstest]
	#[tokio::test]
	async fn test_update_validates_before_driver() {
		// Arrange
		let adapter = RelationalAdapter::sqlite();

		// Act
		let result = adapter
			.update(&Context::background(), "people", &Record::new(), &record! { "a" => 1 }, None)
			.await;

		// Assert
		assert!(matches!(result, Err(DbError::InvalidInput(_))));
	}
}
