//! Transaction handles
//!
//! A [`TransactionHandle`] wraps either an sqlx transaction or a MongoDB
//! client session with a started transaction. It reaches its terminal state
//! through exactly one of [`Transaction::commit`] or
//! [`Transaction::rollback`]; afterwards both fail with
//! [`DbError::AlreadyFinalized`].
//!
//! Dropping an unfinalized handle rolls back through the driver's own drop
//! behaviour.

use async_trait::async_trait;
use mongodb::ClientSession;
use sqlx::{MySql, Postgres, Sqlite};
use uuid::Uuid;

use crate::config::BackendType;
use crate::context::Context;
use crate::error::{BoxError, DbError, Result};

/// Commit/rollback contract of a transaction handle
#[async_trait]
pub trait Transaction: Send {
	async fn commit(&mut self, ctx: &Context) -> Result<()>;

	async fn rollback(&mut self, ctx: &Context) -> Result<()>;
}

/// Backend-native transaction state
pub(crate) enum TransactionContext {
	Postgres(sqlx::Transaction<'static, Postgres>),
	MySql(sqlx::Transaction<'static, MySql>),
	Sqlite(sqlx::Transaction<'static, Sqlite>),
	Document(Box<ClientSession>),
}

/// Transaction opened by [`Adapter::begin_transaction`](crate::Adapter::begin_transaction)
pub struct TransactionHandle {
	id: Uuid,
	owner: Uuid,
	backend: BackendType,
	context: Option<TransactionContext>,
}

impl TransactionHandle {
	pub(crate) fn new(owner: Uuid, backend: BackendType, context: TransactionContext) -> Self {
		let handle = Self {
			id: Uuid::new_v4(),
			owner,
			backend,
			context: Some(context),
		};
		tracing::debug!(transaction = %handle.id, %backend, "transaction started");
		handle
	}

	pub fn id(&self) -> Uuid {
		self.id
	}

	/// Id of the adapter that opened this transaction
	pub fn owner(&self) -> Uuid {
		self.owner
	}

	pub fn backend_type(&self) -> BackendType {
		self.backend
	}

	pub fn is_finalized(&self) -> bool {
		self.context.is_none()
	}

	/// Live transaction state for an operation issued by adapter `owner`
	pub(crate) fn context_mut(&mut self, owner: Uuid) -> Result<&mut TransactionContext> {
		if self.owner != owner {
			return Err(DbError::InvalidInput(format!(
				"transaction {} belongs to another adapter",
				self.id
			)));
		}
		self.context.as_mut().ok_or(DbError::AlreadyFinalized)
	}

	fn finalize(&mut self) -> Result<TransactionContext> {
		self.context.take().ok_or(DbError::AlreadyFinalized)
	}
}

#[async_trait]
impl Transaction for TransactionHandle {
	async fn commit(&mut self, ctx: &Context) -> Result<()> {
		let context = self.finalize()?;
		let (backend, id) = (self.backend, self.id);
		let result = ctx
			.run(async move {
				let outcome: std::result::Result<(), BoxError> = match context {
					TransactionContext::Postgres(tx) => tx.commit().await.map_err(Into::into),
					TransactionContext::MySql(tx) => tx.commit().await.map_err(Into::into),
					TransactionContext::Sqlite(tx) => tx.commit().await.map_err(Into::into),
					TransactionContext::Document(mut session) => {
						session.commit_transaction().await.map_err(Into::into)
					}
				};
				outcome.map_err(|e| DbError::backend(backend, "commit", id.to_string(), e))
			})
			.await;
		tracing::debug!(transaction = %id, ok = result.is_ok(), "transaction committed");
		result
	}

	async fn rollback(&mut self, ctx: &Context) -> Result<()> {
		let context = self.finalize()?;
		let (backend, id) = (self.backend, self.id);
		let result = ctx
			.run(async move {
				let outcome: std::result::Result<(), BoxError> = match context {
					TransactionContext::Postgres(tx) => tx.rollback().await.map_err(Into::into),
					TransactionContext::MySql(tx) => tx.rollback().await.map_err(Into::into),
					TransactionContext::Sqlite(tx) => tx.rollback().await.map_err(Into::into),
					TransactionContext::Document(mut session) => {
						session.abort_transaction().await.map_err(Into::into)
					}
				};
				outcome.map_err(|e| DbError::backend(backend, "rollback", id.to_string(), e))
			})
			.await;
		tracing::debug!(transaction = %id, ok = result.is_ok(), "transaction rolled back");
		result
	}
}

impl std::fmt::Debug for TransactionHandle {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("TransactionHandle")
			.field("id", &self.id)
			.field("owner", &self.owner)
			.field("backend", &self.backend)
			.field("finalized", &self.is_finalized())
			.finish()
	}
}

impl Drop for TransactionHandle {
	fn drop(&mut self) {
		if self.context.is_some() {
			tracing::warn!(
				transaction = %self.id,
				backend = %self.backend,
				"transaction dropped without commit or rollback, rolling back"
			);
		}
	}
}
