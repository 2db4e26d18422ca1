//! Document adapter (MongoDB)
//!
//! Records are stored as BSON documents in the collection named by the
//! operation target. Update and delete apply to every matching document.
//! Raw statements have no MongoDB equivalent and fail with
//! [`DbError::Unsupported`].
//!
//! The database is chosen from [`Config::database`], then the default
//! database of the connection string, then `test`.

use async_trait::async_trait;
use bson::{Document, doc};
use futures::stream::TryStreamExt;
use mongodb::options::ClientOptions;
use mongodb::{Client, ClientSession, Collection};
use parking_lot::RwLock;
use uuid::Uuid;

use crate::adapter::{Adapter, ExecResult};
use crate::config::{BackendType, Config};
use crate::context::Context;
use crate::error::{DbError, Result};
use crate::transaction::{TransactionContext, TransactionHandle};
use crate::translate::document::{
	condition_to_filter, document_to_record, record_to_document, set_update,
};
use crate::value::{Condition, Record, Value};

/// Database used when neither the configuration nor the connection string names one
pub const DEFAULT_DATABASE: &str = "test";

const BACKEND: BackendType = BackendType::MongoDb;

#[derive(Clone)]
struct MongoConnection {
	client: Client,
	database: String,
}

impl MongoConnection {
	fn collection(&self, target: &str) -> Result<Collection<Document>> {
		if target.is_empty() {
			return Err(DbError::InvalidInput("empty collection name".to_string()));
		}
		Ok(self
			.client
			.database(&self.database)
			.collection::<Document>(target))
	}
}

pub struct DocumentAdapter {
	id: Uuid,
	connection: RwLock<Option<MongoConnection>>,
}

impl Default for DocumentAdapter {
	fn default() -> Self {
		Self::new()
	}
}

impl DocumentAdapter {
	pub fn new() -> Self {
		Self {
			id: Uuid::new_v4(),
			connection: RwLock::new(None),
		}
	}

	/// Name of the database operations run against, once connected
	pub fn database_name(&self) -> Option<String> {
		self.connection
			.read()
			.as_ref()
			.map(|conn| conn.database.clone())
	}

	fn connection(&self) -> Result<MongoConnection> {
		self.connection.read().clone().ok_or(DbError::NotConnected)
	}

	fn session<'a>(
		&self,
		tx: Option<&'a mut TransactionHandle>,
	) -> Result<Option<&'a mut ClientSession>> {
		let Some(handle) = tx else {
			return Ok(None);
		};
		match handle.context_mut(self.id)? {
			TransactionContext::Document(session) => Ok(Some(&mut **session)),
			_ => Err(DbError::InvalidInput(
				"transaction does not belong to a mongodb adapter".to_string(),
			)),
		}
	}

	async fn open(config: &Config) -> std::result::Result<MongoConnection, mongodb::error::Error> {
		let mut options = ClientOptions::parse(&config.connection_string).await?;
		if let Some(max) = config.effective_open_connections() {
			options.max_pool_size = Some(max);
		}
		if let Some(min) = config.effective_idle_connections() {
			options.min_pool_size = Some(min);
		}
		options.connect_timeout = Some(config.connect_timeout);
		options.server_selection_timeout = Some(config.connect_timeout);

		let database = config
			.database
			.clone()
			.or_else(|| options.default_database.clone())
			.unwrap_or_else(|| DEFAULT_DATABASE.to_string());

		let client = Client::with_options(options)?;
		if let Err(e) = client.database(&database).run_command(doc! { "ping": 1 }).await {
			client.shutdown().immediate(true).await;
			return Err(e);
		}
		Ok(MongoConnection { client, database })
	}
}

fn driver_error(
	operation: &'static str,
	target: &str,
) -> impl FnOnce(mongodb::error::Error) -> DbError {
	move |e| DbError::backend(BACKEND, operation, target, e)
}

#[async_trait]
impl Adapter for DocumentAdapter {
	fn id(&self) -> Uuid {
		self.id
	}

	fn backend_type(&self) -> BackendType {
		BACKEND
	}

	fn is_connected(&self) -> bool {
		self.connection.read().is_some()
	}

	async fn connect(&self, ctx: &Context, config: &Config) -> Result<()> {
		if let Ok(configured) = config.backend_type()
			&& configured != BACKEND
		{
			return Err(DbError::InvalidInput(format!(
				"mongodb adapter cannot connect with a {} configuration",
				configured
			)));
		}
		if self.is_connected() {
			return Err(DbError::InvalidInput("adapter is already connected".to_string()));
		}

		tracing::debug!(backend = %BACKEND, adapter = %self.id, "connecting");
		let connection = ctx
			.clone()
			.timeout(config.connect_timeout)
			.run(async {
				Self::open(config)
					.await
					.map_err(|e| DbError::connect(BACKEND, e))
			})
			.await?;

		let raced = {
			let mut guard = self.connection.write();
			match guard.as_ref() {
				Some(_) => Some(connection),
				None => {
					*guard = Some(connection);
					None
				}
			}
		};
		if let Some(connection) = raced {
			connection.client.shutdown().immediate(true).await;
			return Err(DbError::InvalidInput("adapter is already connected".to_string()));
		}

		tracing::debug!(
			backend = %BACKEND,
			adapter = %self.id,
			database = self.database_name().as_deref(),
			"connected"
		);
		Ok(())
	}

	async fn close(&self) -> Result<()> {
		let connection = self.connection.write().take();
		if let Some(connection) = connection {
			connection.client.shutdown().immediate(true).await;
			tracing::debug!(backend = %BACKEND, adapter = %self.id, "closed");
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
		let document = record_to_document(record)?;
		let collection = self.connection()?.collection(target)?;
		let session = self.session(tx)?;
		tracing::debug!(
			backend = %BACKEND,
			target,
			in_transaction = session.is_some(),
			"inserting document"
		);

		ctx.run(async move {
			let action = collection.insert_one(document);
			let result = match session {
				Some(session) => action.session(session).await,
				None => action.await,
			};
			result.map(|_| ()).map_err(driver_error("insert", target))
		})
		.await
	}

	async fn update(
		&self,
		ctx: &Context,
		target: &str,
		record: &Record,
		condition: &Condition,
		tx: Option<&mut TransactionHandle>,
	) -> Result<u64> {
		let update = set_update(record)?;
		let filter = condition_to_filter(condition)?;
		let collection = self.connection()?.collection(target)?;
		let session = self.session(tx)?;
		tracing::debug!(
			backend = %BACKEND,
			target,
			%filter,
			in_transaction = session.is_some(),
			"updating documents"
		);

		ctx.run(async move {
			let action = collection.update_many(filter, update);
			let result = match session {
				Some(session) => action.session(session).await,
				None => action.await,
			};
			result
				.map(|result| result.matched_count)
				.map_err(driver_error("update", target))
		})
		.await
	}

	async fn delete(
		&self,
		ctx: &Context,
		target: &str,
		condition: &Condition,
		tx: Option<&mut TransactionHandle>,
	) -> Result<u64> {
		let filter = condition_to_filter(condition)?;
		let collection = self.connection()?.collection(target)?;
		let session = self.session(tx)?;
		tracing::debug!(
			backend = %BACKEND,
			target,
			%filter,
			in_transaction = session.is_some(),
			"deleting documents"
		);

		ctx.run(async move {
			let action = collection.delete_many(filter);
			let result = match session {
				Some(session) => action.session(session).await,
				None => action.await,
			};
			result
				.map(|result| result.deleted_count)
				.map_err(driver_error("delete", target))
		})
		.await
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
		if offset < 0 {
			return Err(DbError::InvalidInput(format!(
				"offset must not be negative, got {}",
				offset
			)));
		}
		let filter = condition_to_filter(condition)?;
		let collection = self.connection()?.collection(target)?;
		let session = self.session(tx)?;
		tracing::debug!(
			backend = %BACKEND,
			target,
			%filter,
			limit,
			offset,
			"finding documents"
		);

		let documents = ctx
			.run(async move {
				let mut action = collection.find(filter);
				if limit > 0 {
					action = action.limit(limit);
				}
				if offset > 0 {
					action = action.skip(offset as u64);
				}

				let documents = match session {
					Some(session) => match action.session(&mut *session).await {
						Ok(mut cursor) => cursor.stream(session).try_collect::<Vec<Document>>().await,
						Err(e) => Err(e),
					},
					None => match action.await {
						Ok(cursor) => cursor.try_collect::<Vec<Document>>().await,
						Err(e) => Err(e),
					},
				};
				documents.map_err(driver_error("find", target))
			})
			.await?;

		Ok(documents.into_iter().map(document_to_record).collect())
	}

	async fn execute_raw(
		&self,
		_ctx: &Context,
		_statement: &str,
		_args: &[Value],
		_tx: Option<&mut TransactionHandle>,
	) -> Result<ExecResult> {
		Err(DbError::Unsupported(
			"mongodb does not support raw statement execution".to_string(),
		))
	}

	async fn query_raw(
		&self,
		_ctx: &Context,
		_statement: &str,
		_args: &[Value],
		_tx: Option<&mut TransactionHandle>,
	) -> Result<Vec<Record>> {
		Err(DbError::Unsupported(
			"mongodb does not support raw queries".to_string(),
		))
	}

	async fn begin_transaction(&self, ctx: &Context) -> Result<TransactionHandle> {
		let connection = self.connection()?;
		let session = ctx
			.run(async move {
				let start = async {
					let mut session = connection.client.start_session().await?;
					session.start_transaction().await?;
					Ok::<_, mongodb::error::Error>(session)
				};
				start.await.map_err(driver_error("begin", "session"))
			})
			.await?;
		Ok(TransactionHandle::new(
			self.id,
			BACKEND,
			TransactionContext::Document(Box::new(session)),
		))
	}
}

impl std::fmt::Debug for DocumentAdapter {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("DocumentAdapter")
			.field("id", &self.id)
			.field("database", &self.database_name())
			.finish()
	}
}
