//! SQLite driver glue
//!
//! SQLite is dynamically typed, so values are decoded by their storage class
//! rather than by the declared column type. Columns declared `BOOLEAN` are the
//! one exception and decode integers as booleans.

use sqlx::query::Query;
use sqlx::sqlite::{SqliteArguments, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::types::Json;
use sqlx::{Column, Connection, Executor, Row, Sqlite, TypeInfo, ValueRef};

use crate::adapter::ExecResult;
use crate::config::Config;
use crate::value::{Record, Value};

pub(super) async fn connect(config: &Config) -> Result<SqlitePool, sqlx::Error> {
	let mut options = SqlitePoolOptions::new().acquire_timeout(config.connect_timeout);
	if let Some(max) = config.effective_open_connections() {
		options = options.max_connections(max);
	}
	if let Some(min) = config.effective_idle_connections() {
		options = options.min_connections(min);
	}

	let pool = options.connect(&config.connection_string).await?;
	let ping = async {
		let mut conn = pool.acquire().await?;
		conn.ping().await
	};
	if let Err(e) = ping.await {
		pool.close().await;
		return Err(e);
	}
	Ok(pool)
}

fn bind_value<'q>(
	query: Query<'q, Sqlite, SqliteArguments<'q>>,
	value: &'q Value,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
	match value {
		Value::Null => query.bind(None::<String>),
		Value::Bool(b) => query.bind(*b),
		Value::Int(i) => query.bind(*i),
		Value::Float(f) => query.bind(*f),
		Value::String(s) => query.bind(s.as_str()),
		Value::Array(_) | Value::Map(_) => query.bind(Json(value.to_json())),
	}
}

fn build<'q>(sql: &'q str, params: &'q [Value]) -> Query<'q, Sqlite, SqliteArguments<'q>> {
	params
		.iter()
		.fold(sqlx::query(sql), |query, param| bind_value(query, param))
}

pub(super) async fn execute<'e, E>(
	executor: E,
	sql: &'e str,
	params: &'e [Value],
) -> Result<ExecResult, sqlx::Error>
where
	E: Executor<'e, Database = Sqlite>,
{
	let result = build(sql, params).execute(executor).await?;
	let last_insert_id = Some(result.last_insert_rowid()).filter(|id| *id > 0);
	Ok(ExecResult {
		rows_affected: result.rows_affected(),
		last_insert_id,
	})
}

pub(super) async fn fetch_all<'e, E>(
	executor: E,
	sql: &'e str,
	params: &'e [Value],
) -> Result<Vec<Record>, sqlx::Error>
where
	E: Executor<'e, Database = Sqlite>,
{
	let rows = build(sql, params).fetch_all(executor).await?;
	rows.iter().map(convert_row).collect()
}

fn convert_row(row: &SqliteRow) -> Result<Record, sqlx::Error> {
	let mut record = Record::new();
	for column in row.columns() {
		let index = column.ordinal();
		let raw = row.try_get_raw(index)?;
		let value = if raw.is_null() {
			Value::Null
		} else {
			let storage = raw.type_info().name().to_string();
			decode_column(row, index, &storage, column.type_info().name())?
		};
		record.insert(column.name(), value);
	}
	Ok(record)
}

fn decode_column(
	row: &SqliteRow,
	index: usize,
	storage: &str,
	declared: &str,
) -> Result<Value, sqlx::Error> {
	let value = match (storage, declared) {
		("INTEGER", "BOOLEAN") => Value::Bool(row.try_get(index)?),
		("INTEGER", _) => Value::Int(row.try_get(index)?),
		("REAL", _) => Value::Float(row.try_get(index)?),
		("TEXT", _) => Value::String(row.try_get(index)?),
		("BLOB", _) => {
			Value::String(String::from_utf8_lossy(&row.try_get::<Vec<u8>, _>(index)?).into_owned())
		}
		_ => {
			return Err(sqlx::Error::Decode(
				format!("unsupported storage class {}", storage).into(),
			));
		}
	};
	Ok(value)
}
