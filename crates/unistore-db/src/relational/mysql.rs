//! MySQL driver glue

use rust_decimal::prelude::ToPrimitive;
use sqlx::mysql::{MySqlArguments, MySqlPool, MySqlPoolOptions, MySqlRow};
use sqlx::query::Query;
use sqlx::types::Json;
use sqlx::{Column, Connection, Executor, MySql, Row, TypeInfo, ValueRef};

use crate::adapter::ExecResult;
use crate::config::Config;
use crate::value::{Record, Value};

pub(super) async fn connect(config: &Config) -> Result<MySqlPool, sqlx::Error> {
	let mut options = MySqlPoolOptions::new().acquire_timeout(config.connect_timeout);
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
	query: Query<'q, MySql, MySqlArguments>,
	value: &'q Value,
) -> Query<'q, MySql, MySqlArguments> {
	match value {
		Value::Null => query.bind(None::<String>),
		Value::Bool(b) => query.bind(*b),
		Value::Int(i) => query.bind(*i),
		Value::Float(f) => query.bind(*f),
		Value::String(s) => query.bind(s.as_str()),
		Value::Array(_) | Value::Map(_) => query.bind(Json(value.to_json())),
	}
}

fn build<'q>(sql: &'q str, params: &'q [Value]) -> Query<'q, MySql, MySqlArguments> {
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
	E: Executor<'e, Database = MySql>,
{
	let result = build(sql, params).execute(executor).await?;
	// LAST_INSERT_ID() is 0 when the statement generated no key
	let last_insert_id = i64::try_from(result.last_insert_id())
		.ok()
		.filter(|id| *id > 0);
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
	E: Executor<'e, Database = MySql>,
{
	let rows = build(sql, params).fetch_all(executor).await?;
	rows.iter().map(convert_row).collect()
}

fn convert_row(row: &MySqlRow) -> Result<Record, sqlx::Error> {
	let mut record = Record::new();
	for column in row.columns() {
		let index = column.ordinal();
		let value = if row.try_get_raw(index)?.is_null() {
			Value::Null
		} else {
			decode_column(row, index, column.type_info().name())?
		};
		record.insert(column.name(), value);
	}
	Ok(record)
}

fn decode_column(row: &MySqlRow, index: usize, type_name: &str) -> Result<Value, sqlx::Error> {
	if type_name.ends_with("UNSIGNED") {
		let unsigned: u64 = row.try_get(index)?;
		return Ok(i64::try_from(unsigned)
			.map(Value::Int)
			.unwrap_or_else(|_| Value::String(unsigned.to_string())));
	}

	let value = match type_name {
		// TINYINT(1)
		"BOOLEAN" => Value::Bool(row.try_get(index)?),
		"TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" => Value::Int(row.try_get(index)?),
		"FLOAT" => Value::Float(row.try_get::<f32, _>(index)?.into()),
		"DOUBLE" => Value::Float(row.try_get(index)?),
		"DECIMAL" => {
			let decimal: rust_decimal::Decimal = row.try_get(index)?;
			match decimal.to_f64() {
				Some(f) => Value::Float(f),
				None => Value::String(decimal.to_string()),
			}
		}
		"JSON" => Value::from(row.try_get::<serde_json::Value, _>(index)?),
		"TIMESTAMP" => Value::String(
			row.try_get::<chrono::DateTime<chrono::Utc>, _>(index)?
				.to_rfc3339(),
		),
		"DATETIME" => Value::String(row.try_get::<chrono::NaiveDateTime, _>(index)?.to_string()),
		"DATE" => Value::String(row.try_get::<chrono::NaiveDate, _>(index)?.to_string()),
		"TIME" => Value::String(row.try_get::<chrono::NaiveTime, _>(index)?.to_string()),
		_ => {
			if let Ok(s) = row.try_get::<String, _>(index) {
				Value::String(s)
			} else if let Ok(bytes) = row.try_get::<Vec<u8>, _>(index) {
				// binary collations and BLOB columns
				Value::String(String::from_utf8_lossy(&bytes).into_owned())
			} else {
				return Err(sqlx::Error::Decode(
					format!("unsupported column type {}", type_name).into(),
				));
			}
		}
	};
	Ok(value)
}
