//! PostgreSQL driver glue

use rust_decimal::prelude::ToPrimitive;
use sqlx::postgres::{PgArguments, PgPool, PgPoolOptions, PgRow};
use sqlx::query::Query;
use sqlx::types::Json;
use sqlx::{Column, Connection, Executor, Postgres, Row, TypeInfo, ValueRef};

use crate::adapter::ExecResult;
use crate::config::Config;
use crate::value::{Record, Value};

pub(super) async fn connect(config: &Config) -> Result<PgPool, sqlx::Error> {
	let mut options = PgPoolOptions::new().acquire_timeout(config.connect_timeout);
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
	query: Query<'q, Postgres, PgArguments>,
	value: &'q Value,
) -> Query<'q, Postgres, PgArguments> {
	match value {
		Value::Null => query.bind(None::<String>),
		Value::Bool(b) => query.bind(*b),
		Value::Int(i) => query.bind(*i),
		Value::Float(f) => query.bind(*f),
		Value::String(s) => query.bind(s.as_str()),
		Value::Array(_) | Value::Map(_) => query.bind(Json(value.to_json())),
	}
}

fn build<'q>(sql: &'q str, params: &'q [Value]) -> Query<'q, Postgres, PgArguments> {
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
	E: Executor<'e, Database = Postgres>,
{
	let result = build(sql, params).execute(executor).await?;
	Ok(ExecResult {
		rows_affected: result.rows_affected(),
		last_insert_id: None,
	})
}

pub(super) async fn fetch_all<'e, E>(
	executor: E,
	sql: &'e str,
	params: &'e [Value],
) -> Result<Vec<Record>, sqlx::Error>
where
	E: Executor<'e, Database = Postgres>,
{
	let rows = build(sql, params).fetch_all(executor).await?;
	rows.iter().map(convert_row).collect()
}

fn convert_row(row: &PgRow) -> Result<Record, sqlx::Error> {
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

fn decode_column(row: &PgRow, index: usize, type_name: &str) -> Result<Value, sqlx::Error> {
	let value = match type_name {
		"BOOL" => Value::Bool(row.try_get(index)?),
		"INT2" => Value::Int(row.try_get::<i16, _>(index)?.into()),
		"INT4" => Value::Int(row.try_get::<i32, _>(index)?.into()),
		"INT8" => Value::Int(row.try_get(index)?),
		"OID" => Value::Int(row.try_get::<sqlx::postgres::types::Oid, _>(index)?.0.into()),
		"FLOAT4" => Value::Float(row.try_get::<f32, _>(index)?.into()),
		"FLOAT8" => Value::Float(row.try_get(index)?),
		"NUMERIC" => {
			let decimal: rust_decimal::Decimal = row.try_get(index)?;
			match decimal.to_f64() {
				Some(f) => Value::Float(f),
				None => Value::String(decimal.to_string()),
			}
		}
		"JSON" | "JSONB" => Value::from(row.try_get::<serde_json::Value, _>(index)?),
		"UUID" => Value::String(row.try_get::<uuid::Uuid, _>(index)?.to_string()),
		"TIMESTAMPTZ" => Value::String(
			row.try_get::<chrono::DateTime<chrono::Utc>, _>(index)?
				.to_rfc3339(),
		),
		"TIMESTAMP" => Value::String(row.try_get::<chrono::NaiveDateTime, _>(index)?.to_string()),
		"DATE" => Value::String(row.try_get::<chrono::NaiveDate, _>(index)?.to_string()),
		"TIME" => Value::String(row.try_get::<chrono::NaiveTime, _>(index)?.to_string()),
		"BYTEA" => Value::String(String::from_utf8_lossy(&row.try_get::<Vec<u8>, _>(index)?).into_owned()),
		_ => match row.try_get::<String, _>(index) {
			Ok(s) => Value::String(s),
			Err(_) => {
				return Err(sqlx::Error::Decode(
					format!("unsupported column type {}", type_name).into(),
				));
			}
		},
	};
	Ok(value)
}
