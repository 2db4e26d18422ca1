//! SQL translation with dialect support
//!
//! Builds parameterized INSERT, UPDATE, DELETE and SELECT statements from
//! records and conditions using SeaQuery, rendered for the dialect of the
//! adapter's backend.
//!
//! | Dialect | Placeholder | Identifier quoting | Type hints |
//! |---------|-------------|--------------------|------------|
//! | PostgreSQL | `$1, $2, …` | `"name"` | `CAST($1 AS bigint)` in SET and WHERE |
//! | MySQL | `?` | `` `name` `` | none |
//! | SQLite | `?` | `"name"` | none |
//!
//! Fields are emitted in sorted order, so logically identical maps always
//! produce identical statement text. Placeholder numbering runs across the
//! whole statement (an UPDATE's WHERE continues after its SET values).
//!
//! ```
//! use unistore_db::translate::{SqlDialect, SqlTranslator};
//! use unistore_db::record;
//!
//! let stmt = SqlTranslator::new(SqlDialect::Postgres)
//!     .update("people", &record! { "age" => 31 }, &record! { "name" => "John Doe" })
//!     .unwrap();
//!
//! assert!(stmt.sql.starts_with(r#"UPDATE "people" SET "age" = CAST($1 AS bigint)"#));
//! assert!(stmt.sql.contains(r#""name" = CAST($2 AS text)"#));
//! assert_eq!(stmt.params.len(), 2);
//! ```

use sea_query::{
	Alias, Asterisk, Expr, ExprTrait, IntoTableRef, MysqlQueryBuilder, PostgresQueryBuilder,
	Query, SqliteQueryBuilder, TableRef, Values,
};

use crate::config::BackendType;
use crate::error::{DbError, Result};
use crate::value::{Condition, Record, Value, ValueKind};

/// MySQL has no offset-only form; this is the documented "all rows" limit
const MYSQL_UNBOUNDED_LIMIT: &str = "18446744073709551615";

macro_rules! build_for {
	($stmt:expr, $dialect:expr) => {
		match $dialect {
			SqlDialect::Postgres => $stmt.build(PostgresQueryBuilder),
			SqlDialect::MySql => $stmt.build(MysqlQueryBuilder),
			SqlDialect::Sqlite => $stmt.build(SqliteQueryBuilder),
		}
	};
}

/// SQL dialect of a relational backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SqlDialect {
	MySql,
	Postgres,
	Sqlite,
}

impl SqlDialect {
	pub fn backend_type(self) -> BackendType {
		match self {
			SqlDialect::MySql => BackendType::Mysql,
			SqlDialect::Postgres => BackendType::Postgres,
			SqlDialect::Sqlite => BackendType::Sqlite,
		}
	}

	/// Dialect for a relational backend type, `None` for document stores
	pub fn from_backend(backend: BackendType) -> Option<Self> {
		match backend {
			BackendType::Mysql => Some(SqlDialect::MySql),
			BackendType::Postgres => Some(SqlDialect::Postgres),
			BackendType::Sqlite => Some(SqlDialect::Sqlite),
			BackendType::MongoDb => None,
		}
	}

	/// Explicit type hint for a SET or WHERE placeholder, if the dialect needs one
	pub fn type_hint(self, value: &Value) -> Option<&'static str> {
		match self {
			SqlDialect::Postgres => Some(postgres_type_hint(value)),
			SqlDialect::MySql | SqlDialect::Sqlite => None,
		}
	}
}

/// PostgreSQL cast for a parameter compared with or assigned to a typed column
///
/// Total over [`ValueKind`]: floats keep full `f64` precision as
/// `double precision`, nested values travel as `jsonb`, and anything else
/// that is not an integer or boolean is sent as text.
pub fn postgres_type_hint(value: &Value) -> &'static str {
	match value.kind() {
		ValueKind::Integer => "bigint",
		ValueKind::Float => "double precision",
		ValueKind::Boolean => "boolean",
		ValueKind::Array | ValueKind::Map => "jsonb",
		ValueKind::Null | ValueKind::Text => "text",
	}
}

/// Convert a [`Value`] into a SeaQuery value
fn sea_value(value: &Value) -> sea_query::Value {
	match value {
		// BigInt(None) is the generic NULL across all dialects
		Value::Null => sea_query::Value::BigInt(None),
		Value::Bool(b) => sea_query::Value::Bool(Some(*b)),
		Value::Int(i) => sea_query::Value::BigInt(Some(*i)),
		Value::Float(f) => sea_query::Value::Double(Some(*f)),
		Value::String(s) => sea_query::Value::String(Some(s.clone())),
		Value::Array(_) | Value::Map(_) => sea_query::Value::from(value.to_json()),
	}
}

fn check_identifier<'a>(ident: &'a str, whole: &str) -> Result<&'a str> {
	if ident.is_empty() || ident.contains('\0') {
		return Err(DbError::InvalidInput(format!(
			"invalid identifier `{}`",
			whole
		)));
	}
	Ok(ident)
}

/// Table reference; `schema.table` is quoted per segment
fn table_ref(table: &str) -> Result<TableRef> {
	let segments = table
		.split('.')
		.map(|segment| check_identifier(segment, table))
		.collect::<Result<Vec<_>>>()?;
	match segments.as_slice() {
		[name] => Ok(Alias::new(*name).into_table_ref()),
		[schema, name] => Ok((Alias::new(*schema), Alias::new(*name)).into_table_ref()),
		_ => Err(DbError::InvalidInput(format!(
			"invalid table name `{}`",
			table
		))),
	}
}

/// Column name, quoted as a single identifier
fn column(field: &str) -> Result<Alias> {
	check_identifier(field, field).map(Alias::new)
}

/// A statement ready for the driver
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
	pub sql: String,
	pub params: Vec<Value>,
}

/// Record/condition to SQL translator for one dialect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SqlTranslator {
	dialect: SqlDialect,
}

impl SqlTranslator {
	pub fn new(dialect: SqlDialect) -> Self {
		Self { dialect }
	}

	pub fn dialect(&self) -> SqlDialect {
		self.dialect
	}

	/// Placeholder expression for `value`, cast when `hinted` and the dialect needs it
	fn param(&self, params: &mut Vec<Value>, value: &Value, hinted: bool) -> Expr {
		params.push(value.clone());
		let expr = Expr::val(sea_value(value));
		match self.dialect.type_hint(value) {
			Some(hint) if hinted => expr.cast_as(Alias::new(hint)),
			_ => expr,
		}
	}

	/// AND-joined equality tests; a Null value becomes `field IS NULL`
	fn conditions(&self, condition: &Condition, params: &mut Vec<Value>) -> Result<Vec<Expr>> {
		condition
			.iter()
			.map(|(field, value)| {
				let col = Expr::col(column(field)?);
				Ok(if value.is_null() {
					col.is_null()
				} else {
					col.eq(self.param(params, value, true))
				})
			})
			.collect()
	}

	/// Pair the rendered SQL with `params`, which must line up with its placeholders
	fn finish(&self, (sql, values): (String, Values), params: Vec<Value>) -> Result<Statement> {
		if values.0.len() != params.len() {
			return Err(DbError::InvalidInput(format!(
				"statement has {} placeholders for {} parameters",
				values.0.len(),
				params.len()
			)));
		}
		Ok(Statement { sql, params })
	}

	/// Single-row INSERT; Null values are written as the `NULL` literal
	pub fn insert(&self, table: &str, record: &Record) -> Result<Statement> {
		if record.is_empty() {
			return Err(DbError::InvalidInput(format!(
				"insert into `{}` requires at least one field",
				table
			)));
		}

		let mut params = Vec::with_capacity(record.len());
		let mut columns = Vec::with_capacity(record.len());
		let mut values = Vec::with_capacity(record.len());
		for (field, value) in record {
			columns.push(column(field)?);
			values.push(if value.is_null() {
				Expr::cust("NULL")
			} else {
				self.param(&mut params, value, false)
			});
		}

		let mut stmt = Query::insert().into_table(table_ref(table)?).to_owned();
		stmt.columns(columns);
		stmt.values(values)
			.map_err(|e| DbError::InvalidInput(e.to_string()))?;
		self.finish(build_for!(stmt, self.dialect), params)
	}

	/// UPDATE of every row matching `condition`; an empty condition matches all rows
	///
	/// A Null assignment is written as `field = NULL`.
	pub fn update(&self, table: &str, record: &Record, condition: &Condition) -> Result<Statement> {
		if record.is_empty() {
			return Err(DbError::InvalidInput(format!(
				"update of `{}` requires at least one assignment",
				table
			)));
		}

		let mut params = Vec::with_capacity(record.len() + condition.len());
		let mut stmt = Query::update().table(table_ref(table)?).to_owned();
		for (field, value) in record {
			let expr = if value.is_null() {
				Expr::cust("NULL")
			} else {
				self.param(&mut params, value, true)
			};
			stmt.value(column(field)?, expr);
		}
		for expr in self.conditions(condition, &mut params)? {
			stmt.and_where(expr);
		}
		self.finish(build_for!(stmt, self.dialect), params)
	}

	/// DELETE of every row matching `condition`; an empty condition deletes all rows
	pub fn delete(&self, table: &str, condition: &Condition) -> Result<Statement> {
		let mut params = Vec::with_capacity(condition.len());
		let mut stmt = Query::delete().from_table(table_ref(table)?).to_owned();
		for expr in self.conditions(condition, &mut params)? {
			stmt.and_where(expr);
		}
		self.finish(build_for!(stmt, self.dialect), params)
	}

	/// SELECT without ORDER BY; `limit <= 0` means no limit
	pub fn select(
		&self,
		table: &str,
		condition: &Condition,
		limit: i64,
		offset: i64,
	) -> Result<Statement> {
		if offset < 0 {
			return Err(DbError::InvalidInput(format!(
				"offset must not be negative, got {}",
				offset
			)));
		}

		let mut params = Vec::with_capacity(condition.len());
		let mut stmt = Query::select()
			.column(Asterisk)
			.from(table_ref(table)?)
			.to_owned();
		for expr in self.conditions(condition, &mut params)? {
			stmt.and_where(expr);
		}
		let mut statement = self.finish(build_for!(stmt, self.dialect), params)?;
		statement.sql.push_str(&self.pagination(limit, offset));
		Ok(statement)
	}

	// Offset-only forms differ per dialect, so pagination is rendered here
	fn pagination(&self, limit: i64, offset: i64) -> String {
		match (self.dialect, limit > 0, offset > 0) {
			(SqlDialect::MySql, true, _) => format!(" LIMIT {}, {}", offset, limit),
			(SqlDialect::Postgres | SqlDialect::Sqlite, true, _) => {
				format!(" LIMIT {} OFFSET {}", limit, offset)
			}
			(_, false, false) => String::new(),
			(SqlDialect::Postgres, false, true) => format!(" OFFSET {}", offset),
			(SqlDialect::Sqlite, false, true) => format!(" LIMIT -1 OFFSET {}", offset),
			(SqlDialect::MySql, false, true) => {
				format!(" LIMIT {}, {}", offset, MYSQL_UNBOUNDED_LIMIT)
			}
		}
	}
}
