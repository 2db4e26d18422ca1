//! Document (BSON) translation
//!
//! Records become insert documents, conditions become equality filters and
//! update records become `{"$set": {...}}` documents. Field names that start
//! with `$` are rejected at every nesting depth, so caller data can never be
//! read as a query or update operator.

use bson::{Bson, Document};

use crate::error::{DbError, Result};
use crate::value::{Condition, Record, Value};

/// Convert a value to BSON; integers are stored as 64-bit
pub fn value_to_bson(value: &Value) -> Bson {
	match value {
		Value::Null => Bson::Null,
		Value::Bool(b) => Bson::Boolean(*b),
		Value::Int(i) => Bson::Int64(*i),
		Value::Float(f) => Bson::Double(*f),
		Value::String(s) => Bson::String(s.clone()),
		Value::Array(items) => Bson::Array(items.iter().map(value_to_bson).collect()),
		Value::Map(map) => Bson::Document(
			map.iter()
				.map(|(k, v)| (k.clone(), value_to_bson(v)))
				.collect(),
		),
	}
}

/// Convert BSON read from the store back to a value
///
/// Types without a [`Value`] counterpart (object ids, dates, decimals, …) are
/// rendered as text; binary payloads are decoded as lossy UTF-8.
pub fn bson_to_value(bson: Bson) -> Value {
	match bson {
		Bson::Null | Bson::Undefined => Value::Null,
		Bson::Boolean(b) => Value::Bool(b),
		Bson::Int32(i) => Value::Int(i as i64),
		Bson::Int64(i) => Value::Int(i),
		Bson::Double(f) => Value::Float(f),
		Bson::String(s) => Value::String(s),
		Bson::Array(items) => Value::Array(items.into_iter().map(bson_to_value).collect()),
		Bson::Document(doc) => Value::Map(document_to_record(doc).into_inner()),
		Bson::ObjectId(oid) => Value::String(oid.to_hex()),
		Bson::Binary(binary) => Value::String(String::from_utf8_lossy(&binary.bytes).into_owned()),
		Bson::DateTime(dt) => Value::String(dt.to_string()),
		other => Value::String(other.to_string()),
	}
}

pub fn document_to_record(doc: Document) -> Record {
	doc.into_iter()
		.map(|(k, v)| (k, bson_to_value(v)))
		.collect()
}

fn check_field(field: &str) -> Result<()> {
	if field.is_empty() {
		return Err(DbError::InvalidInput("empty field name".to_string()));
	}
	if field.starts_with('$') {
		return Err(DbError::InvalidInput(format!(
			"field `{}` must not start with `$`",
			field
		)));
	}
	Ok(())
}

fn check_nested(value: &Value) -> Result<()> {
	match value {
		Value::Map(map) => map.iter().try_for_each(|(k, v)| {
			check_field(k)?;
			check_nested(v)
		}),
		Value::Array(items) => items.iter().try_for_each(check_nested),
		_ => Ok(()),
	}
}

fn to_document(record: &Record) -> Result<Document> {
	let mut doc = Document::new();
	for (field, value) in record {
		check_field(field)?;
		check_nested(value)?;
		doc.insert(field.clone(), value_to_bson(value));
	}
	Ok(doc)
}

/// Document inserted for `record`
pub fn record_to_document(record: &Record) -> Result<Document> {
	if record.is_empty() {
		return Err(DbError::InvalidInput(
			"insert requires at least one field".to_string(),
		));
	}
	to_document(record)
}

/// Equality filter; an empty condition yields `{}` and matches every document
///
/// # Examples
///
/// ```
/// use bson::doc;
/// use unistore_db::record;
/// use unistore_db::translate::document::condition_to_filter;
///
/// let filter = condition_to_filter(&record! { "name" => "John Doe" }).unwrap();
/// assert_eq!(filter, doc! { "name": "John Doe" });
///
/// assert!(condition_to_filter(&record! { "$where" => "1" }).is_err());
/// ```
pub fn condition_to_filter(condition: &Condition) -> Result<Document> {
	to_document(condition)
}

/// `{"$set": {...}}` update document
pub fn set_update(record: &Record) -> Result<Document> {
	if record.is_empty() {
		return Err(DbError::InvalidInput(
			"update requires at least one assignment".to_string(),
		));
	}
	let mut update = Document::new();
	update.insert("$set", to_document(record)?);
	Ok(update)
}
