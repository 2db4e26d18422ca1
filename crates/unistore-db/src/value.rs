//! Schema-less value model
//!
//! [`Value`] is a closed tagged union so every translator can match on it
//! exhaustively. [`Record`] maps field names to values; its fields iterate in
//! sorted order, which keeps generated statements identical for logically
//! identical maps.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::collections::btree_map;

use crate::error::DbError;

/// A single field value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
	Null,
	Bool(bool),
	Int(i64),
	Float(f64),
	String(String),
	/// Nested sequence, stored natively by document backends
	Array(Vec<Value>),
	/// Nested mapping, stored natively by document backends
	Map(BTreeMap<String, Value>),
}

/// Primitive kind of a [`Value`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
	Null,
	Boolean,
	Integer,
	Float,
	Text,
	Array,
	Map,
}

impl Value {
	pub fn kind(&self) -> ValueKind {
		match self {
			Value::Null => ValueKind::Null,
			Value::Bool(_) => ValueKind::Boolean,
			Value::Int(_) => ValueKind::Integer,
			Value::Float(_) => ValueKind::Float,
			Value::String(_) => ValueKind::Text,
			Value::Array(_) => ValueKind::Array,
			Value::Map(_) => ValueKind::Map,
		}
	}

	pub fn is_null(&self) -> bool {
		matches!(self, Value::Null)
	}

	pub fn as_i64(&self) -> Option<i64> {
		match self {
			Value::Int(i) => Some(*i),
			_ => None,
		}
	}

	pub fn as_f64(&self) -> Option<f64> {
		match self {
			Value::Float(f) => Some(*f),
			Value::Int(i) => Some(*i as f64),
			_ => None,
		}
	}

	pub fn as_bool(&self) -> Option<bool> {
		match self {
			Value::Bool(b) => Some(*b),
			_ => None,
		}
	}

	pub fn as_str(&self) -> Option<&str> {
		match self {
			Value::String(s) => Some(s),
			_ => None,
		}
	}

	/// Convert to a JSON value; non-finite floats become `null`
	pub fn to_json(&self) -> serde_json::Value {
		match self {
			Value::Null => serde_json::Value::Null,
			Value::Bool(b) => serde_json::Value::Bool(*b),
			Value::Int(i) => serde_json::Value::from(*i),
			Value::Float(f) => serde_json::Number::from_f64(*f)
				.map(serde_json::Value::Number)
				.unwrap_or(serde_json::Value::Null),
			Value::String(s) => serde_json::Value::String(s.clone()),
			Value::Array(items) => serde_json::Value::Array(items.iter().map(Value::to_json).collect()),
			Value::Map(map) => serde_json::Value::Object(
				map.iter()
					.map(|(k, v)| (k.clone(), v.to_json()))
					.collect(),
			),
		}
	}
}

impl From<serde_json::Value> for Value {
	fn from(json: serde_json::Value) -> Self {
		match json {
			serde_json::Value::Null => Value::Null,
			serde_json::Value::Bool(b) => Value::Bool(b),
			serde_json::Value::Number(n) => match n.as_i64() {
				Some(i) => Value::Int(i),
				None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
			},
			serde_json::Value::String(s) => Value::String(s),
			serde_json::Value::Array(items) => {
				Value::Array(items.into_iter().map(Value::from).collect())
			}
			serde_json::Value::Object(map) => {
				Value::Map(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
			}
		}
	}
}

impl From<&str> for Value {
	fn from(s: &str) -> Self {
		Value::String(s.to_string())
	}
}

impl From<String> for Value {
	fn from(s: String) -> Self {
		Value::String(s)
	}
}

impl From<bool> for Value {
	fn from(b: bool) -> Self {
		Value::Bool(b)
	}
}

impl From<i64> for Value {
	fn from(i: i64) -> Self {
		Value::Int(i)
	}
}

impl From<i32> for Value {
	fn from(i: i32) -> Self {
		Value::Int(i as i64)
	}
}

impl From<i16> for Value {
	fn from(i: i16) -> Self {
		Value::Int(i as i64)
	}
}

impl From<i8> for Value {
	fn from(i: i8) -> Self {
		Value::Int(i as i64)
	}
}

impl From<u32> for Value {
	fn from(i: u32) -> Self {
		Value::Int(i as i64)
	}
}

impl From<u16> for Value {
	fn from(i: u16) -> Self {
		Value::Int(i as i64)
	}
}

impl From<u8> for Value {
	fn from(i: u8) -> Self {
		Value::Int(i as i64)
	}
}

impl From<f64> for Value {
	fn from(f: f64) -> Self {
		Value::Float(f)
	}
}

impl From<f32> for Value {
	fn from(f: f32) -> Self {
		Value::Float(f as f64)
	}
}

impl<T: Into<Value>> From<Option<T>> for Value {
	fn from(value: Option<T>) -> Self {
		value.map(Into::into).unwrap_or(Value::Null)
	}
}

impl<T: Into<Value>> From<Vec<T>> for Value {
	fn from(items: Vec<T>) -> Self {
		Value::Array(items.into_iter().map(Into::into).collect())
	}
}

impl From<BTreeMap<String, Value>> for Value {
	fn from(map: BTreeMap<String, Value>) -> Self {
		Value::Map(map)
	}
}

impl From<Record> for Value {
	fn from(record: Record) -> Self {
		Value::Map(record.0)
	}
}

impl TryFrom<Value> for i64 {
	type Error = DbError;

	fn try_from(value: Value) -> Result<Self, Self::Error> {
		match value {
			Value::Int(i) => Ok(i),
			_ => Err(DbError::Type(format!("cannot convert {:?} to i64", value))),
		}
	}
}

impl TryFrom<Value> for i32 {
	type Error = DbError;

	fn try_from(value: Value) -> Result<Self, Self::Error> {
		match value {
			Value::Int(i) => i32::try_from(i)
				.map_err(|_| DbError::Type(format!("value {} out of range for i32", i))),
			_ => Err(DbError::Type(format!("cannot convert {:?} to i32", value))),
		}
	}
}

impl TryFrom<Value> for f64 {
	type Error = DbError;

	fn try_from(value: Value) -> Result<Self, Self::Error> {
		value
			.as_f64()
			.ok_or_else(|| DbError::Type(format!("cannot convert {:?} to f64", value)))
	}
}

impl TryFrom<Value> for bool {
	type Error = DbError;

	fn try_from(value: Value) -> Result<Self, Self::Error> {
		match value {
			Value::Bool(b) => Ok(b),
			// MySQL reports BOOLEAN columns as TINYINT
			Value::Int(0) => Ok(false),
			Value::Int(1) => Ok(true),
			_ => Err(DbError::Type(format!("cannot convert {:?} to bool", value))),
		}
	}
}

impl TryFrom<Value> for String {
	type Error = DbError;

	fn try_from(value: Value) -> Result<Self, Self::Error> {
		match value {
			Value::String(s) => Ok(s),
			_ => Err(DbError::Type(format!("cannot convert {:?} to String", value))),
		}
	}
}

/// A single entity: field names mapped to values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(BTreeMap<String, Value>);

/// Equality-only filter: every pair must match (`field = value AND ...`)
pub type Condition = Record;

impl Record {
	pub fn new() -> Self {
		Self(BTreeMap::new())
	}

	/// Builder-style insert
	///
	/// # Examples
	///
	/// ```
	/// use unistore_db::{Record, Value};
	///
	/// let record = Record::new().with("name", "John Doe").with("age", 30);
	///
	/// assert_eq!(record.get("age"), Some(&Value::Int(30)));
	/// assert_eq!(record.len(), 2);
	/// ```
	pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
		self.0.insert(field.into(), value.into());
		self
	}

	pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
		self.0.insert(field.into(), value.into())
	}

	pub fn get(&self, field: &str) -> Option<&Value> {
		self.0.get(field)
	}

	/// Typed accessor
	///
	/// # Examples
	///
	/// ```
	/// use unistore_db::Record;
	///
	/// let record = Record::new().with("age", 31);
	/// let age: i64 = record.get_as("age").unwrap();
	/// assert_eq!(age, 31);
	/// assert!(record.get_as::<String>("age").is_err());
	/// ```
	pub fn get_as<T>(&self, field: &str) -> Result<T, DbError>
	where
		T: TryFrom<Value, Error = DbError>,
	{
		self.0
			.get(field)
			.cloned()
			.ok_or_else(|| DbError::Type(format!("field `{}` not present", field)))
			.and_then(T::try_from)
	}

	pub fn remove(&mut self, field: &str) -> Option<Value> {
		self.0.remove(field)
	}

	pub fn contains_key(&self, field: &str) -> bool {
		self.0.contains_key(field)
	}

	pub fn len(&self) -> usize {
		self.0.len()
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// Fields in sorted order
	pub fn iter(&self) -> btree_map::Iter<'_, String, Value> {
		self.0.iter()
	}

	pub fn fields(&self) -> impl Iterator<Item = &str> {
		self.0.keys().map(String::as_str)
	}

	/// Whether every field of `other` is present here with an equal value
	pub fn contains(&self, other: &Record) -> bool {
		other.iter().all(|(k, v)| self.0.get(k) == Some(v))
	}

	pub fn into_inner(self) -> BTreeMap<String, Value> {
		self.0
	}
}

impl From<BTreeMap<String, Value>> for Record {
	fn from(map: BTreeMap<String, Value>) -> Self {
		Self(map)
	}
}

impl<K: Into<String>, V: Into<Value>, const N: usize> From<[(K, V); N]> for Record {
	fn from(pairs: [(K, V); N]) -> Self {
		pairs.into_iter().collect()
	}
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Record {
	fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
		Self(
			iter.into_iter()
				.map(|(k, v)| (k.into(), v.into()))
				.collect(),
		)
	}
}

impl IntoIterator for Record {
	type Item = (String, Value);
	type IntoIter = btree_map::IntoIter<String, Value>;

	fn into_iter(self) -> Self::IntoIter {
		self.0.into_iter()
	}
}

impl<'a> IntoIterator for &'a Record {
	type Item = (&'a String, &'a Value);
	type IntoIter = btree_map::Iter<'a, String, Value>;

	fn into_iter(self) -> Self::IntoIter {
		self.0.iter()
	}
}

/// Build a [`Record`] from `field => value` pairs
///
/// # Examples
///
/// ```
/// use unistore_db::{record, Value};
///
/// let person = record! { "name" => "John Doe", "age" => 30 };
/// assert_eq!(person.get("name"), Some(&Value::from("John Doe")));
///
/// let empty = record! {};
/// assert!(empty.is_empty());
/// ```
#[macro_export]
macro_rules! record {
	() => {
		$crate::Record::new()
	};
	($($field:expr => $value:expr),+ $(,)?) => {
		$crate::Record::new()$(.with($field, $value))+
	};
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_record_iterates_in_field_order() {
		// Arrange
		let record = Record::new()
			.with("zeta", 1)
			.with("alpha", 2)
			.with("mid", 3);

		// Act
		let fields: Vec<&str> = record.fields().collect();

		// Assert
		assert_eq!(fields, vec!["alpha", "mid", "zeta"]);
	}

	#[rstest]
	#[case(Value::from(7_i32), ValueKind::Integer)]
	#[case(Value::from(7_u8), ValueKind::Integer)]
	#[case(Value::from(1.5_f32), ValueKind::Float)]
	#[case(Value::from(true), ValueKind::Boolean)]
	#[case(Value::from("x"), ValueKind::Text)]
	#[case(Value::from(None::<i64>), ValueKind::Null)]
	#[case(Value::from(vec![1, 2]), ValueKind::Array)]
	#[case(Value::from(Record::new().with("a", 1)), ValueKind::Map)]
	fn test_value_kind(#[case] value: Value, #[case] expected: ValueKind) {
		assert_eq!(value.kind(), expected);
	}

	#[rstest]
	fn test_json_conversion_preserves_nesting() {
		// Arrange
		let json = serde_json::json!({
			"name": "Ada",
			"tags": ["a", "b"],
			"address": { "zip": 12345, "geo": 1.5 },
			"nick": null
		});

		// Act
		let value = Value::from(json.clone());

		// Assert
		let Value::Map(map) = &value else {
			panic!("expected a map, got {:?}", value);
		};
		assert_eq!(map["tags"], Value::Array(vec!["a".into(), "b".into()]));
		assert_eq!(map["nick"], Value::Null);
		assert_eq!(value.to_json(), json);
	}

	#[rstest]
	fn test_record_contains_subset() {
		// Arrange
		let stored = record! { "_id" => "abc", "name" => "John Doe", "age" => 30 };

		// Act & Assert
		assert!(stored.contains(&record! { "name" => "John Doe", "age" => 30 }));
		assert!(!stored.contains(&record! { "age" => 31 }));
	}

	#[rstest]
	fn test_record_serializes_as_plain_object() {
		// Arrange
		let record = record! { "age" => 30, "name" => "John Doe" };

		// Act
		let json = serde_json::to_string(&record).unwrap();

		// Assert
		assert_eq!(json, r#"{"age":30,"name":"John Doe"}"#);
	}

	#[rstest]
	fn test_get_as_reports_missing_field() {
		// Arrange
		let record = Record::new();

		// Act
		let err = record.get_as::<i64>("age").unwrap_err();

		// Assert
		assert!(matches!(err, DbError::Type(ref msg) if msg.contains("age")));
	}

	#[rstest]
	fn test_bool_accepts_tinyint() {
		assert!(bool::try_from(Value::Int(1)).unwrap());
		assert!(!bool::try_from(Value::Int(0)).unwrap());
		assert!(bool::try_from(Value::Int(2)).is_err());
	}
}
