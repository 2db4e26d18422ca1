//! Adapter behaviour against an on-disk SQLite database
//!
//! Each test gets a fresh database file in a temporary directory, so the
//! tests need no external services.

use rstest::*;
use std::time::Duration;
use tempfile::TempDir;
use unistore_db::{
	Adapter, Config, Context, DbError, Record, Transaction, Value, new_adapter, record,
};

struct SqliteFixture {
	_dir: TempDir,
	url: String,
	ctx: Context,
	adapter: Box<dyn Adapter>,
}

const CREATE_PEOPLE: &str = "CREATE TABLE people (
	id INTEGER PRIMARY KEY AUTOINCREMENT,
	name TEXT NOT NULL,
	age INTEGER,
	active BOOLEAN,
	score REAL,
	nickname TEXT,
	profile TEXT
)";

#[fixture]
async fn sqlite() -> SqliteFixture {
	let dir = tempfile::tempdir().expect("Failed to create temp dir");
	let url = format!("sqlite://{}?mode=rwc", dir.path().join("unistore.db").display());
	let ctx = Context::background();

	let config = Config::new("sqlite", url.clone()).with_max_open_connections(4);
	let adapter = new_adapter(&ctx, &config)
		.await
		.expect("Failed to connect to SQLite");
	adapter
		.execute_raw(&ctx, CREATE_PEOPLE, &[], None)
		.await
		.expect("Failed to create people table");

	SqliteFixture {
		_dir: dir,
		url,
		ctx,
		adapter,
	}
}

fn john() -> Record {
	record! { "name" => "John Doe", "age" => 30 }
}

#[rstest]
#[tokio::test]
async fn test_person_lifecycle(#[future] sqlite: SqliteFixture) {
	let SqliteFixture { _dir, ctx, adapter, .. } = sqlite.await;
	let by_name = record! { "name" => "John Doe" };

	// Insert
	adapter.insert(&ctx, "people", &john(), None).await.unwrap();
	let found = adapter.find(&ctx, "people", &by_name, 10, 0, None).await.unwrap();
	assert_eq!(found.len(), 1);
	assert_eq!(found[0].get("age"), Some(&Value::Int(30)));

	// Update
	let updated = adapter
		.update(&ctx, "people", &record! { "age" => 31 }, &by_name, None)
		.await
		.unwrap();
	assert_eq!(updated, 1);
	let found = adapter.find(&ctx, "people", &by_name, 10, 0, None).await.unwrap();
	assert_eq!(found[0].get_as::<i64>("age").unwrap(), 31);

	// Delete
	let deleted = adapter.delete(&ctx, "people", &by_name, None).await.unwrap();
	assert_eq!(deleted, 1);
	let found = adapter.find(&ctx, "people", &by_name, 10, 0, None).await.unwrap();
	assert!(found.is_empty());

	adapter.close().await.unwrap();
}

#[rstest]
#[tokio::test]
async fn test_inserted_record_is_found_by_its_own_fields(#[future] sqlite: SqliteFixture) {
	// Arrange
	let SqliteFixture { _dir, ctx, adapter, .. } = sqlite.await;
	let person = record! {
		"name" => "Ada",
		"age" => 36,
		"active" => true,
		"score" => 9.5,
	};

	// Act
	adapter.insert(&ctx, "people", &person, None).await.unwrap();
	let found = adapter.find(&ctx, "people", &person, 1, 0, None).await.unwrap();

	// Assert
	assert_eq!(found.len(), 1);
	assert!(found[0].contains(&person));
	assert_eq!(found[0].get("nickname"), Some(&Value::Null));
}

#[rstest]
#[tokio::test]
async fn test_update_matching_nothing_reports_zero(#[future] sqlite: SqliteFixture) {
	// Arrange
	let SqliteFixture { _dir, ctx, adapter, .. } = sqlite.await;
	adapter.insert(&ctx, "people", &john(), None).await.unwrap();

	// Act
	let updated = adapter
		.update(&ctx, "people", &record! { "age" => 99 }, &record! { "name" => "Nobody" }, None)
		.await
		.unwrap();

	// Assert
	assert_eq!(updated, 0);
	let all = adapter.find(&ctx, "people", &Record::new(), 0, 0, None).await.unwrap();
	assert_eq!(all[0].get("age"), Some(&Value::Int(30)));
}

#[rstest]
#[tokio::test]
async fn test_empty_condition_applies_to_every_row(#[future] sqlite: SqliteFixture) {
	// Arrange
	let SqliteFixture { _dir, ctx, adapter, .. } = sqlite.await;
	for name in ["a", "b", "c"] {
		adapter
			.insert(&ctx, "people", &record! { "name" => name, "age" => 1 }, None)
			.await
			.unwrap();
	}

	// Act
	let updated = adapter
		.update(&ctx, "people", &record! { "age" => 2 }, &Record::new(), None)
		.await
		.unwrap();
	let deleted = adapter.delete(&ctx, "people", &Record::new(), None).await.unwrap();

	// Assert
	assert_eq!(updated, 3);
	assert_eq!(deleted, 3);
	assert!(adapter.find(&ctx, "people", &Record::new(), 0, 0, None).await.unwrap().is_empty());
}

#[rstest]
#[tokio::test]
async fn test_find_limit_and_offset(#[future] sqlite: SqliteFixture) {
	// Arrange
	let SqliteFixture { _dir, ctx, adapter, .. } = sqlite.await;
	for age in 0..5 {
		adapter
			.insert(&ctx, "people", &record! { "name" => "p", "age" => age }, None)
			.await
			.unwrap();
	}
	let condition = record! { "name" => "p" };

	// Act
	let page = adapter.find(&ctx, "people", &condition, 2, 1, None).await.unwrap();
	let tail = adapter.find(&ctx, "people", &condition, 0, 3, None).await.unwrap();
	let all = adapter.find(&ctx, "people", &condition, -1, 0, None).await.unwrap();

	// Assert
	assert_eq!(page.len(), 2);
	assert_eq!(tail.len(), 2);
	assert_eq!(all.len(), 5);
}

#[rstest]
#[tokio::test]
async fn test_negative_offset_is_rejected(#[future] sqlite: SqliteFixture) {
	// Arrange
	let SqliteFixture { _dir, ctx, adapter, .. } = sqlite.await;

	// Act
	let result = adapter.find(&ctx, "people", &Record::new(), 10, -1, None).await;

	// Assert
	assert!(matches!(result, Err(DbError::InvalidInput(_))));
}

#[rstest]
#[tokio::test]
async fn test_null_condition_matches_missing_values(#[future] sqlite: SqliteFixture) {
	// Arrange
	let SqliteFixture { _dir, ctx, adapter, .. } = sqlite.await;
	adapter
		.insert(&ctx, "people", &record! { "name" => "a", "nickname" => Value::Null }, None)
		.await
		.unwrap();
	adapter
		.insert(&ctx, "people", &record! { "name" => "b", "nickname" => "bee" }, None)
		.await
		.unwrap();

	// Act
	let found = adapter
		.find(&ctx, "people", &record! { "nickname" => Value::Null }, 0, 0, None)
		.await
		.unwrap();

	// Assert
	assert_eq!(found.len(), 1);
	assert_eq!(found[0].get("name"), Some(&Value::from("a")));
}

#[rstest]
#[tokio::test]
async fn test_nested_values_are_stored_as_json_text(#[future] sqlite: SqliteFixture) {
	// Arrange
	let SqliteFixture { _dir, ctx, adapter, .. } = sqlite.await;
	let profile = record! { "langs" => vec!["rust", "go"] };

	// Act
	adapter
		.insert(&ctx, "people", &record! { "name" => "a", "profile" => profile }, None)
		.await
		.unwrap();
	let found = adapter.find(&ctx, "people", &record! { "name" => "a" }, 0, 0, None).await.unwrap();

	// Assert
	assert_eq!(
		found[0].get("profile"),
		Some(&Value::from(r#"{"langs":["rust","go"]}"#))
	);
}

#[rstest]
#[tokio::test]
async fn test_empty_insert_is_invalid(#[future] sqlite: SqliteFixture) {
	// Arrange
	let SqliteFixture { _dir, ctx, adapter, .. } = sqlite.await;

	// Act
	let result = adapter.insert(&ctx, "people", &Record::new(), None).await;

	// Assert
	assert!(matches!(result, Err(DbError::InvalidInput(_))));
}

#[rstest]
#[tokio::test]
async fn test_driver_failure_carries_context(#[future] sqlite: SqliteFixture) {
	// Arrange
	let SqliteFixture { _dir, ctx, adapter, .. } = sqlite.await;

	// Act
	let result = adapter.insert(&ctx, "missing_table", &john(), None).await;

	// Assert
	match result {
		Err(DbError::Backend { operation, target, .. }) => {
			assert_eq!(operation, "insert");
			assert_eq!(target, "missing_table");
		}
		other => panic!("expected a backend error, got {:?}", other),
	}
}

#[rstest]
#[tokio::test]
async fn test_close_is_idempotent(#[future] sqlite: SqliteFixture) {
	// Arrange
	let SqliteFixture { _dir, ctx, adapter, .. } = sqlite.await;

	// Act
	adapter.close().await.unwrap();
	adapter.close().await.unwrap();

	// Assert
	assert!(!adapter.is_connected());
	let result = adapter.find(&ctx, "people", &Record::new(), 0, 0, None).await;
	assert!(matches!(result, Err(DbError::NotConnected)));
}

#[rstest]
#[tokio::test]
async fn test_connect_twice_is_invalid(#[future] sqlite: SqliteFixture) {
	// Arrange
	let SqliteFixture { _dir, ctx, adapter, url, .. } = sqlite.await;

	// Act
	let result = adapter.connect(&ctx, &Config::new("sqlite", url)).await;

	// Assert
	assert!(matches!(result, Err(DbError::InvalidInput(_))));
	assert!(adapter.is_connected());
}

#[rstest]
#[tokio::test]
async fn test_cancelled_context_stops_before_driver(#[future] sqlite: SqliteFixture) {
	// Arrange
	let SqliteFixture { _dir, ctx, adapter, .. } = sqlite.await;
	let cancelled = ctx.child();
	cancelled.cancel();

	// Act
	let result = adapter.insert(&cancelled, "people", &john(), None).await;

	// Assert
	assert!(matches!(result, Err(DbError::Cancelled)));
	let all = adapter.find(&ctx, "people", &Record::new(), 0, 0, None).await.unwrap();
	assert!(all.is_empty());
}

#[rstest]
#[tokio::test]
async fn test_expired_deadline(#[future] sqlite: SqliteFixture) {
	// Arrange
	let SqliteFixture { _dir, adapter, .. } = sqlite.await;
	let expired = Context::with_timeout(Duration::ZERO);

	// Act
	let result = adapter.find(&expired, "people", &Record::new(), 0, 0, None).await;

	// Assert
	assert!(matches!(result, Err(DbError::DeadlineExceeded)));
}

#[rstest]
#[tokio::test]
async fn test_commit_makes_insert_visible(#[future] sqlite: SqliteFixture) {
	// Arrange
	let SqliteFixture { _dir, ctx, adapter, .. } = sqlite.await;
	let mut tx = adapter.begin_transaction(&ctx).await.unwrap();

	// Act
	adapter.insert(&ctx, "people", &john(), Some(&mut tx)).await.unwrap();
	let inside = adapter
		.find(&ctx, "people", &john(), 0, 0, Some(&mut tx))
		.await
		.unwrap();
	let outside = adapter.find(&ctx, "people", &john(), 0, 0, None).await.unwrap();
	tx.commit(&ctx).await.unwrap();

	// Assert
	assert_eq!(inside.len(), 1);
	assert!(outside.is_empty());
	let after = adapter.find(&ctx, "people", &john(), 0, 0, None).await.unwrap();
	assert_eq!(after.len(), 1);
}

#[rstest]
#[tokio::test]
async fn test_rollback_discards_insert(#[future] sqlite: SqliteFixture) {
	// Arrange
	let SqliteFixture { _dir, ctx, adapter, .. } = sqlite.await;
	let mut tx = adapter.begin_transaction(&ctx).await.unwrap();

	// Act
	adapter.insert(&ctx, "people", &john(), Some(&mut tx)).await.unwrap();
	tx.rollback(&ctx).await.unwrap();

	// Assert
	let found = adapter.find(&ctx, "people", &john(), 0, 0, None).await.unwrap();
	assert!(found.is_empty());
}

#[rstest]
#[tokio::test]
async fn test_finalized_transaction_is_terminal(#[future] sqlite: SqliteFixture) {
	// Arrange
	let SqliteFixture { _dir, ctx, adapter, .. } = sqlite.await;
	let mut tx = adapter.begin_transaction(&ctx).await.unwrap();
	tx.commit(&ctx).await.unwrap();

	// Act
	let commit = tx.commit(&ctx).await;
	let rollback = tx.rollback(&ctx).await;
	let insert = adapter.insert(&ctx, "people", &john(), Some(&mut tx)).await;

	// Assert
	assert!(tx.is_finalized());
	assert!(matches!(commit, Err(DbError::AlreadyFinalized)));
	assert!(matches!(rollback, Err(DbError::AlreadyFinalized)));
	assert!(matches!(insert, Err(DbError::AlreadyFinalized)));
}

#[rstest]
#[tokio::test]
async fn test_transaction_from_another_adapter_is_rejected(#[future] sqlite: SqliteFixture) {
	// Arrange
	let SqliteFixture { _dir, ctx, adapter, url, .. } = sqlite.await;
	let other = new_adapter(&ctx, &Config::new("sqlite", url)).await.unwrap();
	let mut tx = other.begin_transaction(&ctx).await.unwrap();

	// Act
	let result = adapter.insert(&ctx, "people", &john(), Some(&mut tx)).await;

	// Assert
	assert!(matches!(result, Err(DbError::InvalidInput(_))));
	tx.rollback(&ctx).await.unwrap();
}

#[rstest]
#[tokio::test]
async fn test_dropped_transaction_is_not_committed(#[future] sqlite: SqliteFixture) {
	// Arrange
	let SqliteFixture { _dir, ctx, adapter, .. } = sqlite.await;
	let mut tx = adapter.begin_transaction(&ctx).await.unwrap();
	adapter.insert(&ctx, "people", &john(), Some(&mut tx)).await.unwrap();

	// Act
	drop(tx);

	// Assert
	let found = adapter.find(&ctx, "people", &john(), 0, 0, None).await.unwrap();
	assert!(found.is_empty());
}

#[rstest]
#[tokio::test]
async fn test_raw_passthrough(#[future] sqlite: SqliteFixture) {
	// Arrange
	let SqliteFixture { _dir, ctx, adapter, .. } = sqlite.await;

	// Act
	let first = adapter
		.execute_raw(
			&ctx,
			"INSERT INTO people (name, age) VALUES (?, ?)",
			&[Value::from("a"), Value::Int(1)],
			None,
		)
		.await
		.unwrap();
	let second = adapter
		.execute_raw(
			&ctx,
			"INSERT INTO people (name, age) VALUES (?, ?)",
			&[Value::from("b"), Value::Int(2)],
			None,
		)
		.await
		.unwrap();
	let rows = adapter
		.query_raw(
			&ctx,
			"SELECT COUNT(*) AS total, SUM(age) AS ages FROM people WHERE age >= ?",
			&[Value::Int(1)],
			None,
		)
		.await
		.unwrap();

	// Assert
	assert_eq!(first.rows_affected, 1);
	assert_eq!(first.last_insert_id, Some(1));
	assert_eq!(second.last_insert_id, Some(2));
	assert_eq!(rows[0].get("total"), Some(&Value::Int(2)));
	assert_eq!(rows[0].get("ages"), Some(&Value::Int(3)));
}

#[rstest]
#[tokio::test]
async fn test_boolean_columns_decode_as_bool(#[future] sqlite: SqliteFixture) {
	// Arrange
	let SqliteFixture { _dir, ctx, adapter, .. } = sqlite.await;
	adapter
		.insert(&ctx, "people", &record! { "name" => "a", "active" => false }, None)
		.await
		.unwrap();

	// Act
	let found = adapter
		.find(&ctx, "people", &record! { "active" => false }, 0, 0, None)
		.await
		.unwrap();

	// Assert
	assert_eq!(found.len(), 1);
	assert_eq!(found[0].get("active"), Some(&Value::Bool(false)));
}
