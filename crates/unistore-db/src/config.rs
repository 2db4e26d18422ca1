//! Adapter configuration
//!
//! [`Config`] keeps the backend type as the raw tag supplied by the caller so
//! that unknown tags reach the factory and are rejected there, instead of
//! being lost at deserialization time.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::DbError;

/// Default timeout for establishing and verifying connectivity
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Backend families sharing one adapter implementation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendFamily {
	Relational,
	Document,
}

/// Concrete backend an adapter talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendType {
	Mysql,
	Postgres,
	Sqlite,
	#[serde(rename = "mongodb")]
	MongoDb,
}

impl BackendType {
	/// Canonical configuration tag
	pub fn as_str(&self) -> &'static str {
		match self {
			BackendType::Mysql => "mysql",
			BackendType::Postgres => "postgres",
			BackendType::Sqlite => "sqlite",
			BackendType::MongoDb => "mongodb",
		}
	}

	/// Store family the backend belongs to
	///
	/// # Examples
	///
	/// ```
	/// use unistore_db::config::{BackendFamily, BackendType};
	///
	/// assert_eq!(BackendType::Mysql.family(), BackendFamily::Relational);
	/// assert_eq!(BackendType::MongoDb.family(), BackendFamily::Document);
	/// ```
	pub fn family(&self) -> BackendFamily {
		match self {
			BackendType::Mysql | BackendType::Postgres | BackendType::Sqlite => {
				BackendFamily::Relational
			}
			BackendType::MongoDb => BackendFamily::Document,
		}
	}
}

impl fmt::Display for BackendType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for BackendType {
	type Err = DbError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_ascii_lowercase().as_str() {
			"mysql" => Ok(BackendType::Mysql),
			"postgres" | "postgresql" => Ok(BackendType::Postgres),
			"sqlite" => Ok(BackendType::Sqlite),
			"mongodb" | "mongo" => Ok(BackendType::MongoDb),
			other => Err(DbError::Unsupported(format!(
				"unsupported database type: {}",
				other
			))),
		}
	}
}

/// Connection settings consumed by the adapter factory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
	/// Backend type tag (`mysql`, `postgres`, `sqlite`, `mongodb`)
	#[serde(rename = "type")]
	pub backend: String,

	/// Driver connection string
	pub connection_string: String,

	/// Upper bound of pooled connections, `0` for the driver default
	#[serde(default)]
	pub max_open_connections: u32,

	/// Connections kept open while idle, `0` for the driver default
	///
	/// Neither sqlx nor the MongoDB driver has an idle ceiling, so this
	/// becomes the pool minimum (`min_connections` / `min_pool_size`): that
	/// many connections are opened eagerly and kept open.
	#[serde(default)]
	pub max_idle_connections: u32,

	/// Document database name, overriding the one in the connection string
	#[serde(default)]
	pub database: Option<String>,

	/// Timeout for establishing and verifying connectivity
	#[serde(default = "default_connect_timeout", with = "duration_secs")]
	pub connect_timeout: Duration,
}

fn default_connect_timeout() -> Duration {
	DEFAULT_CONNECT_TIMEOUT
}

mod duration_secs {
	use serde::{Deserialize, Deserializer, Serializer};
	use std::time::Duration;

	pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.serialize_u64(value.as_secs())
	}

	pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
		u64::deserialize(deserializer).map(Duration::from_secs)
	}
}

impl Config {
	/// Create a configuration with driver-default pool sizing
	///
	/// # Examples
	///
	/// ```
	/// use unistore_db::Config;
	///
	/// let config = Config::new("postgres", "postgres://localhost/app")
	///     .with_max_open_connections(10)
	///     .with_max_idle_connections(5);
	///
	/// assert_eq!(config.backend, "postgres");
	/// assert_eq!(config.max_open_connections, 10);
	/// assert_eq!(config.max_idle_connections, 5);
	/// ```
	pub fn new(backend: impl Into<String>, connection_string: impl Into<String>) -> Self {
		Self {
			backend: backend.into(),
			connection_string: connection_string.into(),
			max_open_connections: 0,
			max_idle_connections: 0,
			database: None,
			connect_timeout: DEFAULT_CONNECT_TIMEOUT,
		}
	}

	pub fn with_max_open_connections(mut self, max: u32) -> Self {
		self.max_open_connections = max;
		self
	}

	pub fn with_max_idle_connections(mut self, max: u32) -> Self {
		self.max_idle_connections = max;
		self
	}

	pub fn with_database(mut self, database: impl Into<String>) -> Self {
		self.database = Some(database.into());
		self
	}

	pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
		self.connect_timeout = timeout;
		self
	}

	/// Parse the backend tag
	pub fn backend_type(&self) -> Result<BackendType, DbError> {
		self.backend.parse()
	}

	/// Idle connection count after clamping it to the open connection limit
	///
	/// `None` means the driver default applies.
	pub fn effective_idle_connections(&self) -> Option<u32> {
		if self.max_idle_connections == 0 {
			return None;
		}
		if self.max_open_connections > 0 && self.max_idle_connections > self.max_open_connections {
			tracing::warn!(
				max_open = self.max_open_connections,
				max_idle = self.max_idle_connections,
				"max_idle_connections exceeds max_open_connections, clamping"
			);
			return Some(self.max_open_connections);
		}
		Some(self.max_idle_connections)
	}

	/// Open connection limit, `None` for the driver default
	pub fn effective_open_connections(&self) -> Option<u32> {
		(self.max_open_connections > 0).then_some(self.max_open_connections)
	}
}
