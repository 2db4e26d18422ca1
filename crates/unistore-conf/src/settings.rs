//! Database settings layered from TOML files and the environment
//!
//! A settings file carries a `[database]` table:
//!
//! ```toml
//! [database]
//! type = "postgres"
//! connection_string = "postgres://localhost/app"
//! max_open_connections = 10
//! max_idle_connections = 5
//! connect_timeout_secs = 10
//! ```
//!
//! Environment variables (`UNISTORE_DB_*` by default) override file values
//! key by key.

use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use unistore_db::Config;
use unistore_db::config::DEFAULT_CONNECT_TIMEOUT;

use crate::env::Env;
use crate::error::ConfError;

/// Table name holding the adapter settings
pub const DATABASE_SECTION: &str = "database";

/// Unprefixed fallback for the connection string
pub const DATABASE_URL: &str = "DATABASE_URL";

/// Partially specified database settings
///
/// Every field is optional so sources can be merged before the result is
/// turned into a [`Config`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseSettings {
	#[serde(rename = "type")]
	pub backend: Option<String>,
	pub connection_string: Option<String>,
	pub max_open_connections: Option<u32>,
	pub max_idle_connections: Option<u32>,
	pub database: Option<String>,
	pub connect_timeout_secs: Option<u64>,
}

#[derive(Deserialize)]
struct SettingsFile {
	database: Option<DatabaseSettings>,
}

impl DatabaseSettings {
	/// Parse the `[database]` table of a TOML document
	///
	/// # Examples
	///
	/// ```
	/// use unistore_conf::DatabaseSettings;
	///
	/// let settings = DatabaseSettings::from_toml_str(
	///     "[database]\ntype = \"sqlite\"\nconnection_string = \"sqlite::memory:\"\n",
	/// )
	/// .unwrap();
	///
	/// assert_eq!(settings.backend.as_deref(), Some("sqlite"));
	/// assert_eq!(settings.max_open_connections, None);
	/// ```
	pub fn from_toml_str(content: &str) -> Result<Self, ConfError> {
		let file: SettingsFile = toml::from_str(content)?;
		file.database
			.ok_or_else(|| ConfError::MissingSection(DATABASE_SECTION.to_string()))
	}

	/// Read and parse a TOML settings file
	pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfError> {
		let path = path.as_ref();
		let content = fs::read_to_string(path).map_err(|source| ConfError::Io {
			path: path.to_path_buf(),
			source,
		})?;
		let settings = Self::from_toml_str(&content)?;
		tracing::debug!(path = %path.display(), "loaded database settings file");
		Ok(settings)
	}

	/// Collect the `DB_*` variables visible through `env`
	pub fn from_env(env: &Env) -> Result<Self, ConfError> {
		let connection_string = match env.opt_str("DB_CONNECTION_STRING")? {
			Some(value) => Some(value),
			None => Env::new().opt_str(DATABASE_URL)?,
		};

		Ok(Self {
			backend: env.opt_str("DB_TYPE")?,
			connection_string,
			max_open_connections: env.opt_parse("DB_MAX_OPEN_CONNECTIONS")?,
			max_idle_connections: env.opt_parse("DB_MAX_IDLE_CONNECTIONS")?,
			database: env.opt_str("DB_NAME")?,
			connect_timeout_secs: env.opt_parse("DB_CONNECT_TIMEOUT_SECS")?,
		})
	}

	/// Layer `overrides` on top of `self`, keeping values `overrides` leaves unset
	pub fn merge(self, overrides: DatabaseSettings) -> Self {
		Self {
			backend: overrides.backend.or(self.backend),
			connection_string: overrides.connection_string.or(self.connection_string),
			max_open_connections: overrides.max_open_connections.or(self.max_open_connections),
			max_idle_connections: overrides.max_idle_connections.or(self.max_idle_connections),
			database: overrides.database.or(self.database),
			connect_timeout_secs: overrides.connect_timeout_secs.or(self.connect_timeout_secs),
		}
	}

	/// Build the adapter configuration
	///
	/// The backend tag is passed through unchecked; the adapter factory
	/// rejects unknown tags.
	pub fn into_config(self) -> Result<Config, ConfError> {
		let backend = self
			.backend
			.ok_or_else(|| ConfError::MissingVariable(format!("{}.type", DATABASE_SECTION)))?;
		let connection_string = self.connection_string.ok_or_else(|| {
			ConfError::MissingVariable(format!("{}.connection_string", DATABASE_SECTION))
		})?;

		let mut config = Config::new(backend, connection_string)
			.with_max_open_connections(self.max_open_connections.unwrap_or(0))
			.with_max_idle_connections(self.max_idle_connections.unwrap_or(0))
			.with_connect_timeout(
				self.connect_timeout_secs
					.map(Duration::from_secs)
					.unwrap_or(DEFAULT_CONNECT_TIMEOUT),
			);
		if let Some(database) = self.database {
			config = config.with_database(database);
		}
		Ok(config)
	}
}

/// Load a [`Config`] from an optional settings file, then the environment
///
/// Environment variables use [`crate::env::DEFAULT_PREFIX`].
pub fn load(path: Option<&Path>) -> Result<Config, ConfError> {
	load_with_env(path, &Env::unistore())
}

/// Load a [`Config`] from an optional settings file, then `env`
pub fn load_with_env(path: Option<&Path>, env: &Env) -> Result<Config, ConfError> {
	let file = match path {
		Some(path) => DatabaseSettings::from_file(path)?,
		None => DatabaseSettings::default(),
	};
	let config = file.merge(DatabaseSettings::from_env(env)?).into_config()?;
	tracing::debug!(
		backend = %config.backend,
		max_open = config.max_open_connections,
		max_idle = config.max_idle_connections,
		"resolved database configuration"
	);
	Ok(config)
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_full_table() {
		// Arrange
		let content = r#"
			[database]
			type = "mysql"
			connection_string = "mysql://root@localhost/app"
			max_open_connections = 10
			max_idle_connections = 5
			database = "ignored_by_sql"
			connect_timeout_secs = 3
		"#;

		// Act
		let config = DatabaseSettings::from_toml_str(content)
			.unwrap()
			.into_config()
			.unwrap();

		// Assert
		assert_eq!(config.backend, "mysql");
		assert_eq!(config.connection_string, "mysql://root@localhost/app");
		assert_eq!(config.max_open_connections, 10);
		assert_eq!(config.max_idle_connections, 5);
		assert_eq!(config.database.as_deref(), Some("ignored_by_sql"));
		assert_eq!(config.connect_timeout, Duration::from_secs(3));
	}

	#[rstest]
	fn test_defaults_for_optional_keys() {
		// Act
		let config = DatabaseSettings::from_toml_str(
			"[database]\ntype = \"mongodb\"\nconnection_string = \"mongodb://localhost\"\n",
		)
		.unwrap()
		.into_config()
		.unwrap();

		// Assert
		assert_eq!(config.max_open_connections, 0);
		assert_eq!(config.max_idle_connections, 0);
		assert_eq!(config.database, None);
		assert_eq!(config.connect_timeout, DEFAULT_CONNECT_TIMEOUT);
	}

	#[rstest]
	fn test_missing_section() {
		// Act
		let err = DatabaseSettings::from_toml_str("[server]\nport = 80\n").unwrap_err();

		// Assert
		assert!(matches!(err, ConfError::MissingSection(ref name) if name == "database"));
	}

	#[rstest]
	#[case("[database]\ntype = 5\n")]
	#[case("[database]\nmax_open_connections = -1\n")]
	#[case("[database]\nunknown_key = true\n")]
	#[case("[database")]
	fn test_malformed_toml(#[case] content: &str) {
		assert!(matches!(
			DatabaseSettings::from_toml_str(content),
			Err(ConfError::Parse(_))
		));
	}

	#[rstest]
	#[case(DatabaseSettings { connection_string: Some("x".into()), ..Default::default() }, "database.type")]
	#[case(DatabaseSettings { backend: Some("mysql".into()), ..Default::default() }, "database.connection_string")]
	fn test_required_keys(#[case] settings: DatabaseSettings, #[case] missing: &str) {
		// Act
		let err = settings.into_config().unwrap_err();

		// Assert
		assert!(matches!(err, ConfError::MissingVariable(ref key) if key == missing));
	}

	#[rstest]
	fn test_merge_prefers_overrides() {
		// Arrange
		let base = DatabaseSettings {
			backend: Some("mysql".into()),
			connection_string: Some("mysql://file".into()),
			max_open_connections: Some(10),
			..Default::default()
		};
		let overrides = DatabaseSettings {
			connection_string: Some("mysql://env".into()),
			max_idle_connections: Some(2),
			..Default::default()
		};

		// Act
		let merged = base.merge(overrides);

		// Assert
		assert_eq!(merged.backend.as_deref(), Some("mysql"));
		assert_eq!(merged.connection_string.as_deref(), Some("mysql://env"));
		assert_eq!(merged.max_open_connections, Some(10));
		assert_eq!(merged.max_idle_connections, Some(2));
	}

	#[rstest]
	fn test_unknown_backend_tag_passes_through() {
		// Act
		let config = DatabaseSettings {
			backend: Some("cassandra".into()),
			connection_string: Some("cassandra://localhost".into()),
			..Default::default()
		}
		.into_config()
		.unwrap();

		// Assert
		assert_eq!(config.backend, "cassandra");
	}
}
