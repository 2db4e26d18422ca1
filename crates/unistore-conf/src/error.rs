//! Configuration loading errors

use std::path::PathBuf;

/// Errors raised while loading adapter configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfError {
	#[error("Failed to read configuration file '{}': {source}", path.display())]
	Io {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("TOML error: {0}")]
	Parse(#[from] toml::de::Error),

	#[error("Missing configuration value: {0}")]
	MissingVariable(String),

	#[error("Failed to parse configuration value '{key}' (value length: {value_len}): {error}")]
	InvalidValue {
		key: String,
		/// Length of the original value, the raw value may hold credentials
		value_len: usize,
		error: String,
	},

	#[error("Missing configuration section: [{0}]")]
	MissingSection(String),
}
