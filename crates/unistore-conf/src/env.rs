//! Prefixed environment variable access

use std::env;
use std::fmt::Display;
use std::str::FromStr;

use crate::error::ConfError;

/// Prefix applied to every variable unless overridden
pub const DEFAULT_PREFIX: &str = "UNISTORE_";

/// Environment variable reader with prefix support
#[derive(Debug, Clone, Default)]
pub struct Env {
	/// Optional prefix for environment variables (e.g., "UNISTORE_")
	pub prefix: Option<String>,
}

impl Env {
	/// Create a reader without a prefix
	pub fn new() -> Self {
		Self { prefix: None }
	}

	/// Set a prefix for all environment variable lookups
	///
	/// # Examples
	///
	/// ```
	/// use unistore_conf::Env;
	///
	/// let env = Env::new().with_prefix("APP_");
	/// assert_eq!(env.key_name("DB_TYPE"), "APP_DB_TYPE");
	/// ```
	pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
		self.prefix = Some(prefix.into());
		self
	}

	/// Reader using [`DEFAULT_PREFIX`]
	pub fn unistore() -> Self {
		Self::new().with_prefix(DEFAULT_PREFIX)
	}

	/// Full variable name with the prefix applied
	pub fn key_name(&self, key: &str) -> String {
		match &self.prefix {
			Some(prefix) => format!("{}{}", prefix, key),
			None => key.to_string(),
		}
	}

	/// Read a string value, `None` when the variable is unset
	pub fn opt_str(&self, key: &str) -> Result<Option<String>, ConfError> {
		let full_key = self.key_name(key);
		match env::var(&full_key) {
			Ok(value) => Ok(Some(value)),
			Err(env::VarError::NotPresent) => Ok(None),
			Err(env::VarError::NotUnicode(raw)) => Err(ConfError::InvalidValue {
				key: full_key,
				value_len: raw.len(),
				error: "value is not valid unicode".to_string(),
			}),
		}
	}

	/// Read and parse a value, `None` when the variable is unset
	pub fn opt_parse<T>(&self, key: &str) -> Result<Option<T>, ConfError>
	where
		T: FromStr,
		T::Err: Display,
	{
		let Some(value) = self.opt_str(key)? else {
			return Ok(None);
		};
		value
			.trim()
			.parse()
			.map(Some)
			.map_err(|e: T::Err| ConfError::InvalidValue {
				key: self.key_name(key),
				value_len: value.len(),
				error: e.to_string(),
			})
	}
}
