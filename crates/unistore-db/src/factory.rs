//! Adapter factory
//!
//! [`AdapterRegistry`] maps backend type tags to connectors. The factory
//! resolves `config.backend` against the registry, builds the adapter and
//! connects it. Unknown tags are rejected before anything is constructed.
//!
//! ## Registering a custom backend
//!
//! ```rust,no_run
//! use unistore_db::factory::AdapterRegistry;
//! use unistore_db::{Adapter, Config, Context, RelationalAdapter};
//!
//! # async fn example() -> unistore_db::Result<()> {
//! let mut registry = AdapterRegistry::with_defaults();
//! registry.register("cockroach", || Box::new(RelationalAdapter::postgres()));
//!
//! let adapter = registry
//!     .connect(&Context::background(), &Config::new("cockroach", "postgres://localhost:26257/app"))
//!     .await?;
//! # Ok(())
//! # }
//! ```

use once_cell::sync::Lazy;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::adapter::Adapter;
use crate::config::Config;
use crate::context::Context;
use crate::document::DocumentAdapter;
use crate::error::{DbError, Result};
use crate::relational::RelationalAdapter;

/// Builds an unconnected adapter
pub type Connector = Arc<dyn Fn() -> Box<dyn Adapter> + Send + Sync>;

static DEFAULT_REGISTRY: Lazy<AdapterRegistry> = Lazy::new(AdapterRegistry::with_defaults);

fn normalize(tag: &str) -> String {
	tag.trim().to_ascii_lowercase()
}

/// Backend type tag to connector mapping
#[derive(Clone, Default)]
pub struct AdapterRegistry {
	connectors: BTreeMap<String, Connector>,
}

impl AdapterRegistry {
	/// An empty registry
	pub fn new() -> Self {
		Self::default()
	}

	/// A registry with every built-in backend
	///
	/// # Examples
	///
	/// ```
	/// use unistore_db::factory::AdapterRegistry;
	///
	/// let registry = AdapterRegistry::with_defaults();
	/// assert!(registry.contains("postgresql"));
	/// assert!(registry.contains("MongoDB"));
	/// assert!(!registry.contains("cassandra"));
	/// ```
	pub fn with_defaults() -> Self {
		let mut registry = Self::new();
		registry
			.register("mysql", || Box::new(RelationalAdapter::mysql()))
			.register("postgres", || Box::new(RelationalAdapter::postgres()))
			.register("postgresql", || Box::new(RelationalAdapter::postgres()))
			.register("sqlite", || Box::new(RelationalAdapter::sqlite()))
			.register("mongodb", || Box::new(DocumentAdapter::new()))
			.register("mongo", || Box::new(DocumentAdapter::new()));
		registry
	}

	/// Add or replace the connector for `tag`; tags are case-insensitive
	pub fn register<F>(&mut self, tag: impl AsRef<str>, connector: F) -> &mut Self
	where
		F: Fn() -> Box<dyn Adapter> + Send + Sync + 'static,
	{
		self.connectors
			.insert(normalize(tag.as_ref()), Arc::new(connector));
		self
	}

	pub fn contains(&self, tag: &str) -> bool {
		self.connectors.contains_key(&normalize(tag))
	}

	/// Registered tags in sorted order
	pub fn supported(&self) -> Vec<&str> {
		self.connectors.keys().map(String::as_str).collect()
	}

	/// Construct an unconnected adapter for `tag`
	pub fn create(&self, tag: &str) -> Result<Box<dyn Adapter>> {
		let connector = self.connectors.get(&normalize(tag)).ok_or_else(|| {
			DbError::Unsupported(format!(
				"unsupported database type: {} (supported: {})",
				tag,
				self.supported().join(", ")
			))
		})?;
		Ok(connector())
	}

	/// Construct and connect the adapter selected by `config.backend`
	pub async fn connect(&self, ctx: &Context, config: &Config) -> Result<Box<dyn Adapter>> {
		let adapter = self.create(&config.backend)?;
		tracing::debug!(backend = %config.backend, adapter = %adapter.id(), "adapter created");
		adapter.connect(ctx, config).await?;
		Ok(adapter)
	}
}

impl fmt::Debug for AdapterRegistry {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("AdapterRegistry")
			.field("supported", &self.supported())
			.finish()
	}
}

/// The lazily built registry of built-in backends
pub fn default_registry() -> &'static AdapterRegistry {
	&DEFAULT_REGISTRY
}

/// Build a connected adapter for `config` from the built-in backends
pub async fn new_adapter(ctx: &Context, config: &Config) -> Result<Box<dyn Adapter>> {
	default_registry().connect(ctx, config).await
}
