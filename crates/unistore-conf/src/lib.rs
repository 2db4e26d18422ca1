//! # unistore-conf
//!
//! Builds [`unistore_db::Config`] values from TOML settings files and
//! prefixed environment variables.
//!
//! ## Sources
//!
//! - **TOML**: a `[database]` table with `type`, `connection_string`,
//!   `max_open_connections`, `max_idle_connections`, `database` and
//!   `connect_timeout_secs`
//! - **Environment**: `UNISTORE_DB_TYPE`, `UNISTORE_DB_CONNECTION_STRING`
//!   (falling back to `DATABASE_URL`), `UNISTORE_DB_MAX_OPEN_CONNECTIONS`,
//!   `UNISTORE_DB_MAX_IDLE_CONNECTIONS`, `UNISTORE_DB_NAME` and
//!   `UNISTORE_DB_CONNECT_TIMEOUT_SECS`
//!
//! Environment values override file values.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::path::Path;
//!
//! # fn main() -> Result<(), unistore_conf::ConfError> {
//! let config = unistore_conf::load(Some(Path::new("unistore.toml")))?;
//! println!("connecting to {}", config.backend);
//! # Ok(())
//! # }
//! ```

pub mod env;
pub mod error;
pub mod settings;

pub use env::{DEFAULT_PREFIX, Env};
pub use error::ConfError;
pub use settings::{DatabaseSettings, load, load_with_env};
