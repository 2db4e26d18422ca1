//! Configuration loading.
//!
//! # Examples
//!
//! ```rust,no_run
//! use unistore::conf::{Env, load_with_env};
//!
//! let config = load_with_env(None, &Env::new().with_prefix("MYAPP_")).unwrap();
//! ```

pub use unistore_conf::*;
