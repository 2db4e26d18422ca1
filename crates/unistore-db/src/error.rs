//! Error types shared by every adapter
//!
//! Driver failures are never classified further: they are wrapped in
//! [`DbError::Backend`] together with the operation, the target and the
//! backend that produced them.

use crate::config::BackendType;

/// Boxed driver error carried inside [`DbError::Backend`] and [`DbError::Connect`]
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type for adapter operations
pub type Result<T> = std::result::Result<T, DbError>;

/// Unified error type for adapter operations
#[derive(Debug, thiserror::Error)]
pub enum DbError {
	/// Connectivity or authentication failure while connecting
	#[error("failed to connect to {backend}: {source}")]
	Connect {
		backend: BackendType,
		#[source]
		source: BoxError,
	},

	/// Empty or malformed record, condition or argument
	#[error("invalid input: {0}")]
	InvalidInput(String),

	/// The backend has no native equivalent of the requested capability
	#[error("unsupported: {0}")]
	Unsupported(String),

	/// Failure reported by the underlying driver
	#[error("{backend} {operation} on `{target}` failed: {source}")]
	Backend {
		backend: BackendType,
		operation: &'static str,
		target: String,
		#[source]
		source: BoxError,
	},

	/// Commit or rollback on a transaction that already ended
	#[error("transaction already finalized")]
	AlreadyFinalized,

	/// The operation context was cancelled
	#[error("operation cancelled")]
	Cancelled,

	/// The operation context deadline passed
	#[error("operation deadline exceeded")]
	DeadlineExceeded,

	/// Operation issued against an adapter that is not connected
	#[error("adapter is not connected")]
	NotConnected,

	/// A typed accessor found a value of another kind
	#[error("type error: {0}")]
	Type(String),
}

impl DbError {
	/// Wrap a driver error with the operation context it happened in
	pub fn backend(
		backend: BackendType,
		operation: &'static str,
		target: impl Into<String>,
		source: impl Into<BoxError>,
	) -> Self {
		DbError::Backend {
			backend,
			operation,
			target: target.into(),
			source: source.into(),
		}
	}

	/// Wrap a driver error raised while establishing connectivity
	pub fn connect(backend: BackendType, source: impl Into<BoxError>) -> Self {
		DbError::Connect {
			backend,
			source: source.into(),
		}
	}

	/// Whether this error was produced by the operation context rather than the backend
	pub fn is_interrupted(&self) -> bool {
		matches!(self, DbError::Cancelled | DbError::DeadlineExceeded)
	}
}
