//! Operation context: cancellation token plus optional deadline
//!
//! Every adapter operation receives a [`Context`]. The driver future is
//! raced against the token and the deadline; whichever fires first ends the
//! call with [`DbError::Cancelled`] or [`DbError::DeadlineExceeded`] and
//! drops the in-flight driver future.

use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::{DbError, Result};

#[derive(Debug, Clone, Default)]
pub struct Context {
	token: CancellationToken,
	deadline: Option<Instant>,
}

impl Context {
	/// A context that is never cancelled and has no deadline
	pub fn background() -> Self {
		Self::default()
	}

	/// A context expiring `timeout` from now
	pub fn with_timeout(timeout: Duration) -> Self {
		Self::background().timeout(timeout)
	}

	/// A context driven by an externally owned cancellation token
	pub fn with_token(token: CancellationToken) -> Self {
		Self {
			token,
			deadline: None,
		}
	}

	/// Tighten the deadline; an earlier existing deadline is kept
	pub fn deadline(mut self, deadline: Instant) -> Self {
		self.deadline = Some(match self.deadline {
			Some(existing) if existing < deadline => existing,
			_ => deadline,
		});
		self
	}

	pub fn timeout(self, timeout: Duration) -> Self {
		self.deadline(Instant::now() + timeout)
	}

	/// Derive a context that is cancelled together with this one but can
	/// also be cancelled on its own
	pub fn child(&self) -> Self {
		Self {
			token: self.token.child_token(),
			deadline: self.deadline,
		}
	}

	pub fn cancel(&self) {
		self.token.cancel();
	}

	pub fn token(&self) -> &CancellationToken {
		&self.token
	}

	pub fn deadline_instant(&self) -> Option<Instant> {
		self.deadline
	}

	/// Fail fast when the context already ended
	pub fn check(&self) -> Result<()> {
		if self.token.is_cancelled() {
			return Err(DbError::Cancelled);
		}
		if let Some(deadline) = self.deadline
			&& Instant::now() >= deadline
		{
			return Err(DbError::DeadlineExceeded);
		}
		Ok(())
	}

	/// Run `fut` until it completes or the context ends
	pub async fn run<T, F>(&self, fut: F) -> Result<T>
	where
		F: Future<Output = Result<T>>,
	{
		self.check()?;

		let deadline = self.deadline;
		let expired = async move {
			match deadline {
				Some(deadline) => tokio::time::sleep_until(deadline).await,
				None => std::future::pending::<()>().await,
			}
		};

		tokio::select! {
			biased;
			_ = self.token.cancelled() => Err(DbError::Cancelled),
			_ = expired => Err(DbError::DeadlineExceeded),
			result = fut => result,
		}
	}
}
