use std::{future::Future, time::Duration};

use crate::Result;

const MAX_BACKOFF_EXPONENT: u32 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
	pub max_attempts: u32,
	pub base_backoff: Duration,
	pub max_backoff: Duration,
}
impl RetryPolicy {
	pub fn from_config(cfg: &beacon_config::Retry) -> Self {
		Self {
			max_attempts: cfg.max_attempts.max(1),
			base_backoff: Duration::from_millis(cfg.base_backoff_ms),
			max_backoff: Duration::from_millis(cfg.max_backoff_ms),
		}
	}

	/// Single attempt, no sleeping. Used by tests and by callers that retry on their own.
	pub fn none() -> Self {
		Self { max_attempts: 1, base_backoff: Duration::ZERO, max_backoff: Duration::ZERO }
	}

	/// Delay after the given failed attempt (1-based): base doubled per attempt, capped.
	pub fn backoff_for_attempt(&self, attempt: u32) -> Duration {
		let exp = attempt.max(1).saturating_sub(1).min(MAX_BACKOFF_EXPONENT);
		let backoff = self.base_backoff.saturating_mul(1 << exp);

		backoff.min(self.max_backoff)
	}
}

/// Runs `call` until it succeeds, fails with a non-transient error, or the attempts run out.
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, operation: &str, mut call: F) -> Result<T>
where
	F: FnMut() -> Fut,
	Fut: Future<Output = Result<T>>,
{
	let mut attempt = 1;

	loop {
		match call().await {
			Ok(value) => return Ok(value),
			Err(err) if err.is_transient() && attempt < policy.max_attempts => {
				let backoff = policy.backoff_for_attempt(attempt);

				tracing::warn!(
					operation,
					attempt,
					backoff_ms = backoff.as_millis() as u64,
					error = %err,
					"Transient upstream failure. Retrying."
				);
				tokio::time::sleep(backoff).await;

				attempt += 1;
			},
			Err(err) => return Err(err),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn backoff_doubles_and_caps() {
		let policy = RetryPolicy {
			max_attempts: 5,
			base_backoff: Duration::from_millis(250),
			max_backoff: Duration::from_millis(1_000),
		};

		assert_eq!(policy.backoff_for_attempt(0), Duration::from_millis(250));
		assert_eq!(policy.backoff_for_attempt(1), Duration::from_millis(250));
		assert_eq!(policy.backoff_for_attempt(2), Duration::from_millis(500));
		assert_eq!(policy.backoff_for_attempt(3), Duration::from_millis(1_000));
		assert_eq!(policy.backoff_for_attempt(30), Duration::from_millis(1_000));
	}
}
