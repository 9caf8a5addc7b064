use crate::error::AuditError;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Errors after which the enclosing transaction may simply be rerun.
pub trait TransientError {
    fn is_transient(&self) -> bool;
}

impl TransientError for AuditError {
    fn is_transient(&self) -> bool {
        AuditError::is_transient(self)
    }
}

/// Reruns a whole transaction when the server aborted it over a write conflict.
///
/// Concurrent audited writes to one collection all insert into the same
/// revision range, so under snapshot isolation all but one of them conflict.
/// Each rerun starts a fresh transaction, recounts, and takes the next free
/// revision.
///
/// ```ignore
/// let retry = TransactionRetry::default();
/// let product = retry.run(|| repository.update_once(&product, expected)).await?;
/// ```
#[derive(Debug, Clone)]
pub struct TransactionRetry {
    max_attempts: u32,
    initial_backoff: Duration,
    max_backoff: Duration,
}

impl Default for TransactionRetry {
    fn default() -> Self {
        Self {
            max_attempts: 30,
            initial_backoff: Duration::from_millis(5),
            max_backoff: Duration::from_millis(200),
        }
    }
}

impl TransactionRetry {
    pub fn new(max_attempts: u32, initial_backoff: Duration, max_backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_backoff,
            max_backoff,
        }
    }

    /// No sleeping between attempts, only a yield to the scheduler.
    pub fn immediate(max_attempts: u32) -> Self {
        Self::new(max_attempts, Duration::ZERO, Duration::ZERO)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Jittered delay before attempt `attempt + 1`.
    fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        let base = self
            .initial_backoff
            .saturating_mul(1 << exponent)
            .min(self.max_backoff);
        base.mul_f64(jitter_factor())
    }

    /// Calls `operation` until it returns something other than a transient
    /// error, at most `max_attempts` times. The last transient error is
    /// returned once attempts run out.
    pub async fn run<F, Fut, T, E>(&self, mut operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: TransientError + std::fmt::Display,
    {
        let mut attempt = 1;

        loop {
            match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(attempt, "Transaction committed after rerun");
                    }
                    return Ok(value);
                }
                Err(err) if err.is_transient() && attempt < self.max_attempts => {
                    warn!(
                        attempt,
                        max_attempts = self.max_attempts,
                        error = %err,
                        "Transaction conflict, rerunning"
                    );

                    let delay = self.backoff(attempt);
                    if delay.is_zero() {
                        tokio::task::yield_now().await;
                    } else {
                        tokio::time::sleep(delay).await;
                    }
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

/// Uniform-ish factor in 0.5..1.0, spreads reruns of colliding writers apart
fn jitter_factor() -> f64 {
    use std::collections::hash_map::RandomState;
    use std::hash::BuildHasher;

    (RandomState::new().hash_one(std::time::SystemTime::now()) % 50) as f64 / 100.0 + 0.5
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conflict() -> AuditError {
        AuditError::TransientConflict("WriteConflict".into())
    }

    #[tokio::test]
    async fn test_reruns_until_commit() {
        let mut calls = 0;
        let result = TransactionRetry::immediate(5)
            .run(|| {
                calls += 1;
                let call = calls;
                async move { if call < 3 { Err(conflict()) } else { Ok(call) } }
            })
            .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls, 3);
    }

    #[tokio::test]
    async fn test_permanent_error_is_not_rerun() {
        let mut calls = 0;
        let result: Result<(), AuditError> = TransactionRetry::immediate(5)
            .run(|| {
                calls += 1;
                async { Err(AuditError::Database("connection reset".into())) }
            })
            .await;

        assert!(matches!(result, Err(AuditError::Database(_))));
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn test_gives_up_with_last_conflict() {
        let mut calls = 0;
        let result: Result<(), AuditError> = TransactionRetry::immediate(4)
            .run(|| {
                calls += 1;
                async { Err(conflict()) }
            })
            .await;

        assert!(result.unwrap_err().is_transient());
        assert_eq!(calls, 4);
    }

    #[test]
    fn test_backoff_is_capped() {
        let retry = TransactionRetry::new(
            10,
            Duration::from_millis(10),
            Duration::from_millis(40),
        );

        assert!(retry.backoff(1) <= Duration::from_millis(10));
        assert!(retry.backoff(1) >= Duration::from_millis(5));
        assert!(retry.backoff(8) <= Duration::from_millis(40));
        assert!(TransactionRetry::immediate(3).backoff(2).is_zero());
        assert_eq!(TransactionRetry::new(0, Duration::ZERO, Duration::ZERO).max_attempts(), 1);
    }
}
