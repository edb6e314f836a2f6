use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use crate::options::CosmosOptions;
use crate::{Error, Result};

/// Values a factory may use to configure the strategy it creates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionStrategyDependencies {
    pub database_name: Option<String>,
    pub request_timeout: Option<Duration>,
}

impl ExecutionStrategyDependencies {
    pub fn from_options(options: &CosmosOptions) -> Self {
        Self {
            database_name: options.database_name().map(str::to_string),
            request_timeout: options.request_timeout(),
        }
    }
}

/// Policy that decides whether a failed attempt runs again.
#[async_trait]
pub trait ExecutionStrategy: Send + Sync {
    /// False when the strategy never retries; [`execute`] then returns the first error as is.
    fn retries_on_failure(&self) -> bool;

    /// Whether `error` is transient for this strategy.
    fn should_retry_on(&self, error: &Error) -> bool;

    /// Delay before retry number `attempt + 1`, or `None` once the retry budget is spent.
    ///
    /// `attempt` is 0-based (first failure => attempt=0).
    async fn next_delay(&self, attempt: u32, error: &Error) -> Option<Duration>;
}

/// Builds a strategy for a context. Stored on the options and compared by identity.
pub type ExecutionStrategyFactory =
    Arc<dyn Fn(&ExecutionStrategyDependencies) -> Arc<dyn ExecutionStrategy> + Send + Sync>;

/// Retries throttled (429), timed out (408) and unavailable (503) responses
/// with exponential backoff, honouring a server supplied retry-after.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryingExecutionStrategy {
    max_retry_count: u32,
    min_delay: Duration,
    max_delay: Duration,
}

impl RetryingExecutionStrategy {
    pub const DEFAULT_MAX_RETRY_COUNT: u32 = 6;
    pub const DEFAULT_MIN_DELAY: Duration = Duration::from_secs(1);
    pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(30);

    pub fn new(max_retry_count: u32, min_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_retry_count,
            min_delay,
            max_delay: max_delay.max(min_delay),
        }
    }

    pub fn max_retry_count(&self) -> u32 {
        self.max_retry_count
    }

    fn backoff_delay(&self, attempt: u32, retry_after_ms: Option<u32>) -> Duration {
        let base = match 1u32.checked_shl(attempt) {
            Some(factor) => self.min_delay.saturating_mul(factor),
            None => self.max_delay,
        };
        let chosen = retry_after_ms
            .map(|ms| Duration::from_millis(u64::from(ms)))
            .unwrap_or(base);
        chosen.min(self.max_delay)
    }
}

impl Default for RetryingExecutionStrategy {
    fn default() -> Self {
        Self::new(
            Self::DEFAULT_MAX_RETRY_COUNT,
            Self::DEFAULT_MIN_DELAY,
            Self::DEFAULT_MAX_DELAY,
        )
    }
}

#[async_trait]
impl ExecutionStrategy for RetryingExecutionStrategy {
    fn retries_on_failure(&self) -> bool {
        true
    }

    fn should_retry_on(&self, error: &Error) -> bool {
        matches!(error, Error::Remote { status: 408 | 429 | 503, .. })
    }

    async fn next_delay(&self, attempt: u32, error: &Error) -> Option<Duration> {
        if attempt >= self.max_retry_count {
            return None;
        }
        let retry_after_ms = match error {
            Error::Remote { retry_after_ms, .. } => *retry_after_ms,
            _ => None,
        };
        Some(self.backoff_delay(attempt, retry_after_ms))
    }
}

/// Never retries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NonRetryingExecutionStrategy;

#[async_trait]
impl ExecutionStrategy for NonRetryingExecutionStrategy {
    fn retries_on_failure(&self) -> bool {
        false
    }

    fn should_retry_on(&self, _error: &Error) -> bool {
        false
    }

    async fn next_delay(&self, _attempt: u32, _error: &Error) -> Option<Duration> {
        None
    }
}

/// Run `operation` until it succeeds or `strategy` gives up.
///
/// Non-transient errors are returned unchanged. A transient error that outlives
/// the retry budget is wrapped in [`Error::RetryLimitExceeded`].
pub async fn execute<T, F, Fut>(strategy: &dyn ExecutionStrategy, mut operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt: u32 = 0;
    loop {
        let err = match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        if !strategy.retries_on_failure() || !strategy.should_retry_on(&err) {
            return Err(err);
        }

        match strategy.next_delay(attempt, &err).await {
            Some(delay) => {
                warn!(
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "transient failure, retrying"
                );
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                attempt += 1;
            }
            None => {
                return Err(Error::RetryLimitExceeded {
                    attempts: attempt,
                    source: Box::new(err),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn throttled(retry_after_ms: Option<u32>) -> Error {
        Error::Remote {
            status: 429,
            message: "Request rate is large".into(),
            retry_after_ms,
        }
    }

    #[tokio::test]
    async fn retries_transient_errors_until_success() {
        let strategy = RetryingExecutionStrategy::new(3, Duration::ZERO, Duration::ZERO);
        let calls = AtomicU32::new(0);
        let result = execute(&strategy, || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(throttled(None))
                } else {
                    Ok("done")
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_retry_budget() {
        let strategy = RetryingExecutionStrategy::new(2, Duration::ZERO, Duration::ZERO);
        let calls = AtomicU32::new(0);
        let result: Result<()> = execute(&strategy, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(throttled(None)) }
        })
        .await;
        match result {
            Err(Error::RetryLimitExceeded { attempts, source }) => {
                assert_eq!(attempts, 2);
                assert!(matches!(*source, Error::Remote { status: 429, .. }));
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn non_transient_errors_are_not_retried() {
        let strategy = RetryingExecutionStrategy::new(5, Duration::ZERO, Duration::ZERO);
        let calls = AtomicU32::new(0);
        let result: Result<()> = execute(&strategy, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async {
                Err(Error::Remote {
                    status: 404,
                    message: "Not found".into(),
                    retry_after_ms: None,
                })
            }
        })
        .await;
        assert!(matches!(result, Err(Error::Remote { status: 404, .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn non_retrying_strategy_surfaces_first_error() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = execute(&NonRetryingExecutionStrategy, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(throttled(None)) }
        })
        .await;
        assert!(matches!(result, Err(Error::Remote { status: 429, .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn backoff_doubles_and_respects_cap_and_retry_after() {
        let strategy = RetryingExecutionStrategy::new(
            10,
            Duration::from_millis(100),
            Duration::from_millis(1_000),
        );
        assert_eq!(strategy.backoff_delay(0, None), Duration::from_millis(100));
        assert_eq!(strategy.backoff_delay(2, None), Duration::from_millis(400));
        assert_eq!(strategy.backoff_delay(5, None), Duration::from_millis(1_000));
        assert_eq!(strategy.backoff_delay(40, None), Duration::from_millis(1_000));
        assert_eq!(strategy.backoff_delay(0, Some(250)), Duration::from_millis(250));
        assert_eq!(strategy.backoff_delay(0, Some(5_000)), Duration::from_millis(1_000));
    }

    #[test]
    fn next_delay_stops_at_max_retry_count() {
        let strategy = RetryingExecutionStrategy::new(1, Duration::ZERO, Duration::ZERO);
        let err = throttled(Some(10));
        assert_eq!(
            tokio_test::block_on(strategy.next_delay(0, &err)),
            Some(Duration::ZERO)
        );
        assert_eq!(tokio_test::block_on(strategy.next_delay(1, &err)), None);
    }
}
