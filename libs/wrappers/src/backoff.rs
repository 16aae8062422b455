//! Status polling with exponential backoff
//!
//! Long-running remote requests are observed by repeatedly probing their
//! status. The delay between probes starts at `initial_delay`, doubles after
//! every pending answer and is capped at `max_delay`.

use crate::error::{Result, WrapperError};
use adaptor_config::BackendConfig;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Answer of one status probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollStatus<T> {
    Ready(T),
    Pending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub max_attempts: u32,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(15),
            max_attempts: 50,
        }
    }
}

impl Backoff {
    pub fn from_config(config: &BackendConfig) -> Self {
        Self {
            initial_delay: config.poll_initial(),
            max_delay: config.poll_max(),
            max_attempts: config.poll_attempts,
        }
    }

    /// Delay to wait after `delay`
    fn next_delay(&self, delay: Duration) -> Duration {
        delay.saturating_mul(2).min(self.max_delay)
    }

    /// Probe until ready, an error, or the attempt budget is spent
    pub async fn poll<T, F, Fut>(&self, operation: &str, mut probe: F) -> Result<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<PollStatus<T>>>,
    {
        let mut delay = self.initial_delay;
        let mut waited = Duration::ZERO;

        for attempt in 1..=self.max_attempts {
            match probe(attempt).await? {
                PollStatus::Ready(value) => {
                    debug!(operation, attempt, "Poll completed");
                    return Ok(value);
                }
                PollStatus::Pending if attempt < self.max_attempts => {
                    debug!(
                        operation,
                        attempt,
                        max_attempts = self.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        "Still pending, backing off"
                    );
                    tokio::time::sleep(delay).await;
                    waited += delay;
                    delay = self.next_delay(delay);
                }
                PollStatus::Pending => {}
            }
        }

        warn!(
            operation,
            attempts = self.max_attempts,
            "Gave up polling after {:?}",
            waited
        );
        Err(WrapperError::timeout(operation, waited.as_millis() as u64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_delays_double_until_ready() {
        let backoff = Backoff::default();
        let start = tokio::time::Instant::now();

        let value = backoff
            .poll("request", |attempt| async move {
                if attempt < 4 {
                    Ok(PollStatus::Pending)
                } else {
                    Ok(PollStatus::Ready(attempt))
                }
            })
            .await
            .unwrap();

        assert_eq!(value, 4);
        // 1 + 2 + 4 seconds
        assert_eq!(start.elapsed(), Duration::from_secs(7));
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay_is_capped() {
        let backoff = Backoff {
            max_attempts: 7,
            ..Backoff::default()
        };
        let start = tokio::time::Instant::now();

        let result: Result<()> = backoff
            .poll("request", |_| async { Ok(PollStatus::Pending) })
            .await;

        assert!(matches!(result, Err(WrapperError::Timeout { .. })));
        // 1 + 2 + 4 + 8 + 15 + 15, no sleep after the last probe
        assert_eq!(start.elapsed(), Duration::from_secs(45));
    }

    #[tokio::test(start_paused = true)]
    async fn test_status_error_stops_polling() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);

        let result: Result<()> = Backoff::default()
            .poll("request", move |_| {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(WrapperError::backend("gatekeeper", "request failed"))
                }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
