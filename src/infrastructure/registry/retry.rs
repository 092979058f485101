use rand::Rng;
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::application::ports::BackendError;

/// Exponential backoff for transient backend failures.
///
/// Attempts stop once the next sleep would overrun `budget`, counted from the
/// first attempt.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub budget: Duration,
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(1),
            budget: Duration::from_secs(60),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    pub fn with_budget(budget: Duration) -> Self {
        Self {
            budget,
            ..Self::default()
        }
    }

    /// Single attempt, used where the caller schedules its own retries
    pub fn none() -> Self {
        Self {
            budget: Duration::ZERO,
            ..Self::default()
        }
    }

    fn next_delay(&self, current: Duration) -> Duration {
        current.mul_f64(self.backoff_multiplier).min(self.max_delay)
    }

    /// Full delay scaled into [0.5, 1.0) so concurrent retries spread out
    fn jittered(delay: Duration) -> Duration {
        let factor: f64 = rand::rng().random_range(0.5..1.0);
        delay.mul_f64(factor)
    }

    /// Run `attempt` until it succeeds, fails permanently or the budget is spent
    pub async fn run<T, F, Fut>(&self, operation: &str, mut attempt: F) -> Result<T, BackendError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, BackendError>>,
    {
        let started = Instant::now();
        let mut delay = self.initial_delay;
        let mut attempts = 1u32;

        loop {
            match attempt().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() => {
                    let sleep = Self::jittered(delay);
                    if started.elapsed() + sleep > self.budget {
                        warn!(
                            operation,
                            attempts,
                            "Retry budget of {:?} exhausted: {}",
                            self.budget,
                            e
                        );
                        return Err(e);
                    }

                    info!(
                        operation,
                        attempt = attempts,
                        "Transient failure, retrying in {:?}: {}",
                        sleep,
                        e
                    );
                    tokio::time::sleep(sleep).await;
                    delay = self.next_delay(delay);
                    attempts += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
