//! Bounded retry with exponential backoff and jitter for cluster API reads.
//!
//! Identity lookups must fail fast enough to surface as a precondition error,
//! so attempts are always bounded here.

use std::time::Duration;

use rand::Rng;
use tracing::{error, warn};

/// Backoff settings for transient API failures
#[derive(Clone, Debug)]
pub struct RetryConfig {
    /// Total attempts including the first (minimum 1)
    pub max_attempts: u32,
    /// Delay before the second attempt
    pub initial_delay: Duration,
    /// Upper bound on any single delay
    pub max_delay: Duration,
    /// Growth factor between delays
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(2),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// Un-jittered delay after failed attempt `attempt` (1-based)
    fn base_delay(&self, attempt: u32) -> Duration {
        let growth = self.backoff_multiplier.powi(attempt.saturating_sub(1) as i32);
        let secs = (self.initial_delay.as_secs_f64() * growth).min(self.max_delay.as_secs_f64());
        Duration::from_secs_f64(secs)
    }
}

/// Run `operation` until it succeeds or `config.max_attempts` is exhausted,
/// returning the last error. Delays carry 0.5x to 1.5x jitter.
pub async fn retry_with_backoff<F, Fut, T, E>(
    config: &RetryConfig,
    operation_name: &str,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        let e = match operation().await {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };
        if attempt >= max_attempts {
            error!(operation = %operation_name, attempt, error = %e, "Giving up");
            return Err(e);
        }

        let delay = config
            .base_delay(attempt)
            .mul_f64(rand::thread_rng().gen_range(0.5..1.5));
        warn!(
            operation = %operation_name,
            attempt,
            error = %e,
            delay_ms = delay.as_millis(),
            "Retrying after transient failure"
        );
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}
