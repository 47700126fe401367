//! Bounded retry for transient sync failures

use std::future::Future;
use std::time::Duration;

use backoff::backoff::Backoff;
use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};
use convoy_exec::VcsError;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Attempt count at which the retry loop escalates its log level; mirrors
/// the long-standing operator warning for stubborn remotes.
const ESCALATION_ATTEMPT: u32 = 4;

/// Configuration for retry behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts per operation
    pub max_attempts: u32,
    /// Initial delay between attempts
    pub initial_delay: Duration,
    /// Maximum delay between attempts
    pub max_delay: Duration,
    /// Multiplier for exponential backoff
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_millis(1000),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
        }
    }
}

impl From<&convoy_config::RetrySettings> for RetryConfig {
    fn from(settings: &convoy_config::RetrySettings) -> Self {
        Self {
            max_attempts: settings.max_attempts,
            initial_delay: Duration::from_millis(settings.initial_delay_ms),
            max_delay: Duration::from_millis(settings.max_delay_ms),
            multiplier: settings.multiplier,
        }
    }
}

impl RetryConfig {
    fn create_backoff(&self) -> ExponentialBackoff {
        ExponentialBackoffBuilder::new()
            .with_initial_interval(self.initial_delay)
            .with_max_interval(self.max_delay)
            .with_multiplier(self.multiplier)
            .with_max_elapsed_time(None)
            .build()
    }
}

/// Why the retry loop gave up
#[derive(Debug)]
pub enum RetryError {
    /// The failure did not match the transient signature
    Fatal(VcsError),
    /// Every attempt failed with a transient error
    Exhausted { attempts: u32, last: VcsError },
}

/// Retry `operation` while it fails with the recognized transient
/// signature, sleeping with exponential backoff between attempts.
///
/// Non-transient failures return immediately as [`RetryError::Fatal`].
pub async fn retry_transient<F, Fut, T>(
    operation_name: &str,
    config: &RetryConfig,
    operation: F,
) -> Result<T, RetryError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, VcsError>>,
{
    let mut backoff = config.create_backoff();
    let mut attempt: u32 = 1;

    loop {
        match operation().await {
            Ok(result) => {
                if attempt > 1 {
                    info!("Operation '{operation_name}' succeeded after {attempt} attempts");
                }
                return Ok(result);
            }
            Err(error) if !error.is_transient() => {
                return Err(RetryError::Fatal(error));
            }
            Err(error) => {
                if attempt >= config.max_attempts {
                    warn!(
                        "Giving up on '{operation_name}' after {attempt} transient failures"
                    );
                    return Err(RetryError::Exhausted { attempts: attempt, last: error });
                }

                let delay = backoff.next_backoff().unwrap_or(config.max_delay);
                if attempt + 1 >= ESCALATION_ATTEMPT {
                    warn!(
                        "Operation '{operation_name}' keeps failing transiently (attempt {attempt}): {error}. Retrying in {delay:?}"
                    );
                } else {
                    info!(
                        "Transient failure in '{operation_name}' (attempt {attempt}): {error}. Retrying in {delay:?}"
                    );
                }

                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
