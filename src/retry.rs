use crate::config::Config;
use log::debug;
use rand::Rng;
use std::future::Future;
use std::time::Duration;

/// Bounded exponential backoff.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub retries: u32,
    pub min_delay: Duration,
    pub factor: u32,
    pub max_delay: Duration,
    /// Multiply each delay by a random factor in [1, 2).
    pub randomize: bool,
}

impl RetryPolicy {
    pub fn from_config(config: &Config, retries: u32) -> Self {
        Self {
            retries,
            min_delay: Duration::from_millis(config.retry.min_delay_ms),
            factor: config.retry.factor,
            max_delay: config.max_retry_delay(),
            randomize: true,
        }
    }

    /// Retry immediately, mostly useful in tests.
    pub fn immediate(retries: u32) -> Self {
        Self {
            retries,
            min_delay: Duration::ZERO,
            factor: 1,
            max_delay: Duration::ZERO,
            randomize: false,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.retries.saturating_add(1)
    }

    /// Delay after the given failed attempt (1-indexed).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(32) as i32;
        let base = self.min_delay.as_secs_f64() * f64::from(self.factor.max(1)).powi(exponent);
        let jitter = if self.randomize {
            rand::thread_rng().gen_range(1.0..2.0)
        } else {
            1.0
        };
        let delay = (base * jitter).min(self.max_delay.as_secs_f64());
        Duration::from_secs_f64(delay.max(0.0))
    }
}

/// Run `operation` until it succeeds, fails with an error `is_retryable`
/// rejects, or the policy runs out of attempts.
///
/// `operation` receives the 1-indexed attempt number. `on_retry` is called
/// with each error that is about to be retried.
pub async fn retry<T, E, F, Fut, P, R>(
    policy: &RetryPolicy,
    mut operation: F,
    is_retryable: P,
    mut on_retry: R,
) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
    R: FnMut(&E, u32),
{
    let max_attempts = policy.max_attempts();
    let mut attempt = 1;

    loop {
        match operation(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !is_retryable(&err) || attempt >= max_attempts {
                    return Err(err);
                }
                on_retry(&err, attempt);
                let delay = policy.delay_for(attempt);
                debug!("Attempt {attempt}/{max_attempts} failed, retrying in {delay:?}");
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                attempt += 1;
            }
        }
    }
}
