//! Bounded retry with exponential backoff, shared by the chat proxy, the image
//! proxy and the chat client.
//!
//! The policy knows nothing about HTTP: it runs an async operation, asks a
//! predicate whether the output is worth another try, and otherwise hands the
//! output back untouched. When attempts run out the last output is returned
//! as-is, even if it still looks retryable.

use backon::{BackoffBuilder, ExponentialBuilder, Retryable};
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: usize,
    base_delay: Duration,
}

/// Output that the predicate asked to retry. Carried through backon as the
/// error type so the final one can be handed back unchanged.
struct RetryableOutput<T>(T);

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_ATTEMPTS, Self::DEFAULT_BASE_DELAY)
    }
}

impl RetryPolicy {
    pub const DEFAULT_MAX_ATTEMPTS: usize = 5;
    pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);

    /// `max_attempts` counts the first call and is clamped to at least one.
    pub fn new(max_attempts: usize, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    pub fn base_delay(&self) -> Duration {
        self.base_delay
    }

    fn backoff(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(self.base_delay)
            .with_factor(2.0)
            .without_max_delay()
            .with_max_times(self.max_attempts - 1)
    }

    /// The sleeps taken between attempts, in order. Empty for a single attempt.
    pub fn delays(&self) -> impl Iterator<Item = Duration> {
        self.backoff().build()
    }

    /// Runs `op` until `should_retry` rejects its output or attempts run out,
    /// returning the most recent output either way.
    ///
    /// No delay precedes the first attempt.
    pub async fn run<T, F, Fut, P>(&self, label: &'static str, mut op: F, should_retry: P) -> T
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = T>,
        P: Fn(&T) -> bool,
    {
        let attempts = AtomicUsize::new(0);
        let should_retry = &should_retry;
        let attempts_ref = &attempts;

        let outcome = (|| {
            attempts_ref.fetch_add(1, Ordering::Relaxed);
            let fut = op();
            async move {
                let output = fut.await;
                if should_retry(&output) {
                    Err(RetryableOutput(output))
                } else {
                    Ok(output)
                }
            }
        })
        .retry(self.backoff())
        .notify(|_: &RetryableOutput<T>, delay: Duration| {
            warn!(
                call = label,
                attempt = attempts_ref.load(Ordering::Relaxed),
                max_attempts = self.max_attempts,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                "[{label}] Retryable outcome, backing off"
            );
        })
        .await;

        match outcome {
            Ok(output) | Err(RetryableOutput(output)) => output,
        }
    }
}
