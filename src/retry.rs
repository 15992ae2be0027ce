//! Bounded connection retries with capped exponential backoff.
//!
//! A failed connect is retried after the current delay; each retry spends
//! one unit of budget and grows the delay by the backoff multiplier up to a
//! ceiling. The chain ends on the first success or once the budget is spent.
//! Exhaustion is logged, not raised: the caller keeps running degraded.
//!
//! ```text
//! attempt  wait before next
//! 1        3000 ms
//! 2        4500 ms
//! 3        6750 ms
//! 4..      10000 ms
//! ```

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::dependency::Dependency;
use crate::error::ConnectError;
use crate::metrics;

/// Retries after the first attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 15;
/// Wait before the first retry, in milliseconds.
pub const DEFAULT_INITIAL_DELAY_MS: u64 = 3000;
/// Ceiling for the wait between attempts, in milliseconds.
pub const DEFAULT_MAX_DELAY_MS: u64 = 10_000;
/// Growth factor applied to the wait after each failure.
pub const DEFAULT_BACKOFF_MULTIPLIER: f64 = 1.5;

/// Retry budget and backoff shape.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Retries allowed after the first attempt.
    pub max_retries: u32,
    /// Wait before the first retry.
    pub initial_delay: Duration,
    /// Upper bound for any wait.
    pub max_delay: Duration,
    /// Multiplier applied to the wait after each failure.
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            initial_delay: Duration::from_millis(DEFAULT_INITIAL_DELAY_MS),
            max_delay: Duration::from_millis(DEFAULT_MAX_DELAY_MS),
            backoff_multiplier: DEFAULT_BACKOFF_MULTIPLIER,
        }
    }
}

impl RetryPolicy {
    /// Policy with the given budget and first delay, default growth and cap.
    pub fn new(max_retries: u32, initial_delay: Duration) -> Self {
        Self {
            max_retries,
            initial_delay,
            ..Default::default()
        }
    }

    /// State before the first attempt. The first delay never exceeds the cap.
    pub fn initial_state(&self) -> RetryState {
        RetryState {
            retries_remaining: self.max_retries,
            delay: self.initial_delay.min(self.max_delay),
        }
    }

    /// Delay following `delay`: `min(delay * multiplier, max_delay)`, never
    /// shorter than `delay`.
    pub fn next_delay(&self, delay: Duration) -> Duration {
        let scaled = delay.as_secs_f64() * self.backoff_multiplier;
        if !scaled.is_finite() || scaled >= self.max_delay.as_secs_f64() {
            return self.max_delay.max(delay);
        }
        Duration::from_secs_f64(scaled.max(0.0)).max(delay)
    }

    /// Waits the policy would sleep between attempts if every attempt failed.
    pub fn delays(&self) -> impl Iterator<Item = Duration> + '_ {
        let mut state = Some(self.initial_state());
        std::iter::from_fn(move || {
            let current = state?;
            state = current.advance(self);
            state.map(|_| current.delay)
        })
    }
}

/// Budget and delay between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryState {
    /// Retries left after the attempt in progress.
    pub retries_remaining: u32,
    /// Wait before the next attempt if the current one fails.
    pub delay: Duration,
}

impl RetryState {
    /// State after a failed attempt, or `None` once the budget is spent.
    pub fn advance(self, policy: &RetryPolicy) -> Option<RetryState> {
        if self.retries_remaining == 0 {
            return None;
        }
        Some(RetryState {
            retries_remaining: self.retries_remaining - 1,
            delay: policy.next_delay(self.delay),
        })
    }

    /// Whether a failure now would end the chain.
    pub fn is_last_attempt(&self) -> bool {
        self.retries_remaining == 0
    }
}

/// Terminal result of a retry chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryOutcome {
    /// An attempt succeeded.
    Connected {
        /// Attempts made, including the successful one.
        attempts: u32,
    },
    /// Every attempt failed and the budget is spent.
    Exhausted {
        /// Attempts made.
        attempts: u32,
    },
    /// The chain was cancelled before reaching another outcome.
    Cancelled {
        /// Attempts started before cancellation.
        attempts: u32,
    },
}

impl RetryOutcome {
    /// Attempts made before the chain ended.
    pub fn attempts(&self) -> u32 {
        match *self {
            Self::Connected { attempts }
            | Self::Exhausted { attempts }
            | Self::Cancelled { attempts } => attempts,
        }
    }

    /// Whether the chain ended connected.
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected { .. })
    }
}

/// Drives one connect operation through a [`RetryPolicy`].
#[derive(Debug, Clone, Default)]
pub struct ConnectionRetrier {
    policy: RetryPolicy,
    cancel: CancellationToken,
}

impl ConnectionRetrier {
    /// Create a retrier with its own cancellation token.
    pub fn new(policy: RetryPolicy) -> Self {
        Self::with_cancellation(policy, CancellationToken::new())
    }

    /// Create a retrier that stops when `cancel` fires.
    pub fn with_cancellation(policy: RetryPolicy, cancel: CancellationToken) -> Self {
        Self { policy, cancel }
    }

    /// Retry policy in use.
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Token that cancels this retrier.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Run the chain to a terminal outcome. Attempts never overlap.
    pub async fn run<F, Fut>(&self, dependency: &'static str, mut connect: F) -> RetryOutcome
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<(), ConnectError>>,
    {
        let mut state = self.policy.initial_state();
        let mut attempts = 0u32;

        loop {
            if self.cancel.is_cancelled() {
                return cancelled(dependency, attempts);
            }

            attempts += 1;
            metrics::inc_connect_attempts(dependency);
            debug!(dependency, attempt = attempts, "Connecting to {}", dependency);

            let result = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return cancelled(dependency, attempts),
                result = connect() => result,
            };

            let err = match result {
                Ok(()) => {
                    metrics::inc_connected(dependency);
                    info!(dependency, attempts, "Connected to {} successfully", dependency);
                    return RetryOutcome::Connected { attempts };
                }
                Err(e) => e,
            };
            metrics::inc_connect_failures(dependency);

            let Some(next) = state.advance(&self.policy) else {
                metrics::inc_retries_exhausted(dependency);
                error!(dependency, attempts, "{} connection failed: {}", dependency, err);
                return RetryOutcome::Exhausted { attempts };
            };

            warn!(
                dependency,
                error = %err,
                "{} unavailable. Retrying in {}ms... ({} attempts left)",
                dependency,
                state.delay.as_millis(),
                state.retries_remaining
            );

            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return cancelled(dependency, attempts),
                _ = tokio::time::sleep(state.delay) => {}
            }

            state = next;
        }
    }

    /// Run the chain for `dependency` on a background task.
    pub fn spawn(self, dependency: Arc<dyn Dependency>) -> JoinHandle<RetryOutcome> {
        tokio::spawn(async move {
            let dep = dependency.as_ref();
            self.run(dep.name(), move || dep.connect()).await
        })
    }
}

fn cancelled(dependency: &'static str, attempts: u32) -> RetryOutcome {
    info!(dependency, attempts, "Stopped connecting to {}: cancelled", dependency);
    RetryOutcome::Cancelled { attempts }
}
