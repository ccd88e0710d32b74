//! Bounded condition polling with exponential backoff.
//!
//! Provisioning on the provider side is asynchronous: a firewall update or a server
//! install reports an intermediate status until it settles. [`wait_until`] re-evaluates a
//! caller predicate until it holds, fails, runs out of attempts, or is cancelled.

use crate::error::{Error, Result};
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Default delay before the second predicate evaluation, in milliseconds
pub const DEFAULT_POLL_INITIAL_DELAY_MS: u64 = 1_000;

/// Default cap for the delay between evaluations, in milliseconds
pub const DEFAULT_POLL_MAX_DELAY_MS: u64 = 30_000;

/// Default number of predicate evaluations (roughly 15 minutes of waiting)
pub const DEFAULT_POLL_MAX_ATTEMPTS: u32 = 35;

/// Polling parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Delay after the first unsuccessful evaluation
    pub initial_delay: Duration,

    /// Upper bound for the doubling delay
    pub max_delay: Duration,

    /// Maximum number of predicate evaluations
    pub max_attempts: u32,
}

impl PollPolicy {
    /// Create a poll policy with default values.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            initial_delay: Duration::from_millis(DEFAULT_POLL_INITIAL_DELAY_MS),
            max_delay: Duration::from_millis(DEFAULT_POLL_MAX_DELAY_MS),
            max_attempts: DEFAULT_POLL_MAX_ATTEMPTS,
        }
    }

    /// Set the initial delay.
    #[must_use]
    pub const fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Set the maximum delay.
    #[must_use]
    pub const fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Set the maximum number of evaluations. Zero is treated as one.
    #[must_use]
    pub const fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Delay to wait after the given (1-based) unsuccessful evaluation.
    ///
    /// `delay = min(initial_delay * 2^(attempt - 1), max_delay)`
    #[must_use]
    pub fn delay_after_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let factor = 2u32.saturating_pow(attempt - 1);
        std::cmp::min(self.initial_delay.saturating_mul(factor), self.max_delay)
    }

    /// Effective attempt budget.
    #[must_use]
    pub const fn attempts(&self) -> u32 {
        if self.max_attempts == 0 {
            1
        } else {
            self.max_attempts
        }
    }

    /// Upper bound of the total time spent waiting between evaluations.
    #[must_use]
    pub fn total_wait(&self) -> Duration {
        (1..self.attempts())
            .map(|attempt| self.delay_after_attempt(attempt))
            .sum()
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::new()
    }
}

/// Observable states of a poll run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    /// Evaluating the predicate
    Checking,
    /// Sleeping before the next evaluation
    Waiting,
    /// The predicate held
    Done,
    /// The predicate returned an error
    Failed,
    /// The caller cancelled the run
    Cancelled,
    /// The attempt budget ran out
    TimedOut,
}

/// Predicate evaluated by [`wait_until`].
///
/// Implemented for any `FnMut() -> impl Future<Output = Result<bool>>` closure, so
/// conditions may borrow the client they query.
pub trait Condition {
    /// Future returned by a single evaluation.
    type Future: Future<Output = Result<bool>>;

    /// Starts one evaluation. Resolves to `Ok(true)` once the awaited state is reached.
    fn evaluate(&mut self) -> Self::Future;
}

impl<F, Fut> Condition for F
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool>>,
{
    type Future = Fut;

    fn evaluate(&mut self) -> Self::Future {
        self()
    }
}

/// Evaluate `condition` until it returns `true`.
///
/// The first evaluation happens immediately. A predicate error ends the run at once;
/// `false` waits the current delay and doubles it up to the policy maximum.
///
/// # Errors
///
/// - the predicate's own error when it fails
/// - [`Error::Timeout`] when the attempt budget is exhausted
/// - [`Error::Cancelled`] when `cancel` fires during an evaluation or a wait
pub async fn wait_until<C>(
    policy: &PollPolicy,
    cancel: &CancellationToken,
    condition: C,
) -> Result<()>
where
    C: Condition,
{
    wait_until_observed(policy, cancel, condition, |_| {}).await
}

/// Same as [`wait_until`], reporting every state the run enters to `observe`.
///
/// # Errors
///
/// See [`wait_until`].
pub async fn wait_until_observed<C, O>(
    policy: &PollPolicy,
    cancel: &CancellationToken,
    mut condition: C,
    mut observe: O,
) -> Result<()>
where
    C: Condition,
    O: FnMut(PollState),
{
    let max_attempts = policy.attempts();
    let mut attempt = 0;

    loop {
        if cancel.is_cancelled() {
            return Err(cancelled(attempt, &mut observe));
        }

        attempt += 1;
        observe(PollState::Checking);

        let outcome = tokio::select! {
            biased;
            () = cancel.cancelled() => None,
            outcome = condition.evaluate() => Some(outcome),
        };

        match outcome {
            None => return Err(cancelled(attempt, &mut observe)),
            Some(Ok(true)) => {
                debug!(attempt, "poll condition met");
                observe(PollState::Done);
                return Ok(());
            }
            Some(Err(err)) => {
                debug!(attempt, error = %err, "poll condition failed");
                observe(PollState::Failed);
                return Err(err);
            }
            Some(Ok(false)) if attempt >= max_attempts => {
                info!(attempts = attempt, "poll attempt budget exhausted");
                observe(PollState::TimedOut);
                return Err(Error::Timeout { attempts: attempt });
            }
            Some(Ok(false)) => {}
        }

        let delay = policy.delay_after_attempt(attempt);
        debug!(attempt, ?delay, "condition not met, waiting");
        observe(PollState::Waiting);

        let interrupted = tokio::select! {
            biased;
            () = cancel.cancelled() => true,
            () = tokio::time::sleep(delay) => false,
        };
        if interrupted {
            return Err(cancelled(attempt, &mut observe));
        }
    }
}

fn cancelled<O: FnMut(PollState)>(attempt: u32, observe: &mut O) -> Error {
    debug!(attempt, "poll cancelled");
    observe(PollState::Cancelled);
    Error::Cancelled
}
