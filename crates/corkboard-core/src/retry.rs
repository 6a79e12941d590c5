//! Bounded retry with exponential backoff for the apply pass.
//!
//! The original failure mode this replaces is an unbounded
//! rescue-and-retry loop. Here the policy is explicit: a fixed attempt
//! budget, `2^attempt` seconds of backoff between attempts (capped), and a
//! typed outcome — callers always learn whether the work succeeded, failed
//! permanently, or exhausted its budget.

use std::time::Duration;

/// Default attempt budget for one apply.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Backoff cap so a deep retry never sleeps unreasonably long.
pub const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Attempt budget and backoff curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    /// Backoff unit; attempt `n` (1-based) sleeps `base * 2^n`, capped.
    pub base: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Policy that never sleeps, for tests.
    #[must_use]
    pub const fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base: Duration::ZERO,
        }
    }

    /// Backoff before re-running attempt `attempt + 1`. `attempt` is the
    /// 1-based number of the attempt that just failed.
    #[must_use]
    pub fn backoff_after(&self, attempt: u32) -> Duration {
        let shift = attempt.min(10);
        let factor = 1_u32 << shift;
        let delay = self.base.saturating_mul(factor);
        delay.min(MAX_BACKOFF)
    }
}

/// Why a retried operation gave up.
#[derive(Debug)]
pub enum RetryOutcome<E> {
    /// A non-transient error; retrying cannot help.
    Fatal(E),
    /// The attempt budget ran out; carries the last transient error.
    Exhausted { attempts: u32, last: E },
}

/// Run `op` under `policy`, sleeping through `sleep` between transient
/// failures. `is_transient` decides which errors are worth another
/// attempt; everything else fails fast.
///
/// No locks or resources may be held across the sleep — each attempt must
/// acquire what it needs from scratch.
///
/// # Errors
///
/// Returns [`RetryOutcome::Fatal`] on the first non-transient error and
/// [`RetryOutcome::Exhausted`] when the budget runs out.
pub fn run_with_retry<T, E: std::fmt::Debug>(
    policy: RetryPolicy,
    mut op: impl FnMut(u32) -> Result<T, E>,
    is_transient: impl Fn(&E) -> bool,
    sleep: impl Fn(Duration),
) -> Result<T, RetryOutcome<E>> {
    let budget = policy.max_attempts.max(1);

    for attempt in 1..=budget {
        match op(attempt) {
            Ok(value) => return Ok(value),
            Err(err) if !is_transient(&err) => return Err(RetryOutcome::Fatal(err)),
            Err(err) => {
                if attempt == budget {
                    return Err(RetryOutcome::Exhausted {
                        attempts: budget,
                        last: err,
                    });
                }
                let delay = policy.backoff_after(attempt);
                tracing::warn!(
                    attempt,
                    budget,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    error = ?err,
                    "transient apply failure, backing off"
                );
                sleep(delay);
            }
        }
    }

    unreachable!("budget is at least one attempt")
}
