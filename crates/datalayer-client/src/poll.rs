//! Polling with a growing delay
//!
//! Used where the platform completes an operation asynchronously and the
//! client has to wait for a resource to reach some state (for example a
//! deleted snapshot disappearing).

use std::{future::Future, time::Duration};

use tokio::time::Instant;
use tracing::debug;

use crate::error::{ClientError, Result};

/// Delay schedule and deadline for a poll loop
#[derive(Clone, Debug)]
pub struct PollPolicy {
    /// Delay before the first probe
    pub initial_delay: Duration,
    /// Growth factor applied to the delay after each probe
    pub factor: f64,
    /// Upper bound for a single delay
    pub max_delay: Duration,
    /// Give up once this much time has elapsed
    pub timeout: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(500),
            factor: 1.5,
            max_delay: Duration::from_secs(10),
            timeout: Duration::from_secs(300),
        }
    }
}

impl PollPolicy {
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    pub fn with_factor(mut self, factor: f64) -> Self {
        self.factor = factor;
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Endless sequence of delays: `initial_delay`, then multiplied by
    /// `factor` each step, capped at `max_delay`.
    pub fn delays(&self) -> impl Iterator<Item = Duration> + use<> {
        let factor = if self.factor.is_finite() && self.factor >= 1.0 {
            self.factor
        } else {
            1.0
        };
        let max_delay = self.max_delay;
        std::iter::successors(Some(self.initial_delay.min(max_delay)), move |d| {
            let next = d.as_secs_f64() * factor;
            Some(
                Duration::try_from_secs_f64(next)
                    .unwrap_or(max_delay)
                    .min(max_delay),
            )
        })
    }
}

/// Call `probe` after each delay of `policy` until it yields `Some`.
///
/// The last delay is shortened so that one probe lands on the deadline;
/// only when that probe still yields `None` does the loop give up. Errors
/// from `probe` end the loop immediately. Exceeding the policy's timeout
/// yields [`ClientError::Timeout`] naming `what`.
pub async fn poll_until<T, F, Fut>(policy: &PollPolicy, what: &str, mut probe: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>>>,
{
    // A timeout too large to represent means waiting without a deadline
    let deadline = Instant::now().checked_add(policy.timeout);

    for (attempt, delay) in policy.delays().enumerate() {
        let delay = match deadline {
            Some(deadline) => delay.min(deadline.saturating_duration_since(Instant::now())),
            None => delay,
        };
        tokio::time::sleep(delay).await;

        if let Some(value) = probe().await? {
            debug!("{} done after {} probes", what, attempt + 1);
            return Ok(value);
        }

        if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            break;
        }
    }

    Err(ClientError::Timeout(format!(
        "{} did not complete within {:?}",
        what, policy.timeout
    )))
}
