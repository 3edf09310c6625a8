use std::time::Duration;

use super::jitter::JitterPolicy;

/// Growth of retry delays.
///
/// The un-jittered delay before retry `n` (0-indexed) is
/// `first × factor^n`, capped at `max`. A retry sequence draws its actual
/// delays from [`delays`](Self::delays), which applies the jitter policy
/// and remembers the previous sleep for decorrelated jitter.
///
/// ```
/// use std::time::Duration;
/// use herald::{BackoffPolicy, JitterPolicy};
///
/// let backoff = BackoffPolicy {
///     first: Duration::from_millis(50),
///     max: Duration::from_secs(1),
///     factor: 3.0,
///     jitter: JitterPolicy::None,
/// };
/// assert_eq!(backoff.base_delay(0), Duration::from_millis(50));
/// assert_eq!(backoff.base_delay(2), Duration::from_millis(450));
/// assert_eq!(backoff.base_delay(5), Duration::from_secs(1));
///
/// let mut delays = backoff.delays();
/// assert_eq!(delays.next_delay(), Duration::from_millis(50));
/// assert_eq!(delays.next_delay(), Duration::from_millis(150));
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BackoffPolicy {
    pub first: Duration,
    pub max: Duration,
    pub factor: f64,
    pub jitter: JitterPolicy,
}

impl Default for BackoffPolicy {
    /// 100ms doubling up to 10s, no jitter.
    fn default() -> Self {
        Self {
            first: Duration::from_millis(100),
            max: Duration::from_secs(10),
            factor: 2.0,
            jitter: JitterPolicy::None,
        }
    }
}

impl BackoffPolicy {
    /// Un-jittered delay before retry number `retry`. Saturates at `max`.
    pub fn base_delay(&self, retry: u32) -> Duration {
        let growth = self.factor.powi(retry.min(i32::MAX as u32) as i32);
        match self.first.as_secs_f64() * growth {
            secs if secs.is_finite() && (0.0..=self.max.as_secs_f64()).contains(&secs) => {
                Duration::from_secs_f64(secs)
            }
            _ => self.max,
        }
    }

    /// Starts a fresh retry sequence.
    pub fn delays(&self) -> RetryDelays<'_> {
        RetryDelays {
            backoff: self,
            retry: 0,
            prev: None,
        }
    }

    fn floor(&self) -> Duration {
        self.first.min(self.max)
    }
}

/// Delays of one retry sequence, in order.
#[derive(Debug)]
pub struct RetryDelays<'a> {
    backoff: &'a BackoffPolicy,
    retry: u32,
    prev: Option<Duration>,
}

impl RetryDelays<'_> {
    /// Delay before the next retry.
    ///
    /// Decorrelated jitter grows from the previous delay drawn here;
    /// the other policies jitter the exponential base.
    pub fn next_delay(&mut self) -> Duration {
        let backoff = self.backoff;
        let delay = match backoff.jitter {
            JitterPolicy::Decorrelated => {
                let floor = backoff.floor();
                JitterPolicy::decorrelated(floor, self.prev.unwrap_or(floor), backoff.max)
            }
            jitter => jitter.apply(backoff.base_delay(self.retry)),
        };
        self.retry = self.retry.saturating_add(1);
        self.prev = Some(delay);
        delay
    }

    /// Retries drawn so far.
    pub fn retries(&self) -> u32 {
        self.retry
    }
}
