//! Randomization of retry delays.
//!
//! Publishers that fail together (a broker restart, say) would otherwise
//! retry in lockstep. Jitter spreads them out.

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// How a computed backoff delay is randomized.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JitterPolicy {
    /// Use the delay as computed.
    #[default]
    None,
    /// Uniform in `[0, delay]`.
    Full,
    /// Half the delay, plus uniform in `[0, delay / 2]`.
    Equal,
    /// Uniform in `[first, min(previous × 3, max)]`, ignoring the exponential base.
    Decorrelated,
}

impl JitterPolicy {
    /// Randomizes an exponential `delay`.
    ///
    /// `Decorrelated` depends on the previous sleep rather than the base,
    /// so it leaves `delay` as is; [`RetryDelays`](super::RetryDelays)
    /// handles it.
    pub fn apply(self, delay: Duration) -> Duration {
        match self {
            JitterPolicy::None | JitterPolicy::Decorrelated => delay,
            JitterPolicy::Full => delay.mul_f64(rand::rng().random::<f64>()),
            JitterPolicy::Equal => {
                let half = delay / 2;
                half + half.mul_f64(rand::rng().random::<f64>())
            }
        }
    }

    /// A delay between `floor` and three times `prev`, never above `cap`.
    pub(crate) fn decorrelated(floor: Duration, prev: Duration, cap: Duration) -> Duration {
        let upper = prev.saturating_mul(3).min(cap);
        if upper <= floor {
            return floor;
        }
        rand::rng().random_range(floor..=upper)
    }
}
