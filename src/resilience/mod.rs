//! Resilience policies applied around publisher calls.
//!
//! A [`PolicyLookup`] maps a publisher's concrete type to an optional
//! [`ResiliencePolicy`]. Publishers without one are called directly.

mod backoff;
mod jitter;
mod policy;
mod retry;

pub use backoff::{BackoffPolicy, RetryDelays};
pub use jitter::JitterPolicy;
pub use policy::{Attempt, PolicyLookup, ResiliencePolicies, ResiliencePolicy};
pub use retry::RetryPolicy;
