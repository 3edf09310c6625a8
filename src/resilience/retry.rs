//! Bounded retry with backoff.
//!
//! ```text
//! attempt ──► Ok ───────────────────────────────► done
//!    │
//!    └─► Err ──► transient && retries left? ──no──► return error
//!                     │ yes
//!                     └─► sleep(next delay) ──► attempt
//!                          (cancel aborts attempt or sleep)
//! ```

use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::{select, time};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use super::backoff::BackoffPolicy;
use super::policy::{Attempt, ResiliencePolicy};
use crate::publisher::PublishError;

/// Retries transient publish failures.
///
/// Non-transient failures (see [`PublishError::is_transient`]) and the
/// last failure after `max_retries` are returned as-is.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff: BackoffPolicy,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff: BackoffPolicy::default(),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, backoff: BackoffPolicy) -> Self {
        Self { max_retries, backoff }
    }
}

impl ResiliencePolicy for RetryPolicy {
    fn name(&self) -> &str {
        "retry"
    }

    fn execute<'a>(
        &'a self,
        mut attempt: Attempt<'a>,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<(), PublishError>> {
        async move {
            let mut delays = self.backoff.delays();
            loop {
                let outcome = select! {
                    biased;
                    _ = cancel.cancelled() => return Err(PublishError::Cancelled),
                    outcome = attempt() => outcome,
                };

                let err = match outcome {
                    Ok(()) => return Ok(()),
                    Err(err) if err.is_transient() && delays.retries() < self.max_retries => err,
                    Err(err) => return Err(err),
                };

                let delay = delays.next_delay();
                warn!(
                    retry = delays.retries(),
                    max_retries = self.max_retries,
                    ?delay,
                    error = %err,
                    label = err.as_label(),
                    "transient publish failure, retrying"
                );

                select! {
                    biased;
                    _ = cancel.cancelled() => return Err(PublishError::Cancelled),
                    _ = time::sleep(delay) => {}
                }
            }
        }
        .boxed()
    }
}
