use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::dispatch::{DispatchError, HandlerError, HandlerRegistry, MessageDispatcher, MessageRouter};
use crate::error::{PipelineStage, PublisherError};
use crate::message::MessageRef;

use super::error::PublishError;
use super::publisher::MessagePublisher;
use super::scope::IntegrationTypes;

/// Delivers messages to the in-process handlers of a [`HandlerRegistry`].
///
/// Resolves the applicable dispatchers, enforces command/query
/// cardinality and runs every handler concurrently. Failed handlers are
/// collected into one [`PublisherError`] with a fault per handler.
///
/// Async handlers run on their own tasks. If the caller stops waiting
/// (cancellation), handlers that do not take the token still run to
/// completion; cancellable ones stop when they observe the token.
#[derive(Clone, Debug)]
pub struct InProcessPublisher {
    router: MessageRouter,
}

impl InProcessPublisher {
    pub fn new(registry: Arc<HandlerRegistry>) -> Self {
        Self {
            router: MessageRouter::new(registry),
        }
    }

    pub fn router(&self) -> &MessageRouter {
        &self.router
    }
}

#[async_trait]
impl MessagePublisher for InProcessPublisher {
    fn name(&self) -> &str {
        "in-process"
    }

    fn integration_type(&self) -> IntegrationTypes {
        IntegrationTypes::Internal
    }

    async fn publish(&self, message: &MessageRef, cancel: &CancellationToken) -> Result<(), PublishError> {
        let dispatchers = self.router.route(message)?;
        if dispatchers.is_empty() {
            return Ok(());
        }
        if cancel.is_cancelled() {
            return Err(PublishError::Cancelled);
        }

        let outcomes = join_all(dispatchers.iter().map(|d| run(d, message, cancel))).await;
        let faults: Vec<_> = outcomes.into_iter().filter_map(Result::err).collect();

        debug!(
            message_type = %message.message_type(),
            handlers = dispatchers.len(),
            failed = faults.len(),
            "in-process dispatch complete"
        );

        if faults.is_empty() {
            Ok(())
        } else {
            Err(PublisherError::new(PipelineStage::Dispatch, message.message_type(), faults).into())
        }
    }
}

/// Runs one dispatcher. Async handlers are detached onto a task so that
/// dropping the publish future does not abort them.
async fn run(
    dispatcher: &MessageDispatcher,
    message: &MessageRef,
    cancel: &CancellationToken,
) -> Result<(), DispatchError> {
    if !dispatcher.is_async() {
        return dispatcher.dispatch(message, cancel).await;
    }

    let task = {
        let dispatcher = dispatcher.clone();
        let message = Arc::clone(message);
        let cancel = cancel.clone();
        tokio::spawn(async move { dispatcher.dispatch(&message, &cancel).await })
    };

    match task.await {
        Ok(outcome) => outcome,
        Err(join) => {
            let err = if join.is_cancelled() {
                HandlerError::Cancelled
            } else {
                HandlerError::Panicked(join.to_string())
            };
            warn!(handler = %dispatcher, error = %err, "handler task did not complete");
            Err(DispatchError::new(dispatcher.to_string(), err))
        }
    }
}
