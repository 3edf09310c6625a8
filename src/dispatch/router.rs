use std::sync::Arc;

use tracing::debug;

use crate::error::ConfigurationError;
use crate::message::MessageRef;

use super::dispatcher::MessageDispatcher;
use super::registry::HandlerRegistry;

/// Resolves which dispatchers handle a message.
#[derive(Clone, Debug)]
pub struct MessageRouter {
    registry: Arc<HandlerRegistry>,
}

impl MessageRouter {
    pub fn new(registry: Arc<HandlerRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    /// Every dispatcher that applies to `message`, in registration order.
    pub fn resolve(&self, message: &MessageRef) -> Vec<&MessageDispatcher> {
        self.registry
            .dispatchers()
            .iter()
            .filter(|d| d.applies_to(message))
            .collect()
    }

    /// [`resolve`](Self::resolve), then enforce the message's handler cardinality.
    ///
    /// Commands and queries need exactly one dispatcher. Anything else is a
    /// [`ConfigurationError::HandlerCardinality`] listing all candidates.
    pub fn route(&self, message: &MessageRef) -> Result<Vec<&MessageDispatcher>, ConfigurationError> {
        let dispatchers = self.resolve(message);
        let archetype = message.archetype();

        debug!(
            message_type = %message.message_type(),
            archetype = %archetype,
            handlers = dispatchers.len(),
            "resolved handlers"
        );

        if archetype.requires_single_handler() && dispatchers.len() != 1 {
            return Err(ConfigurationError::HandlerCardinality {
                message_type: message.message_type(),
                archetype,
                candidates: dispatchers.iter().map(|d| d.info()).collect(),
            });
        }
        Ok(dispatchers)
    }
}
