use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::trace;
use uuid::Uuid;

use super::{Envelope, InMemoryQueue};
use crate::message::{Message, MessageRef, MessageType};
use crate::publisher::{IntegrationTypes, MessagePublisher, PublishError};

type Encoder = Arc<dyn Fn(&dyn Any) -> Result<Vec<u8>, PublishError> + Send + Sync>;

struct Route {
    queue: String,
    encode: Encoder,
}

/// External publisher that writes routed message types to named queues.
///
/// Payloads are bitcode-encoded; the attribute bag travels as envelope
/// headers. Message types without a route are skipped.
///
/// ```ignore
/// let outbound = QueuePublisher::new(queue.clone())
///     .route::<OrderPlaced>("orders")
///     .route::<OrderShipped>("shipping");
/// ```
pub struct QueuePublisher {
    name: String,
    queue: InMemoryQueue,
    routes: HashMap<TypeId, Route>,
}

impl QueuePublisher {
    pub fn new(queue: InMemoryQueue) -> Self {
        Self {
            name: "queue".to_string(),
            queue,
            routes: HashMap::new(),
        }
    }

    /// Name used as the origin of this publisher's faults.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Send messages of type `M` to `queue`.
    pub fn route<M: Message + Serialize>(mut self, queue: impl Into<String>) -> Self {
        let encode: Encoder = Arc::new(|message: &dyn Any| -> Result<Vec<u8>, PublishError> {
            let message = message.downcast_ref::<M>().ok_or_else(|| {
                PublishError::SerializationFailed(format!("expected {}", MessageType::of::<M>()))
            })?;
            Ok(bitcode::serialize(message)?)
        });
        self.routes.insert(
            TypeId::of::<M>(),
            Route {
                queue: queue.into(),
                encode,
            },
        );
        self
    }

    pub fn queue(&self) -> &InMemoryQueue {
        &self.queue
    }
}

#[async_trait]
impl MessagePublisher for QueuePublisher {
    fn name(&self) -> &str {
        &self.name
    }

    fn integration_type(&self) -> IntegrationTypes {
        IntegrationTypes::External
    }

    async fn publish(&self, message: &MessageRef, cancel: &CancellationToken) -> Result<(), PublishError> {
        let message_type = message.message_type();
        let Some(route) = self.routes.get(&message_type.id()) else {
            trace!(%message_type, publisher = %self.name, "no route, skipping");
            return Ok(());
        };
        if cancel.is_cancelled() {
            return Err(PublishError::Cancelled);
        }

        let payload = (route.encode)(message.as_any())?;
        let attrs = message.attributes();
        let id = attrs.message_id().unwrap_or_else(|| Uuid::new_v4().to_string());

        let mut envelope = Envelope::new(id, message_type.short_name(), payload);
        envelope.attributes = attrs.to_map();

        trace!(%message_type, queue = %route.queue, id = %envelope.id, "sending envelope");
        self.queue.send(&route.queue, envelope)
    }
}
