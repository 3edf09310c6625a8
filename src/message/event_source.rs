use std::fmt;
use std::sync::Arc;

use super::message::{Event, MessageRef};

/// An entity that accumulates domain events to be published together.
pub trait EventSource: Send + Sync {
    /// Events waiting to be published, in the order they were recorded.
    fn domain_events(&self) -> Vec<MessageRef>;
}

/// Event recorder for entities.
///
/// Embed it in an aggregate, record events as state changes, and hand the
/// aggregate to `MessagingService::publish_event_source`. Events recorded
/// since the last [`mark_published`](Self::mark_published) are pending.
///
/// ```
/// use herald::{Attributes, DomainEvents, EventSource, Message};
///
/// #[derive(Message, Default)]
/// #[message(event)]
/// struct Renamed {
///     attributes: Attributes,
///     name: String,
/// }
///
/// let mut events = DomainEvents::new();
/// events.record(Renamed { name: "a".into(), ..Default::default() });
/// assert_eq!(events.domain_events().len(), 1);
///
/// events.mark_published();
/// assert!(events.domain_events().is_empty());
/// ```
#[derive(Default, Clone)]
pub struct DomainEvents {
    events: Vec<MessageRef>,
    published: usize,
}

impl DomainEvents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record<E: Event>(&mut self, event: E) {
        self.events.push(Arc::new(event));
    }

    pub fn record_shared<E: Event>(&mut self, event: Arc<E>) {
        self.events.push(event);
    }

    /// All recorded events, published or not.
    pub fn events(&self) -> &[MessageRef] {
        &self.events
    }

    /// Events recorded since the last publish.
    pub fn pending(&self) -> &[MessageRef] {
        &self.events[self.published..]
    }

    pub fn mark_published(&mut self) {
        self.published = self.events.len();
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl EventSource for DomainEvents {
    fn domain_events(&self) -> Vec<MessageRef> {
        self.pending().to_vec()
    }
}

impl fmt::Debug for DomainEvents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DomainEvents")
            .field("events", &self.events)
            .field("published", &self.published)
            .finish()
    }
}
