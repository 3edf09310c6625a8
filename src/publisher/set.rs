use std::any::TypeId;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::future::join_all;
use futures::FutureExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::dispatch::panic_message;
use crate::message::MessageRef;
use crate::resilience::PolicyLookup;

use super::error::PublishError;
use super::publisher::MessagePublisher;
use super::scope::IntegrationTypes;

struct Entry {
    type_id: TypeId,
    publisher: Arc<dyn MessagePublisher>,
}

/// A failed delivery: which publisher, and why.
#[derive(Debug)]
pub struct PublishFailure {
    pub publisher: String,
    pub error: PublishError,
}

/// Publishers in registration order, each call wrapped by its resilience
/// policy when one is registered for the publisher's concrete type.
#[derive(Clone)]
pub struct PublisherSet {
    entries: Vec<Arc<Entry>>,
    policies: Arc<dyn PolicyLookup>,
}

impl PublisherSet {
    pub fn new(policies: Arc<dyn PolicyLookup>) -> Self {
        Self {
            entries: Vec::new(),
            policies,
        }
    }

    pub fn set_policies(&mut self, policies: Arc<dyn PolicyLookup>) {
        self.policies = policies;
    }

    pub fn push<P: MessagePublisher>(&mut self, publisher: P) {
        self.push_shared(Arc::new(publisher));
    }

    pub fn push_shared<P: MessagePublisher>(&mut self, publisher: Arc<P>) {
        self.entries.push(Arc::new(Entry {
            type_id: TypeId::of::<P>(),
            publisher,
        }));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Publisher names in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.publisher.name()).collect()
    }

    /// Publishers taking part in a publish scoped to `scope`.
    pub fn select(&self, scope: IntegrationTypes) -> impl Iterator<Item = &Arc<dyn MessagePublisher>> {
        self.entries
            .iter()
            .filter(move |e| scope.includes(e.publisher.integration_type()))
            .map(|e| &e.publisher)
    }

    /// Delivers `message` to every publisher in `scope` concurrently and
    /// returns the failures, in registration order.
    pub async fn publish(
        &self,
        message: &MessageRef,
        scope: IntegrationTypes,
        cancel: &CancellationToken,
    ) -> Vec<PublishFailure> {
        let selected: Vec<&Entry> = self
            .entries
            .iter()
            .filter(|e| scope.includes(e.publisher.integration_type()))
            .map(|e| e.as_ref())
            .collect();

        debug!(
            message_type = %message.message_type(),
            %scope,
            publishers = selected.len(),
            "publishing"
        );

        let outcomes = join_all(selected.iter().map(|entry| self.deliver(entry, message, cancel))).await;

        selected
            .iter()
            .zip(outcomes)
            .filter_map(|(entry, outcome)| {
                outcome.err().map(|error| {
                    let publisher = entry.publisher.name().to_string();
                    warn!(%publisher, %error, label = error.as_label(), "publisher failed");
                    PublishFailure { publisher, error }
                })
            })
            .collect()
    }

    /// One publisher's delivery under its policy. A panic anywhere inside
    /// becomes [`PublishError::Panicked`].
    async fn deliver(
        &self,
        entry: &Entry,
        message: &MessageRef,
        cancel: &CancellationToken,
    ) -> Result<(), PublishError> {
        let delivery = async {
            match self.policies.policy_for(entry.type_id) {
                Some(policy) => {
                    let publisher = &entry.publisher;
                    policy
                        .execute(Box::new(move || publisher.publish(message, cancel)), cancel)
                        .await
                }
                None => entry.publisher.publish(message, cancel).await,
            }
        };

        AssertUnwindSafe(delivery)
            .catch_unwind()
            .await
            .unwrap_or_else(|payload| Err(PublishError::Panicked(panic_message(payload))))
    }
}

impl fmt::Debug for PublisherSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PublisherSet")
            .field("publishers", &self.names())
            .finish()
    }
}
