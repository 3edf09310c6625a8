use std::sync::Arc;

use tracing::debug;

use crate::config::MessagingConfig;
use crate::dispatch::HandlerRegistry;
use crate::error::ConfigurationError;
use crate::publisher::{InProcessPublisher, MessagePublisher, PublisherSet};
use crate::resilience::{PolicyLookup, ResiliencePolicies, ResiliencePolicy, RetryPolicy};

use super::enricher::{CorrelationEnricher, DateOccurredEnricher, HostEnricher, MessageEnricher};
use super::filter::MessageFilter;
use super::service::MessagingService;
use super::stage::Pipeline;

/// Assembles a [`MessagingService`].
///
/// Enrichers, filters and publishers run in the order they are added
/// here. [`handlers`](Self::handlers) installs the in-process publisher at
/// that position among the publishers.
pub struct MessagingServiceBuilder {
    config: MessagingConfig,
    enrichers: Vec<Arc<dyn MessageEnricher>>,
    filters: Vec<Arc<dyn MessageFilter>>,
    publishers: PublisherSet,
    policies: ResiliencePolicies,
    lookup: Option<Arc<dyn PolicyLookup>>,
}

impl MessagingServiceBuilder {
    pub fn new(config: MessagingConfig) -> Self {
        Self {
            config,
            enrichers: Vec::new(),
            filters: Vec::new(),
            publishers: PublisherSet::new(Arc::new(ResiliencePolicies::new())),
            policies: ResiliencePolicies::new(),
            lookup: None,
        }
    }

    /// Adds the correlation, date-occurred and host enrichers.
    pub fn with_default_enrichers(self) -> Self {
        let host = HostEnricher::new(self.config.host_name.clone(), self.config.host_id.clone());
        self.add_enricher(CorrelationEnricher)
            .add_enricher(DateOccurredEnricher)
            .add_enricher(host)
    }

    pub fn add_enricher(mut self, enricher: impl MessageEnricher) -> Self {
        self.enrichers.push(Arc::new(enricher));
        self
    }

    pub fn add_filter(mut self, filter: impl MessageFilter) -> Self {
        self.filters.push(Arc::new(filter));
        self
    }

    /// Delivers messages to the handlers of `registry`, in process.
    pub fn handlers(mut self, registry: HandlerRegistry) -> Self {
        self.publishers.push(InProcessPublisher::new(Arc::new(registry)));
        self
    }

    pub fn add_publisher<P: MessagePublisher>(mut self, publisher: P) -> Self {
        self.publishers.push(publisher);
        self
    }

    /// Adds a publisher the caller keeps a handle to.
    pub fn add_shared_publisher<P: MessagePublisher>(mut self, publisher: Arc<P>) -> Self {
        self.publishers.push_shared(publisher);
        self
    }

    /// Wraps every publisher of type `P` in `policy`.
    pub fn policy<P: MessagePublisher>(mut self, policy: impl ResiliencePolicy) -> Self {
        self.policies.insert::<P>(Arc::new(policy));
        self
    }

    /// Wraps every publisher of type `P` in the configured retry policy.
    pub fn retry<P: MessagePublisher>(self) -> Self {
        let retry = RetryPolicy::from(&self.config.retry);
        self.policy::<P>(retry)
    }

    /// Resolves policies through `lookup` instead of the ones registered
    /// with [`policy`](Self::policy) and [`retry`](Self::retry).
    pub fn policy_lookup(mut self, lookup: impl PolicyLookup + 'static) -> Self {
        self.lookup = Some(Arc::new(lookup));
        self
    }

    /// Fails with [`ConfigurationError::MissingCollaborator`] when no
    /// publisher (and no handler registry) was added.
    pub fn build(self) -> Result<MessagingService, ConfigurationError> {
        if self.publishers.is_empty() {
            return Err(ConfigurationError::MissingCollaborator("publisher"));
        }

        let lookup = self
            .lookup
            .unwrap_or_else(|| Arc::new(self.policies) as Arc<dyn PolicyLookup>);
        let mut publishers = self.publishers;
        publishers.set_policies(lookup);

        debug!(
            enrichers = self.enrichers.len(),
            filters = self.filters.len(),
            publishers = ?publishers.names(),
            "messaging service built"
        );

        Ok(MessagingService::from_parts(
            Pipeline {
                enrichers: self.enrichers,
                filters: self.filters,
                publishers,
            },
            self.config,
        ))
    }
}
