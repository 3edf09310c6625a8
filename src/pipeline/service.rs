//! The publish API.
//!
//! Events, commands and queries all go through the same pipeline
//! (enrich → pre-filter → publish → post-filter); they differ in handler
//! cardinality and in whether a result is read back.
//!
//! ## Example
//!
//! ```ignore
//! let service = MessagingService::builder(MessagingConfig::default())
//!     .with_default_enrichers()
//!     .handlers(registry)
//!     .build()?;
//!
//! let cancel = CancellationToken::new();
//! service.publish_event(OrderPlaced::new(42), &cancel).await?;
//! let total = service.execute_query(OrderTotal::new(42), &cancel).await?;
//! ```

use std::sync::Arc;

use futures::future::join_all;
use tokio_util::sync::CancellationToken;
use tracing::{debug_span, Instrument};

use crate::config::MessagingConfig;
use crate::dispatch::DispatchError;
use crate::error::{ConfigurationError, MessagingError, PipelineStage, PublisherError};
use crate::message::{Archetype, Command, Event, EventSource, MessageRef, MessageType, Query, Returns};
use crate::publisher::IntegrationTypes;

use super::builder::MessagingServiceBuilder;
use super::stage::{Pipeline, PipelineRun};

/// Publishes messages through the configured pipeline.
///
/// Cheap to clone; clones share the same pipeline.
#[derive(Clone)]
pub struct MessagingService {
    pipeline: Arc<Pipeline>,
    config: Arc<MessagingConfig>,
}

impl MessagingService {
    pub fn builder(config: MessagingConfig) -> MessagingServiceBuilder {
        MessagingServiceBuilder::new(config)
    }

    pub(crate) fn from_parts(pipeline: Pipeline, config: MessagingConfig) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &MessagingConfig {
        &self.config
    }

    /// Publisher names, in the order they are invoked.
    pub fn publisher_names(&self) -> Vec<&str> {
        self.pipeline.publishers.names()
    }

    // =========================================================================
    // Events
    // =========================================================================

    /// Publishes an event to the configured default scope.
    pub async fn publish_event<E: Event>(
        &self,
        event: impl Into<Arc<E>>,
        cancel: &CancellationToken,
    ) -> Result<(), MessagingError> {
        self.publish_event_scoped(event, self.config.default_scope, cancel).await
    }

    /// Publishes an event to the publishers in `scope`.
    pub async fn publish_event_scoped<E: Event>(
        &self,
        event: impl Into<Arc<E>>,
        scope: IntegrationTypes,
        cancel: &CancellationToken,
    ) -> Result<(), MessagingError> {
        let event: Arc<E> = event.into();
        self.publish_message(event, scope, cancel).await
    }

    /// Publishes every pending event of `source`.
    ///
    /// Events are published concurrently and one failing event never stops
    /// the others. Failures come back together as one
    /// [`PublisherError`] (stage `EventSource`) with a fault per failed event.
    pub async fn publish_event_source(
        &self,
        source: &dyn EventSource,
        cancel: &CancellationToken,
    ) -> Result<(), MessagingError> {
        self.publish_event_source_scoped(source, self.config.default_scope, cancel)
            .await
    }

    pub async fn publish_event_source_scoped(
        &self,
        source: &dyn EventSource,
        scope: IntegrationTypes,
        cancel: &CancellationToken,
    ) -> Result<(), MessagingError> {
        let events = source.domain_events();
        if let Some(stray) = events.iter().find(|e| e.archetype() != Archetype::Event) {
            return Err(ConfigurationError::ArchetypeMismatch {
                message_type: stray.message_type(),
                expected: Archetype::Event,
                actual: stray.archetype(),
            }
            .into());
        }
        let Some(first) = events.first() else {
            return Ok(());
        };
        let source_type = first.message_type();

        let outcomes = join_all(
            events
                .iter()
                .map(|event| self.publish_message(Arc::clone(event), scope, cancel)),
        )
        .await;

        let mut faults = Vec::new();
        for (index, (event, outcome)) in events.iter().zip(outcomes).enumerate() {
            match outcome {
                Ok(()) => {}
                Err(MessagingError::Cancelled) => return Err(MessagingError::Cancelled),
                Err(err) => faults.push(DispatchError::new(
                    format!("{}#{}", event.message_type(), index),
                    err,
                )),
            }
        }

        if faults.is_empty() {
            Ok(())
        } else {
            Err(PublisherError::new(PipelineStage::EventSource, source_type, faults).into())
        }
    }

    // =========================================================================
    // Commands
    // =========================================================================

    /// Sends a command to its single handler.
    pub async fn send_command<C: Command>(
        &self,
        command: impl Into<Arc<C>>,
        cancel: &CancellationToken,
    ) -> Result<(), MessagingError> {
        self.send_command_scoped(command, self.config.default_scope, cancel)
            .await
    }

    pub async fn send_command_scoped<C: Command>(
        &self,
        command: impl Into<Arc<C>>,
        scope: IntegrationTypes,
        cancel: &CancellationToken,
    ) -> Result<(), MessagingError> {
        let command: Arc<C> = command.into();
        self.publish_message(command, scope, cancel).await
    }

    /// Sends a command and returns the value its handler replied with.
    pub async fn send<C: Command + Returns>(
        &self,
        command: impl Into<Arc<C>>,
        cancel: &CancellationToken,
    ) -> Result<C::Output, MessagingError> {
        self.send_scoped(command, self.config.default_scope, cancel).await
    }

    pub async fn send_scoped<C: Command + Returns>(
        &self,
        command: impl Into<Arc<C>>,
        scope: IntegrationTypes,
        cancel: &CancellationToken,
    ) -> Result<C::Output, MessagingError> {
        let command: Arc<C> = command.into();
        self.publish_message(command.clone(), scope, cancel).await?;
        read_result(command.as_ref())
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Runs a query against its single handler and returns the answer.
    pub async fn execute_query<Q: Query>(
        &self,
        query: impl Into<Arc<Q>>,
        cancel: &CancellationToken,
    ) -> Result<Q::Output, MessagingError> {
        let query: Arc<Q> = query.into();
        self.publish_message(query.clone(), IntegrationTypes::All, cancel)
            .await?;
        read_result(query.as_ref())
    }

    /// Runs an already type-erased message through the pipeline.
    pub async fn publish_message(
        &self,
        message: MessageRef,
        scope: IntegrationTypes,
        cancel: &CancellationToken,
    ) -> Result<(), MessagingError> {
        let span = debug_span!(
            "publish",
            message_type = %message.message_type(),
            archetype = %message.archetype(),
            %scope,
        );
        PipelineRun::new(&self.pipeline, message, scope, cancel)
            .execute()
            .instrument(span)
            .await
    }
}

fn read_result<M: Returns>(message: &M) -> Result<M::Output, MessagingError> {
    message
        .result()
        .get()
        .cloned()
        .ok_or_else(|| MessagingError::NoResult(MessageType::of::<M>()))
}

impl std::fmt::Debug for MessagingService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessagingService")
            .field("enrichers", &self.pipeline.enrichers.len())
            .field("filters", &self.pipeline.filters.len())
            .field("publishers", &self.pipeline.publishers)
            .field("config", &self.config)
            .finish()
    }
}
