//! Per-publish pipeline run.
//!
//! ```text
//! PipelineRun::execute
//!   ├─► enrich       (all enrichers, concurrent) ──fail──► PublisherError(Enrich)
//!   ├─► pre-filter   (pre filters, concurrent)   ──fail──► PublisherError(PreFilter)
//!   ├─► publish      (publishers in scope, concurrent, each under its policy)
//!   │      ├─ ConfigurationError ─► returned as-is
//!   │      └─ other failures ─────► PublisherError(Publish)
//!   └─► post-filter  (post filters, concurrent)  ──fail──► PublisherError(PostFilter)
//! ```
//!
//! Stages run one after another; members of a stage run together and the
//! stage waits for all of them. The cancellation token is checked before
//! each stage and raced against the stage while it runs.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::future::join_all;
use futures::FutureExt;
use tokio::select;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::dispatch::{panic_message, DispatchError, HandlerError};
use crate::error::{MessagingError, PipelineStage, PublisherError};
use crate::message::MessageRef;
use crate::publisher::{IntegrationTypes, PublishError, PublishFailure, PublisherSet};

use super::enricher::MessageEnricher;
use super::filter::MessageFilter;

/// Collaborators resolved once when the service is built.
pub(crate) struct Pipeline {
    pub(crate) enrichers: Vec<Arc<dyn MessageEnricher>>,
    pub(crate) filters: Vec<Arc<dyn MessageFilter>>,
    pub(crate) publishers: PublisherSet,
}

/// One message going through the pipeline. Lives for one publish call.
pub(crate) struct PipelineRun<'a> {
    pipeline: &'a Pipeline,
    message: MessageRef,
    scope: IntegrationTypes,
    cancel: &'a CancellationToken,
}

impl<'a> PipelineRun<'a> {
    pub(crate) fn new(
        pipeline: &'a Pipeline,
        message: MessageRef,
        scope: IntegrationTypes,
        cancel: &'a CancellationToken,
    ) -> Self {
        Self {
            pipeline,
            message,
            scope,
            cancel,
        }
    }

    pub(crate) async fn execute(self) -> Result<(), MessagingError> {
        self.guard(self.enrich()).await?;
        self.guard(self.pre_filter()).await?;
        self.guard(self.publish()).await?;
        self.guard(self.post_filter()).await
    }

    /// Runs a stage unless cancelled, and abandons it if cancelled midway.
    async fn guard(
        &self,
        stage: impl Future<Output = Result<(), MessagingError>>,
    ) -> Result<(), MessagingError> {
        if self.cancel.is_cancelled() {
            return Err(MessagingError::Cancelled);
        }
        select! {
            biased;
            _ = self.cancel.cancelled() => Err(MessagingError::Cancelled),
            outcome = stage => outcome,
        }
    }

    async fn enrich(&self) -> Result<(), MessagingError> {
        let message = self.message.as_ref();
        let outcomes = join_all(
            self.pipeline
                .enrichers
                .iter()
                .map(|e| contained(e.name(), e.enrich(message))),
        )
        .await;
        self.aggregate(PipelineStage::Enrich, outcomes)
    }

    async fn pre_filter(&self) -> Result<(), MessagingError> {
        let message = self.message.as_ref();
        let outcomes = join_all(
            self.pipeline
                .filters
                .iter()
                .filter(|f| f.stages().pre)
                .map(|f| contained(f.name(), f.on_pre_publish(message))),
        )
        .await;
        self.aggregate(PipelineStage::PreFilter, outcomes)
    }

    async fn post_filter(&self) -> Result<(), MessagingError> {
        let message = self.message.as_ref();
        let outcomes = join_all(
            self.pipeline
                .filters
                .iter()
                .filter(|f| f.stages().post)
                .map(|f| contained(f.name(), f.on_post_publish(message))),
        )
        .await;
        self.aggregate(PipelineStage::PostFilter, outcomes)
    }

    async fn publish(&self) -> Result<(), MessagingError> {
        let failures = self
            .pipeline
            .publishers
            .publish(&self.message, self.scope, self.cancel)
            .await;
        if failures.is_empty() {
            return Ok(());
        }

        let mut faults = Vec::new();
        for PublishFailure { publisher, error } in failures {
            match error {
                PublishError::Configuration(err) => return Err(err.into()),
                PublishError::Cancelled => return Err(MessagingError::Cancelled),
                // handler faults already name their handlers
                PublishError::Handlers(handlers) => faults.extend(handlers.into_faults()),
                other => faults.push(DispatchError::new(publisher, other)),
            }
        }
        Err(PublisherError::new(PipelineStage::Publish, self.message.message_type(), faults).into())
    }

    fn aggregate(
        &self,
        stage: PipelineStage,
        outcomes: Vec<Result<(), DispatchError>>,
    ) -> Result<(), MessagingError> {
        let faults: Vec<_> = outcomes.into_iter().filter_map(Result::err).collect();
        debug!(%stage, message_type = %self.message.message_type(), failed = faults.len(), "stage complete");
        if faults.is_empty() {
            Ok(())
        } else {
            Err(PublisherError::new(stage, self.message.message_type(), faults).into())
        }
    }
}

/// Awaits one stage member, turning its error or panic into a fault named `origin`.
async fn contained(
    origin: &str,
    member: impl Future<Output = Result<(), HandlerError>>,
) -> Result<(), DispatchError> {
    let outcome = AssertUnwindSafe(member)
        .catch_unwind()
        .await
        .unwrap_or_else(|payload| Err(HandlerError::Panicked(panic_message(payload))));

    outcome.map_err(|err| {
        warn!(%origin, error = %err, label = err.as_label(), "pipeline member failed");
        DispatchError::new(origin, err)
    })
}
