//! Pipeline-level errors: configuration faults, per-stage aggregates and
//! the error surfaced by [`MessagingService`](crate::MessagingService).

use std::error::Error;
use std::fmt;

use thiserror::Error;

use crate::dispatch::{DispatchError, DispatcherInfo};
use crate::message::{Archetype, MessageType};
use crate::publisher::PublishError;

/// The pipeline stage a fault was collected in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineStage {
    Enrich,
    PreFilter,
    Publish,
    PostFilter,
    /// In-process handler fan-out.
    Dispatch,
    /// Publishing every event of an event source.
    EventSource,
}

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStage::Enrich => "enrich",
            PipelineStage::PreFilter => "pre_filter",
            PipelineStage::Publish => "publish",
            PipelineStage::PostFilter => "post_filter",
            PipelineStage::Dispatch => "dispatch",
            PipelineStage::EventSource => "event_source",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Wiring mistakes. Never retried.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    /// A command or query resolved to zero or several handlers.
    #[error(
        "{archetype} {message_type} requires exactly one handler, found {}{}",
        .candidates.len(),
        describe_candidates(.candidates)
    )]
    HandlerCardinality {
        message_type: MessageType,
        archetype: Archetype,
        candidates: Vec<DispatcherInfo>,
    },
    /// A collaborator the pipeline needs was never registered.
    #[error("missing collaborator: {0}")]
    MissingCollaborator(&'static str),
    /// A message was published through an API meant for another archetype.
    #[error("{message_type} is a {actual}, expected a {expected}")]
    ArchetypeMismatch {
        message_type: MessageType,
        expected: Archetype,
        actual: Archetype,
    },
}

impl ConfigurationError {
    pub fn as_label(&self) -> &'static str {
        match self {
            ConfigurationError::HandlerCardinality { .. } => "config_handler_cardinality",
            ConfigurationError::MissingCollaborator(_) => "config_missing_collaborator",
            ConfigurationError::ArchetypeMismatch { .. } => "config_archetype_mismatch",
        }
    }
}

fn describe_candidates(candidates: &[DispatcherInfo]) -> String {
    if candidates.is_empty() {
        return String::new();
    }
    let names: Vec<String> = candidates.iter().map(ToString::to_string).collect();
    format!(": [{}]", names.join(", "))
}

/// Every fault collected by one pipeline stage.
///
/// A stage runs all its members concurrently and keeps each failure, so a
/// caller can inspect exactly which enrichers, filters, publishers or
/// handlers failed.
#[derive(Debug)]
pub struct PublisherError {
    stage: PipelineStage,
    message_type: MessageType,
    faults: Vec<DispatchError>,
}

impl PublisherError {
    pub fn new(stage: PipelineStage, message_type: MessageType, faults: Vec<DispatchError>) -> Self {
        Self {
            stage,
            message_type,
            faults,
        }
    }

    pub fn stage(&self) -> PipelineStage {
        self.stage
    }

    pub fn message_type(&self) -> MessageType {
        self.message_type
    }

    /// Faults recorded directly by this stage.
    pub fn faults(&self) -> &[DispatchError] {
        &self.faults
    }

    pub fn into_faults(self) -> Vec<DispatchError> {
        self.faults
    }

    /// Leaf faults of the whole tree.
    ///
    /// Faults whose cause is itself an aggregate (a nested `PublisherError`,
    /// a `PublishError::Handlers` or a `MessagingError::Publisher`) are
    /// replaced by that aggregate's own leaf faults.
    pub fn handler_faults(&self) -> Vec<&DispatchError> {
        let mut leaves = Vec::new();
        for fault in &self.faults {
            match nested_aggregate(fault) {
                Some(inner) => leaves.extend(inner.handler_faults()),
                None => leaves.push(fault),
            }
        }
        leaves
    }

    pub fn as_label(&self) -> &'static str {
        "publisher_aggregate"
    }
}

fn nested_aggregate(fault: &DispatchError) -> Option<&PublisherError> {
    if let Some(inner) = fault.downcast_ref::<PublisherError>() {
        return Some(inner);
    }
    if let Some(PublishError::Handlers(inner)) = fault.downcast_ref::<PublishError>() {
        return Some(inner);
    }
    if let Some(MessagingError::Publisher(inner)) = fault.downcast_ref::<MessagingError>() {
        return Some(inner);
    }
    None
}

impl fmt::Display for PublisherError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} stage failed for {} with {} fault(s)",
            self.stage,
            self.message_type,
            self.faults.len()
        )?;
        for fault in &self.faults {
            write!(f, "; {}", fault)?;
        }
        Ok(())
    }
}

impl Error for PublisherError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.faults.first().map(|fault| fault as &(dyn Error + 'static))
    }
}

/// Error returned by the publish API.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum MessagingError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error(transparent)]
    Publisher(#[from] PublisherError),
    /// The cancellation token fired before the pipeline finished.
    #[error("publish cancelled")]
    Cancelled,
    /// Handlers ran but nothing was written onto the result slot.
    #[error("{0} completed without a result")]
    NoResult(MessageType),
}

impl MessagingError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, MessagingError::Cancelled)
    }

    /// The stage aggregate, if this is a stage failure.
    pub fn publisher_error(&self) -> Option<&PublisherError> {
        match self {
            MessagingError::Publisher(inner) => Some(inner),
            _ => None,
        }
    }

    pub fn as_label(&self) -> &'static str {
        match self {
            MessagingError::Configuration(inner) => inner.as_label(),
            MessagingError::Publisher(inner) => inner.as_label(),
            MessagingError::Cancelled => "messaging_cancelled",
            MessagingError::NoResult(_) => "messaging_no_result",
        }
    }
}
