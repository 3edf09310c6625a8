use std::error::Error;
use std::time::Duration;

use thiserror::Error;

use crate::error::{ConfigurationError, PublisherError};

/// Outcome of a single publisher's delivery attempt.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum PublishError {
    /// Connection to the transport failed.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),
    /// The message could not be serialized for the transport.
    #[error("serialization failed: {0}")]
    SerializationFailed(String),
    /// The transport refused the message.
    #[error("message rejected: {0}")]
    Rejected(String),
    /// No acknowledgment within the deadline.
    #[error("publish timed out after {0:?}")]
    Timeout(Duration),
    /// Routing could not pick handlers for the message.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    /// One or more in-process handlers failed.
    #[error(transparent)]
    Handlers(#[from] PublisherError),
    /// The cancellation token fired.
    #[error("publish cancelled")]
    Cancelled,
    /// The publisher panicked; the payload message is kept.
    #[error("publisher panicked: {0}")]
    Panicked(String),
    /// Other error.
    #[error(transparent)]
    Other(Box<dyn Error + Send + Sync>),
}

impl PublishError {
    pub fn other(err: impl Into<Box<dyn Error + Send + Sync>>) -> Self {
        PublishError::Other(err.into())
    }

    /// Whether another attempt could succeed.
    ///
    /// Only transport hiccups (connection loss, timeouts) qualify. Handler
    /// failures, rejections and configuration faults are final.
    pub fn is_transient(&self) -> bool {
        matches!(self, PublishError::ConnectionFailed(_) | PublishError::Timeout(_))
    }

    pub fn as_label(&self) -> &'static str {
        match self {
            PublishError::ConnectionFailed(_) => "publish_connection_failed",
            PublishError::SerializationFailed(_) => "publish_serialization_failed",
            PublishError::Rejected(_) => "publish_rejected",
            PublishError::Timeout(_) => "publish_timeout",
            PublishError::Configuration(_) => "publish_configuration",
            PublishError::Handlers(_) => "publish_handlers",
            PublishError::Cancelled => "publish_cancelled",
            PublishError::Panicked(_) => "publish_panicked",
            PublishError::Other(_) => "publish_other",
        }
    }
}

impl From<bitcode::Error> for PublishError {
    fn from(err: bitcode::Error) -> Self {
        PublishError::SerializationFailed(err.to_string())
    }
}
