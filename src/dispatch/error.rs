//! Error types for handler dispatch.

use std::any::Any;
use std::error::Error;

use thiserror::Error;

use crate::attributes::AttributeError;

/// Error returned by a message handler (or an enricher / filter).
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum HandlerError {
    /// The handler was invoked with something it cannot accept.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// Payload decode / deserialization failed.
    #[error("decode failed: {0}")]
    DecodeFailed(String),
    /// Business logic rejected the message.
    #[error("rejected: {0}")]
    Rejected(String),
    /// A referenced resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),
    /// Missing or invalid authentication / authorization.
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    /// The message's result slot was already written.
    #[error("result already set on {0}")]
    ResultAlreadySet(&'static str),
    /// The handler observed cancellation and stopped.
    #[error("handler cancelled")]
    Cancelled,
    /// The handler panicked; the payload message is kept.
    #[error("handler panicked: {0}")]
    Panicked(String),
    /// Reading a message attribute failed.
    #[error(transparent)]
    Attribute(#[from] AttributeError),
    /// Any other error.
    #[error(transparent)]
    Other(Box<dyn Error + Send + Sync>),
}

impl HandlerError {
    /// Wraps an arbitrary error.
    pub fn other(err: impl Into<Box<dyn Error + Send + Sync>>) -> Self {
        HandlerError::Other(err.into())
    }

    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            HandlerError::InvalidArgument(_) => "handler_invalid_argument",
            HandlerError::DecodeFailed(_) => "handler_decode_failed",
            HandlerError::Rejected(_) => "handler_rejected",
            HandlerError::NotFound(_) => "handler_not_found",
            HandlerError::Unauthorized(_) => "handler_unauthorized",
            HandlerError::ResultAlreadySet(_) => "handler_result_already_set",
            HandlerError::Cancelled => "handler_cancelled",
            HandlerError::Panicked(_) => "handler_panicked",
            HandlerError::Attribute(_) => "handler_attribute",
            HandlerError::Other(_) => "handler_other",
        }
    }
}

impl From<serde_json::Error> for HandlerError {
    fn from(err: serde_json::Error) -> Self {
        HandlerError::DecodeFailed(err.to_string())
    }
}

impl From<bitcode::Error> for HandlerError {
    fn from(err: bitcode::Error) -> Self {
        HandlerError::DecodeFailed(err.to_string())
    }
}

/// A single fault recorded by the pipeline: which component failed
/// (`origin`) and why (`cause`).
///
/// The origin names a handler (`Consumer::method(Message)`), an enricher,
/// a filter or a publisher.
#[derive(Error, Debug)]
#[error("{origin}: {cause}")]
pub struct DispatchError {
    origin: String,
    #[source]
    cause: Box<dyn Error + Send + Sync>,
}

impl DispatchError {
    pub fn new(origin: impl Into<String>, cause: impl Into<Box<dyn Error + Send + Sync>>) -> Self {
        Self {
            origin: origin.into(),
            cause: cause.into(),
        }
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn cause(&self) -> &(dyn Error + Send + Sync + 'static) {
        self.cause.as_ref()
    }

    /// The cause as a concrete error type, if it is one.
    pub fn downcast_ref<T: Error + 'static>(&self) -> Option<&T> {
        self.cause.downcast_ref::<T>()
    }

    /// Deepest error in the cause's source chain.
    pub fn root_cause(&self) -> &(dyn Error + 'static) {
        let mut current: &(dyn Error + 'static) = self.cause.as_ref();
        while let Some(next) = current.source() {
            current = next;
        }
        current
    }
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
