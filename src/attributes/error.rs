//! Error types for message attribute access.

use thiserror::Error;

/// Error raised when reading a typed attribute.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AttributeError {
    /// No value is stored under the name.
    #[error("attribute `{name}` not found")]
    NotFound {
        /// Attribute name that was requested.
        name: String,
    },

    /// The stored string could not be parsed as the requested type.
    #[error("attribute `{name}` has invalid value `{raw}`: {reason}")]
    Format {
        /// Attribute name that was requested.
        name: String,
        /// Raw stored value.
        raw: String,
        /// Parser message.
        reason: String,
    },
}

impl AttributeError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            AttributeError::NotFound { .. } => "attribute_not_found",
            AttributeError::Format { .. } => "attribute_format",
        }
    }
}
