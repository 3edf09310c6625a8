use std::fmt;

use serde::{Deserialize, Serialize};

/// Where a publisher delivers, and which publishers a publish call targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegrationTypes {
    /// In-process handlers.
    Internal,
    /// Out-of-process transports (brokers, queues).
    External,
    /// Every publisher.
    #[default]
    All,
}

impl IntegrationTypes {
    /// Whether a publisher declaring `declared` takes part in a publish
    /// call scoped to `self`.
    pub fn includes(&self, declared: IntegrationTypes) -> bool {
        match self {
            IntegrationTypes::All => true,
            scope => declared == IntegrationTypes::All || declared == *scope,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            IntegrationTypes::Internal => "internal",
            IntegrationTypes::External => "external",
            IntegrationTypes::All => "all",
        }
    }
}

impl fmt::Display for IntegrationTypes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
