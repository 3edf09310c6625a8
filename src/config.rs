//! # Messaging configuration.
//!
//! [`MessagingConfig`] carries the settings the pipeline reads at build
//! time. Every field has a default, so a partial JSON document is enough:
//!
//! ```
//! use herald::{IntegrationTypes, MessagingConfig};
//!
//! let config = MessagingConfig::from_json(r#"{
//!     "host_name": "billing-1",
//!     "default_scope": "internal",
//!     "retry": { "max_retries": 5, "jitter": "equal" }
//! }"#).unwrap();
//!
//! assert_eq!(config.host_name, "billing-1");
//! assert_eq!(config.default_scope, IntegrationTypes::Internal);
//! assert_eq!(config.retry.max_retries, 5);
//! assert_eq!(config.retry.first_delay_ms, 100);
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::publisher::IntegrationTypes;
use crate::resilience::{BackoffPolicy, JitterPolicy, RetryPolicy};

/// Settings for a [`MessagingService`](crate::MessagingService).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MessagingConfig {
    /// Stamped on messages by the host enricher. Defaults to `$HOSTNAME`.
    pub host_name: String,
    /// Identifies this process among instances on the same host.
    ///
    /// Defaults to a fresh v4 UUID.
    pub host_id: String,
    /// Scope used by publish calls that do not name one.
    pub default_scope: IntegrationTypes,
    /// Retry policy for publishers registered with
    /// [`MessagingServiceBuilder::retry`](crate::MessagingServiceBuilder::retry).
    pub retry: RetrySettings,
}

impl Default for MessagingConfig {
    fn default() -> Self {
        Self {
            host_name: std::env::var("HOSTNAME").unwrap_or_else(|_| "localhost".to_string()),
            host_id: Uuid::new_v4().to_string(),
            default_scope: IntegrationTypes::All,
            retry: RetrySettings::default(),
        }
    }
}

impl MessagingConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::from(&self.retry)
    }
}

/// Serializable form of a [`RetryPolicy`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    /// Retries after the first attempt (`0` = never retry).
    pub max_retries: u32,
    pub first_delay_ms: u64,
    pub max_delay_ms: u64,
    pub factor: f64,
    pub jitter: JitterPolicy,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: 3,
            first_delay_ms: 100,
            max_delay_ms: 10_000,
            factor: 2.0,
            jitter: JitterPolicy::None,
        }
    }
}

impl From<&RetrySettings> for RetryPolicy {
    fn from(settings: &RetrySettings) -> Self {
        RetryPolicy::new(
            settings.max_retries,
            BackoffPolicy {
                first: Duration::from_millis(settings.first_delay_ms),
                max: Duration::from_millis(settings.max_delay_ms),
                factor: settings.factor,
                jitter: settings.jitter,
            },
        )
    }
}
