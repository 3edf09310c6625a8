//! # Enrichers.
//!
//! An enricher stamps cross-cutting metadata onto a message's attributes
//! before anything is published. All enrichers of a service run
//! concurrently; a message is never published partially enriched.
//!
//! Built-ins, usually installed with
//! [`MessagingServiceBuilder::with_default_enrichers`](crate::MessagingServiceBuilder::with_default_enrichers):
//! - [`CorrelationEnricher`]: message id and correlation id;
//! - [`DateOccurredEnricher`]: publish timestamp;
//! - [`HostEnricher`]: publishing host name and id.

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::attributes::well_known::{CORRELATION_ID, DATE_OCCURRED, HOST_ID, HOST_NAME, MESSAGE_ID};
use crate::dispatch::HandlerError;
use crate::message::Message;

/// Decorates messages with metadata before publishing.
///
/// Enrichers may only touch the attribute bag. Two enrichers running
/// together must not write the same attribute.
#[async_trait]
pub trait MessageEnricher: Send + Sync + 'static {
    /// Name recorded as the origin of this enricher's faults.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    async fn enrich(&self, message: &dyn Message) -> Result<(), HandlerError>;
}

/// Assigns a v4 message id when absent, then defaults the correlation id
/// to the message id.
#[derive(Debug, Default, Clone, Copy)]
pub struct CorrelationEnricher;

#[async_trait]
impl MessageEnricher for CorrelationEnricher {
    fn name(&self) -> &str {
        "correlation"
    }

    async fn enrich(&self, message: &dyn Message) -> Result<(), HandlerError> {
        let attrs = message.attributes();
        attrs.set_if_absent(MESSAGE_ID, Uuid::new_v4());
        if let Some(id) = attrs.message_id() {
            attrs.set_if_absent(CORRELATION_ID, id);
        }
        Ok(())
    }
}

/// Stamps the UTC time of publishing when the message has no date yet.
#[derive(Debug, Default, Clone, Copy)]
pub struct DateOccurredEnricher;

#[async_trait]
impl MessageEnricher for DateOccurredEnricher {
    fn name(&self) -> &str {
        "date-occurred"
    }

    async fn enrich(&self, message: &dyn Message) -> Result<(), HandlerError> {
        message.attributes().set_if_absent(DATE_OCCURRED, Utc::now());
        Ok(())
    }
}

/// Records which host published the message.
#[derive(Debug, Clone)]
pub struct HostEnricher {
    host_name: String,
    host_id: String,
}

impl HostEnricher {
    pub fn new(host_name: impl Into<String>, host_id: impl Into<String>) -> Self {
        Self {
            host_name: host_name.into(),
            host_id: host_id.into(),
        }
    }
}

#[async_trait]
impl MessageEnricher for HostEnricher {
    fn name(&self) -> &str {
        "host"
    }

    async fn enrich(&self, message: &dyn Message) -> Result<(), HandlerError> {
        let attrs = message.attributes();
        if !self.host_name.is_empty() {
            attrs.set_if_absent(HOST_NAME, self.host_name.as_str());
        }
        if !self.host_id.is_empty() {
            attrs.set_if_absent(HOST_ID, self.host_id.as_str());
        }
        Ok(())
    }
}
