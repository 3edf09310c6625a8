use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, Level};

use crate::dispatch::HandlerError;
use crate::message::Message;

/// Which filter stages a filter takes part in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterStages {
    pub pre: bool,
    pub post: bool,
}

impl FilterStages {
    pub const PRE: FilterStages = FilterStages { pre: true, post: false };
    pub const POST: FilterStages = FilterStages { pre: false, post: true };
    pub const BOTH: FilterStages = FilterStages { pre: true, post: true };
}

/// Observes or vetoes messages around the publish stage.
///
/// Pre-filters run after enrichment; a failing pre-filter stops the
/// publish. Post-filters run once every publisher succeeded.
#[async_trait]
pub trait MessageFilter: Send + Sync + 'static {
    /// Name recorded as the origin of this filter's faults.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    fn stages(&self) -> FilterStages;

    async fn on_pre_publish(&self, _message: &dyn Message) -> Result<(), HandlerError> {
        Ok(())
    }

    async fn on_post_publish(&self, _message: &dyn Message) -> Result<(), HandlerError> {
        Ok(())
    }
}

/// Emits a `tracing` event before and after each publish.
#[derive(Debug, Clone, Copy)]
pub struct TraceFilter {
    level: Level,
}

impl Default for TraceFilter {
    fn default() -> Self {
        Self { level: Level::DEBUG }
    }
}

impl TraceFilter {
    pub fn new(level: Level) -> Self {
        Self { level }
    }
}

macro_rules! trace_at {
    ($level:expr, $message:expr, $phase:literal) => {{
        let attrs = $message.attributes();
        let message_type = $message.message_type();
        let archetype = $message.archetype();
        let message_id = attrs.message_id().unwrap_or_default();
        let correlation_id = attrs.correlation_id().unwrap_or_default();
        match $level {
            Level::ERROR => tracing::error!(%message_type, %archetype, %message_id, %correlation_id, $phase),
            Level::WARN => tracing::warn!(%message_type, %archetype, %message_id, %correlation_id, $phase),
            Level::INFO => tracing::info!(%message_type, %archetype, %message_id, %correlation_id, $phase),
            Level::DEBUG => tracing::debug!(%message_type, %archetype, %message_id, %correlation_id, $phase),
            _ => tracing::trace!(%message_type, %archetype, %message_id, %correlation_id, $phase),
        }
    }};
}

#[async_trait]
impl MessageFilter for TraceFilter {
    fn name(&self) -> &str {
        "trace"
    }

    fn stages(&self) -> FilterStages {
        FilterStages::BOTH
    }

    async fn on_pre_publish(&self, message: &dyn Message) -> Result<(), HandlerError> {
        trace_at!(self.level, message, "publishing message");
        Ok(())
    }

    async fn on_post_publish(&self, message: &dyn Message) -> Result<(), HandlerError> {
        trace_at!(self.level, message, "message published");
        Ok(())
    }
}

/// Rejects messages whose expiry attribute lies in the past.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExpiryFilter;

#[async_trait]
impl MessageFilter for ExpiryFilter {
    fn name(&self) -> &str {
        "expiry"
    }

    fn stages(&self) -> FilterStages {
        FilterStages::PRE
    }

    async fn on_pre_publish(&self, message: &dyn Message) -> Result<(), HandlerError> {
        let attrs = message.attributes();
        if attrs.is_expired(Utc::now()) {
            debug!(message_type = %message.message_type(), "dropping expired message");
            return Err(HandlerError::Rejected(format!(
                "{} expired at {}",
                message.message_type(),
                attrs.expires_at().map(|at| at.to_rfc3339()).unwrap_or_default()
            )));
        }
        Ok(())
    }
}
