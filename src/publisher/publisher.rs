//! # Publisher contract.
//!
//! [`MessagePublisher`] is the extension point for delivery targets. The
//! in-process handler fan-out is one implementation; broker clients and
//! other transports are others. The pipeline only calls
//! [`MessagePublisher::publish`] and interprets success or failure.
//!
//! ## Example
//! ```rust
//! use async_trait::async_trait;
//! use herald::{IntegrationTypes, MessagePublisher, MessageRef, PublishError};
//! use tokio_util::sync::CancellationToken;
//!
//! struct AuditLog;
//!
//! #[async_trait]
//! impl MessagePublisher for AuditLog {
//!     fn name(&self) -> &str { "audit" }
//!
//!     fn integration_type(&self) -> IntegrationTypes { IntegrationTypes::External }
//!
//!     async fn publish(&self, message: &MessageRef, _cancel: &CancellationToken) -> Result<(), PublishError> {
//!         println!("{}", message.message_type());
//!         Ok(())
//!     }
//! }
//! ```

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::message::MessageRef;

use super::error::PublishError;
use super::scope::IntegrationTypes;

/// A delivery target for messages.
///
/// Publishers are shared across concurrent publish calls and hold no
/// per-message state.
#[async_trait]
pub trait MessagePublisher: Send + Sync + 'static {
    /// Name recorded as the origin of this publisher's faults.
    ///
    /// The default uses `type_name::<Self>()`; override it with something shorter.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    fn integration_type(&self) -> IntegrationTypes;

    /// Delivers one message.
    ///
    /// Implementations that can block for long should watch `cancel`.
    async fn publish(&self, message: &MessageRef, cancel: &CancellationToken) -> Result<(), PublishError>;
}
