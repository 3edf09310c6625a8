//! Handler binding and routing.
//!
//! A [`MessageDispatcher`] binds one handler to one message type. The
//! [`HandlerRegistry`] holds them all in registration order and the
//! [`MessageRouter`] picks the ones that apply to a message, enforcing
//! one-handler cardinality for commands and queries.

mod dispatcher;
mod error;
mod registry;
mod router;

pub(crate) use error::panic_message;

pub use dispatcher::{DispatcherBuilder, DispatcherInfo, HandlerOutput, MessageDispatcher, Reply};
pub use error::{DispatchError, HandlerError};
pub use registry::HandlerRegistry;
pub use router::MessageRouter;
