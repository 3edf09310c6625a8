//! Message model: archetypes, runtime type identity, result slots and
//! event sources.

mod event_source;
#[allow(clippy::module_inception)]
mod message;
mod result;

pub use event_source::{DomainEvents, EventSource};
pub use message::{Archetype, Command, Event, Message, MessageRef, MessageType, Query, Returns};
pub use result::{DeclaresResult, ResultSlot};
