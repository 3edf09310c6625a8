use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::attributes::Attributes;

use super::result::ResultSlot;

/// Fixed classification of a message, deciding handler cardinality and
/// result semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Archetype {
    /// Zero or more handlers; no result.
    Event,
    /// Exactly one handler; may declare a result.
    Command,
    /// Exactly one handler; always declares a result.
    Query,
}

impl Archetype {
    /// Whether routing must resolve exactly one handler.
    pub fn requires_single_handler(&self) -> bool {
        matches!(self, Archetype::Command | Archetype::Query)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Archetype::Event => "event",
            Archetype::Command => "command",
            Archetype::Query => "query",
        }
    }
}

impl fmt::Display for Archetype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Runtime identity of a message type.
///
/// Equality and hashing use the `TypeId` only; the name is for diagnostics.
#[derive(Clone, Copy)]
pub struct MessageType {
    id: TypeId,
    name: &'static str,
}

impl MessageType {
    pub fn of<T: Any + ?Sized>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Fully qualified type name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Type name without its module path.
    pub fn short_name(&self) -> &'static str {
        self.name.rsplit("::").next().unwrap_or(self.name)
    }
}

impl PartialEq for MessageType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for MessageType {}

impl Hash for MessageType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

/// A publishable message.
///
/// Usually implemented with `#[derive(Message)]`:
///
/// ```
/// use herald::{Attributes, Message, ResultSlot};
///
/// #[derive(Message, Default)]
/// #[message(command)]
/// struct PlaceOrder {
///     attributes: Attributes,
///     #[message(result)]
///     order_id: ResultSlot<u64>,
///     sku: String,
/// }
/// ```
///
/// Derived messages embed their parent as `#[message(base)] base: Arc<Parent>`;
/// handlers opted into derived-type inclusion receive that parent.
pub trait Message: Any + Send + Sync {
    fn archetype(&self) -> Archetype;

    fn attributes(&self) -> &Attributes;

    /// Exact runtime type of this message.
    fn message_type(&self) -> MessageType;

    /// Base message types, nearest first.
    fn ancestors(&self) -> Vec<MessageType> {
        Vec::new()
    }

    fn as_any(&self) -> &dyn Any;

    /// Views this message as `target`, which is either its own type or one
    /// of its [`ancestors`](Message::ancestors).
    fn upcast(self: Arc<Self>, target: TypeId) -> Option<Arc<dyn Any + Send + Sync>>;

    /// True if this message is `ty` or derives from it.
    fn is_assignable_to(&self, ty: MessageType) -> bool {
        self.message_type() == ty || self.ancestors().contains(&ty)
    }
}

/// Shared handle to a message in flight.
pub type MessageRef = Arc<dyn Message>;

/// Messages that handlers answer with a value.
pub trait Returns: Message {
    type Output: Clone + Send + Sync + 'static;

    fn result(&self) -> &ResultSlot<Self::Output>;
}

/// Marker for the [`Archetype::Event`] archetype.
pub trait Event: Message {}

/// Marker for the [`Archetype::Command`] archetype.
pub trait Command: Message {}

/// Marker for the [`Archetype::Query`] archetype.
pub trait Query: Returns {}

impl fmt::Debug for dyn Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Message")
            .field("type", &self.message_type())
            .field("archetype", &self.archetype())
            .field("attributes", self.attributes())
            .finish()
    }
}
