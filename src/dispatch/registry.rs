use std::collections::HashSet;

use crate::message::MessageType;

use super::dispatcher::MessageDispatcher;

/// Ordered list of dispatchers, assembled once at startup.
///
/// Whatever discovers handlers (explicit wiring, a build script, a macro)
/// registers them here; the router only ever reads the finished registry.
///
/// ```ignore
/// let registry = HandlerRegistry::new()
///     .register(MessageDispatcher::synchronous(billing.clone(), "on_placed", |c, e| c.on_placed(e)))
///     .register(MessageDispatcher::synchronous(billing, "total", |c, q| c.total(q)));
/// ```
#[derive(Default, Clone, Debug)]
pub struct HandlerRegistry {
    dispatchers: Vec<MessageDispatcher>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a dispatcher.
    ///
    /// Returns `self` for chaining.
    pub fn register(mut self, dispatcher: impl Into<MessageDispatcher>) -> Self {
        self.add(dispatcher);
        self
    }

    /// Register a dispatcher in place.
    pub fn add(&mut self, dispatcher: impl Into<MessageDispatcher>) {
        self.dispatchers.push(dispatcher.into());
    }

    /// All dispatchers in registration order.
    pub fn dispatchers(&self) -> &[MessageDispatcher] {
        &self.dispatchers
    }

    /// Dispatchers declared for exactly `ty`.
    pub fn for_message_type(&self, ty: MessageType) -> impl Iterator<Item = &MessageDispatcher> {
        self.dispatchers.iter().filter(move |d| d.message_type() == ty)
    }

    /// Distinct handled message types, in first-registration order.
    pub fn message_types(&self) -> Vec<MessageType> {
        let mut seen = HashSet::new();
        self.dispatchers
            .iter()
            .map(MessageDispatcher::message_type)
            .filter(|ty| seen.insert(*ty))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.dispatchers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dispatchers.is_empty()
    }
}
