mod message;

use proc_macro::TokenStream;

/// Derive macro implementing `herald::Message` (and the archetype marker,
/// plus `herald::Returns` when a result field is declared).
///
/// # Usage
///
/// ```ignore
/// #[derive(Message)]
/// #[message(event)]
/// struct OrderShipped {
///     attributes: Attributes,
///     order_id: u64,
/// }
///
/// #[derive(Message)]
/// #[message(query)]
/// struct OrderTotal {
///     attributes: Attributes,
///     #[message(result)]
///     total: ResultSlot<f64>,
///     order_id: u64,
/// }
///
/// // A derived event: handlers of `OrderShipped` that opted into derived
/// // types also receive `ExpressOrderShipped`, viewed as its parent.
/// #[derive(Message)]
/// #[message(event)]
/// struct ExpressOrderShipped {
///     #[message(base)]
///     base: Arc<OrderShipped>,
///     courier: String,
/// }
/// ```
///
/// Struct attribute: `#[message(event | command | query)]`.
///
/// Field attributes:
/// - `#[message(attributes)]`: the `Attributes` bag (defaults to a field named `attributes`;
///   a derived message without one shares its parent's bag)
/// - `#[message(result)]`: a `ResultSlot<T>` field; required for queries, optional for commands
/// - `#[message(base)]`: an `Arc<Parent>` field holding the parent message
#[proc_macro_derive(Message, attributes(message))]
pub fn derive_message(input: TokenStream) -> TokenStream {
    message::derive_message(input)
}
