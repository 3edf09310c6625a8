//! Handler bindings: one handler method bound to one message type.
//!
//! Synchronous, asynchronous and cancellation-aware handlers are all
//! normalized at registration time into the same stored invoker of shape
//! `(message, cancel) -> future<Result<(), HandlerError>>`, so dispatch
//! never branches on handler style.
//!
//! ## Example
//!
//! ```ignore
//! let orders = Arc::new(OrderProjection::default());
//!
//! let registry = HandlerRegistry::new()
//!     .register(MessageDispatcher::asynchronous(
//!         orders.clone(),
//!         "on_placed",
//!         |c, e| async move { c.on_placed(&e).await },
//!     ))
//!     .register(
//!         MessageDispatcher::synchronous(orders, "on_any_shipment", |c, e| c.on_shipped(e))
//!             .include_derived(),
//!     );
//! ```

use std::any::{self, Any};
use std::borrow::Cow;
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use futures::future::{self as fut, BoxFuture};
use futures::FutureExt;
use tokio_util::sync::CancellationToken;
use tracing::{trace, warn};

use super::error::{panic_message, DispatchError, HandlerError};
use crate::message::{Message, MessageRef, MessageType, Returns};

type AnyMessage = Arc<dyn Any + Send + Sync>;

type Invoker = Arc<
    dyn Fn(AnyMessage, CancellationToken) -> BoxFuture<'static, Result<(), HandlerError>>
        + Send
        + Sync,
>;

type Predicate = Arc<dyn Fn(&(dyn Any + Send + Sync)) -> bool + Send + Sync>;

// =============================================================================
// Handler output
// =============================================================================

/// What a handler hands back to the dispatcher.
///
/// `()` for handlers with nothing to return; [`Reply`] for handlers whose
/// message declares a result, in which case the value is written onto the
/// message's result slot.
pub trait HandlerOutput<M>: Send + 'static {
    const PRODUCES_RESULT: bool;

    fn store(self, message: &M) -> Result<(), HandlerError>;
}

impl<M: Message> HandlerOutput<M> for () {
    const PRODUCES_RESULT: bool = false;

    fn store(self, _message: &M) -> Result<(), HandlerError> {
        Ok(())
    }
}

/// A handler's answer to a result-bearing message.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply<T>(pub T);

impl<M: Returns> HandlerOutput<M> for Reply<M::Output> {
    const PRODUCES_RESULT: bool = true;

    fn store(self, message: &M) -> Result<(), HandlerError> {
        message
            .result()
            .set(self.0)
            .map_err(|_| HandlerError::ResultAlreadySet(any::type_name::<M>()))
    }
}

// =============================================================================
// Dispatcher
// =============================================================================

/// Immutable binding of a handler to a message type.
#[derive(Clone)]
pub struct MessageDispatcher {
    message_type: MessageType,
    consumer_type: &'static str,
    method: Cow<'static, str>,
    include_derived: bool,
    supports_cancellation: bool,
    is_async: bool,
    returns_result: bool,
    predicate: Option<Predicate>,
    invoke: Invoker,
}

impl MessageDispatcher {
    /// Binds an async handler.
    pub fn asynchronous<C, M, R, F, Fut>(
        consumer: Arc<C>,
        method: impl Into<Cow<'static, str>>,
        handler: F,
    ) -> DispatcherBuilder<M>
    where
        C: Send + Sync + 'static,
        M: Message,
        R: HandlerOutput<M>,
        F: Fn(Arc<C>, Arc<M>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, HandlerError>> + Send + 'static,
    {
        let invoke: Invoker = Arc::new(move |message: AnyMessage, _cancel: CancellationToken| match message.downcast::<M>() {
            Ok(message) => {
                let pending = handler(Arc::clone(&consumer), Arc::clone(&message));
                async move { pending.await?.store(&message) }.boxed()
            }
            Err(_) => fut::ready(Err(type_mismatch::<M>())).boxed(),
        });
        DispatcherBuilder::new::<C, R>(method, invoke, true, false)
    }

    /// Binds an async handler that receives the publish call's cancellation token.
    pub fn cancellable<C, M, R, F, Fut>(
        consumer: Arc<C>,
        method: impl Into<Cow<'static, str>>,
        handler: F,
    ) -> DispatcherBuilder<M>
    where
        C: Send + Sync + 'static,
        M: Message,
        R: HandlerOutput<M>,
        F: Fn(Arc<C>, Arc<M>, CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, HandlerError>> + Send + 'static,
    {
        let invoke: Invoker = Arc::new(move |message: AnyMessage, cancel: CancellationToken| match message.downcast::<M>() {
            Ok(message) => {
                let pending = handler(Arc::clone(&consumer), Arc::clone(&message), cancel);
                async move { pending.await?.store(&message) }.boxed()
            }
            Err(_) => fut::ready(Err(type_mismatch::<M>())).boxed(),
        });
        DispatcherBuilder::new::<C, R>(method, invoke, true, true)
    }

    /// Binds a plain function handler. It runs inline on the dispatching task.
    pub fn synchronous<C, M, R, F>(
        consumer: Arc<C>,
        method: impl Into<Cow<'static, str>>,
        handler: F,
    ) -> DispatcherBuilder<M>
    where
        C: Send + Sync + 'static,
        M: Message,
        R: HandlerOutput<M>,
        F: Fn(&C, &M) -> Result<R, HandlerError> + Send + Sync + 'static,
    {
        let invoke: Invoker = Arc::new(move |message: AnyMessage, _cancel: CancellationToken| {
            let outcome = match message.downcast::<M>() {
                Ok(message) => handler(&consumer, &message).and_then(|out| out.store(&message)),
                Err(_) => Err(type_mismatch::<M>()),
            };
            fut::ready(outcome).boxed()
        });
        DispatcherBuilder::new::<C, R>(method, invoke, false, false)
    }

    /// Invokes the handler for `message`.
    ///
    /// The message is viewed as this dispatcher's message type (its own type
    /// or an ancestor). Handler errors and panics come back as a
    /// [`DispatchError`] whose origin names this dispatcher.
    pub async fn dispatch(
        &self,
        message: &MessageRef,
        cancel: &CancellationToken,
    ) -> Result<(), DispatchError> {
        let target = Arc::clone(message)
            .upcast(self.message_type.id())
            .ok_or_else(|| {
                self.fault(HandlerError::InvalidArgument(format!(
                    "{} is not assignable to {}",
                    message.message_type(),
                    self.message_type
                )))
            })?;

        trace!(handler = %self, "dispatching");

        let pending = match panic::catch_unwind(AssertUnwindSafe(|| (self.invoke)(target, cancel.clone()))) {
            Ok(pending) => pending,
            Err(payload) => return Err(self.fault(HandlerError::Panicked(panic_message(payload)))),
        };

        AssertUnwindSafe(pending)
            .catch_unwind()
            .await
            .unwrap_or_else(|payload| Err(HandlerError::Panicked(panic_message(payload))))
            .map_err(|err| self.fault(err))
    }

    /// Whether this dispatcher handles `message`.
    ///
    /// True when the message is exactly this dispatcher's type, or derives
    /// from it and the dispatcher opted into derived types; a registered
    /// predicate must accept the message as well.
    pub fn applies_to(&self, message: &MessageRef) -> bool {
        let exact = message.message_type() == self.message_type;
        if !exact && !(self.include_derived && message.ancestors().contains(&self.message_type)) {
            return false;
        }
        match &self.predicate {
            None => true,
            Some(predicate) => Arc::clone(message)
                .upcast(self.message_type.id())
                .is_some_and(|view| predicate(view.as_ref())),
        }
    }

    pub fn message_type(&self) -> MessageType {
        self.message_type
    }

    /// Fully qualified consumer type name.
    pub fn consumer_type(&self) -> &'static str {
        self.consumer_type
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn include_derived(&self) -> bool {
        self.include_derived
    }

    pub fn supports_cancellation(&self) -> bool {
        self.supports_cancellation
    }

    pub fn is_async(&self) -> bool {
        self.is_async
    }

    pub fn returns_result(&self) -> bool {
        self.returns_result
    }

    /// Diagnostic snapshot of this binding.
    pub fn info(&self) -> DispatcherInfo {
        DispatcherInfo {
            message_type: self.message_type.name(),
            consumer_type: self.consumer_type,
            method: self.method.to_string(),
            include_derived: self.include_derived,
        }
    }

    fn fault(&self, err: HandlerError) -> DispatchError {
        warn!(handler = %self, error = %err, label = err.as_label(), "handler failed");
        DispatchError::new(self.to_string(), err)
    }
}

impl fmt::Display for MessageDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}::{}({})",
            short_name(self.consumer_type),
            self.method,
            self.message_type
        )
    }
}

impl fmt::Debug for MessageDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageDispatcher")
            .field("message_type", &self.message_type)
            .field("consumer_type", &self.consumer_type)
            .field("method", &self.method)
            .field("include_derived", &self.include_derived)
            .field("supports_cancellation", &self.supports_cancellation)
            .field("is_async", &self.is_async)
            .field("returns_result", &self.returns_result)
            .field("has_predicate", &self.predicate.is_some())
            .finish()
    }
}

/// Identity of a dispatcher, carried in configuration errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatcherInfo {
    pub message_type: &'static str,
    pub consumer_type: &'static str,
    pub method: String,
    pub include_derived: bool,
}

impl fmt::Display for DispatcherInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}::{}({})",
            short_name(self.consumer_type),
            self.method,
            short_name(self.message_type)
        )?;
        if self.include_derived {
            f.write_str(" +derived")?;
        }
        Ok(())
    }
}

// =============================================================================
// Builder
// =============================================================================

/// Optional settings for a dispatcher before it is registered.
pub struct DispatcherBuilder<M> {
    dispatcher: MessageDispatcher,
    _message: PhantomData<fn(M)>,
}

impl<M: Message> DispatcherBuilder<M> {
    fn new<C: 'static, R: HandlerOutput<M>>(
        method: impl Into<Cow<'static, str>>,
        invoke: Invoker,
        is_async: bool,
        supports_cancellation: bool,
    ) -> Self {
        Self {
            dispatcher: MessageDispatcher {
                message_type: MessageType::of::<M>(),
                consumer_type: any::type_name::<C>(),
                method: method.into(),
                include_derived: false,
                supports_cancellation,
                is_async,
                returns_result: R::PRODUCES_RESULT,
                predicate: None,
                invoke,
            },
            _message: PhantomData,
        }
    }

    /// Also receive messages deriving from `M`, viewed as `M`.
    pub fn include_derived(mut self) -> Self {
        self.dispatcher.include_derived = true;
        self
    }

    /// Only receive messages the predicate accepts.
    pub fn when<P>(mut self, predicate: P) -> Self
    where
        P: Fn(&M) -> bool + Send + Sync + 'static,
    {
        self.dispatcher.predicate = Some(Arc::new(move |message: &(dyn Any + Send + Sync)| {
            message.downcast_ref::<M>().is_some_and(&predicate)
        }));
        self
    }

    pub fn build(self) -> MessageDispatcher {
        self.dispatcher
    }
}

impl<M: Message> From<DispatcherBuilder<M>> for MessageDispatcher {
    fn from(builder: DispatcherBuilder<M>) -> Self {
        builder.build()
    }
}

fn type_mismatch<M: 'static>() -> HandlerError {
    HandlerError::InvalidArgument(format!(
        "message is not a {}",
        short_name(any::type_name::<M>())
    ))
}

fn short_name(name: &'static str) -> &'static str {
    // keep generic arguments intact: only strip the path before the first '<'
    let head = name.split('<').next().unwrap_or(name);
    match head.rfind("::") {
        Some(idx) => &name[idx + 2..],
        None => name,
    }
}
