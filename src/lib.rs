//! # herald
//!
//! In-process message dispatch and publishing for services built from
//! independently wired handler components.
//!
//! Application code publishes three kinds of message through one API:
//! - **events**: any number of handlers, no result;
//! - **commands**: exactly one handler, optionally answering with a result;
//! - **queries**: exactly one handler, always answering with a result.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │ MessagingService                                             │
//! │  publish_event / publish_event_source / send_command /       │
//! │  send / execute_query                                        │
//! └──────────────────────────────────────────────────────────────┘
//!        │ enrich ─► pre-filter ─► publish ─► post-filter
//!        ▼                           │
//! ┌──────────────┐                   ▼
//! │ Attributes   │         ┌───────────────────────────────────┐
//! │ (per message)│         │ PublisherSet (+ resilience policy)│
//! └──────────────┘         └───────────────────────────────────┘
//!                             │                       │
//!                             ▼                       ▼
//!                  InProcessPublisher          QueuePublisher / others
//!                  MessageRouter ─► MessageDispatcher × N
//! ```
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use herald::{
//!     Attributes, HandlerError, HandlerRegistry, Message, MessageDispatcher,
//!     MessagingConfig, MessagingService, Reply, ResultSlot,
//! };
//! use tokio_util::sync::CancellationToken;
//!
//! #[derive(Message, Default)]
//! #[message(query)]
//! struct Square {
//!     attributes: Attributes,
//!     #[message(result)]
//!     answer: ResultSlot<u64>,
//!     n: u64,
//! }
//!
//! struct Calculator;
//!
//! impl Calculator {
//!     fn square(&self, q: &Square) -> Result<Reply<u64>, HandlerError> {
//!         Ok(Reply(q.n * q.n))
//!     }
//! }
//!
//! # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
//! let registry = HandlerRegistry::new()
//!     .register(MessageDispatcher::synchronous(Arc::new(Calculator), "square", |c, q: &Square| c.square(q)));
//!
//! let service = MessagingService::builder(MessagingConfig::default())
//!     .with_default_enrichers()
//!     .handlers(registry)
//!     .build()
//!     .unwrap();
//!
//! let cancel = CancellationToken::new();
//! let answer = service
//!     .execute_query(Square { n: 12, ..Default::default() }, &cancel)
//!     .await
//!     .unwrap();
//! assert_eq!(answer, 144);
//! # });
//! ```

extern crate self as herald;

mod attributes;
mod config;
mod dispatch;
mod error;
mod message;
mod pipeline;
mod publisher;
mod resilience;

#[cfg(feature = "bus")]
pub mod bus;

pub use attributes::{well_known, AttributeError, Attributes, FromAttribute, ToAttribute, ARRAY_SEPARATOR};
pub use config::{MessagingConfig, RetrySettings};
pub use dispatch::{
    DispatchError, DispatcherBuilder, DispatcherInfo, HandlerError, HandlerOutput, HandlerRegistry,
    MessageDispatcher, MessageRouter, Reply,
};
pub use error::{ConfigurationError, MessagingError, PipelineStage, PublisherError};
pub use message::{
    Archetype, Command, DeclaresResult, DomainEvents, Event, EventSource, Message, MessageRef,
    MessageType, Query, ResultSlot, Returns,
};
pub use pipeline::{
    CorrelationEnricher, DateOccurredEnricher, ExpiryFilter, FilterStages, HostEnricher,
    MessageEnricher, MessageFilter, MessagingService, MessagingServiceBuilder, TraceFilter,
};
pub use publisher::{
    InProcessPublisher, IntegrationTypes, MessagePublisher, PublishError, PublishFailure,
    PublisherSet,
};
pub use resilience::{
    Attempt, BackoffPolicy, JitterPolicy, PolicyLookup, ResiliencePolicies, ResiliencePolicy,
    RetryDelays, RetryPolicy,
};

/// Derive macro for [`Message`]; see the `herald_macros` crate docs.
pub use herald_macros::Message;
