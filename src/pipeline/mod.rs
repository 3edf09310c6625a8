//! The publish pipeline and its extension points.

mod builder;
mod enricher;
mod filter;
mod service;
mod stage;

pub use builder::MessagingServiceBuilder;
pub use enricher::{CorrelationEnricher, DateOccurredEnricher, HostEnricher, MessageEnricher};
pub use filter::{ExpiryFilter, FilterStages, MessageFilter, TraceFilter};
pub use service::MessagingService;
