//! Publishers: delivery targets behind one contract.
//!
//! ```text
//!                 PublisherSet (registration order)
//!        ┌──────────────────┼──────────────────────┐
//!        ▼                  ▼                      ▼
//! InProcessPublisher   QueuePublisher        your transport
//!   (Internal)          (External)        (Internal / External)
//!        │
//!        └─► MessageRouter ─► MessageDispatcher × N (concurrent)
//! ```

mod error;
mod in_process;
#[allow(clippy::module_inception)]
mod publisher;
mod scope;
mod set;

pub use error::PublishError;
pub use in_process::InProcessPublisher;
pub use publisher::MessagePublisher;
pub use scope::IntegrationTypes;
pub use set::{PublishFailure, PublisherSet};
