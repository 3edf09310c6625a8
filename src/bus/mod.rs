//! Service bus: a reference external transport.
//!
//! ```text
//! MessagingService ──► QueuePublisher (External)
//!                          │ route by message type
//!                          ▼
//!                      Envelope { id, message_type, payload (bitcode), attributes }
//!                          │
//!                          ▼
//!                      InMemoryQueue ["orders"] ["shipping"] ...
//! ```
//!
//! Real broker clients implement [`MessagePublisher`](crate::MessagePublisher)
//! the same way `QueuePublisher` does; the in-memory queue stands in for
//! the broker in tests.

mod envelope;
mod in_memory_queue;
mod queue_publisher;

pub use envelope::Envelope;
pub use in_memory_queue::InMemoryQueue;
pub use queue_publisher::QueuePublisher;
