//! Message attribute bag.
//!
//! Every message owns an [`Attributes`] bag: a string-to-string map carrying
//! cross-cutting metadata (correlation id, route key, priority, expiry, ...)
//! without coupling to any serializer's type model. All typed parsing and
//! formatting lives in [`value`].

mod bag;
mod error;
mod value;
pub mod well_known;

pub use bag::Attributes;
pub use error::AttributeError;
pub use value::{FromAttribute, ToAttribute, ARRAY_SEPARATOR};
