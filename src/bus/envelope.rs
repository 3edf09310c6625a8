use std::collections::HashMap;

use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::attributes::Attributes;

/// A message as it travels over a transport.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Unique identifier (the message id attribute when present).
    pub id: String,
    /// Message type name, e.g. `OrderPlaced`.
    pub message_type: String,
    /// Serialized payload.
    pub payload: Vec<u8>,
    /// The message's attribute bag as plain strings.
    pub attributes: HashMap<String, String>,
}

impl Envelope {
    pub fn new(id: impl Into<String>, message_type: impl Into<String>, payload: Vec<u8>) -> Self {
        Self {
            id: id.into(),
            message_type: message_type.into(),
            payload,
            attributes: HashMap::new(),
        }
    }

    /// Create an envelope with a bitcode-serialized payload.
    pub fn encode<T: Serialize>(
        id: impl Into<String>,
        message_type: impl Into<String>,
        payload: &T,
    ) -> Result<Self, bitcode::Error> {
        let bytes = bitcode::serialize(payload)?;
        Ok(Self::new(id, message_type, bytes))
    }

    /// Decode the payload from bitcode binary format.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, bitcode::Error> {
        bitcode::deserialize(&self.payload)
    }

    /// Add a header.
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Rebuild an attribute bag on the receiving side.
    pub fn to_attributes(&self) -> Attributes {
        Attributes::from_map(self.attributes.clone())
    }

    /// Serialize the whole envelope (for transports that carry opaque frames).
    pub fn to_bytes(&self) -> Result<Vec<u8>, bitcode::Error> {
        bitcode::serialize(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, bitcode::Error> {
        bitcode::deserialize(bytes)
    }
}
