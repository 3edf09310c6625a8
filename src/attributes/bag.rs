use std::collections::HashMap;
use std::fmt;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::error::AttributeError;
use super::value::{FromAttribute, ToAttribute};

/// Schema-less, string-keyed property store attached to every message.
///
/// Values are kept as strings so that no serializer needs to understand a
/// custom type model. Typed access goes through [`ToAttribute`] /
/// [`FromAttribute`].
///
/// Setters take `&self`: a message is shared between concurrently running
/// enrichers and handlers, and the bag is its only mutable metadata.
///
/// ## Example
///
/// ```
/// use herald::Attributes;
///
/// let attrs = Attributes::new();
/// attrs.set("priority", 5u8);
/// attrs.set("tags", vec![1, 2, 3]);
///
/// assert_eq!(attrs.get::<u8>("priority").unwrap(), 5);
/// assert_eq!(attrs.get::<Vec<i32>>("tags").unwrap(), vec![1, 2, 3]);
/// assert_eq!(attrs.get_or("missing", 10u8), 10);
/// ```
#[derive(Default)]
pub struct Attributes {
    values: RwLock<HashMap<String, String>>,
}

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a bag from raw string values (e.g. transport headers).
    pub fn from_map(values: HashMap<String, String>) -> Self {
        Self {
            values: RwLock::new(values),
        }
    }

    // Holders of the lock never panic mid-update, so a poisoned map is still consistent.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, String>> {
        self.values.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, String>> {
        self.values.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Stores `value`, replacing any existing value.
    pub fn set<T: ToAttribute>(&self, name: impl Into<String>, value: T) {
        self.write().insert(name.into(), value.to_attribute());
    }

    /// Stores `value`; an existing value is replaced only when `overwrite` is set.
    ///
    /// Returns `true` if the value was written.
    pub fn set_with<T: ToAttribute>(&self, name: impl Into<String>, value: T, overwrite: bool) -> bool {
        let name = name.into();
        let mut values = self.write();
        if !overwrite && values.contains_key(&name) {
            return false;
        }
        values.insert(name, value.to_attribute());
        true
    }

    /// Stores `value` only if nothing is stored under `name` yet.
    pub fn set_if_absent<T: ToAttribute>(&self, name: impl Into<String>, value: T) -> bool {
        self.set_with(name, value, false)
    }

    /// Reads a typed value, failing if it is absent or cannot be parsed.
    pub fn get<T: FromAttribute>(&self, name: &str) -> Result<T, AttributeError> {
        let raw = self.raw(name).ok_or_else(|| AttributeError::NotFound {
            name: name.to_string(),
        })?;
        T::from_attribute(&raw).map_err(|reason| AttributeError::Format {
            name: name.to_string(),
            raw,
            reason,
        })
    }

    /// Reads a typed value, falling back to `default` when it is absent or malformed.
    pub fn get_or<T: FromAttribute>(&self, name: &str, default: T) -> T {
        self.get(name).unwrap_or(default)
    }

    /// Reads a typed value if present; a malformed value is still an error.
    pub fn get_opt<T: FromAttribute>(&self, name: &str) -> Result<Option<T>, AttributeError> {
        match self.get(name) {
            Ok(value) => Ok(Some(value)),
            Err(AttributeError::NotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Stores an opaque byte blob (base64 encoded).
    pub fn set_bytes(&self, name: impl Into<String>, bytes: &[u8]) {
        self.set(name, STANDARD.encode(bytes));
    }

    /// Reads a blob stored with [`set_bytes`](Self::set_bytes).
    pub fn get_bytes(&self, name: &str) -> Result<Vec<u8>, AttributeError> {
        let raw: String = self.get(name)?;
        STANDARD.decode(raw.as_bytes()).map_err(|e| AttributeError::Format {
            name: name.to_string(),
            raw,
            reason: e.to_string(),
        })
    }

    pub fn has_value(&self, name: &str) -> bool {
        self.read().contains_key(name)
    }

    /// Raw stored string for `name`.
    pub fn raw(&self, name: &str) -> Option<String> {
        self.read().get(name).cloned()
    }

    pub fn remove(&self, name: &str) -> Option<String> {
        self.write().remove(name)
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Snapshot of all raw values.
    pub fn to_map(&self) -> HashMap<String, String> {
        self.read().clone()
    }
}

impl Clone for Attributes {
    fn clone(&self) -> Self {
        Self::from_map(self.to_map())
    }
}

impl fmt::Debug for Attributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.read().iter()).finish()
    }
}

impl PartialEq for Attributes {
    fn eq(&self, other: &Self) -> bool {
        self.to_map() == other.to_map()
    }
}

impl Serialize for Attributes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.read().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Attributes {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        HashMap::<String, String>::deserialize(deserializer).map(Self::from_map)
    }
}
