use std::fmt;
use std::sync::OnceLock;

/// Write-once result cell carried by commands and queries.
///
/// The unique handler fills it during dispatch; the publish call reads it
/// back once the pipeline has completed.
pub struct ResultSlot<T> {
    value: OnceLock<T>,
}

impl<T> ResultSlot<T> {
    pub fn new() -> Self {
        Self {
            value: OnceLock::new(),
        }
    }

    /// Stores the result. A slot accepts exactly one value; the rejected
    /// value is handed back on a second write.
    pub fn set(&self, value: T) -> Result<(), T> {
        self.value.set(value)
    }

    pub fn get(&self) -> Option<&T> {
        self.value.get()
    }

    pub fn is_set(&self) -> bool {
        self.value.get().is_some()
    }

    pub fn into_inner(self) -> Option<T> {
        self.value.into_inner()
    }
}

impl<T> Default for ResultSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: fmt::Debug> fmt::Debug for ResultSlot<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value.get() {
            Some(value) => f.debug_tuple("ResultSlot").field(value).finish(),
            None => f.write_str("ResultSlot(<unset>)"),
        }
    }
}

/// Names the value type of a result field; used by `#[derive(Message)]`.
pub trait DeclaresResult {
    type Output;
}

impl<T> DeclaresResult for ResultSlot<T> {
    type Output = T;
}
