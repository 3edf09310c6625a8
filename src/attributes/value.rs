//! String encoding for typed attribute values.
//!
//! Every value is stored in its culture-invariant string form. A non-empty
//! array writes [`ARRAY_SEPARATOR`] before each element, which none of the
//! scalar encodings emit; the empty array is the empty string. `[""]`
//! therefore encodes as one separator and stays distinct from `[]`.

use chrono::{DateTime, SecondsFormat, Utc};
use uuid::Uuid;

/// Reserved character joining the elements of an array attribute (ASCII unit separator).
pub const ARRAY_SEPARATOR: char = '\u{1f}';

/// Encodes a value into its stored string form.
pub trait ToAttribute {
    fn to_attribute(&self) -> String;
}

/// Decodes a value from its stored string form.
///
/// The error is a parser message; the bag wraps it into
/// [`AttributeError::Format`](super::AttributeError::Format) with the
/// attribute name and raw value.
pub trait FromAttribute: Sized {
    fn from_attribute(raw: &str) -> Result<Self, String>;
}

impl<T: ToAttribute + ?Sized> ToAttribute for &T {
    fn to_attribute(&self) -> String {
        (**self).to_attribute()
    }
}

macro_rules! display_scalar {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl ToAttribute for $ty {
                fn to_attribute(&self) -> String {
                    self.to_string()
                }
            }

            impl FromAttribute for $ty {
                fn from_attribute(raw: &str) -> Result<Self, String> {
                    raw.trim().parse::<$ty>().map_err(|e| e.to_string())
                }
            }
        )+
    };
}

// `f32`/`f64` Display output is the shortest string that parses back to the same value.
display_scalar!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64);

impl ToAttribute for bool {
    fn to_attribute(&self) -> String {
        self.to_string()
    }
}

impl FromAttribute for bool {
    fn from_attribute(raw: &str) -> Result<Self, String> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "true" => Ok(true),
            "false" => Ok(false),
            other => Err(format!("`{other}` is not a boolean")),
        }
    }
}

impl ToAttribute for str {
    fn to_attribute(&self) -> String {
        self.to_string()
    }
}

impl ToAttribute for String {
    fn to_attribute(&self) -> String {
        self.clone()
    }
}

impl FromAttribute for String {
    fn from_attribute(raw: &str) -> Result<Self, String> {
        Ok(raw.to_string())
    }
}

impl ToAttribute for Uuid {
    fn to_attribute(&self) -> String {
        self.hyphenated().to_string()
    }
}

impl FromAttribute for Uuid {
    fn from_attribute(raw: &str) -> Result<Self, String> {
        Uuid::parse_str(raw.trim()).map_err(|e| e.to_string())
    }
}

impl ToAttribute for DateTime<Utc> {
    fn to_attribute(&self) -> String {
        self.to_rfc3339_opts(SecondsFormat::AutoSi, true)
    }
}

impl FromAttribute for DateTime<Utc> {
    fn from_attribute(raw: &str) -> Result<Self, String> {
        DateTime::parse_from_rfc3339(raw.trim())
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| e.to_string())
    }
}

impl<T: ToAttribute> ToAttribute for [T] {
    fn to_attribute(&self) -> String {
        let mut out = String::new();
        for item in self {
            out.push(ARRAY_SEPARATOR);
            out.push_str(&item.to_attribute());
        }
        out
    }
}

impl<T: ToAttribute> ToAttribute for Vec<T> {
    fn to_attribute(&self) -> String {
        self.as_slice().to_attribute()
    }
}

impl<T: ToAttribute, const N: usize> ToAttribute for [T; N] {
    fn to_attribute(&self) -> String {
        self.as_slice().to_attribute()
    }
}

impl<T: FromAttribute> FromAttribute for Vec<T> {
    fn from_attribute(raw: &str) -> Result<Self, String> {
        if raw.is_empty() {
            return Ok(Vec::new());
        }
        let Some(elements) = raw.strip_prefix(ARRAY_SEPARATOR) else {
            return Err(format!("not an array value: {raw:?}"));
        };
        elements
            .split(ARRAY_SEPARATOR)
            .enumerate()
            .map(|(i, part)| T::from_attribute(part).map_err(|e| format!("element {i}: {e}")))
            .collect()
    }
}
