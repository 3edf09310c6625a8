//! Cross-cutting attribute names and typed accessors for them.

use chrono::{DateTime, Utc};

use super::bag::Attributes;

pub const MESSAGE_ID: &str = "message-id";
pub const CORRELATION_ID: &str = "correlation-id";
pub const ROUTE_KEY: &str = "route-key";
pub const PRIORITY: &str = "priority";
pub const SUBJECT: &str = "subject";
pub const CONTENT_TYPE: &str = "content-type";
pub const DATE_OCCURRED: &str = "date-occurred";
pub const EXPIRES_AT: &str = "expires-at";
pub const HOST_NAME: &str = "host-name";
pub const HOST_ID: &str = "host-id";

impl Attributes {
    pub fn message_id(&self) -> Option<String> {
        self.raw(MESSAGE_ID)
    }

    pub fn set_message_id(&self, id: impl AsRef<str>) {
        self.set(MESSAGE_ID, id.as_ref());
    }

    pub fn correlation_id(&self) -> Option<String> {
        self.raw(CORRELATION_ID)
    }

    pub fn set_correlation_id(&self, id: impl AsRef<str>) {
        self.set(CORRELATION_ID, id.as_ref());
    }

    pub fn route_key(&self) -> Option<String> {
        self.raw(ROUTE_KEY)
    }

    pub fn set_route_key(&self, key: impl AsRef<str>) {
        self.set(ROUTE_KEY, key.as_ref());
    }

    /// Message priority; `0` when unset or malformed.
    pub fn priority(&self) -> u8 {
        self.get_or(PRIORITY, 0)
    }

    pub fn set_priority(&self, priority: u8) {
        self.set(PRIORITY, priority);
    }

    pub fn subject(&self) -> Option<String> {
        self.raw(SUBJECT)
    }

    pub fn set_subject(&self, subject: impl AsRef<str>) {
        self.set(SUBJECT, subject.as_ref());
    }

    pub fn content_type(&self) -> Option<String> {
        self.raw(CONTENT_TYPE)
    }

    pub fn set_content_type(&self, content_type: impl AsRef<str>) {
        self.set(CONTENT_TYPE, content_type.as_ref());
    }

    pub fn date_occurred(&self) -> Option<DateTime<Utc>> {
        self.get(DATE_OCCURRED).ok()
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.get(EXPIRES_AT).ok()
    }

    pub fn set_expires_at(&self, at: DateTime<Utc>) {
        self.set(EXPIRES_AT, at);
    }

    /// True if an expiry is set and lies before `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at().is_some_and(|at| at < now)
    }
}
