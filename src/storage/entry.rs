//! Stored values and their expiry metadata.

use bytes::Bytes;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// The typed payload held under a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// Binary-safe string (also used for integers, as in Redis)
    String(Bytes),
    /// Deque for O(1) push/pop on both ends
    List(VecDeque<Bytes>),
}

impl Value {
    /// The name reported by the `TYPE` command.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::String(_) => "string",
            Value::List(_) => "list",
        }
    }
}

/// A value plus its optional absolute expiry time.
#[derive(Debug, Clone)]
pub struct Entry {
    pub value: Value,
    /// When this entry expires (None = never expires)
    pub expires_at: Option<Instant>,
}

impl Entry {
    /// Creates a new entry without expiry.
    pub fn new(value: Value) -> Self {
        Self {
            value,
            expires_at: None,
        }
    }

    /// Creates a string entry with an optional deadline.
    pub fn string(data: Bytes, expires_at: Option<Instant>) -> Self {
        Self {
            value: Value::String(data),
            expires_at,
        }
    }

    /// Checks if this entry has expired as of `now`.
    #[inline]
    pub fn is_expired_at(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|deadline| now >= deadline)
    }

    /// Time left before expiry, or None if the entry never expires.
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        self.expires_at
            .map(|deadline| deadline.saturating_duration_since(now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expiry_check() {
        let now = Instant::now();
        let entry = Entry::string(Bytes::from("v"), Some(now + Duration::from_secs(1)));

        assert!(!entry.is_expired_at(now));
        assert!(entry.is_expired_at(now + Duration::from_secs(1)));
        assert_eq!(entry.remaining(now), Some(Duration::from_secs(1)));
        assert_eq!(
            entry.remaining(now + Duration::from_secs(5)),
            Some(Duration::ZERO)
        );
    }

    #[test]
    fn test_persistent_entry() {
        let entry = Entry::new(Value::List(VecDeque::new()));
        assert!(!entry.is_expired_at(Instant::now()));
        assert_eq!(entry.remaining(Instant::now()), None);
        assert_eq!(entry.value.type_name(), "list");
    }
}
