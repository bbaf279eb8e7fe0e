use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::telemetry::FieldValue;

pub const DEFAULT_PENDING_TTL: Duration = Duration::from_secs(2);
/// Shorter TTLs are raised to this so a caller cannot switch suppression off.
pub const MIN_PENDING_TTL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, PartialEq)]
pub struct PendingOverride {
    pub value: FieldValue,
    pub expires_at: Instant,
}

impl PendingOverride {
    pub fn is_active(&self, now: Instant) -> bool {
        self.expires_at > now
    }
}

/// Locally requested values waiting for the device to echo them back.
#[derive(Debug, Default)]
pub struct PendingOverrideStore {
    entries: HashMap<String, PendingOverride>,
}

impl PendingOverrideStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `value` for `key` until `now + ttl`, replacing any earlier entry.
    pub fn set(&mut self, key: impl Into<String>, value: FieldValue, ttl: Duration, now: Instant) {
        let expires_at = now + ttl.max(MIN_PENDING_TTL);
        self.entries.insert(key.into(), PendingOverride { value, expires_at });
    }

    /// Drops every entry expiring at or before `now`. Returns how many went.
    pub fn sweep(&mut self, now: Instant) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.is_active(now));
        before - self.entries.len()
    }

    pub fn peek(&self, key: &str, now: Instant) -> Option<(&FieldValue, bool)> {
        self.entries
            .get(key)
            .map(|entry| (&entry.value, entry.is_active(now)))
    }

    pub fn clear(&mut self, key: &str) -> Option<PendingOverride> {
        self.entries.remove(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_active_until_ttl() {
        let now = Instant::now();
        let mut store = PendingOverrideStore::new();
        store.set("k", FieldValue::Int(4), Duration::from_secs(2), now);

        assert_eq!(
            store.peek("k", now + Duration::from_millis(1900)),
            Some((&FieldValue::Int(4), true))
        );
        assert_eq!(
            store.peek("k", now + Duration::from_millis(2100)),
            Some((&FieldValue::Int(4), false))
        );
        assert_eq!(store.peek("other", now), None);
    }

    #[test]
    fn test_expiry_boundary_counts_as_expired() {
        let now = Instant::now();
        let mut store = PendingOverrideStore::new();
        store.set("k", FieldValue::Bool(true), Duration::from_secs(1), now);

        assert_eq!(store.sweep(now + Duration::from_secs(1)), 1);
        assert!(store.is_empty());
    }

    #[test]
    fn test_ttl_floor() {
        let now = Instant::now();
        let mut store = PendingOverrideStore::new();
        store.set("k", FieldValue::Int(1), Duration::ZERO, now);

        assert_eq!(store.peek("k", now + Duration::from_millis(50)).map(|(_, a)| a), Some(true));
        assert_eq!(store.peek("k", now + Duration::from_millis(100)).map(|(_, a)| a), Some(false));
    }

    #[test]
    fn test_last_write_wins() {
        let now = Instant::now();
        let mut store = PendingOverrideStore::new();
        store.set("k", FieldValue::Int(1), Duration::from_secs(5), now);
        store.set("k", FieldValue::Int(2), Duration::from_millis(500), now);

        assert_eq!(store.len(), 1);
        assert_eq!(store.peek("k", now), Some((&FieldValue::Int(2), true)));
        assert_eq!(store.sweep(now + Duration::from_secs(1)), 1);
    }

    #[test]
    fn test_sweep_keeps_live_entries() {
        let now = Instant::now();
        let mut store = PendingOverrideStore::new();
        store.set("short", FieldValue::Int(1), Duration::from_millis(200), now);
        store.set("long", FieldValue::Int(2), Duration::from_secs(3), now);

        assert_eq!(store.sweep(now + Duration::from_secs(1)), 1);
        assert_eq!(store.keys().collect::<Vec<_>>(), vec!["long"]);
        assert!(store.clear("long").is_some());
        assert!(store.clear("long").is_none());
    }
}
