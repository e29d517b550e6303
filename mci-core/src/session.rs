//! Session storage as an injected trait only. Keys are `session:{id}:{field}`,
//! values are opaque strings, and every write is TTL-bounded. The real
//! network-backed store (a key-value cache) is an external collaborator;
//! this crate ships only the trait and two in-process implementations
//! (tests and a single-process fallback).
//!
//! Grounded on `examples/original_source/backend/app/memory.py`'s
//! `session:{id}:{suffix}` keying and TTL writes.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;

pub fn session_key(session_id: &str, field: &str) -> String {
    format!("session:{session_id}:{field}")
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, key: &str) -> Option<String>;
    async fn set(&self, key: &str, value: String, ttl: Duration);
}

struct Entry {
    value: String,
    expires_at: Instant,
}

/// Single-process, in-memory session store. Suitable for tests and for a
/// standalone process with no shared cache; entries expire lazily on read.
#[derive(Default)]
pub struct InMemorySessionStore {
    entries: Mutex<HashMap<String, Entry>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        InMemorySessionStore { entries: Mutex::new(HashMap::new()) }
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get(&self, key: &str) -> Option<String> {
        let mut entries = self.entries.lock().expect("session store lock poisoned");
        match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) {
        let mut entries = self.entries.lock().expect("session store lock poisoned");
        entries.insert(key.to_string(), Entry { value, expires_at: Instant::now() + ttl });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn round_trips_a_value() {
        let store = InMemorySessionStore::new();
        let key = session_key("abc", "style");
        store.set(&key, "analytical".into(), Duration::from_secs(60)).await;
        assert_eq!(store.get(&key).await, Some("analytical".to_string()));
    }

    #[tokio::test]
    async fn expired_entries_read_back_as_none() {
        let store = InMemorySessionStore::new();
        let key = session_key("abc", "summary");
        store.set(&key, "x".into(), Duration::from_millis(0)).await;
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert_eq!(store.get(&key).await, None);
    }

    #[tokio::test]
    async fn missing_key_reads_back_as_none() {
        let store = InMemorySessionStore::new();
        assert_eq!(store.get(&session_key("nope", "style")).await, None);
    }
}
