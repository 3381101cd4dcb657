//! Time-bounded JSON caching on top of a key-value store.
//!
//! Entries are stored as `{"value": ..., "cachedAt": <epoch ms>}`. The
//! maximum age is supplied by the reader, never stored, so staleness is
//! decided at read time and entries are never evicted. Reads and writes
//! never fail: a missing, corrupt or stale entry reads as `None`, and a
//! write that cannot be persisted is dropped.

use jualuma_storage::KeyValueStore;
use jualuma_types::{Clock, SystemClock};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CachedPayload<'a, T> {
    value: &'a T,
    cached_at: i64,
}

/// Reads `key` if it was written no more than `max_age` ago.
pub fn read_cached_value<T: DeserializeOwned>(
    store: &dyn KeyValueStore,
    clock: &dyn Clock,
    key: &str,
    max_age: Duration,
) -> Option<T> {
    let raw = match store.get_item(key) {
        Ok(Some(raw)) if !raw.is_empty() => raw,
        Ok(_) => return None,
        Err(e) => {
            debug!("cache read for {key} failed: {e}");
            return None;
        }
    };

    let mut entry: Map<String, Value> = serde_json::from_str(&raw).ok()?;
    let cached_at = entry.get("cachedAt").and_then(Value::as_f64)?;
    // `"value": null` is a stored value; only a missing key is malformed.
    let value = entry.remove("value")?;

    let age_ms = clock.now_millis() as f64 - cached_at;
    if age_ms > max_age.as_millis() as f64 {
        return None;
    }

    serde_json::from_value(value).ok()
}

/// Writes `value` under `key`, stamped with the current time.
pub fn write_cached_value<T: Serialize>(store: &dyn KeyValueStore, clock: &dyn Clock, key: &str, value: &T) {
    let payload = CachedPayload {
        value,
        cached_at: clock.now_millis(),
    };
    let json = match serde_json::to_string(&payload) {
        Ok(json) => json,
        Err(e) => {
            debug!("cache entry for {key} not serializable: {e}");
            return;
        }
    };
    if let Err(e) = store.set_item(key, &json) {
        debug!("cache write for {key} dropped: {e}");
    }
}

/// A store and clock bundled for repeated cache access.
#[derive(Clone)]
pub struct ValueCache {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
}

impl ValueCache {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self::with_clock(store, Arc::new(SystemClock))
    }

    pub fn with_clock(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub fn read_cached_value<T: DeserializeOwned>(&self, key: &str, max_age: Duration) -> Option<T> {
        read_cached_value(self.store.as_ref(), self.clock.as_ref(), key, max_age)
    }

    pub fn write_cached_value<T: Serialize>(&self, key: &str, value: &T) {
        write_cached_value(self.store.as_ref(), self.clock.as_ref(), key, value);
    }
}
