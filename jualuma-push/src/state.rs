//! Persisted push lifecycle state.
//!
//! Stored as `{"observedToken": ..., "syncedByUid": {uid: token}}` under
//! [`crate::PushConfig::storage_key`]. Loading never fails: missing,
//! corrupt or mistyped data falls back to empty fields.

use crate::error::PushResult;
use jualuma_storage::KeyValueStore;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::debug;

/// Token bookkeeping for one installation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushLifecycleState {
    /// Last native token seen, whether or not it was synced.
    pub observed_token: Option<String>,
    /// Token last registered with the server for each user.
    pub synced_by_uid: BTreeMap<String, String>,
}

impl PushLifecycleState {
    /// Loads state from `storage`, tolerating absent or malformed data.
    pub fn load(storage: Option<&dyn KeyValueStore>, key: &str) -> Self {
        let Some(storage) = storage else {
            return Self::default();
        };

        let raw = match storage.get_item(key) {
            Ok(Some(raw)) if !raw.is_empty() => raw,
            Ok(_) => return Self::default(),
            Err(e) => {
                debug!("push lifecycle state unreadable, starting empty: {e}");
                return Self::default();
            }
        };

        match serde_json::from_str::<Value>(&raw) {
            Ok(value) => Self::from_json_lenient(&value),
            Err(e) => {
                debug!("push lifecycle state corrupt, starting empty: {e}");
                Self::default()
            }
        }
    }

    fn from_json_lenient(value: &Value) -> Self {
        let observed_token = value
            .get("observedToken")
            .and_then(Value::as_str)
            .map(str::to_string);

        let synced_by_uid = value
            .get("syncedByUid")
            .and_then(Value::as_object)
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|(uid, token)| Some((uid.clone(), token.as_str()?.to_string())))
                    .collect()
            })
            .unwrap_or_default();

        Self {
            observed_token,
            synced_by_uid,
        }
    }

    /// Writes the state to `storage`. Without storage this is a no-op.
    pub fn persist(&self, storage: Option<&dyn KeyValueStore>, key: &str) -> PushResult<()> {
        if let Some(storage) = storage {
            let json = serde_json::to_string(self)?;
            storage.set_item(key, &json)?;
        }
        Ok(())
    }

    /// The normalized token synced for `uid`, if any.
    pub fn synced_token(&self, uid: &str) -> Option<&str> {
        self.synced_by_uid.get(uid).and_then(|t| normalize_token(t))
    }
}

/// Trims a token; blank tokens count as absent.
pub fn normalize_token(token: &str) -> Option<&str> {
    let trimmed = token.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}
