//! Push lifecycle configuration.

use serde::{Deserialize, Serialize};

/// Configuration for the push token lifecycle manager.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushConfig {
    /// Storage key holding the persisted lifecycle state.
    pub storage_key: String,
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            storage_key: "jualuma_push_lifecycle_v1".to_string(),
        }
    }
}
