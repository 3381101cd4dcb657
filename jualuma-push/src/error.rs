//! Push lifecycle error types.

use crate::plugin::PermissionState;
use jualuma_storage::StorageError;
use jualuma_types::ApiError;
use thiserror::Error;

/// Result type for push lifecycle operations.
pub type PushResult<T> = Result<T, PushError>;

/// Errors raised inside a unit of lifecycle work.
///
/// These never reach callers of the public operations; the worker hands
/// them to the injected [`crate::LifecycleLogger`].
#[derive(Debug, Error)]
pub enum PushError {
    #[error("device registry call failed: {0}")]
    Api(#[from] ApiError),

    #[error("push state persistence failed: {0}")]
    Storage(#[from] StorageError),

    #[error("push state serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("push plugin error: {0}")]
    Plugin(String),

    #[error("push permission not granted: {0}")]
    PermissionDenied(PermissionState),

    #[error("native push registration error: {0}")]
    NativeRegistration(String),

    #[error("push lifecycle worker is not running")]
    WorkerStopped,
}
