//! Server-side device registration.

use async_trait::async_trait;
use jualuma_types::{ApiError, DevicePlatform};

/// Backend calls that record which push tokens are live for the signed-in
/// user. Both calls must be idempotent on the server.
#[async_trait]
pub trait DeviceRegistry: Send + Sync {
    async fn register_device(&self, token: &str, platform: DevicePlatform) -> Result<(), ApiError>;

    async fn deactivate_device(&self, token: &str) -> Result<(), ApiError>;
}
