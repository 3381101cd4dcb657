//! Device registry decorator that retries transient failures.

use async_trait::async_trait;
use jualuma_push::DeviceRegistry;
use jualuma_resilience::Retrier;
use jualuma_types::{ApiError, DevicePlatform};
use std::sync::Arc;

/// Runs every register/deactivate call of `inner` through a [`Retrier`].
///
/// The push lifecycle itself never retries; wrapping its registry here
/// adds retries below the serialized queue.
pub struct RetryingDeviceRegistry {
    inner: Arc<dyn DeviceRegistry>,
    retrier: Retrier,
}

impl RetryingDeviceRegistry {
    pub fn new(inner: Arc<dyn DeviceRegistry>, retrier: Retrier) -> Self {
        Self { inner, retrier }
    }
}

#[async_trait]
impl DeviceRegistry for RetryingDeviceRegistry {
    async fn register_device(&self, token: &str, platform: DevicePlatform) -> Result<(), ApiError> {
        self.retrier
            .run(|| self.inner.register_device(token, platform))
            .await
    }

    async fn deactivate_device(&self, token: &str) -> Result<(), ApiError> {
        self.retrier
            .run(|| self.inner.deactivate_device(token))
            .await
    }
}
