use crate::error::PushError;
use tracing::warn;

/// Receives failures contained by the lifecycle worker.
pub trait LifecycleLogger: Send + Sync {
    fn warn(&self, context: &str, error: &PushError);
}

/// Forwards contained failures to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl LifecycleLogger for TracingLogger {
    fn warn(&self, context: &str, error: &PushError) {
        warn!("{context}: {error}");
    }
}
