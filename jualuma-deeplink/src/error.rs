//! Deep link error types.

use thiserror::Error;

/// Result type for native deep link plugin calls.
pub type DeepLinkResult<T> = Result<T, DeepLinkError>;

/// Failures reported by the native app plugin.
///
/// Route resolution itself never fails; unusable URLs resolve to `None`.
#[derive(Debug, Error)]
pub enum DeepLinkError {
    #[error("app plugin error: {0}")]
    Plugin(String),
}
