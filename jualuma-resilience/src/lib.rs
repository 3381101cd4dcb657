//! Resilience helpers for mobile data access.
//!
//! - [`retry`]: bounded retry with capped exponential backoff for
//!   transient-only failures
//! - [`connectivity`]: online/offline signal used by retry classification
//! - [`cache`]: time-bounded JSON caching on top of a key-value store

pub mod cache;
pub mod connectivity;
pub mod retry;

pub use cache::{read_cached_value, write_cached_value, ValueCache};
pub use connectivity::{AssumeOnline, Connectivity, ConnectivityMonitor};
pub use retry::{is_retryable_error, with_retry, Retrier, RetryPolicy, RetryableError};
