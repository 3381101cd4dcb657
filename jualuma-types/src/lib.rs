//! Core types shared across the Jualuma mobile crates.
//!
//! - [`Platform`] / [`DevicePlatform`]: where the app is running and which
//!   push service a device token belongs to
//! - [`ApiError`]: failure value returned by injected backend calls
//! - [`Clock`]: epoch-millisecond time source, swappable in tests

mod api_error;
mod clock;
mod platform;

pub use api_error::ApiError;
pub use clock::{Clock, ManualClock, SystemClock};
pub use platform::{DevicePlatform, Platform};
