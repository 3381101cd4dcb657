//! Push notification token lifecycle.
//!
//! Keeps exactly one server-side push registration per signed-in user on
//! this device in step with the native push token, which the OS may rotate
//! at any time:
//! - Native token events and auth changes funnel into one FIFO worker, so
//!   register/deactivate calls never overlap
//! - A rotated token deactivates the user's previous token before the new
//!   one is registered
//! - Logging out deactivates the token synced for that user
//! - State survives restarts through a [`jualuma_storage::KeyValueStore`]
//!
//! The manager is inert on platforms without native push (web, desktop).

pub mod config;
pub mod error;
pub mod lifecycle;
pub mod logger;
pub mod plugin;
pub mod registry;
pub mod state;

pub use config::PushConfig;
pub use error::{PushError, PushResult};
pub use lifecycle::{create_push_lifecycle, PushLifecycleHandle, PushLifecycleOptions, PushLifecycleWorker};
pub use logger::{LifecycleLogger, TracingLogger};
pub use plugin::{ListenerHandle, PermissionState, PushEvent, PushEventKind, PushListener, PushNotificationsPlugin};
pub use registry::DeviceRegistry;
pub use state::PushLifecycleState;
