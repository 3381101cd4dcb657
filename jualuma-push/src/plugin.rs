//! Native push plugin capability.

use crate::error::PushResult;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

/// Outcome of a push permission request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionState {
    Granted,
    Denied,
    /// The user has not answered yet.
    Prompt,
}

impl fmt::Display for PermissionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PermissionState::Granted => write!(f, "granted"),
            PermissionState::Denied => write!(f, "denied"),
            PermissionState::Prompt => write!(f, "prompt"),
        }
    }
}

/// Event kinds a listener can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PushEventKind {
    Registration,
    RegistrationError,
}

/// Events delivered by the native push layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushEvent {
    /// The OS issued (or rotated) the device token.
    Registration { value: String },
    /// The OS failed to issue a token.
    RegistrationError { error: Option<String> },
}

impl PushEvent {
    pub fn kind(&self) -> PushEventKind {
        match self {
            PushEvent::Registration { .. } => PushEventKind::Registration,
            PushEvent::RegistrationError { .. } => PushEventKind::RegistrationError,
        }
    }
}

/// Callback invoked by the plugin for each subscribed event.
pub type PushListener = Arc<dyn Fn(PushEvent) + Send + Sync>;

/// Subscription returned by [`PushNotificationsPlugin::add_listener`].
#[async_trait]
pub trait ListenerHandle: Send + Sync {
    /// Stops delivery to the listener.
    async fn remove(&self) -> PushResult<()>;
}

/// The native push notifications plugin.
#[async_trait]
pub trait PushNotificationsPlugin: Send + Sync {
    async fn request_permissions(&self) -> PushResult<PermissionState>;

    /// Asks the OS for a token. The token arrives later as a
    /// [`PushEvent::Registration`].
    async fn register(&self) -> PushResult<()>;

    async fn add_listener(
        &self,
        kind: PushEventKind,
        listener: PushListener,
    ) -> PushResult<Box<dyn ListenerHandle>>;
}
