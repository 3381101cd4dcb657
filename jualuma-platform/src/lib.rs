//! Composition root for the Jualuma mobile core.
//!
//! Reads [`PlatformConfig`] from the environment, installs logging and
//! builds an [`AppContext`]. The free functions below are the entry points
//! the app shell calls on auth changes, logout and startup.

pub mod config;
pub mod context;
pub mod logging;
pub mod registry;

pub use config::PlatformConfig;
pub use context::{AppContext, AppContextBuilder};
pub use logging::init_logging;
pub use registry::RetryingDeviceRegistry;

use jualuma_deeplink::{attach_native_deep_link_listener, DeepLinkListener, NativeAppPlugin};
use std::sync::Arc;

/// Call whenever the signed-in user changes (`None` on sign-out).
pub async fn set_push_lifecycle_authenticated_uid(ctx: &AppContext, uid: Option<&str>) {
    ctx.push().set_authenticated_uid(uid).await;
}

/// Call on logout, before credentials are dropped.
pub async fn deactivate_push_lifecycle_token_for_uid(ctx: &AppContext, uid: Option<&str>) {
    ctx.push().deactivate_synced_token_for_uid(uid).await;
}

pub async fn dispose_push_lifecycle(ctx: &AppContext) {
    ctx.push().dispose().await;
}

/// Routes native deep links into `navigate_to` using the context's
/// resolver. Keep the returned listener alive for as long as navigation
/// should happen.
pub fn attach_deep_link_listener(
    ctx: &AppContext,
    plugin: Arc<dyn NativeAppPlugin>,
    navigate_to: impl Fn(String) + Send + Sync + 'static,
) -> DeepLinkListener {
    attach_native_deep_link_listener(
        ctx.platform(),
        plugin,
        Arc::clone(ctx.deep_links()),
        navigate_to,
    )
}
