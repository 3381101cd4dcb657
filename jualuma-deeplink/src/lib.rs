//! Deep link handling for the Jualuma mobile apps.
//!
//! Turns URLs handed over by the OS (custom `jualuma://` links or links to
//! one of our own web hosts) into internal router paths, and wires the
//! native "app URL opened" events to a navigation callback.

pub mod config;
pub mod error;
pub mod listener;
pub mod resolver;

pub use config::DeepLinkConfig;
pub use error::{DeepLinkError, DeepLinkResult};
pub use listener::{
    attach_native_deep_link_listener, DeepLinkListener, ListenerHandle, NativeAppPlugin,
    UrlOpenListener,
};
pub use resolver::{normalize_path, DeepLinkResolver, DEFAULT_WEB_HOSTS};

use std::sync::OnceLock;

static ENV_RESOLVER: OnceLock<DeepLinkResolver> = OnceLock::new();

/// Resolves `raw_url` with a resolver configured from the process
/// environment. The environment is read on first call only.
pub fn extract_app_route_from_deep_link(raw_url: &str) -> Option<String> {
    ENV_RESOLVER
        .get_or_init(DeepLinkResolver::from_env)
        .extract_app_route(raw_url)
}
