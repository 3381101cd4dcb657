//! Native "app URL opened" wiring.
//!
//! On native platforms the listener routes the launch URL (the link that
//! cold-started the app, if any) and every URL opened while running
//! through a [`DeepLinkResolver`] into a navigation callback. Once torn
//! down, neither path navigates again.

use crate::error::DeepLinkResult;
use crate::resolver::DeepLinkResolver;
use async_trait::async_trait;
use jualuma_types::Platform;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::runtime::Handle;
use tracing::debug;

/// Callback invoked by the plugin with each opened URL.
pub type UrlOpenListener = Arc<dyn Fn(String) + Send + Sync>;

type Navigate = Arc<dyn Fn(String) + Send + Sync>;

/// Subscription returned by [`NativeAppPlugin::add_url_open_listener`].
#[async_trait]
pub trait ListenerHandle: Send + Sync {
    async fn remove(&self) -> DeepLinkResult<()>;
}

/// The native app shell plugin.
#[async_trait]
pub trait NativeAppPlugin: Send + Sync {
    /// The URL that launched the app, if it was launched by a link.
    async fn get_launch_url(&self) -> DeepLinkResult<Option<String>>;

    async fn add_url_open_listener(
        &self,
        listener: UrlOpenListener,
    ) -> DeepLinkResult<Box<dyn ListenerHandle>>;
}

#[derive(Default)]
struct ListenerState {
    closed: AtomicBool,
    subscription: Mutex<Option<Box<dyn ListenerHandle>>>,
}

impl ListenerState {
    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Keeps `handle` unless already closed, in which case it is returned
    /// for removal.
    fn adopt(&self, handle: Box<dyn ListenerHandle>) -> Option<Box<dyn ListenerHandle>> {
        let mut guard = self
            .subscription
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if self.is_closed() {
            return Some(handle);
        }
        *guard = Some(handle);
        None
    }

    fn close(&self) -> Option<Box<dyn ListenerHandle>> {
        self.closed.store(true, Ordering::SeqCst);
        self.subscription
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take()
    }
}

/// A live deep link subscription. Dropping it tears it down.
pub struct DeepLinkListener {
    state: Arc<ListenerState>,
    runtime: Option<Handle>,
}

impl DeepLinkListener {
    fn inert() -> Self {
        let state = ListenerState::default();
        state.closed.store(true, Ordering::SeqCst);
        Self {
            state: Arc::new(state),
            runtime: None,
        }
    }

    /// Stops navigation and releases the native subscription. Safe to call
    /// more than once.
    pub fn teardown(&self) {
        let Some(handle) = self.state.close() else {
            return;
        };
        if let Some(runtime) = &self.runtime {
            runtime.spawn(async move { remove_quietly(handle).await });
        }
    }

    pub fn is_closed(&self) -> bool {
        self.state.is_closed()
    }
}

impl Drop for DeepLinkListener {
    fn drop(&mut self) {
        self.teardown();
    }
}

async fn remove_quietly(handle: Box<dyn ListenerHandle>) {
    if let Err(e) = handle.remove().await {
        debug!("deep link listener removal failed: {e}");
    }
}

fn route_and_navigate(resolver: &DeepLinkResolver, navigate: &Navigate, url: Option<String>) {
    let Some(url) = url.filter(|url| !url.is_empty()) else {
        return;
    };
    if let Some(route) = resolver.extract_app_route(&url) {
        debug!("navigating to deep link route {route}");
        navigate(route);
    }
}

/// Routes native deep links into `navigate_to` until the returned listener
/// is torn down.
///
/// On web, or when called outside a tokio runtime, this does nothing and
/// returns an already closed listener. Otherwise the launch URL lookup and
/// the subscription run on the current runtime; plugin failures are logged
/// and swallowed.
pub fn attach_native_deep_link_listener(
    platform: &Platform,
    plugin: Arc<dyn NativeAppPlugin>,
    resolver: Arc<DeepLinkResolver>,
    navigate_to: impl Fn(String) + Send + Sync + 'static,
) -> DeepLinkListener {
    if !platform.is_native() {
        return DeepLinkListener::inert();
    }

    let Ok(runtime) = Handle::try_current() else {
        debug!("no tokio runtime, deep link listener not attached");
        return DeepLinkListener::inert();
    };
    let state = Arc::new(ListenerState::default());
    let navigate: Navigate = Arc::new(navigate_to);

    let on_url_open: UrlOpenListener = {
        let state = Arc::clone(&state);
        let resolver = Arc::clone(&resolver);
        let navigate = Arc::clone(&navigate);
        Arc::new(move |url| {
            if state.is_closed() {
                return;
            }
            route_and_navigate(&resolver, &navigate, Some(url));
        })
    };

    let launch = {
        let plugin = Arc::clone(&plugin);
        let state = Arc::clone(&state);
        async move {
            match plugin.get_launch_url().await {
                Ok(url) if !state.is_closed() => route_and_navigate(&resolver, &navigate, url),
                Ok(_) => {}
                Err(e) => debug!("launch url lookup failed: {e}"),
            }
        }
    };

    let subscribe = {
        let state = Arc::clone(&state);
        async move {
            match plugin.add_url_open_listener(on_url_open).await {
                Ok(handle) => {
                    if let Some(late) = state.adopt(handle) {
                        remove_quietly(late).await;
                    }
                }
                Err(e) => debug!("url open subscription failed: {e}"),
            }
        }
    };

    runtime.spawn(async move {
        tokio::join!(launch, subscribe);
    });

    DeepLinkListener {
        state,
        runtime: Some(runtime),
    }
}
