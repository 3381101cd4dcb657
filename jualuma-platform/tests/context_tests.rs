use async_trait::async_trait;
use jualuma_deeplink::{DeepLinkResult, ListenerHandle as AppListenerHandle, NativeAppPlugin, UrlOpenListener};
use jualuma_platform::{
    attach_deep_link_listener, deactivate_push_lifecycle_token_for_uid, dispose_push_lifecycle,
    set_push_lifecycle_authenticated_uid, AppContext, AppContextBuilder, PlatformConfig,
};
use jualuma_push::{
    DeviceRegistry, ListenerHandle, PermissionState, PushEvent, PushEventKind, PushListener,
    PushNotificationsPlugin, PushResult,
};
use jualuma_resilience::RetryPolicy;
use jualuma_storage::{KeyValueStore, MemoryStore};
use jualuma_types::{ApiError, DevicePlatform, ManualClock, Platform};
use pretty_assertions::assert_eq;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ── Doubles ─────────────────────────────────────────────────────

#[derive(Default)]
struct FakePushPlugin {
    registration: Mutex<Option<PushListener>>,
}

impl FakePushPlugin {
    fn issue_token(&self, token: &str) {
        let listener = self.registration.lock().unwrap().clone();
        if let Some(listener) = listener {
            listener(PushEvent::Registration {
                value: token.to_string(),
            });
        }
    }
}

struct NoopHandle;

#[async_trait]
impl ListenerHandle for NoopHandle {
    async fn remove(&self) -> PushResult<()> {
        Ok(())
    }
}

#[async_trait]
impl PushNotificationsPlugin for FakePushPlugin {
    async fn request_permissions(&self) -> PushResult<PermissionState> {
        Ok(PermissionState::Granted)
    }

    async fn register(&self) -> PushResult<()> {
        Ok(())
    }

    async fn add_listener(
        &self,
        kind: PushEventKind,
        listener: PushListener,
    ) -> PushResult<Box<dyn ListenerHandle>> {
        if kind == PushEventKind::Registration {
            *self.registration.lock().unwrap() = Some(listener);
        }
        Ok(Box::new(NoopHandle))
    }
}

#[derive(Default)]
struct FlakyRegistry {
    failures: Mutex<VecDeque<ApiError>>,
    registered: Mutex<Vec<(String, DevicePlatform)>>,
    deactivated: Mutex<Vec<String>>,
    attempts: Mutex<usize>,
}

impl FlakyRegistry {
    fn fail_next(&self, error: ApiError) {
        self.failures.lock().unwrap().push_back(error);
    }

    fn next_failure(&self) -> Option<ApiError> {
        *self.attempts.lock().unwrap() += 1;
        self.failures.lock().unwrap().pop_front()
    }
}

#[async_trait]
impl DeviceRegistry for FlakyRegistry {
    async fn register_device(&self, token: &str, platform: DevicePlatform) -> Result<(), ApiError> {
        if let Some(error) = self.next_failure() {
            return Err(error);
        }
        self.registered
            .lock()
            .unwrap()
            .push((token.to_string(), platform));
        Ok(())
    }

    async fn deactivate_device(&self, token: &str) -> Result<(), ApiError> {
        if let Some(error) = self.next_failure() {
            return Err(error);
        }
        self.deactivated.lock().unwrap().push(token.to_string());
        Ok(())
    }
}

struct Harness {
    ctx: AppContext,
    plugin: Arc<FakePushPlugin>,
    registry: Arc<FlakyRegistry>,
    storage: Arc<MemoryStore>,
}

fn harness(platform: Platform) -> Harness {
    let plugin = Arc::new(FakePushPlugin::default());
    let registry = Arc::new(FlakyRegistry::default());
    let storage = Arc::new(MemoryStore::new());
    let config = PlatformConfig {
        platform,
        ..Default::default()
    };

    let ctx = AppContextBuilder::new(config, plugin.clone(), registry.clone())
        .with_storage(storage.clone())
        .build()
        .unwrap();

    Harness {
        ctx,
        plugin,
        registry,
        storage,
    }
}

// ── Push wiring ─────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn push_lifecycle_registers_through_context() {
    let h = harness(Platform::Android);

    set_push_lifecycle_authenticated_uid(&h.ctx, Some("uid-1")).await;
    h.plugin.issue_token("token-1");
    h.ctx.push().flush().await;

    assert_eq!(
        *h.registry.registered.lock().unwrap(),
        vec![("token-1".to_string(), DevicePlatform::Android)]
    );
    assert!(h
        .storage
        .get_item("jualuma_push_lifecycle_v1")
        .unwrap()
        .is_some());
}

#[tokio::test(start_paused = true)]
async fn transient_registry_failures_are_retried() {
    let h = harness(Platform::Ios);
    h.registry.fail_next(ApiError::with_status(503, "Service unavailable"));
    h.registry.fail_next(ApiError::new("Failed to fetch"));

    set_push_lifecycle_authenticated_uid(&h.ctx, Some("uid-1")).await;
    h.plugin.issue_token("token-1");
    h.ctx.push().flush().await;

    assert_eq!(*h.registry.attempts.lock().unwrap(), 3);
    assert_eq!(h.registry.registered.lock().unwrap().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn permanent_registry_failures_are_not_retried() {
    let h = harness(Platform::Ios);
    h.registry.fail_next(ApiError::with_status(401, "Unauthorized"));

    set_push_lifecycle_authenticated_uid(&h.ctx, Some("uid-1")).await;
    h.plugin.issue_token("token-1");
    h.ctx.push().flush().await;

    assert_eq!(*h.registry.attempts.lock().unwrap(), 1);
    assert!(h.registry.registered.lock().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn offline_failures_are_retried_with_custom_policy() {
    let plugin = Arc::new(FakePushPlugin::default());
    let registry = Arc::new(FlakyRegistry::default());
    let ctx = AppContextBuilder::new(
        PlatformConfig {
            platform: Platform::Ios,
            ..Default::default()
        },
        plugin.clone(),
        registry.clone(),
    )
    .with_storage(Arc::new(MemoryStore::new()))
    .with_retry_policy(RetryPolicy::new(
        2,
        Duration::from_millis(100),
        Duration::from_millis(100),
    ))
    .build()
    .unwrap();

    ctx.connectivity().set_online(false);
    registry.fail_next(ApiError::new("bad request"));
    registry.fail_next(ApiError::new("bad request"));

    set_push_lifecycle_authenticated_uid(&ctx, Some("uid-1")).await;
    plugin.issue_token("token-1");
    ctx.push().flush().await;

    // Offline makes any failure transient; the budget of 2 is spent.
    assert_eq!(*registry.attempts.lock().unwrap(), 2);
    assert!(registry.registered.lock().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn logout_deactivates_and_dispose_stops_listening() {
    let h = harness(Platform::Ios);

    set_push_lifecycle_authenticated_uid(&h.ctx, Some("uid-1")).await;
    h.plugin.issue_token("token-1");
    h.ctx.push().flush().await;

    deactivate_push_lifecycle_token_for_uid(&h.ctx, None).await;
    assert_eq!(*h.registry.deactivated.lock().unwrap(), vec!["token-1"]);

    dispose_push_lifecycle(&h.ctx).await;
    assert!(h.ctx.push().is_disposed());
}

// ── Storage ─────────────────────────────────────────────────────

#[tokio::test]
async fn file_storage_is_opened_from_config() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("storage.json");
    let config = PlatformConfig {
        platform: Platform::Ios,
        storage_path: Some(path.clone()),
        ..Default::default()
    };

    let ctx = AppContextBuilder::new(
        config,
        Arc::new(FakePushPlugin::default()),
        Arc::new(FlakyRegistry::default()),
    )
    .build()
    .unwrap();

    ctx.storage().set_item("greeting", "hello").unwrap();
    assert!(path.exists());
}

#[tokio::test]
async fn corrupt_storage_file_fails_build() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("storage.json");
    std::fs::write(&path, "{not json").unwrap();

    let result = AppContextBuilder::new(
        PlatformConfig {
            storage_path: Some(path),
            ..Default::default()
        },
        Arc::new(FakePushPlugin::default()),
        Arc::new(FlakyRegistry::default()),
    )
    .build();

    let error = result.err().expect("corrupt storage should fail");
    assert!(error.to_string().starts_with("failed to open storage at"));
}

#[tokio::test]
async fn cache_uses_context_storage_and_clock() {
    let storage = Arc::new(MemoryStore::new());
    let clock = Arc::new(ManualClock::new(1_000));
    let ctx = AppContextBuilder::new(
        PlatformConfig::default(),
        Arc::new(FakePushPlugin::default()),
        Arc::new(FlakyRegistry::default()),
    )
    .with_storage(storage.clone())
    .with_clock(clock.clone())
    .build()
    .unwrap();

    ctx.cache().write_cached_value("threads", &vec!["t1", "t2"]);
    let max_age = Duration::from_millis(500);
    assert_eq!(
        ctx.cache().read_cached_value::<Vec<String>>("threads", max_age),
        Some(vec!["t1".to_string(), "t2".to_string()])
    );

    clock.advance(501);
    assert_eq!(ctx.cache().read_cached_value::<Vec<String>>("threads", max_age), None);
    assert!(storage.get_item("threads").unwrap().is_some());
}

// ── Deep links ──────────────────────────────────────────────────

#[derive(Default)]
struct FakeAppPlugin {
    listener: Mutex<Option<UrlOpenListener>>,
}

#[async_trait]
impl NativeAppPlugin for FakeAppPlugin {
    async fn get_launch_url(&self) -> DeepLinkResult<Option<String>> {
        Ok(Some("https://app.jualuma.com/verify-email?token=abc123".into()))
    }

    async fn add_url_open_listener(
        &self,
        listener: UrlOpenListener,
    ) -> DeepLinkResult<Box<dyn AppListenerHandle>> {
        *self.listener.lock().unwrap() = Some(listener);
        Ok(Box::new(NoopAppHandle))
    }
}

struct NoopAppHandle;

#[async_trait]
impl AppListenerHandle for NoopAppHandle {
    async fn remove(&self) -> DeepLinkResult<()> {
        Ok(())
    }
}

#[tokio::test]
async fn deep_links_use_configured_resolver() {
    let mut config = PlatformConfig {
        platform: Platform::Android,
        ..Default::default()
    };
    config.deep_link.scheme = "jualumadev".into();
    let ctx = AppContextBuilder::new(
        config,
        Arc::new(FakePushPlugin::default()),
        Arc::new(FlakyRegistry::default()),
    )
    .with_storage(Arc::new(MemoryStore::new()))
    .build()
    .unwrap();

    let routes = Arc::new(Mutex::new(Vec::new()));
    let recorded = Arc::clone(&routes);
    let plugin = Arc::new(FakeAppPlugin::default());
    let listener = attach_deep_link_listener(&ctx, plugin.clone(), move |route| {
        recorded.lock().unwrap().push(route)
    });
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }

    let on_open = plugin.listener.lock().unwrap().clone().unwrap();
    on_open("jualumadev://dashboard".into());
    on_open("jualuma://dashboard".into());

    assert_eq!(
        *routes.lock().unwrap(),
        vec!["/verify-email?token=abc123", "/dashboard"]
    );
    listener.teardown();
}

#[tokio::test]
async fn deep_link_listener_is_inert_on_web() {
    let h = harness(Platform::Web);
    let listener = attach_deep_link_listener(
        &h.ctx,
        Arc::new(FakeAppPlugin::default()),
        |_route| panic!("web must not navigate"),
    );
    assert!(listener.is_closed());
}
