//! Test doubles for the native push plugin, device registry and logger.

#![allow(dead_code)]

use async_trait::async_trait;
use jualuma_push::{
    DeviceRegistry, LifecycleLogger, ListenerHandle, PermissionState, PushError, PushEvent,
    PushEventKind, PushLifecycleHandle, PushLifecycleOptions, PushListener,
    PushNotificationsPlugin, PushResult,
};
use jualuma_storage::MemoryStore;
use jualuma_types::{ApiError, DevicePlatform, Platform};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

// ── Plugin ──────────────────────────────────────────────────────

type ListenerMap = Arc<Mutex<HashMap<PushEventKind, PushListener>>>;

pub struct MockPlugin {
    listeners: ListenerMap,
    permission: Mutex<PermissionState>,
    pub add_listener_calls: AtomicUsize,
    pub permission_requests: AtomicUsize,
    pub register_calls: AtomicUsize,
    pub removed: Arc<AtomicUsize>,
}

impl MockPlugin {
    pub fn new() -> Self {
        Self {
            listeners: Arc::new(Mutex::new(HashMap::new())),
            permission: Mutex::new(PermissionState::Granted),
            add_listener_calls: AtomicUsize::new(0),
            permission_requests: AtomicUsize::new(0),
            register_calls: AtomicUsize::new(0),
            removed: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn set_permission(&self, permission: PermissionState) {
        *self.permission.lock().unwrap() = permission;
    }

    pub fn emit(&self, event: PushEvent) {
        let listener = self.listeners.lock().unwrap().get(&event.kind()).cloned();
        if let Some(listener) = listener {
            listener(event);
        }
    }

    pub fn emit_registration(&self, token: &str) {
        self.emit(PushEvent::Registration {
            value: token.to_string(),
        });
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().unwrap().len()
    }

    pub fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

struct MockListenerHandle {
    kind: PushEventKind,
    listeners: ListenerMap,
    removed: Arc<AtomicUsize>,
}

#[async_trait]
impl ListenerHandle for MockListenerHandle {
    async fn remove(&self) -> PushResult<()> {
        self.listeners.lock().unwrap().remove(&self.kind);
        self.removed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl PushNotificationsPlugin for MockPlugin {
    async fn request_permissions(&self) -> PushResult<PermissionState> {
        self.permission_requests.fetch_add(1, Ordering::SeqCst);
        Ok(*self.permission.lock().unwrap())
    }

    async fn register(&self) -> PushResult<()> {
        self.register_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn add_listener(
        &self,
        kind: PushEventKind,
        listener: PushListener,
    ) -> PushResult<Box<dyn ListenerHandle>> {
        self.add_listener_calls.fetch_add(1, Ordering::SeqCst);
        self.listeners.lock().unwrap().insert(kind, listener);
        Ok(Box::new(MockListenerHandle {
            kind,
            listeners: Arc::clone(&self.listeners),
            removed: Arc::clone(&self.removed),
        }))
    }
}

// ── Registry ────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryCall {
    Register(String, DevicePlatform),
    Deactivate(String),
}

pub fn register(token: &str, platform: DevicePlatform) -> RegistryCall {
    RegistryCall::Register(token.to_string(), platform)
}

pub fn deactivate(token: &str) -> RegistryCall {
    RegistryCall::Deactivate(token.to_string())
}

#[derive(Default)]
pub struct MockRegistry {
    calls: Mutex<Vec<RegistryCall>>,
    register_failures: Mutex<VecDeque<ApiError>>,
    deactivate_failures: Mutex<VecDeque<ApiError>>,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

impl MockRegistry {
    pub fn calls(&self) -> Vec<RegistryCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn deactivations(&self) -> Vec<RegistryCall> {
        self.calls()
            .into_iter()
            .filter(|call| matches!(call, RegistryCall::Deactivate(_)))
            .collect()
    }

    pub fn fail_next_register(&self, error: ApiError) {
        self.register_failures.lock().unwrap().push_back(error);
    }

    pub fn fail_next_deactivate(&self, error: ApiError) {
        self.deactivate_failures.lock().unwrap().push_back(error);
    }

    async fn record(&self, call: RegistryCall, failure: Option<ApiError>) -> Result<(), ApiError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        // Give any concurrently running command a chance to interleave.
        for _ in 0..3 {
            tokio::task::yield_now().await;
        }
        self.calls.lock().unwrap().push(call);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        match failure {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl DeviceRegistry for MockRegistry {
    async fn register_device(&self, token: &str, platform: DevicePlatform) -> Result<(), ApiError> {
        let failure = self.register_failures.lock().unwrap().pop_front();
        self.record(register(token, platform), failure).await
    }

    async fn deactivate_device(&self, token: &str) -> Result<(), ApiError> {
        let failure = self.deactivate_failures.lock().unwrap().pop_front();
        self.record(deactivate(token), failure).await
    }
}

// ── Logger ──────────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingLogger {
    entries: Mutex<Vec<String>>,
}

impl RecordingLogger {
    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().unwrap().clone()
    }
}

impl LifecycleLogger for RecordingLogger {
    fn warn(&self, context: &str, error: &PushError) {
        self.entries.lock().unwrap().push(format!("{context}: {error}"));
    }
}

// ── Fixture ─────────────────────────────────────────────────────

pub struct Fixture {
    pub plugin: Arc<MockPlugin>,
    pub registry: Arc<MockRegistry>,
    pub logger: Arc<RecordingLogger>,
    pub storage: Arc<MemoryStore>,
    pub lifecycle: PushLifecycleHandle,
}

pub fn fixture(platform: Platform) -> Fixture {
    fixture_with_storage(platform, Arc::new(MemoryStore::new()))
}

pub fn fixture_with_storage(platform: Platform, storage: Arc<MemoryStore>) -> Fixture {
    let plugin = Arc::new(MockPlugin::new());
    let registry = Arc::new(MockRegistry::default());
    let logger = Arc::new(RecordingLogger::default());

    let options = PushLifecycleOptions::new(platform, plugin.clone(), registry.clone())
        .with_storage(storage.clone())
        .with_logger(logger.clone());

    Fixture {
        plugin,
        registry,
        logger,
        storage,
        lifecycle: PushLifecycleHandle::spawn(options),
    }
}
