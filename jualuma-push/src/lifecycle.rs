//! Serialized push token lifecycle worker.
//!
//! Every public operation and every native token event becomes a
//! command on one FIFO channel. A single worker drains the
//! channel and runs each command to completion before taking the next, so
//! register/deactivate calls for this device never overlap and a token
//! rotation cannot interleave with a user switch.
//!
//! Failures inside a command are handed to the injected
//! [`LifecycleLogger`] and the worker moves on to the next command.

use crate::config::PushConfig;
use crate::error::{PushError, PushResult};
use crate::logger::{LifecycleLogger, TracingLogger};
use crate::plugin::{
    ListenerHandle, PermissionState, PushEvent, PushEventKind, PushListener,
    PushNotificationsPlugin,
};
use crate::registry::DeviceRegistry;
use crate::state::{normalize_token, PushLifecycleState};
use jualuma_storage::KeyValueStore;
use jualuma_types::{DevicePlatform, Platform};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

/// Dependencies and settings for a push lifecycle manager.
pub struct PushLifecycleOptions {
    pub platform: Platform,
    pub plugin: Arc<dyn PushNotificationsPlugin>,
    pub registry: Arc<dyn DeviceRegistry>,
    /// `None` keeps state in memory only.
    pub storage: Option<Arc<dyn KeyValueStore>>,
    pub logger: Arc<dyn LifecycleLogger>,
    pub config: PushConfig,
}

impl PushLifecycleOptions {
    pub fn new(
        platform: Platform,
        plugin: Arc<dyn PushNotificationsPlugin>,
        registry: Arc<dyn DeviceRegistry>,
    ) -> Self {
        Self {
            platform,
            plugin,
            registry,
            storage: None,
            logger: Arc::new(TracingLogger),
            config: PushConfig::default(),
        }
    }

    pub fn with_storage(mut self, storage: Arc<dyn KeyValueStore>) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn with_logger(mut self, logger: Arc<dyn LifecycleLogger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn with_config(mut self, config: PushConfig) -> Self {
        self.config = config;
        self
    }
}

/// Units of work processed by the worker, in arrival order.
#[derive(Debug)]
enum LifecycleCommand {
    SetAuthenticatedUid {
        uid: Option<String>,
        done: oneshot::Sender<()>,
    },
    DeactivateSyncedToken {
        uid: Option<String>,
        done: oneshot::Sender<()>,
    },
    /// A token delivered by the native `registration` event.
    NativeToken { value: String },
    Flush { done: oneshot::Sender<()> },
    Snapshot {
        reply: oneshot::Sender<PushLifecycleState>,
    },
}

/// Native subscription bookkeeping shared by handles and the worker.
#[derive(Default)]
struct NativeListeners {
    disposed: AtomicBool,
    attached: AtomicBool,
    handles: Mutex<Vec<Box<dyn ListenerHandle>>>,
}

impl NativeListeners {
    fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    fn store(&self, mut handles: Vec<Box<dyn ListenerHandle>>) {
        let mut guard = self.handles.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        guard.append(&mut handles);
    }

    fn take(&self) -> Vec<Box<dyn ListenerHandle>> {
        let mut guard = self.handles.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        std::mem::take(&mut *guard)
    }
}

async fn remove_all(handles: Vec<Box<dyn ListenerHandle>>) {
    let removals = handles.iter().map(|handle| handle.remove());
    for result in futures::future::join_all(removals).await {
        if let Err(e) = result {
            debug!("push listener removal failed: {e}");
        }
    }
}

/// Handle for scheduling work on the push lifecycle worker.
///
/// Clones share the same worker. Each operation resolves once its unit of
/// work has settled; none of them report failure to the caller.
#[derive(Clone)]
pub struct PushLifecycleHandle {
    command_tx: mpsc::UnboundedSender<LifecycleCommand>,
    listeners: Arc<NativeListeners>,
}

impl PushLifecycleHandle {
    /// Creates a lifecycle manager and spawns its worker on the current
    /// tokio runtime.
    pub fn spawn(options: PushLifecycleOptions) -> Self {
        let (handle, worker) = create_push_lifecycle(options);
        tokio::spawn(worker.run());
        handle
    }

    /// Makes `uid` the active user (or signs out with `None`) and syncs the
    /// observed token for them. Attaches native listeners on first use.
    pub async fn set_authenticated_uid(&self, uid: Option<&str>) {
        let uid = uid.map(str::to_string);
        self.submit(|done| LifecycleCommand::SetAuthenticatedUid { uid, done })
            .await;
    }

    /// Deactivates the token synced for `uid` (or the active user) and
    /// forgets it.
    pub async fn deactivate_synced_token_for_uid(&self, uid: Option<&str>) {
        let uid = uid.map(str::to_string);
        self.submit(|done| LifecycleCommand::DeactivateSyncedToken { uid, done })
            .await;
    }

    /// Resolves once everything enqueued before it has settled.
    pub async fn flush(&self) {
        self.submit(|done| LifecycleCommand::Flush { done }).await;
    }

    /// Returns the worker's current state, or `None` if it has stopped.
    pub async fn snapshot(&self) -> Option<PushLifecycleState> {
        let (reply, rx) = oneshot::channel();
        self.command_tx
            .send(LifecycleCommand::Snapshot { reply })
            .ok()?;
        rx.await.ok()
    }

    /// Makes the manager permanently inert and removes native listeners.
    /// Work already enqueued still drains.
    pub async fn dispose(&self) {
        self.listeners.disposed.store(true, Ordering::SeqCst);
        self.listeners.attached.store(false, Ordering::SeqCst);
        remove_all(self.listeners.take()).await;
        debug!("push lifecycle disposed");
    }

    pub fn is_disposed(&self) -> bool {
        self.listeners.is_disposed()
    }

    async fn submit(&self, command: impl FnOnce(oneshot::Sender<()>) -> LifecycleCommand) {
        let (done, rx) = oneshot::channel();
        if self.command_tx.send(command(done)).is_err() {
            debug!("{}", PushError::WorkerStopped);
            return;
        }
        // A dropped sender means the worker stopped mid-command.
        let _ = rx.await;
    }
}

/// Creates a lifecycle handle and the worker that must be run for it.
///
/// The worker exits once every [`PushLifecycleHandle`] has been dropped.
pub fn create_push_lifecycle(
    options: PushLifecycleOptions,
) -> (PushLifecycleHandle, PushLifecycleWorker) {
    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let listeners = Arc::new(NativeListeners::default());

    let device_platform = options.platform.device_platform();
    if device_platform.is_none() {
        debug!(
            "push notifications unsupported on {}, lifecycle is inert",
            options.platform
        );
    }

    let state = PushLifecycleState::load(options.storage.as_deref(), &options.config.storage_key);

    let worker = PushLifecycleWorker {
        command_rx,
        command_tx: command_tx.downgrade(),
        device_platform,
        plugin: options.plugin,
        registry: options.registry,
        storage: options.storage,
        logger: options.logger,
        config: options.config,
        listeners: Arc::clone(&listeners),
        state,
        active_uid: None,
    };

    let handle = PushLifecycleHandle {
        command_tx,
        listeners,
    };

    (handle, worker)
}

/// Owns the lifecycle state and executes commands one at a time.
pub struct PushLifecycleWorker {
    command_rx: mpsc::UnboundedReceiver<LifecycleCommand>,
    /// Weak so native listeners do not keep the worker alive.
    command_tx: mpsc::WeakUnboundedSender<LifecycleCommand>,
    device_platform: Option<DevicePlatform>,
    plugin: Arc<dyn PushNotificationsPlugin>,
    registry: Arc<dyn DeviceRegistry>,
    storage: Option<Arc<dyn KeyValueStore>>,
    logger: Arc<dyn LifecycleLogger>,
    config: PushConfig,
    listeners: Arc<NativeListeners>,
    state: PushLifecycleState,
    active_uid: Option<String>,
}

impl PushLifecycleWorker {
    /// Runs the worker until every handle is dropped.
    pub async fn run(mut self) {
        debug!("push lifecycle worker started");
        while let Some(command) = self.command_rx.recv().await {
            self.dispatch(command).await;
        }
        debug!("push lifecycle worker stopped");
    }

    async fn dispatch(&mut self, command: LifecycleCommand) {
        match command {
            LifecycleCommand::SetAuthenticatedUid { uid, done } => {
                let result = self.set_authenticated_uid(uid).await;
                self.report(result);
                let _ = done.send(());
            }
            LifecycleCommand::DeactivateSyncedToken { uid, done } => {
                let result = self.deactivate_synced_token_for_uid(uid).await;
                self.report(result);
                let _ = done.send(());
            }
            LifecycleCommand::NativeToken { value } => {
                let result = self.handle_native_token(&value).await;
                self.report(result);
            }
            LifecycleCommand::Flush { done } => {
                let _ = done.send(());
            }
            LifecycleCommand::Snapshot { reply } => {
                let _ = reply.send(self.state.clone());
            }
        }
    }

    fn report(&self, result: PushResult<()>) {
        if let Err(e) = result {
            self.logger.warn("push token lifecycle operation failed", &e);
        }
    }

    fn persist(&self) -> PushResult<()> {
        self.state
            .persist(self.storage.as_deref(), &self.config.storage_key)
    }

    async fn set_authenticated_uid(&mut self, uid: Option<String>) -> PushResult<()> {
        self.attach_listeners().await?;

        // An empty uid means nobody is signed in.
        let uid = uid.filter(|uid| !uid.is_empty());
        if self.active_uid != uid {
            debug!("push lifecycle active user changed");
        }
        self.active_uid = uid;
        if self.active_uid.is_none() {
            return Ok(());
        }

        self.sync_token_for_active_user().await?;
        if self.state.observed_token.is_none() {
            self.request_native_token_refresh().await;
        }
        Ok(())
    }

    async fn deactivate_synced_token_for_uid(&mut self, uid: Option<String>) -> PushResult<()> {
        if self.device_platform.is_none() {
            return Ok(());
        }
        let Some(target) = uid
            .or_else(|| self.active_uid.clone())
            .filter(|target| !target.is_empty())
        else {
            return Ok(());
        };

        if let Some(token) = self.state.synced_token(&target).map(str::to_string) {
            self.registry.deactivate_device(&token).await?;
            info!("deactivated push token for {target}");
        }
        self.state.synced_by_uid.remove(&target);
        self.persist()?;

        if self.active_uid.as_deref() == Some(target.as_str()) {
            self.active_uid = None;
        }
        Ok(())
    }

    async fn handle_native_token(&mut self, token: &str) -> PushResult<()> {
        let Some(normalized) = normalize_token(token) else {
            return Ok(());
        };

        self.state.observed_token = Some(normalized.to_string());
        self.persist()?;
        self.sync_token_for_active_user().await
    }

    /// Registers the observed token for the active user, first
    /// deactivating a different token previously synced for them.
    async fn sync_token_for_active_user(&mut self) -> PushResult<()> {
        let Some(platform) = self.device_platform else {
            return Ok(());
        };
        let Some(uid) = self.active_uid.clone() else {
            return Ok(());
        };
        let Some(next_token) = self
            .state
            .observed_token
            .as_deref()
            .and_then(normalize_token)
            .map(str::to_string)
        else {
            return Ok(());
        };

        if let Some(previous) = self.state.synced_token(&uid).map(str::to_string) {
            if previous != next_token {
                debug!("push token rotated for {uid}, deactivating previous token");
                if let Err(e) = self.registry.deactivate_device(&previous).await {
                    self.logger
                        .warn("failed to deactivate stale push token", &PushError::from(e));
                }
            }
        }

        self.registry.register_device(&next_token, platform).await?;
        info!("registered {platform} push token for {uid}");
        self.state.synced_by_uid.insert(uid, next_token);
        self.persist()
    }

    async fn attach_listeners(&self) -> PushResult<()> {
        if self.device_platform.is_none() || self.listeners.is_disposed() {
            return Ok(());
        }
        if self.listeners.attached.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let handles = match self.subscribe().await {
            Ok(handles) => handles,
            Err(e) => {
                self.listeners.attached.store(false, Ordering::SeqCst);
                return Err(e);
            }
        };

        if self.listeners.is_disposed() {
            // Disposed while subscribing; nothing may stay attached.
            remove_all(handles).await;
            return Ok(());
        }
        self.listeners.store(handles);
        debug!("push listeners attached");

        self.request_native_token_refresh().await;
        Ok(())
    }

    async fn subscribe(&self) -> PushResult<Vec<Box<dyn ListenerHandle>>> {
        let registration = self
            .plugin
            .add_listener(PushEventKind::Registration, self.registration_listener())
            .await?;

        let registration_error = match self
            .plugin
            .add_listener(
                PushEventKind::RegistrationError,
                self.registration_error_listener(),
            )
            .await
        {
            Ok(handle) => handle,
            Err(e) => {
                remove_all(vec![registration]).await;
                return Err(e);
            }
        };

        Ok(vec![registration, registration_error])
    }

    fn registration_listener(&self) -> PushListener {
        let command_tx = self.command_tx.clone();
        let listeners = Arc::clone(&self.listeners);
        Arc::new(move |event| {
            if listeners.is_disposed() {
                return;
            }
            if let PushEvent::Registration { value } = event {
                if let Some(tx) = command_tx.upgrade() {
                    let _ = tx.send(LifecycleCommand::NativeToken { value });
                }
            }
        })
    }

    fn registration_error_listener(&self) -> PushListener {
        let logger = Arc::clone(&self.logger);
        let listeners = Arc::clone(&self.listeners);
        Arc::new(move |event| {
            if listeners.is_disposed() {
                return;
            }
            if let PushEvent::RegistrationError { error } = event {
                let reason = error.unwrap_or_else(|| "unknown error".to_string());
                logger.warn(
                    "native push registration error",
                    &PushError::NativeRegistration(reason),
                );
            }
        })
    }

    async fn request_native_token_refresh(&self) {
        if self.device_platform.is_none() {
            return;
        }
        if let Err(e) = self.request_native_token().await {
            self.logger.warn("push token registration request failed", &e);
        }
    }

    async fn request_native_token(&self) -> PushResult<()> {
        let permission = self.plugin.request_permissions().await?;
        if permission != PermissionState::Granted {
            return Err(PushError::PermissionDenied(permission));
        }
        self.plugin.register().await
    }
}
