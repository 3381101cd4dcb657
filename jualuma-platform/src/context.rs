//! Explicitly constructed application services.
//!
//! One [`AppContext`] replaces the module-level singletons a web shell
//! would keep: the storage, the push lifecycle, the deep link resolver, the
//! value cache and the connectivity flag all hang off it.

use crate::config::PlatformConfig;
use crate::registry::RetryingDeviceRegistry;
use anyhow::Context;
use jualuma_deeplink::DeepLinkResolver;
use jualuma_push::{
    DeviceRegistry, LifecycleLogger, PushConfig, PushLifecycleHandle, PushLifecycleOptions,
    PushNotificationsPlugin,
};
use jualuma_resilience::{ConnectivityMonitor, Retrier, RetryPolicy, ValueCache};
use jualuma_storage::{FileStore, KeyValueStore};
use jualuma_types::{Clock, Platform, SystemClock};
use std::sync::Arc;
use tracing::info;

/// Collects dependencies for an [`AppContext`].
pub struct AppContextBuilder {
    config: PlatformConfig,
    push_plugin: Arc<dyn PushNotificationsPlugin>,
    registry: Arc<dyn DeviceRegistry>,
    storage: Option<Arc<dyn KeyValueStore>>,
    push_logger: Option<Arc<dyn LifecycleLogger>>,
    push_config: PushConfig,
    retry_policy: RetryPolicy,
    connectivity: ConnectivityMonitor,
    clock: Arc<dyn Clock>,
}

impl AppContextBuilder {
    pub fn new(
        config: PlatformConfig,
        push_plugin: Arc<dyn PushNotificationsPlugin>,
        registry: Arc<dyn DeviceRegistry>,
    ) -> Self {
        Self {
            config,
            push_plugin,
            registry,
            storage: None,
            push_logger: None,
            push_config: PushConfig::default(),
            retry_policy: RetryPolicy::default(),
            connectivity: ConnectivityMonitor::default(),
            clock: Arc::new(SystemClock),
        }
    }

    /// Uses `storage` instead of opening a file store.
    pub fn with_storage(mut self, storage: Arc<dyn KeyValueStore>) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn with_push_logger(mut self, logger: Arc<dyn LifecycleLogger>) -> Self {
        self.push_logger = Some(logger);
        self
    }

    pub fn with_push_config(mut self, push_config: PushConfig) -> Self {
        self.push_config = push_config;
        self
    }

    /// Policy for retrying device registry calls.
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    pub fn with_connectivity(mut self, connectivity: ConnectivityMonitor) -> Self {
        self.connectivity = connectivity;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Opens storage and starts the push lifecycle worker.
    ///
    /// Must be called from within a tokio runtime. Fails only when the
    /// file store cannot be opened.
    pub fn build(self) -> anyhow::Result<AppContext> {
        let storage = match self.storage {
            Some(storage) => storage,
            None => {
                let path = self
                    .config
                    .storage_path
                    .clone()
                    .unwrap_or_else(FileStore::default_path);
                let store = FileStore::open(&path)
                    .with_context(|| format!("failed to open storage at {}", path.display()))?;
                Arc::new(store)
            }
        };

        let retrier = Retrier::new(self.retry_policy)
            .with_connectivity(Arc::new(self.connectivity.clone()));
        let registry: Arc<dyn DeviceRegistry> =
            Arc::new(RetryingDeviceRegistry::new(self.registry, retrier.clone()));

        let mut push_options =
            PushLifecycleOptions::new(self.config.platform.clone(), self.push_plugin, registry)
                .with_storage(Arc::clone(&storage))
                .with_config(self.push_config);
        if let Some(logger) = self.push_logger {
            push_options = push_options.with_logger(logger);
        }
        let push = PushLifecycleHandle::spawn(push_options);

        let deep_links = Arc::new(DeepLinkResolver::new(self.config.deep_link.clone()));
        let cache = ValueCache::with_clock(Arc::clone(&storage), self.clock);

        info!("app context ready on {}", self.config.platform);

        Ok(AppContext {
            config: self.config,
            storage,
            push,
            deep_links,
            cache,
            connectivity: self.connectivity,
            retrier,
        })
    }
}

/// Long-lived services for one app session.
pub struct AppContext {
    config: PlatformConfig,
    storage: Arc<dyn KeyValueStore>,
    push: PushLifecycleHandle,
    deep_links: Arc<DeepLinkResolver>,
    cache: ValueCache,
    connectivity: ConnectivityMonitor,
    retrier: Retrier,
}

impl AppContext {
    pub fn platform(&self) -> &Platform {
        &self.config.platform
    }

    pub fn config(&self) -> &PlatformConfig {
        &self.config
    }

    pub fn storage(&self) -> &Arc<dyn KeyValueStore> {
        &self.storage
    }

    pub fn push(&self) -> &PushLifecycleHandle {
        &self.push
    }

    pub fn deep_links(&self) -> &Arc<DeepLinkResolver> {
        &self.deep_links
    }

    pub fn cache(&self) -> &ValueCache {
        &self.cache
    }

    /// Flip this when the OS reports reachability changes.
    pub fn connectivity(&self) -> &ConnectivityMonitor {
        &self.connectivity
    }

    /// Retrier sharing this context's policy and connectivity, for
    /// wrapping other flaky network calls.
    pub fn retrier(&self) -> &Retrier {
        &self.retrier
    }
}
