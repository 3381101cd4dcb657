//! Online/offline signal.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Reports whether the device currently has network connectivity.
pub trait Connectivity: Send + Sync {
    fn is_online(&self) -> bool;
}

/// Used when the runtime cannot report connectivity.
#[derive(Debug, Clone, Copy, Default)]
pub struct AssumeOnline;

impl Connectivity for AssumeOnline {
    fn is_online(&self) -> bool {
        true
    }
}

/// Shared connectivity flag updated by the platform layer.
///
/// Clones observe the same flag.
#[derive(Debug, Clone)]
pub struct ConnectivityMonitor {
    online: Arc<AtomicBool>,
}

impl ConnectivityMonitor {
    pub fn new(online: bool) -> Self {
        Self {
            online: Arc::new(AtomicBool::new(online)),
        }
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }
}

impl Default for ConnectivityMonitor {
    fn default() -> Self {
        Self::new(true)
    }
}

impl Connectivity for ConnectivityMonitor {
    fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }
}
