//! Platform configuration read from the environment.

use jualuma_deeplink::DeepLinkConfig;
use jualuma_types::Platform;
use std::path::PathBuf;

pub const PLATFORM_ENV: &str = "JUALUMA_PLATFORM";
pub const STORAGE_PATH_ENV: &str = "JUALUMA_STORAGE_PATH";
pub const LOG_ENV: &str = "JUALUMA_LOG";

/// Settings the app shell hands to [`crate::AppContextBuilder`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PlatformConfig {
    /// Runtime platform reported by the shell.
    pub platform: Platform,

    /// Backing file for persistent storage. `None` uses the per-OS
    /// default location.
    pub storage_path: Option<PathBuf>,

    /// `tracing` filter directive, e.g. `"jualuma_push=debug,info"`.
    pub log_filter: Option<String>,

    pub deep_link: DeepLinkConfig,
}

impl PlatformConfig {
    /// Reads `JUALUMA_PLATFORM`, `JUALUMA_STORAGE_PATH`, `JUALUMA_LOG`
    /// (falling back to `RUST_LOG`) and the deep link variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_blank = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let platform = non_blank(PLATFORM_ENV)
            .map(|name| Platform::from(name.as_str()))
            .unwrap_or_default();

        Self {
            platform,
            storage_path: non_blank(STORAGE_PATH_ENV).map(PathBuf::from),
            log_filter: non_blank(LOG_ENV).or_else(|| non_blank("RUST_LOG")),
            deep_link: DeepLinkConfig::from_lookup(&lookup),
        }
    }
}
