//! Deep link configuration.

use serde::{Deserialize, Serialize};

/// Environment variable overriding the custom URL scheme.
pub const SCHEME_ENV: &str = "JUALUMA_DEEP_LINK_SCHEME";

/// Environment variable with extra comma-separated web hosts to accept.
pub const HOSTS_ENV: &str = "JUALUMA_DEEP_LINK_HOSTS";

/// Custom scheme registered by the native apps.
pub const DEFAULT_SCHEME: &str = "jualuma";

/// Which URLs count as links into the app.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeepLinkConfig {
    /// Custom URL scheme, without the trailing `:`.
    pub scheme: String,

    /// Web hosts accepted in addition to the built-in production hosts.
    /// May include a port (`localhost:5173`).
    pub extra_hosts: Vec<String>,
}

impl Default for DeepLinkConfig {
    fn default() -> Self {
        Self {
            scheme: DEFAULT_SCHEME.to_string(),
            extra_hosts: Vec::new(),
        }
    }
}

impl DeepLinkConfig {
    /// Reads `JUALUMA_DEEP_LINK_SCHEME` and `JUALUMA_DEEP_LINK_HOSTS`.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds a config from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let scheme = lookup(SCHEME_ENV)
            .map(|value| value.trim().to_lowercase())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_SCHEME.to_string());

        let extra_hosts = lookup(HOSTS_ENV)
            .map(|value| parse_host_list(&value))
            .unwrap_or_default();

        Self { scheme, extra_hosts }
    }
}

/// Splits a comma-separated host list, dropping blanks.
pub fn parse_host_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|host| host.trim().to_lowercase())
        .filter(|host| !host.is_empty())
        .collect()
}
