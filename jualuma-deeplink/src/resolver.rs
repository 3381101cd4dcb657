//! URL to in-app route resolution.

use crate::config::DeepLinkConfig;
use std::collections::HashSet;
use tracing::debug;
use url::Url;

/// Production web hosts that always open in the app.
pub const DEFAULT_WEB_HOSTS: [&str; 3] = [
    "app.jualuma.com",
    "jualuma-user-app-stage-ripznron4a-uc.a.run.app",
    "frontend-app-77ybfmw7cq-uc.a.run.app",
];

/// Maps inbound URLs to router paths, rejecting anything not ours.
#[derive(Clone, Debug)]
pub struct DeepLinkResolver {
    scheme: String,
    allowed_hosts: HashSet<String>,
}

impl Default for DeepLinkResolver {
    fn default() -> Self {
        Self::new(DeepLinkConfig::default())
    }
}

impl DeepLinkResolver {
    pub fn new(config: DeepLinkConfig) -> Self {
        let allowed_hosts = DEFAULT_WEB_HOSTS
            .iter()
            .map(|host| host.to_string())
            .chain(
                config
                    .extra_hosts
                    .iter()
                    .map(|host| host.trim().to_lowercase())
                    .filter(|host| !host.is_empty()),
            )
            .collect();

        Self {
            scheme: config.scheme.trim().to_lowercase(),
            allowed_hosts,
        }
    }

    /// Builds a resolver from `JUALUMA_DEEP_LINK_*` environment variables.
    pub fn from_env() -> Self {
        Self::new(DeepLinkConfig::from_env())
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Whether `host` (optionally with `:port`) is one of our web hosts.
    pub fn is_allowed_host(&self, host: &str) -> bool {
        self.allowed_hosts.contains(&host.to_lowercase())
    }

    /// Returns the internal route for `raw_url`, or `None` when the URL is
    /// blank, unparsable, uses a foreign scheme, or points at a host that
    /// is not ours.
    ///
    /// - `jualuma://household/accept-invite?token=x` → `/household/accept-invite?token=x`
    /// - `https://app.jualuma.com/verify-email?token=x` → `/verify-email?token=x`
    /// - `/settings//profile` → `/settings/profile`
    pub fn extract_app_route(&self, raw_url: &str) -> Option<String> {
        if raw_url.trim().is_empty() {
            return None;
        }

        let parsed = match Url::parse(raw_url) {
            Ok(parsed) => parsed,
            Err(e) => {
                if raw_url.starts_with('/') {
                    return Some(normalize_path(raw_url));
                }
                debug!("ignoring unparsable deep link: {e}");
                return None;
            }
        };

        let scheme = parsed.scheme();
        if scheme == self.scheme {
            return Some(custom_scheme_route(&parsed));
        }

        match scheme {
            "http" | "https" => {
                let host = host_with_port(&parsed);
                if !self.is_allowed_host(&host) {
                    debug!("ignoring deep link to foreign host {host}");
                    return None;
                }
                Some(with_query_and_fragment(parsed.path(), &parsed))
            }
            other => {
                debug!("ignoring deep link with scheme {other}");
                None
            }
        }
    }
}

/// Collapses repeated `/`, guarantees one leading `/`, and maps an empty
/// path to `/`.
pub fn normalize_path(path: &str) -> String {
    let mut collapsed = String::with_capacity(path.len() + 1);
    for ch in path.chars() {
        if ch == '/' && collapsed.ends_with('/') {
            continue;
        }
        collapsed.push(ch);
    }

    if collapsed.is_empty() || collapsed == "/" {
        return "/".to_string();
    }
    if !collapsed.starts_with('/') {
        collapsed.insert(0, '/');
    }
    collapsed
}

/// The custom scheme's host is the first route segment.
fn custom_scheme_route(parsed: &Url) -> String {
    let host = host_with_port(parsed);
    let host = host.trim();
    let path = parsed.path().trim();

    if !host.is_empty() && !path.is_empty() && path != "/" {
        with_query_and_fragment(&format!("/{host}{path}"), parsed)
    } else if !host.is_empty() {
        with_query_and_fragment(&format!("/{host}"), parsed)
    } else if path.is_empty() {
        with_query_and_fragment("/", parsed)
    } else {
        with_query_and_fragment(path, parsed)
    }
}

/// `host[:port]`, matching what a browser reports as `URL.host`.
fn host_with_port(parsed: &Url) -> String {
    match (parsed.host_str(), parsed.port()) {
        (Some(host), Some(port)) => format!("{host}:{port}"),
        (Some(host), None) => host.to_string(),
        (None, _) => String::new(),
    }
}

fn with_query_and_fragment(path: &str, parsed: &Url) -> String {
    let mut route = normalize_path(path);
    if let Some(query) = parsed.query().filter(|q| !q.is_empty()) {
        route.push('?');
        route.push_str(query);
    }
    if let Some(fragment) = parsed.fragment().filter(|f| !f.is_empty()) {
        route.push('#');
        route.push_str(fragment);
    }
    route
}
