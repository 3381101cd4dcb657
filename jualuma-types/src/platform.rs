//! Runtime platform identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The platform the app shell reports at runtime.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Platform {
    Ios,
    Android,
    #[default]
    Web,
    /// Any platform name this crate does not know about.
    Other(String),
}

impl Platform {
    /// Returns the push platform for this runtime, if push is supported.
    pub fn device_platform(&self) -> Option<DevicePlatform> {
        match self {
            Platform::Ios => Some(DevicePlatform::Ios),
            Platform::Android => Some(DevicePlatform::Android),
            Platform::Web | Platform::Other(_) => None,
        }
    }

    /// Returns true when running inside a native shell (anything but web).
    pub fn is_native(&self) -> bool {
        !matches!(self, Platform::Web)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Platform::Ios => "ios",
            Platform::Android => "android",
            Platform::Web => "web",
            Platform::Other(name) => name,
        }
    }
}

impl FromStr for Platform {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Ok(match trimmed.to_ascii_lowercase().as_str() {
            "ios" => Platform::Ios,
            "android" => Platform::Android,
            "web" => Platform::Web,
            _ => Platform::Other(trimmed.to_string()),
        })
    }
}

impl From<&str> for Platform {
    fn from(s: &str) -> Self {
        match s.parse() {
            Ok(platform) => platform,
            Err(never) => match never {},
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Push platforms a device token can be registered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DevicePlatform {
    Ios,
    Android,
}

impl DevicePlatform {
    pub fn as_str(&self) -> &'static str {
        match self {
            DevicePlatform::Ios => "ios",
            DevicePlatform::Android => "android",
        }
    }
}

impl fmt::Display for DevicePlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
