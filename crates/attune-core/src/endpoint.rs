// ── Connection identity ──
//
// An EndpointId is the key under which physical connections dedup: two
// attribute paths naming the same device through the same network host
// resolve to one connection. Canonicalization prepends the configured
// network host so aliased references converge on one key.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Canonical identifier for one physical remote connection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EndpointId(String);

impl EndpointId {
    /// Canonicalize a device path against an optional network host.
    ///
    /// Paths that already carry a `//host/` prefix are kept as-is.
    pub fn canonical(device_path: &str, network_host: Option<&str>) -> Self {
        match network_host {
            Some(host) if !device_path.starts_with("//") => {
                Self(format!("//{host}/{device_path}"))
            }
            _ => Self(device_path.to_owned()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EndpointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for EndpointId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_owned()))
    }
}

impl From<String> for EndpointId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for EndpointId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}
