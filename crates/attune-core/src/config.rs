// ── Runtime configuration ──
//
// These types describe *which* remote attributes to reach and how the
// context behaves. They are plain values: an external loader deserializes
// them and hands them in, core never reads files.

use serde::{Deserialize, Serialize};

/// Configuration for one logical attribute.
///
/// `attribute` is the full path, device endpoint plus attribute suffix
/// (e.g. `sys/ps/1/current`). A configured `range` wins wholly over the
/// bounds reported by remote metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeConfig {
    pub attribute: String,
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub range: Option<(Option<f64>, Option<f64>)>,
}

impl AttributeConfig {
    pub fn new(attribute: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
            unit: String::new(),
            range: None,
        }
    }
}

/// Configuration for a named group of attributes sharing suffixes.
///
/// Each entry of `endpoints` is a full attribute path; members are
/// bucketed by attribute suffix so one group call fans out per device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupConfig {
    pub endpoints: Vec<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub unit: String,
}

/// Configuration for an ordered multi-attribute batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiAttributeConfig {
    #[serde(default)]
    pub attributes: Vec<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub unit: String,
}

/// Configuration for a [`Context`](crate::Context).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextConfig {
    /// Display name of the control-system context.
    pub name: String,
    /// When set, prefixed onto every endpoint for connection identity.
    #[serde(default)]
    pub network_host: Option<String>,
    /// Deferred (`true`, default) vs eager connection setup.
    #[serde(default = "default_lazy")]
    pub lazy: bool,
    /// Shared request timeout applied to every connection and wait.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_lazy() -> bool {
    true
}

fn default_timeout_ms() -> u64 {
    3000
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            name: "attune".into(),
            network_host: None,
            lazy: default_lazy(),
            timeout_ms: default_timeout_ms(),
        }
    }
}
