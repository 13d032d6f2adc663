// ── Value model ──
//
// What a remote attribute read actually yields. Process variables are
// numeric scalars or vectors; every reading carries the quality state and
// timestamp attached by the device server, passed through unchanged.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ── PvValue ─────────────────────────────────────────────────────────

/// A process-variable payload: numeric scalar or vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PvValue {
    Scalar(f64),
    Vector(Vec<f64>),
}

impl PvValue {
    /// The scalar payload, if this value is a scalar.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Scalar(v) => Some(*v),
            Self::Vector(_) => None,
        }
    }

    /// The vector payload, if this value is a vector.
    pub fn as_slice(&self) -> Option<&[f64]> {
        match self {
            Self::Scalar(_) => None,
            Self::Vector(v) => Some(v),
        }
    }
}

impl fmt::Display for PvValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar(v) => write!(f, "{v}"),
            Self::Vector(v) => {
                write!(f, "[")?;
                for (i, x) in v.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{x}")?;
                }
                write!(f, "]")
            }
        }
    }
}

impl From<f64> for PvValue {
    fn from(v: f64) -> Self {
        Self::Scalar(v)
    }
}

impl From<Vec<f64>> for PvValue {
    fn from(v: Vec<f64>) -> Self {
        Self::Vector(v)
    }
}

// ── Quality ─────────────────────────────────────────────────────────

/// Confidence state attached to a reading by the remote device server.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[strum(ascii_case_insensitive)]
pub enum Quality {
    Valid,
    Invalid,
    Alarm,
    Changing,
    Warning,
}

// ── Reading ─────────────────────────────────────────────────────────

/// One remote attribute read.
///
/// `set_point` is the last commanded value for writable attributes; remote
/// servers that do not track one leave it empty.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub value: PvValue,
    pub set_point: Option<PvValue>,
    pub quality: Quality,
    pub timestamp: DateTime<Utc>,
}

impl Reading {
    /// A valid reading stamped now, with the set-point tracking the value.
    pub fn now(value: PvValue) -> Self {
        Self {
            set_point: Some(value.clone()),
            value,
            quality: Quality::Valid,
            timestamp: Utc::now(),
        }
    }
}

// ── AttrMetadata ────────────────────────────────────────────────────

/// Remote attribute metadata: writability and optional numeric bounds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttrMetadata {
    pub writable: bool,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl Default for AttrMetadata {
    fn default() -> Self {
        Self {
            writable: true,
            min: None,
            max: None,
        }
    }
}
