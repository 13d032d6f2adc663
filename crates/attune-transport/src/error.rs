use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Severity reported by the remote device network alongside a fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Warning,
    Error,
    Panic,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Warning => write!(f, "WARN"),
            Self::Error => write!(f, "ERR"),
            Self::Panic => write!(f, "PANIC"),
        }
    }
}

/// Failure modes at the transport seam.
///
/// `attune-core` maps these into its user-facing error type; consumers of
/// the core never handle a `TransportError` directly.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// The remote device server reported a structured fault.
    #[error("{reason}: {description} Origin: {origin} Severity: {severity}")]
    Remote {
        reason: String,
        description: String,
        origin: String,
        severity: Severity,
    },

    /// The endpoint could not be reached or refused the connection.
    #[error("Cannot connect to {endpoint}: {reason}")]
    ConnectionFailed { endpoint: String, reason: String },

    /// A remote call exceeded the configured request timeout.
    #[error("Request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
}

impl TransportError {
    /// Shorthand for a remote fault with [`Severity::Error`].
    pub fn remote(
        reason: impl Into<String>,
        description: impl Into<String>,
        origin: impl Into<String>,
    ) -> Self {
        Self::Remote {
            reason: reason.into(),
            description: description.into(),
            origin: origin.into(),
            severity: Severity::Error,
        }
    }
}
