// ── Core error types ──
//
// User-facing errors from attune-core. Consumers never see transport-layer
// failures directly; the `From<TransportError>` impl translates them into
// domain-appropriate variants.

use attune_transport::{Severity, TransportError};
use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Lifecycle errors ─────────────────────────────────────────────
    #[error("{name} is not initialized -- start() or warmup() the context first")]
    NotInitialized { name: String },

    #[error("Cannot connect to {endpoint}: {reason}")]
    ConnectionFailed { endpoint: String, reason: String },

    // ── Validation errors (raised before any remote call) ────────────
    #[error("Attribute {attribute} is not writable")]
    NotWritable { attribute: String },

    #[error("Size of value ({got}) does not match the number of managed attributes ({expected})")]
    SizeMismatch { expected: usize, got: usize },

    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    // ── Remote operation errors ──────────────────────────────────────
    #[error("{reason}: {description} Origin: {origin} Severity: {severity}")]
    Remote {
        reason: String,
        description: String,
        origin: String,
        severity: Severity,
    },

    #[error("Remote call timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("No reply received for attribute {attribute}")]
    MissingReply { attribute: String },

    // ── Operation errors ─────────────────────────────────────────────
    #[error("Operation not supported: {operation}")]
    Unsupported { operation: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

// ── Conversion from transport-layer errors ──────────────────────────

impl From<TransportError> for CoreError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Remote {
                reason,
                description,
                origin,
                severity,
            } => Self::Remote {
                reason,
                description,
                origin,
                severity,
            },
            TransportError::ConnectionFailed { endpoint, reason } => {
                Self::ConnectionFailed { endpoint, reason }
            }
            TransportError::Timeout { timeout_ms } => Self::Timeout { timeout_ms },
        }
    }
}
