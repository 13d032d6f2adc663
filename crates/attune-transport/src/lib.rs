//! Remote-connection capability boundary for the `attune` workspace.
//!
//! This crate defines the narrow surface through which `attune-core` talks
//! to a device network, without owning any wire protocol itself:
//!
//! - **[`Transport`]** — opens one [`Connection`] per physical endpoint.
//!   Implementations adapt a concrete control-system protocol behind this
//!   seam; the core never sees protocol types.
//!
//! - **[`Connection`]** — one live link to a remote device server. Exposes
//!   attribute read/write, metadata queries, and a liveness ping. All
//!   methods are plain async calls; the access layer builds its
//!   fire-and-forget and scatter-gather behavior by spawning tasks over
//!   them.
//!
//! - **Value model** ([`PvValue`], [`Quality`], [`Reading`],
//!   [`AttrMetadata`]) — what a remote read actually yields: a scalar or
//!   vector payload, the last commanded set-point when the remote tracks
//!   one, and the quality/timestamp pair attached by the device server.
//!
//! - **[`MemoryTransport`]** — an in-process loopback implementation with
//!   seedable devices and failure injection, used by the core's tests and
//!   useful for simulation.

pub mod error;
pub mod memory;
pub mod value;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

pub use error::{Severity, TransportError};
pub use memory::{MemoryDevice, MemoryTransport};
pub use value::{AttrMetadata, PvValue, Quality, Reading};

/// One live connection to a remote device server.
///
/// Shared and reference-counted: the connection cache in `attune-core` owns
/// the canonical `Arc` and hands out clones, so many logical attribute
/// handles can share one physical link.
#[async_trait]
pub trait Connection: Send + Sync {
    /// The endpoint identifier this connection was opened for.
    fn endpoint(&self) -> &str;

    /// Apply a request timeout to all subsequent operations on this link.
    fn set_timeout(&self, timeout: Duration);

    /// Read one named attribute, returning its live value, set-point,
    /// quality, and timestamp.
    async fn read(&self, attr: &str) -> Result<Reading, TransportError>;

    /// Write one named attribute and wait for the remote acknowledgement.
    async fn write(&self, attr: &str, value: PvValue) -> Result<(), TransportError>;

    /// Query attribute metadata (writability and numeric bounds).
    async fn metadata(&self, attr: &str) -> Result<AttrMetadata, TransportError>;

    /// Liveness probe.
    async fn ping(&self) -> Result<(), TransportError>;
}

/// Factory capability: opens connections to endpoints.
///
/// `attune-core` holds exactly one `Arc<dyn Transport>` per context and
/// routes every connection request through its cache, so implementations
/// only see one `open` per distinct endpoint.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Open a connection to the given endpoint.
    ///
    /// # Errors
    /// Returns [`TransportError::ConnectionFailed`] when the endpoint is
    /// unreachable; the caller must not retain anything from a failed open.
    async fn open(&self, endpoint: &str) -> Result<Arc<dyn Connection>, TransportError>;
}
