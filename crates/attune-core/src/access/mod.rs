//! Attribute access objects: single attributes, named groups, and ordered
//! scatter-gather batches, plus the read-only policy variant.

pub mod attribute;
pub mod group;
pub mod multi;

pub use attribute::{Attribute, AttributeReadOnly};
pub use group::AttributeGroup;
pub use multi::MultiAttribute;

use std::time::Duration;

use tokio::task::JoinHandle;

use attune_transport::TransportError;

use crate::error::CoreError;

/// Wait on one pending remote call under the shared timeout.
///
/// A timed-out or failed wait surfaces immediately; the remote call behind
/// the handle is left running detached.
pub(crate) async fn await_reply<T>(
    timeout: Duration,
    pending: JoinHandle<Result<T, TransportError>>,
) -> Result<T, CoreError> {
    match tokio::time::timeout(timeout, pending).await {
        Err(_) => Err(CoreError::Timeout {
            timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        }),
        Ok(Err(join_err)) => Err(CoreError::Internal(format!(
            "pending reply task failed: {join_err}"
        ))),
        Ok(Ok(result)) => result.map_err(CoreError::from),
    }
}
