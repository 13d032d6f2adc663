// ── Connection cache ──
//
// Endpoint -> shared connection dedup with a single shared request timeout.
// Lookups of established connections are lock-free; creation for a given
// key is serialized through a per-key OnceCell, so a race on first use
// still opens exactly one physical connection.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::OnceCell;
use tracing::debug;

use attune_transport::{Connection, Transport};

use crate::endpoint::EndpointId;
use crate::error::CoreError;

/// Deduplicating cache of live connections, owned by the context.
///
/// Connection handles live here for the lifetime of the cache; access
/// objects only ever hold `Arc` clones.
pub struct ConnectionCache {
    transport: Arc<dyn Transport>,
    connections: DashMap<EndpointId, Arc<OnceCell<Arc<dyn Connection>>>>,
    timeout_ms: AtomicU64,
}

impl ConnectionCache {
    pub fn new(transport: Arc<dyn Transport>, timeout: Duration) -> Self {
        let timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        Self {
            transport,
            connections: DashMap::new(),
            timeout_ms: AtomicU64::new(timeout_ms),
        }
    }

    /// The shared request timeout applied to connections and waits.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms.load(Ordering::SeqCst))
    }

    /// Change the shared request timeout. Applies to connections opened
    /// from now on; already-open connections keep their timeout.
    pub fn set_timeout(&self, timeout: Duration) {
        let timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self.timeout_ms.store(timeout_ms, Ordering::SeqCst);
    }

    /// Return the shared connection for `endpoint`, opening it on first use.
    ///
    /// Concurrent callers racing on the same endpoint all receive the same
    /// handle; at most one physical open happens. A failed open stores
    /// nothing, so the next call retries.
    pub async fn get(&self, endpoint: &EndpointId) -> Result<Arc<dyn Connection>, CoreError> {
        let cell = {
            let entry = self
                .connections
                .entry(endpoint.clone())
                .or_insert_with(|| Arc::new(OnceCell::new()));
            Arc::clone(entry.value())
        };

        let opened = cell
            .get_or_try_init(|| async {
                debug!(endpoint = %endpoint, "opening connection");
                let conn = self.transport.open(endpoint.as_str()).await?;
                conn.set_timeout(self.timeout());
                Ok::<_, attune_transport::TransportError>(conn)
            })
            .await;

        // A failed open leaves the cell empty and in place; waiters queued
        // on it re-run the initializer, and the next call retries through
        // the same cell. Removing the entry here would orphan the cell a
        // waiter is about to fill, splitting one endpoint across two
        // physical connections.
        match opened {
            Ok(conn) => Ok(Arc::clone(conn)),
            Err(err) => Err(err.into()),
        }
    }

    /// Drop all cached handles. Callers must ensure no concurrent I/O.
    pub fn clear(&self) {
        self.connections.clear();
    }

    /// Number of cached (or in-flight) endpoints.
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}
