// ── Lifecycle coordinator ──
//
// The Context represents one control-system binding. Access objects
// register here at construction instead of opening connections; start()
// activates the context (draining the pending registrations in eager
// mode), warmup() forces eager initialization regardless of mode.
//
// There is no hidden singleton: a Context is constructed explicitly and
// passed to every access-object constructor. The process-wide slot behind
// try_install_global() keeps the historical first-writer-wins behavior
// available as an explicit, observable call.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock, Weak};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, info};

use attune_transport::Transport;

use crate::cache::ConnectionCache;
use crate::config::ContextConfig;
use crate::endpoint::EndpointId;
use crate::error::CoreError;

/// Contract implemented by every attribute-like object.
///
/// `initialize()` resolves real connections through the context's cache and
/// is productive at most once; later calls are no-ops.
#[async_trait]
pub trait Initializable: Send + Sync {
    async fn initialize(&self) -> Result<(), CoreError>;
    fn is_initialized(&self) -> bool;
    fn name(&self) -> &str;
}

static GLOBAL: OnceLock<Context> = OnceLock::new();

/// Explicitly constructed control-system context.
///
/// Cheaply cloneable via `Arc` inner; one clone lives inside every access
/// object constructed against it.
#[derive(Clone)]
pub struct Context {
    inner: Arc<ContextInner>,
}

struct ContextInner {
    cfg: ContextConfig,
    cache: ConnectionCache,
    active: AtomicBool,
    lazy: AtomicBool,
    /// Registrations awaiting an eager drain. Weak: a dropped access
    /// object must not be kept alive by the queue.
    pending: Mutex<Vec<Weak<dyn Initializable>>>,
}

impl Context {
    /// Create a new context. Does NOT open any connection — connections
    /// are resolved by [`start()`](Self::start) / [`warmup()`](Self::warmup)
    /// in eager mode, or on first I/O in lazy mode.
    pub fn new(cfg: ContextConfig, transport: Arc<dyn Transport>) -> Self {
        let timeout = Duration::from_millis(cfg.timeout_ms);
        info!(
            context = %cfg.name,
            network_host = cfg.network_host.as_deref().unwrap_or("<none>"),
            lazy = cfg.lazy,
            "control-system context created",
        );
        Self {
            inner: Arc::new(ContextInner {
                cache: ConnectionCache::new(transport, timeout),
                active: AtomicBool::new(false),
                lazy: AtomicBool::new(cfg.lazy),
                pending: Mutex::new(Vec::new()),
                cfg,
            }),
        }
    }

    // ── Accessors ────────────────────────────────────────────────

    pub fn name(&self) -> &str {
        &self.inner.cfg.name
    }

    pub fn config(&self) -> &ContextConfig {
        &self.inner.cfg
    }

    pub fn cache(&self) -> &ConnectionCache {
        &self.inner.cache
    }

    pub fn is_active(&self) -> bool {
        self.inner.active.load(Ordering::SeqCst)
    }

    pub fn is_lazy(&self) -> bool {
        self.inner.lazy.load(Ordering::SeqCst)
    }

    /// Canonicalize a device path against the configured network host.
    pub fn canonical_endpoint(&self, device_path: &str) -> EndpointId {
        EndpointId::canonical(device_path, self.inner.cfg.network_host.as_deref())
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Activate the context.
    ///
    /// Idempotent: a second call on an active context logs and returns. In
    /// eager mode the pending registrations are initialized in registration
    /// order; the first failure aborts and leaves the context inactive.
    pub async fn start(&self) -> Result<(), CoreError> {
        if self.is_active() {
            debug!(context = %self.inner.cfg.name, "context already active, start() ignored");
            return Ok(());
        }
        self.inner
            .cache
            .set_timeout(Duration::from_millis(self.inner.cfg.timeout_ms));
        if !self.is_lazy() {
            self.drain_pending().await?;
        }
        self.inner.active.store(true, Ordering::SeqCst);
        info!(context = %self.inner.cfg.name, lazy = self.is_lazy(), "context started");
        Ok(())
    }

    /// Force eager initialization of every pending registration,
    /// regardless of the configured mode, and activate the context.
    ///
    /// Safe to call repeatedly: a later call finds an empty queue.
    pub async fn warmup(&self) -> Result<(), CoreError> {
        self.inner.lazy.store(false, Ordering::SeqCst);
        self.drain_pending().await?;
        self.inner.active.store(true, Ordering::SeqCst);
        info!(context = %self.inner.cfg.name, "context warmed up");
        Ok(())
    }

    /// Queue an element for the next eager drain.
    ///
    /// Only meaningful before the drain; elements constructed afterwards
    /// self-initialize through their `ensure_initialized` guard instead.
    pub async fn register(&self, element: Weak<dyn Initializable>) {
        self.inner.pending.lock().await.push(element);
    }

    /// Pending registrations not yet drained (dropped elements included
    /// until the next drain skips them).
    pub async fn pending_len(&self) -> usize {
        self.inner.pending.lock().await.len()
    }

    async fn drain_pending(&self) -> Result<(), CoreError> {
        let queue = std::mem::take(&mut *self.inner.pending.lock().await);
        let mut elements = queue.into_iter();
        while let Some(weak) = elements.next() {
            let Some(element) = weak.upgrade() else {
                continue;
            };
            if let Err(err) = element.initialize().await {
                // Put the failed element and the unprocessed tail back so a
                // later warmup() can retry after the fault is fixed.
                let mut pending = self.inner.pending.lock().await;
                pending.insert(0, Arc::downgrade(&element));
                pending.splice(1..1, elements);
                return Err(err);
            }
            debug!(element = element.name(), "initialized");
        }
        Ok(())
    }

    // ── Process-wide slot ────────────────────────────────────────

    /// Install this context as the process-wide default.
    ///
    /// First writer wins: returns `true` if this call installed it,
    /// `false` if another context already occupies the slot (the slot is
    /// left untouched).
    pub fn try_install_global(&self) -> bool {
        GLOBAL.set(self.clone()).is_ok()
    }

    /// The process-wide default context, if one was installed.
    pub fn global() -> Option<&'static Context> {
        GLOBAL.get()
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("name", &self.inner.cfg.name)
            .field("active", &self.is_active())
            .field("lazy", &self.is_lazy())
            .field("cached_connections", &self.inner.cache.len())
            .finish()
    }
}
