// ── Single-attribute access ──
//
// One logical attribute on one remote device server. The shared core state
// (config, resolved connection, metadata) lives behind an Arc so the
// context's pending queue can hold a weak registration to it.

use std::sync::{Arc, Weak};

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::warn;

use attune_transport::{AttrMetadata, Connection, PvValue, Reading};

use crate::config::AttributeConfig;
use crate::context::{Context, Initializable};
use crate::endpoint::EndpointId;
use crate::error::CoreError;

// ── Shared core state ───────────────────────────────────────────────

pub(crate) struct AttributeCore {
    context: Context,
    cfg: AttributeConfig,
    endpoint: EndpointId,
    attr_name: String,
    /// Write-once: set by `initialize()`, read by every I/O call.
    connection: OnceCell<Arc<dyn Connection>>,
    meta: OnceCell<AttrMetadata>,
    /// The writable variant refuses to initialize against a read-only
    /// remote attribute.
    require_writable: bool,
}

impl AttributeCore {
    fn build(
        context: &Context,
        cfg: AttributeConfig,
        require_writable: bool,
    ) -> Result<Arc<Self>, CoreError> {
        let Some((device, attr_name)) = cfg.attribute.rsplit_once('/') else {
            return Err(CoreError::InvalidConfig {
                message: format!("attribute path '{}' has no device component", cfg.attribute),
            });
        };
        let endpoint = context.canonical_endpoint(device);
        Ok(Arc::new(Self {
            context: context.clone(),
            endpoint,
            attr_name: attr_name.to_owned(),
            connection: OnceCell::new(),
            meta: OnceCell::new(),
            require_writable,
            cfg,
        }))
    }

    /// Construction-time lifecycle step: initialize immediately when the
    /// context is already active and eager, otherwise register and defer.
    async fn attach(self: &Arc<Self>) -> Result<(), CoreError> {
        if self.context.is_active() && !self.context.is_lazy() {
            self.initialize().await
        } else {
            let weak = Arc::downgrade(self) as Weak<dyn Initializable>;
            self.context.register(weak).await;
            Ok(())
        }
    }

    /// Guard consulted before every I/O call.
    ///
    /// Initialized: no-op. Lazy mode: initialize now. Eager mode and still
    /// uninitialized: ordering error — eager mode guarantees registered
    /// elements were connected during start()/warmup().
    pub(crate) async fn ensure_initialized(&self) -> Result<Arc<dyn Connection>, CoreError> {
        if let Some(conn) = self.connection.get() {
            return Ok(Arc::clone(conn));
        }
        if !self.context.is_lazy() {
            return Err(CoreError::NotInitialized {
                name: self.cfg.attribute.clone(),
            });
        }
        self.initialize().await?;
        self.connection.get().map(Arc::clone).ok_or_else(|| {
            CoreError::Internal("connection missing after initialization".into())
        })
    }

    pub(crate) fn attr_name(&self) -> &str {
        &self.attr_name
    }

    pub(crate) fn is_writable(&self) -> bool {
        self.meta.get().is_some_and(|m| m.writable)
    }
}

#[async_trait]
impl Initializable for AttributeCore {
    async fn initialize(&self) -> Result<(), CoreError> {
        if self.connection.initialized() {
            return Ok(());
        }
        let conn = self.context.cache().get(&self.endpoint).await?;
        let meta = conn.metadata(&self.attr_name).await?;
        if self.require_writable && !meta.writable {
            return Err(CoreError::NotWritable {
                attribute: self.cfg.attribute.clone(),
            });
        }
        let _ = self.meta.set(meta);
        let _ = self.connection.set(conn);
        Ok(())
    }

    fn is_initialized(&self) -> bool {
        self.connection.initialized()
    }

    fn name(&self) -> &str {
        &self.cfg.attribute
    }
}

// ── Attribute ───────────────────────────────────────────────────────

/// Writable access to one remote attribute.
///
/// Constructed against a [`Context`]; no connection is opened until the
/// context activates eagerly or the first I/O call arrives (lazy mode).
pub struct Attribute {
    core: Arc<AttributeCore>,
}

impl Attribute {
    pub async fn new(context: &Context, cfg: AttributeConfig) -> Result<Self, CoreError> {
        let core = AttributeCore::build(context, cfg, true)?;
        core.attach().await?;
        Ok(Self { core })
    }

    /// Full attribute path (e.g. `sys/ps/1/current`).
    pub fn name(&self) -> &str {
        &self.core.cfg.attribute
    }

    /// Short attribute name (last path component).
    pub fn measure_name(&self) -> &str {
        &self.core.attr_name
    }

    pub fn unit(&self) -> &str {
        &self.core.cfg.unit
    }

    pub fn is_initialized(&self) -> bool {
        self.core.is_initialized()
    }

    /// Writability resolved from remote metadata at initialization.
    pub fn is_writable(&self) -> bool {
        self.core.is_writable()
    }

    /// The last commanded value (falls back to the live value when the
    /// remote keeps no set-point).
    pub async fn get(&self) -> Result<PvValue, CoreError> {
        let conn = self.core.ensure_initialized().await?;
        let reading = conn.read(&self.core.attr_name).await?;
        Ok(reading.set_point.unwrap_or(reading.value))
    }

    /// Fire-and-forget write: the remote call is issued asynchronously and
    /// never awaited. Failures are logged, not raised.
    pub async fn set(&self, value: impl Into<PvValue>) -> Result<(), CoreError> {
        let conn = self.core.ensure_initialized().await?;
        let attr = self.core.attr_name.clone();
        let path = self.core.cfg.attribute.clone();
        let value = value.into();
        tokio::spawn(async move {
            if let Err(err) = conn.write(&attr, value).await {
                warn!(attribute = %path, error = %err, "asynchronous write failed");
            }
        });
        Ok(())
    }

    /// Synchronous write: blocks until the remote acknowledges.
    pub async fn set_and_wait(&self, value: impl Into<PvValue>) -> Result<(), CoreError> {
        let conn = self.core.ensure_initialized().await?;
        conn.write(&self.core.attr_name, value.into()).await?;
        Ok(())
    }

    /// The current live value with quality and timestamp.
    pub async fn readback(&self) -> Result<Reading, CoreError> {
        let conn = self.core.ensure_initialized().await?;
        Ok(conn.read(&self.core.attr_name).await?)
    }

    /// Numeric bounds: a configured range wins wholly; otherwise the
    /// remote metadata; `(None, None)` when absent on both sides.
    pub async fn get_range(&self) -> Result<(Option<f64>, Option<f64>), CoreError> {
        if let Some(range) = self.core.cfg.range {
            return Ok(range);
        }
        self.core.ensure_initialized().await?;
        Ok(self.core.meta.get().map_or((None, None), |m| (m.min, m.max)))
    }

    /// Liveness probe. Returns `false` on any failure, including a failed
    /// initialization; never raises.
    pub async fn check_availability(&self) -> bool {
        match self.core.ensure_initialized().await {
            Ok(conn) => conn.ping().await.is_ok(),
            Err(_) => false,
        }
    }

    pub(crate) fn core(&self) -> &Arc<AttributeCore> {
        &self.core
    }
}

impl std::fmt::Debug for Attribute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Attribute")
            .field("attribute", &self.core.cfg.attribute)
            .field("initialized", &self.core.is_initialized())
            .finish()
    }
}

// ── AttributeReadOnly ───────────────────────────────────────────────

/// Read-only access to one remote attribute.
///
/// Same read paths as [`Attribute`], but writes (and `get`, which reads
/// the last *commanded* value — something a read-only attribute does not
/// have) fail with [`CoreError::NotWritable`] without issuing any remote
/// call.
pub struct AttributeReadOnly {
    core: Arc<AttributeCore>,
}

impl AttributeReadOnly {
    pub async fn new(context: &Context, cfg: AttributeConfig) -> Result<Self, CoreError> {
        let core = AttributeCore::build(context, cfg, false)?;
        core.attach().await?;
        Ok(Self { core })
    }

    pub fn name(&self) -> &str {
        &self.core.cfg.attribute
    }

    pub fn measure_name(&self) -> &str {
        &self.core.attr_name
    }

    pub fn unit(&self) -> &str {
        &self.core.cfg.unit
    }

    pub fn is_initialized(&self) -> bool {
        self.core.is_initialized()
    }

    pub async fn set(&self, _value: impl Into<PvValue>) -> Result<(), CoreError> {
        Err(self.not_writable())
    }

    pub async fn set_and_wait(&self, _value: impl Into<PvValue>) -> Result<(), CoreError> {
        Err(self.not_writable())
    }

    pub async fn get(&self) -> Result<PvValue, CoreError> {
        Err(self.not_writable())
    }

    /// The current live value with quality and timestamp.
    pub async fn readback(&self) -> Result<Reading, CoreError> {
        let conn = self.core.ensure_initialized().await?;
        Ok(conn.read(self.core.attr_name()).await?)
    }

    pub async fn get_range(&self) -> Result<(Option<f64>, Option<f64>), CoreError> {
        if let Some(range) = self.core.cfg.range {
            return Ok(range);
        }
        self.core.ensure_initialized().await?;
        Ok(self.core.meta.get().map_or((None, None), |m| (m.min, m.max)))
    }

    pub async fn check_availability(&self) -> bool {
        match self.core.ensure_initialized().await {
            Ok(conn) => conn.ping().await.is_ok(),
            Err(_) => false,
        }
    }

    fn not_writable(&self) -> CoreError {
        CoreError::NotWritable {
            attribute: self.core.cfg.attribute.clone(),
        }
    }
}
