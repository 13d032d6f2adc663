// ── In-process loopback transport ──
//
// A Transport implementation backed by in-memory device tables. Devices are
// seeded by tests or simulations through `MemoryTransport::device()`;
// failure injection covers refused opens, per-attribute read faults, and
// dead pings. The open counter makes lazy/eager connection accounting
// observable.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;

use crate::error::TransportError;
use crate::value::{AttrMetadata, PvValue, Quality, Reading};
use crate::{Connection, Transport};

#[derive(Clone)]
struct StoredAttr {
    value: Option<PvValue>,
    set_point: Option<PvValue>,
    meta: AttrMetadata,
}

impl Default for StoredAttr {
    fn default() -> Self {
        Self {
            value: None,
            set_point: None,
            meta: AttrMetadata::default(),
        }
    }
}

// ── MemoryDevice ────────────────────────────────────────────────────

/// One simulated device server, addressable by its endpoint identifier.
pub struct MemoryDevice {
    endpoint: String,
    attributes: DashMap<String, StoredAttr>,
    timeout_ms: AtomicU64,
    online: AtomicBool,
    read_faults: DashMap<String, String>,
    read_delay_ms: AtomicU64,
}

impl MemoryDevice {
    fn new(endpoint: &str) -> Self {
        Self {
            endpoint: endpoint.to_owned(),
            attributes: DashMap::new(),
            timeout_ms: AtomicU64::new(0),
            online: AtomicBool::new(true),
            read_faults: DashMap::new(),
            read_delay_ms: AtomicU64::new(0),
        }
    }

    /// Seed a writable attribute with an initial value.
    pub fn seed(&self, attr: &str, value: impl Into<PvValue>) {
        let value = value.into();
        self.attributes.insert(
            attr.to_owned(),
            StoredAttr {
                set_point: Some(value.clone()),
                value: Some(value),
                meta: AttrMetadata::default(),
            },
        );
    }

    /// Seed a read-only attribute with an initial value.
    pub fn seed_read_only(&self, attr: &str, value: impl Into<PvValue>) {
        self.attributes.insert(
            attr.to_owned(),
            StoredAttr {
                value: Some(value.into()),
                set_point: None,
                meta: AttrMetadata {
                    writable: false,
                    ..AttrMetadata::default()
                },
            },
        );
    }

    /// Set the numeric bounds reported by metadata queries for `attr`.
    pub fn set_range(&self, attr: &str, min: Option<f64>, max: Option<f64>) {
        let mut entry = self.attributes.entry(attr.to_owned()).or_default();
        entry.meta.min = min;
        entry.meta.max = max;
    }

    /// Make every read of `attr` fail with a remote fault.
    pub fn fail_reads_on(&self, attr: &str, reason: &str) {
        self.read_faults.insert(attr.to_owned(), reason.to_owned());
    }

    /// Mark the device as unreachable for pings.
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    /// Delay every read by `delay` (for timeout testing).
    pub fn set_read_delay(&self, delay: Duration) {
        let ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self.read_delay_ms.store(ms, Ordering::SeqCst);
    }

    /// The last commanded value of `attr`, if any write happened.
    pub fn written(&self, attr: &str) -> Option<PvValue> {
        self.attributes.get(attr).and_then(|a| a.set_point.clone())
    }

    /// The live value of `attr`, if present.
    pub fn value(&self, attr: &str) -> Option<PvValue> {
        self.attributes.get(attr).and_then(|a| a.value.clone())
    }

    /// The request timeout most recently applied to this link.
    pub fn applied_timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms.load(Ordering::SeqCst))
    }
}

#[async_trait]
impl Connection for MemoryDevice {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn set_timeout(&self, timeout: Duration) {
        let ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self.timeout_ms.store(ms, Ordering::SeqCst);
    }

    async fn read(&self, attr: &str) -> Result<Reading, TransportError> {
        let delay = self.read_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if let Some(reason) = self.read_faults.get(attr) {
            return Err(TransportError::remote(
                reason.clone(),
                format!("read of {attr} failed"),
                self.endpoint.clone(),
            ));
        }
        let stored = self.attributes.get(attr).ok_or_else(|| {
            TransportError::remote(
                "AttrNotFound",
                format!("device has no attribute named {attr}"),
                self.endpoint.clone(),
            )
        })?;
        let value = stored.value.clone().ok_or_else(|| {
            TransportError::remote(
                "AttrValueNotSet",
                format!("attribute {attr} has never been set"),
                self.endpoint.clone(),
            )
        })?;
        Ok(Reading {
            value,
            set_point: stored.set_point.clone(),
            quality: Quality::Valid,
            timestamp: chrono::Utc::now(),
        })
    }

    async fn write(&self, attr: &str, value: PvValue) -> Result<(), TransportError> {
        let mut entry = self.attributes.entry(attr.to_owned()).or_default();
        if !entry.meta.writable {
            return Err(TransportError::remote(
                "AttrNotWritable",
                format!("attribute {attr} is read-only"),
                self.endpoint.clone(),
            ));
        }
        entry.set_point = Some(value.clone());
        entry.value = Some(value);
        Ok(())
    }

    async fn metadata(&self, attr: &str) -> Result<AttrMetadata, TransportError> {
        Ok(self
            .attributes
            .get(attr)
            .map(|a| a.meta)
            .unwrap_or_default())
    }

    async fn ping(&self) -> Result<(), TransportError> {
        if self.online.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(TransportError::ConnectionFailed {
                endpoint: self.endpoint.clone(),
                reason: "ping timed out".into(),
            })
        }
    }
}

// ── MemoryTransport ─────────────────────────────────────────────────

/// In-process [`Transport`] over a table of [`MemoryDevice`]s.
///
/// Cheaply cloneable; clones share the same device table, so a test can
/// keep a handle for seeding while the context owns another.
#[derive(Clone, Default)]
pub struct MemoryTransport {
    inner: Arc<TransportInner>,
}

#[derive(Default)]
struct TransportInner {
    devices: DashMap<String, Arc<MemoryDevice>>,
    open_count: AtomicUsize,
    refused: DashMap<String, String>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create the device behind `endpoint`.
    ///
    /// Seeding goes through this handle; it does not count as an open.
    pub fn device(&self, endpoint: &str) -> Arc<MemoryDevice> {
        self.inner
            .devices
            .entry(endpoint.to_owned())
            .or_insert_with(|| Arc::new(MemoryDevice::new(endpoint)))
            .clone()
    }

    /// Number of connections opened through [`Transport::open`].
    pub fn open_count(&self) -> usize {
        self.inner.open_count.load(Ordering::SeqCst)
    }

    /// Make every open of `endpoint` fail.
    pub fn refuse_open(&self, endpoint: &str, reason: &str) {
        self.inner
            .refused
            .insert(endpoint.to_owned(), reason.to_owned());
    }

    /// Undo [`refuse_open`](Self::refuse_open).
    pub fn allow_open(&self, endpoint: &str) {
        self.inner.refused.remove(endpoint);
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn open(&self, endpoint: &str) -> Result<Arc<dyn Connection>, TransportError> {
        if let Some(reason) = self.inner.refused.get(endpoint) {
            return Err(TransportError::ConnectionFailed {
                endpoint: endpoint.to_owned(),
                reason: reason.clone(),
            });
        }
        self.inner.open_count.fetch_add(1, Ordering::SeqCst);
        let conn: Arc<dyn Connection> = self.device(endpoint);
        Ok(conn)
    }
}
