// ── Ordered scatter-gather batch ──
//
// A MultiAttribute is an ordered sequence of independent attributes;
// position is the caller-visible identity. Every operation submits one
// asynchronous remote call per position, then waits on the pending replies
// in submission order, so output index i always corresponds to input
// index i.

use attune_transport::{PvValue, Reading};

use crate::access::attribute::Attribute;
use crate::access::await_reply;
use crate::config::{AttributeConfig, MultiAttributeConfig};
use crate::context::Context;
use crate::error::CoreError;

/// Ordered batch of independent writable attributes.
pub struct MultiAttribute {
    context: Context,
    name: String,
    unit: String,
    items: Vec<Attribute>,
}

impl MultiAttribute {
    /// Build the batch from configuration, constructing (and registering)
    /// one [`Attribute`] per path in order.
    pub async fn new(context: &Context, cfg: MultiAttributeConfig) -> Result<Self, CoreError> {
        let mut items = Vec::with_capacity(cfg.attributes.len());
        for path in &cfg.attributes {
            let attr_cfg = AttributeConfig {
                attribute: path.clone(),
                unit: cfg.unit.clone(),
                range: None,
            };
            items.push(Attribute::new(context, attr_cfg).await?);
        }
        Ok(Self {
            context: context.clone(),
            name: cfg.name,
            unit: cfg.unit,
            items,
        })
    }

    /// An empty batch to be filled with [`push`](Self::push).
    pub fn empty(context: &Context, name: impl Into<String>) -> Self {
        Self {
            context: context.clone(),
            name: name.into(),
            unit: String::new(),
            items: Vec::new(),
        }
    }

    /// Append an attribute; its position becomes its identity.
    pub fn push(&mut self, attribute: Attribute) {
        self.items.push(attribute);
    }

    /// Absorb every attribute of `other` in order, after this batch's own.
    pub fn extend_from(&mut self, other: MultiAttribute) {
        self.items.extend(other.items);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.items
    }

    /// Write one value per position.
    ///
    /// All writes are submitted before any wait happens; the pending
    /// replies are then awaited in submission order under the shared
    /// timeout. The first wait failure aborts the call — replies not yet
    /// waited on are abandoned (the remote calls keep running detached and
    /// nothing observes their result), and the caller cannot tell how many
    /// writes completed remotely.
    pub async fn set(&self, values: &[PvValue]) -> Result<(), CoreError> {
        if values.len() != self.items.len() {
            return Err(CoreError::SizeMismatch {
                expected: self.items.len(),
                got: values.len(),
            });
        }
        let timeout = self.context.cache().timeout();

        let mut pending = Vec::with_capacity(self.items.len());
        for (attribute, value) in self.items.iter().zip(values) {
            let conn = attribute.core().ensure_initialized().await?;
            let attr = attribute.measure_name().to_owned();
            let value = value.clone();
            pending.push(tokio::spawn(
                async move { conn.write(&attr, value).await },
            ));
        }
        for handle in pending {
            await_reply(timeout, handle).await?;
        }
        Ok(())
    }

    /// Not provided for batches; write with [`set`](Self::set) instead.
    pub async fn set_and_wait(&self, _values: &[PvValue]) -> Result<(), CoreError> {
        Err(CoreError::Unsupported {
            operation: "MultiAttribute::set_and_wait".into(),
        })
    }

    /// One value per position: the last commanded value for writable
    /// attributes, the live value otherwise.
    pub async fn get(&self) -> Result<Vec<PvValue>, CoreError> {
        let replies = self.gather_reads().await?;
        Ok(self
            .items
            .iter()
            .zip(replies)
            .map(|(attribute, reading)| {
                if attribute.is_writable() {
                    reading.set_point.unwrap_or(reading.value)
                } else {
                    reading.value
                }
            })
            .collect())
    }

    /// Live values only, one per position.
    pub async fn readback(&self) -> Result<Vec<PvValue>, CoreError> {
        let replies = self.gather_reads().await?;
        Ok(replies.into_iter().map(|reading| reading.value).collect())
    }

    /// Numeric bounds per position.
    pub async fn get_range(&self) -> Result<Vec<(Option<f64>, Option<f64>)>, CoreError> {
        let mut ranges = Vec::with_capacity(self.items.len());
        for attribute in &self.items {
            ranges.push(attribute.get_range().await?);
        }
        Ok(ranges)
    }

    /// Submit one read per position, then collect replies in submission
    /// order under the shared timeout.
    async fn gather_reads(&self) -> Result<Vec<Reading>, CoreError> {
        let timeout = self.context.cache().timeout();

        let mut pending = Vec::with_capacity(self.items.len());
        for attribute in &self.items {
            let conn = attribute.core().ensure_initialized().await?;
            let attr = attribute.measure_name().to_owned();
            pending.push(tokio::spawn(async move { conn.read(&attr).await }));
        }
        let mut replies = Vec::with_capacity(pending.len());
        for handle in pending {
            replies.push(await_reply(timeout, handle).await?);
        }
        Ok(replies)
    }
}

impl std::fmt::Debug for MultiAttribute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MultiAttribute")
            .field("name", &self.name)
            .field("len", &self.items.len())
            .finish()
    }
}
