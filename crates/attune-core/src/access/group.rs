// ── Named multi-device group ──
//
// One call fans out over every member device sharing an attribute suffix.
// Replies come back unordered, keyed by (device, attribute); results are
// reassembled into the caller's configured order, and a missing key is an
// error rather than a silent gap.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::warn;

use attune_transport::{Connection, PvValue, Reading};

use crate::access::await_reply;
use crate::config::GroupConfig;
use crate::context::{Context, Initializable};
use crate::endpoint::EndpointId;
use crate::error::CoreError;

struct GroupCore {
    context: Context,
    cfg: GroupConfig,
    /// Attribute suffix -> member devices, bucketed at construction.
    buckets: Vec<(String, Vec<EndpointId>)>,
    /// The caller's configured order as (device, attribute) reply keys.
    order: Vec<(EndpointId, String)>,
    /// Write-once: one resolved connection per member device.
    connections: OnceCell<HashMap<EndpointId, Arc<dyn Connection>>>,
}

impl GroupCore {
    fn build(context: &Context, cfg: GroupConfig) -> Result<Arc<Self>, CoreError> {
        let mut buckets: Vec<(String, Vec<EndpointId>)> = Vec::new();
        let mut order = Vec::with_capacity(cfg.endpoints.len());

        for path in &cfg.endpoints {
            let Some((device, attr_name)) = path.rsplit_once('/') else {
                return Err(CoreError::InvalidConfig {
                    message: format!("attribute path '{path}' has no device component"),
                });
            };
            let endpoint = context.canonical_endpoint(device);
            order.push((endpoint.clone(), attr_name.to_owned()));

            match buckets.iter_mut().find(|(name, _)| name == attr_name) {
                Some((_, members)) => {
                    if !members.contains(&endpoint) {
                        members.push(endpoint);
                    }
                }
                None => buckets.push((attr_name.to_owned(), vec![endpoint])),
            }
        }

        Ok(Arc::new(Self {
            context: context.clone(),
            buckets,
            order,
            connections: OnceCell::new(),
            cfg,
        }))
    }

    async fn attach(self: &Arc<Self>) -> Result<(), CoreError> {
        if self.context.is_active() && !self.context.is_lazy() {
            self.initialize().await
        } else {
            let weak = Arc::downgrade(self) as Weak<dyn Initializable>;
            self.context.register(weak).await;
            Ok(())
        }
    }

    async fn ensure_initialized(
        &self,
    ) -> Result<&HashMap<EndpointId, Arc<dyn Connection>>, CoreError> {
        if let Some(conns) = self.connections.get() {
            return Ok(conns);
        }
        if !self.context.is_lazy() {
            return Err(CoreError::NotInitialized {
                name: self.cfg.name.clone(),
            });
        }
        self.initialize().await?;
        self.connections
            .get()
            .ok_or_else(|| CoreError::Internal("connections missing after initialization".into()))
    }
}

#[async_trait]
impl Initializable for GroupCore {
    async fn initialize(&self) -> Result<(), CoreError> {
        if self.connections.initialized() {
            return Ok(());
        }
        let mut conns = HashMap::new();
        for (endpoint, _) in &self.order {
            if !conns.contains_key(endpoint) {
                let conn = self.context.cache().get(endpoint).await?;
                conns.insert(endpoint.clone(), conn);
            }
        }
        let _ = self.connections.set(conns);
        Ok(())
    }

    fn is_initialized(&self) -> bool {
        self.connections.initialized()
    }

    fn name(&self) -> &str {
        &self.cfg.name
    }
}

/// Named group of remote attributes sharing one (or a few) attribute
/// suffixes, written and read as a unit.
pub struct AttributeGroup {
    core: Arc<GroupCore>,
}

impl AttributeGroup {
    pub async fn new(context: &Context, cfg: GroupConfig) -> Result<Self, CoreError> {
        let core = GroupCore::build(context, cfg)?;
        core.attach().await?;
        Ok(Self { core })
    }

    pub fn name(&self) -> &str {
        &self.core.cfg.name
    }

    pub fn measure_name(&self) -> &str {
        &self.core.cfg.name
    }

    pub fn unit(&self) -> &str {
        &self.core.cfg.unit
    }

    pub fn len(&self) -> usize {
        self.core.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.core.order.is_empty()
    }

    pub fn is_initialized(&self) -> bool {
        self.core.is_initialized()
    }

    /// Fire-and-forget write of one value to every member.
    pub async fn set(&self, value: impl Into<PvValue>) -> Result<(), CoreError> {
        let conns = self.core.ensure_initialized().await?;
        let value = value.into();
        for (attr_name, members) in &self.core.buckets {
            for endpoint in members {
                let conn = Arc::clone(self.connection_for(conns, endpoint)?);
                let attr = attr_name.clone();
                let value = value.clone();
                let target = endpoint.clone();
                tokio::spawn(async move {
                    if let Err(err) = conn.write(&attr, value).await {
                        warn!(endpoint = %target, attribute = %attr, error = %err,
                            "asynchronous group write failed");
                    }
                });
            }
        }
        Ok(())
    }

    /// Write one value to every member and wait for every acknowledgement.
    /// The first failure aborts the call.
    pub async fn set_and_wait(&self, value: impl Into<PvValue>) -> Result<(), CoreError> {
        let conns = self.core.ensure_initialized().await?;
        let timeout = self.core.context.cache().timeout();
        let value = value.into();

        let mut pending = Vec::with_capacity(self.core.order.len());
        for (attr_name, members) in &self.core.buckets {
            for endpoint in members {
                let conn = Arc::clone(self.connection_for(conns, endpoint)?);
                let attr = attr_name.clone();
                let value = value.clone();
                pending.push(tokio::spawn(
                    async move { conn.write(&attr, value).await },
                ));
            }
        }
        for handle in pending {
            await_reply(timeout, handle).await?;
        }
        Ok(())
    }

    /// Last commanded values, in the caller's configured order.
    pub async fn get(&self) -> Result<Vec<PvValue>, CoreError> {
        let replies = self.gather_reads().await?;
        self.reassemble(replies, |reading| {
            reading.set_point.clone().unwrap_or_else(|| reading.value.clone())
        })
    }

    /// Live values with quality and timestamp, in the caller's configured
    /// order.
    pub async fn readback(&self) -> Result<Vec<Reading>, CoreError> {
        let replies = self.gather_reads().await?;
        self.reassemble(replies, Clone::clone)
    }

    /// Liveness probe: `true` only when every member device answers.
    pub async fn check_availability(&self) -> bool {
        let Ok(conns) = self.core.ensure_initialized().await else {
            return false;
        };
        let pings = conns.values().map(|conn| conn.ping());
        futures_util::future::join_all(pings)
            .await
            .into_iter()
            .all(|r| r.is_ok())
    }

    fn connection_for<'a>(
        &self,
        conns: &'a HashMap<EndpointId, Arc<dyn Connection>>,
        endpoint: &EndpointId,
    ) -> Result<&'a Arc<dyn Connection>, CoreError> {
        conns.get(endpoint).ok_or_else(|| {
            CoreError::Internal(format!("no connection resolved for {endpoint}"))
        })
    }

    /// Scatter one read per (device, attribute) pair; gather the unordered
    /// replies into a keyed map.
    async fn gather_reads(
        &self,
    ) -> Result<HashMap<(EndpointId, String), Reading>, CoreError> {
        let conns = self.core.ensure_initialized().await?;
        let timeout = self.core.context.cache().timeout();

        let mut pending = Vec::with_capacity(self.core.order.len());
        for (attr_name, members) in &self.core.buckets {
            for endpoint in members {
                let conn = Arc::clone(self.connection_for(conns, endpoint)?);
                let attr = attr_name.clone();
                let key = (endpoint.clone(), attr_name.clone());
                pending.push((
                    key,
                    tokio::spawn(async move { conn.read(&attr).await }),
                ));
            }
        }

        let mut replies = HashMap::with_capacity(pending.len());
        for (key, handle) in pending {
            let reading = await_reply(timeout, handle).await?;
            replies.insert(key, reading);
        }
        Ok(replies)
    }

    /// Map keyed replies back onto the configured order; a member missing
    /// from the reply set is an error.
    fn reassemble<T>(
        &self,
        replies: HashMap<(EndpointId, String), Reading>,
        extract: impl Fn(&Reading) -> T,
    ) -> Result<Vec<T>, CoreError> {
        self.core
            .order
            .iter()
            .zip(&self.core.cfg.endpoints)
            .map(|(key, path)| {
                replies
                    .get(key)
                    .map(&extract)
                    .ok_or_else(|| CoreError::MissingReply {
                        attribute: path.clone(),
                    })
            })
            .collect()
    }
}

impl std::fmt::Debug for AttributeGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AttributeGroup")
            .field("name", &self.core.cfg.name)
            .field("members", &self.core.order.len())
            .field("initialized", &self.core.is_initialized())
            .finish()
    }
}
