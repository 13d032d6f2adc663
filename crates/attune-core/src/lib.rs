//! Access-and-lifecycle core for the `attune` device-attribute layer.
//!
//! This crate gives callers a uniform handle to read, write, and read back
//! named remote process variables hosted on many independent device
//! servers, while hiding connection setup, deduplication, and batching:
//!
//! - **[`Context`]** — Explicitly constructed lifecycle coordinator.
//!   Construction registers access objects instead of opening connections;
//!   [`start()`](Context::start) activates the context (draining the
//!   pending registrations in eager mode), and
//!   [`warmup()`](Context::warmup) forces eager initialization regardless
//!   of mode. A first-writer-wins process-wide slot is available through
//!   [`Context::try_install_global`].
//!
//! - **[`ConnectionCache`]** — One shared connection per endpoint, with a
//!   shared request timeout. Concurrent first use of the same endpoint
//!   still opens exactly one physical connection.
//!
//! - **Access objects** — [`Attribute`] (writable scalar/vector),
//!   [`AttributeReadOnly`], [`AttributeGroup`] (named multi-device group),
//!   and [`MultiAttribute`] (ordered scatter-gather batch). All implement
//!   the [`Initializable`] contract and defer connection setup until the
//!   context activates them or their first I/O call arrives.
//!
//! The remote protocol itself lives behind the [`attune_transport`]
//! capability seam; this crate never sees wire types.

pub mod access;
pub mod cache;
pub mod config;
pub mod context;
pub mod endpoint;
pub mod error;

// ── Primary re-exports ──────────────────────────────────────────────
pub use access::{Attribute, AttributeGroup, AttributeReadOnly, MultiAttribute};
pub use cache::ConnectionCache;
pub use config::{AttributeConfig, ContextConfig, GroupConfig, MultiAttributeConfig};
pub use context::{Context, Initializable};
pub use endpoint::EndpointId;
pub use error::CoreError;

// Re-export the transport value model at the crate root for ergonomics.
pub use attune_transport::{AttrMetadata, PvValue, Quality, Reading};
