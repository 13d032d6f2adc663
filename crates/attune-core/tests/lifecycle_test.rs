#![allow(clippy::unwrap_used)]
// Integration tests for the context lifecycle: lazy vs eager connection
// accounting, idempotent start, warmup, and the strict-mode guard.

use std::sync::Arc;

use pretty_assertions::assert_eq;

use attune_core::{
    Attribute, AttributeConfig, AttributeGroup, Context, ContextConfig, CoreError, GroupConfig,
    PvValue,
};
use attune_transport::MemoryTransport;

fn setup(lazy: bool) -> (MemoryTransport, Context) {
    let transport = MemoryTransport::new();
    let ctx = Context::new(
        ContextConfig {
            name: "lifecycle-cs".into(),
            lazy,
            ..ContextConfig::default()
        },
        Arc::new(transport.clone()),
    );
    (transport, ctx)
}

async fn attribute(ctx: &Context, path: &str) -> Attribute {
    Attribute::new(ctx, AttributeConfig::new(path)).await.unwrap()
}

#[tokio::test]
async fn lazy_mode_defers_connections_until_first_io() {
    let (transport, ctx) = setup(true);
    for n in 1..=3 {
        transport.device(&format!("sys/ps/{n}")).seed("current", 0.0);
    }

    let a1 = attribute(&ctx, "sys/ps/1/current").await;
    let _a2 = attribute(&ctx, "sys/ps/2/current").await;
    let _a3 = attribute(&ctx, "sys/ps/3/current").await;
    ctx.start().await.unwrap();

    // No connection was opened by construction or lazy start.
    assert_eq!(transport.open_count(), 0);

    // First I/O call opens exactly one connection.
    a1.set_and_wait(42.0).await.unwrap();
    assert_eq!(transport.open_count(), 1);

    // Repeated I/O opens nothing further.
    a1.set_and_wait(43.0).await.unwrap();
    assert_eq!(a1.get().await.unwrap(), PvValue::Scalar(43.0));
    assert_eq!(transport.open_count(), 1);
}

#[tokio::test]
async fn eager_start_opens_one_connection_per_registered_handle() {
    let (transport, ctx) = setup(false);
    for n in 1..=3 {
        transport.device(&format!("sys/ps/{n}")).seed("current", 0.0);
    }

    let a1 = attribute(&ctx, "sys/ps/1/current").await;
    let a2 = attribute(&ctx, "sys/ps/2/current").await;
    let a3 = attribute(&ctx, "sys/ps/3/current").await;
    assert_eq!(transport.open_count(), 0);

    ctx.start().await.unwrap();
    assert_eq!(transport.open_count(), 3);
    assert!(a1.is_initialized() && a2.is_initialized() && a3.is_initialized());

    // Subsequent I/O opens nothing further.
    a1.set_and_wait(1.0).await.unwrap();
    a2.set_and_wait(2.0).await.unwrap();
    a3.set_and_wait(3.0).await.unwrap();
    assert_eq!(transport.open_count(), 3);
}

#[tokio::test]
async fn start_twice_has_no_additional_side_effects() {
    let (transport, ctx) = setup(false);
    transport.device("sys/ps/1").seed("current", 0.0);

    let _attr = attribute(&ctx, "sys/ps/1/current").await;
    ctx.start().await.unwrap();
    assert_eq!(transport.open_count(), 1);

    ctx.start().await.unwrap();
    assert_eq!(transport.open_count(), 1);
}

#[tokio::test]
async fn strict_mode_io_before_start_is_an_error() {
    let (transport, ctx) = setup(false);
    transport.device("sys/ps/1").seed("current", 0.0);

    let attr = attribute(&ctx, "sys/ps/1/current").await;
    let err = attr.set_and_wait(1.0).await.unwrap_err();
    assert!(
        matches!(&err, CoreError::NotInitialized { name } if name == "sys/ps/1/current"),
        "expected NotInitialized, got: {err:?}"
    );
    assert_eq!(transport.open_count(), 0);
}

#[tokio::test]
async fn element_constructed_after_eager_start_initializes_immediately() {
    let (transport, ctx) = setup(false);
    transport.device("sys/ps/1").seed("current", 0.0);
    ctx.start().await.unwrap();

    let attr = attribute(&ctx, "sys/ps/1/current").await;
    assert!(attr.is_initialized());
    assert_eq!(transport.open_count(), 1);
}

#[tokio::test]
async fn warmup_overrides_lazy_mode_and_drains_everything() {
    let (transport, ctx) = setup(true);
    for n in 1..=2 {
        transport.device(&format!("sys/ps/{n}")).seed("current", 0.0);
    }
    let a1 = attribute(&ctx, "sys/ps/1/current").await;
    let group = AttributeGroup::new(
        &ctx,
        GroupConfig {
            endpoints: vec!["sys/ps/1/current".into(), "sys/ps/2/current".into()],
            name: "supplies".into(),
            unit: "A".into(),
        },
    )
    .await
    .unwrap();

    ctx.warmup().await.unwrap();
    assert!(a1.is_initialized());
    assert!(group.is_initialized());
    // Two distinct devices across both handles: dedup keeps it at two.
    assert_eq!(transport.open_count(), 2);

    // A second warmup finds nothing left to do.
    ctx.warmup().await.unwrap();
    assert_eq!(transport.open_count(), 2);
}

#[tokio::test]
async fn eager_start_aborts_on_unreachable_endpoint() {
    let (transport, ctx) = setup(false);
    transport.device("sys/ps/1").seed("current", 0.0);
    transport.refuse_open("sys/ps/2", "no route");

    let _good = attribute(&ctx, "sys/ps/1/current").await;
    let _bad = attribute(&ctx, "sys/ps/2/current").await;

    let err = ctx.start().await.unwrap_err();
    assert!(matches!(err, CoreError::ConnectionFailed { .. }));
    assert!(!ctx.is_active());

    // Once the endpoint is reachable again, warmup retries the remainder.
    transport.allow_open("sys/ps/2");
    transport.device("sys/ps/2").seed("current", 0.0);
    ctx.warmup().await.unwrap();
    assert!(ctx.is_active());
    assert_eq!(transport.open_count(), 2);
}
