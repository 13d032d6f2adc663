#![allow(clippy::unwrap_used)]
// Integration tests for single-attribute access against `MemoryTransport`.

use std::sync::Arc;

use pretty_assertions::assert_eq;

use attune_core::{
    Attribute, AttributeConfig, AttributeReadOnly, Context, ContextConfig, CoreError, PvValue,
    Quality,
};
use attune_transport::MemoryTransport;

// ── Helpers ─────────────────────────────────────────────────────────

fn setup() -> (MemoryTransport, Context) {
    let transport = MemoryTransport::new();
    let ctx = Context::new(
        ContextConfig {
            name: "test-cs".into(),
            ..ContextConfig::default()
        },
        Arc::new(transport.clone()),
    );
    (transport, ctx)
}

fn attr_config(path: &str) -> AttributeConfig {
    AttributeConfig {
        attribute: path.into(),
        unit: "A".into(),
        range: None,
    }
}

// ── Read/write paths ────────────────────────────────────────────────

#[tokio::test]
async fn set_and_wait_then_get_round_trips() {
    let (transport, ctx) = setup();
    transport.device("sys/tg_test/1").seed("float_scalar", 0.0);

    let attr = Attribute::new(&ctx, attr_config("sys/tg_test/1/float_scalar"))
        .await
        .unwrap();
    attr.set_and_wait(42.0).await.unwrap();

    assert_eq!(attr.get().await.unwrap(), PvValue::Scalar(42.0));

    let reading = attr.readback().await.unwrap();
    assert_eq!(reading.value, PvValue::Scalar(42.0));
    assert_eq!(reading.quality, Quality::Valid);

    assert_eq!(attr.unit(), "A");
    assert_eq!(attr.name(), "sys/tg_test/1/float_scalar");
    assert_eq!(attr.measure_name(), "float_scalar");
}

#[tokio::test]
async fn remote_read_fault_surfaces_as_remote_error() {
    let (transport, ctx) = setup();
    let device = transport.device("sys/tg_test/1");
    device.seed("float_scalar", 1.0);
    device.fail_reads_on("float_scalar", "MockedReason");

    let attr = Attribute::new(&ctx, attr_config("sys/tg_test/1/float_scalar"))
        .await
        .unwrap();
    let err = attr.readback().await.unwrap_err();
    assert!(matches!(err, CoreError::Remote { reason, .. } if reason == "MockedReason"));
}

// ── Writability policy ──────────────────────────────────────────────

#[tokio::test]
async fn writable_variant_rejects_read_only_remote_attribute() {
    let (transport, ctx) = setup();
    transport
        .device("sys/tg_test/1")
        .seed_read_only("float_scalar", 5.0);

    // Lazy mode: construction defers, first I/O hits the writability check.
    let attr = Attribute::new(&ctx, attr_config("sys/tg_test/1/float_scalar"))
        .await
        .unwrap();
    let err = attr.get().await.unwrap_err();
    assert!(
        matches!(&err, CoreError::NotWritable { attribute } if attribute == "sys/tg_test/1/float_scalar"),
        "expected NotWritable, got: {err:?}"
    );
}

#[tokio::test]
async fn read_only_variant_never_writes() {
    let (transport, ctx) = setup();
    let device = transport.device("sys/tg_test/1");
    device.seed_read_only("float_scalar", 5.0);

    let attr = AttributeReadOnly::new(&ctx, attr_config("sys/tg_test/1/float_scalar"))
        .await
        .unwrap();

    assert!(matches!(
        attr.set(10.0).await.unwrap_err(),
        CoreError::NotWritable { .. }
    ));
    assert!(matches!(
        attr.set_and_wait(10.0).await.unwrap_err(),
        CoreError::NotWritable { .. }
    ));
    assert!(matches!(
        attr.get().await.unwrap_err(),
        CoreError::NotWritable { .. }
    ));

    // The remote value is untouched and still readable.
    assert_eq!(device.value("float_scalar"), Some(PvValue::Scalar(5.0)));
    let reading = attr.readback().await.unwrap();
    assert_eq!(reading.value, PvValue::Scalar(5.0));
}

// ── Range resolution ────────────────────────────────────────────────

#[tokio::test]
async fn configured_range_wins_over_remote_metadata() {
    let (transport, ctx) = setup();
    let device = transport.device("sys/tg_test/1");
    device.seed("float_scalar", 0.0);
    device.set_range("float_scalar", Some(-10.0), Some(10.0));

    let mut cfg = attr_config("sys/tg_test/1/float_scalar");
    cfg.range = Some((Some(-15.0), Some(15.0)));
    let attr = Attribute::new(&ctx, cfg).await.unwrap();

    assert_eq!(attr.get_range().await.unwrap(), (Some(-15.0), Some(15.0)));
}

#[tokio::test]
async fn partial_configured_range_is_returned_as_is() {
    let (transport, ctx) = setup();
    transport.device("sys/tg_test/1").seed("float_scalar", 0.0);

    let mut cfg = attr_config("sys/tg_test/1/float_scalar");
    cfg.range = Some((Some(0.0), None));
    let attr = Attribute::new(&ctx, cfg).await.unwrap();

    assert_eq!(attr.get_range().await.unwrap(), (Some(0.0), None));
}

#[tokio::test]
async fn remote_range_used_when_not_configured() {
    let (transport, ctx) = setup();
    let device = transport.device("sys/tg_test/1");
    device.seed("float_scalar", 0.0);
    device.set_range("float_scalar", Some(-10.0), None);

    let attr = Attribute::new(&ctx, attr_config("sys/tg_test/1/float_scalar"))
        .await
        .unwrap();
    assert_eq!(attr.get_range().await.unwrap(), (Some(-10.0), None));
}

#[tokio::test]
async fn range_defaults_to_none_on_both_sides() {
    let (transport, ctx) = setup();
    transport.device("sys/tg_test/1").seed("float_scalar", 0.0);

    let attr = Attribute::new(&ctx, attr_config("sys/tg_test/1/float_scalar"))
        .await
        .unwrap();
    assert_eq!(attr.get_range().await.unwrap(), (None, None));
}

// ── Availability ────────────────────────────────────────────────────

#[tokio::test]
async fn availability_probe_never_raises() {
    let (transport, ctx) = setup();
    let device = transport.device("sys/tg_test/1");
    device.seed("float_scalar", 0.0);

    let attr = Attribute::new(&ctx, attr_config("sys/tg_test/1/float_scalar"))
        .await
        .unwrap();
    assert!(attr.check_availability().await);

    device.set_online(false);
    assert!(!attr.check_availability().await);

    // Unreachable endpoint: initialization fails, probe reports false.
    transport.refuse_open("sys/tg_test/9", "no route");
    let dead = Attribute::new(&ctx, attr_config("sys/tg_test/9/float_scalar"))
        .await
        .unwrap();
    assert!(!dead.check_availability().await);
}

// ── Connection dedup ────────────────────────────────────────────────

#[tokio::test]
async fn two_handles_share_one_connection() {
    let (transport, ctx) = setup();
    transport.device("sys/tg_test/1").seed("float_scalar", 0.0);

    let a = Attribute::new(&ctx, attr_config("sys/tg_test/1/float_scalar"))
        .await
        .unwrap();
    let b = Attribute::new(&ctx, attr_config("sys/tg_test/1/float_scalar"))
        .await
        .unwrap();

    a.set_and_wait(1.0).await.unwrap();
    b.set_and_wait(2.0).await.unwrap();

    assert_eq!(transport.open_count(), 1);
    assert_eq!(ctx.cache().len(), 1);
}

#[tokio::test]
async fn aliased_endpoints_dedup_after_canonicalization() {
    let transport = MemoryTransport::new();
    let ctx = Context::new(
        ContextConfig {
            name: "test-cs".into(),
            network_host: Some("ctrl-host:10000".into()),
            ..ContextConfig::default()
        },
        Arc::new(transport.clone()),
    );
    transport
        .device("//ctrl-host:10000/sys/tg_test/1")
        .seed("current", 0.0);
    transport
        .device("//ctrl-host:10000/sys/tg_test/1")
        .seed("voltage", 0.0);

    let bare = Attribute::new(&ctx, attr_config("sys/tg_test/1/current"))
        .await
        .unwrap();
    let prefixed = Attribute::new(&ctx, attr_config("//ctrl-host:10000/sys/tg_test/1/voltage"))
        .await
        .unwrap();

    bare.set_and_wait(1.0).await.unwrap();
    prefixed.set_and_wait(2.0).await.unwrap();

    assert_eq!(transport.open_count(), 1);
    assert_eq!(ctx.cache().len(), 1);
}
