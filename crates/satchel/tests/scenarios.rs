//! End-to-end scenarios against the in-memory host engine.
//!
//! These exercise the full stack: bridge -> proxy/lazy wrapper -> call
//! channel -> emulated host -> event bus -> change router -> callback.

use std::sync::Arc;

use satchel::{ChannelError, ClientError, Lookup, StoreId, StoreOptions};
use satchel_testkit::{change_log, TestFixture};
use serde_json::{json, Value as JsonValue};

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

#[tokio::test]
async fn absent_is_distinct_from_present_null() -> anyhow::Result<()> {
    init_tracing();
    let fixture = TestFixture::new();
    let store = fixture.bridge.open("s.json", StoreOptions::new()).await?;

    assert!(!store.has("missing").await?);
    assert_eq!(store.get("missing").await?, Lookup::Absent);

    store.set("nullable", JsonValue::Null).await?;
    assert!(store.has("nullable").await?);
    assert_eq!(store.get("nullable").await?, Lookup::Present(JsonValue::Null));

    store.close().await?;
    Ok(())
}

#[tokio::test]
async fn legacy_generation_collapses_null_to_absent() -> anyhow::Result<()> {
    let fixture = TestFixture::legacy();
    let store = fixture.bridge.open("s.json", StoreOptions::new()).await?;

    store.set("nullable", JsonValue::Null).await?;
    // The key exists host-side...
    assert!(store.has("nullable").await?);
    // ...but the legacy get encoding cannot say so.
    assert_eq!(store.get("nullable").await?, Lookup::Absent);
    Ok(())
}

#[tokio::test]
async fn set_then_get_roundtrips() -> anyhow::Result<()> {
    let fixture = TestFixture::new();
    let store = fixture.bridge.open("s.json", StoreOptions::new()).await?;

    store.set("x", json!({"nested": [1, 2, 3]})).await?;
    assert_eq!(
        store.get("x").await?,
        Lookup::Present(json!({"nested": [1, 2, 3]}))
    );

    store.close().await?;
    Ok(())
}

#[tokio::test]
async fn delete_reports_whether_a_key_was_removed() -> anyhow::Result<()> {
    let fixture = TestFixture::new();
    let store = fixture.bridge.open("s.json", StoreOptions::new()).await?;

    store.set("x", json!(1)).await?;
    assert!(store.delete("x").await?);
    assert!(!store.has("x").await?);
    assert!(!store.delete("x").await?);

    store.close().await?;
    Ok(())
}

#[tokio::test]
async fn reset_without_defaults_behaves_like_clear() -> anyhow::Result<()> {
    let fixture = TestFixture::new();
    let store = fixture.bridge.open("s.json", StoreOptions::new()).await?;

    store.set("a", json!(1)).await?;
    store.set("b", json!(2)).await?;
    store.reset().await?;

    assert!(store.keys().await?.is_empty());
    assert_eq!(store.length().await?, 0);
    Ok(())
}

#[tokio::test]
async fn reset_restores_defaults_and_publishes_only_diffs() -> anyhow::Result<()> {
    let fixture = TestFixture::new();
    let options = StoreOptions::new().default_entry("a", json!(1));
    let store = fixture.bridge.open("s.json", options).await?;

    let (callback, log) = change_log();
    let _watch = fixture.bridge.watch_store(store.store_id(), callback);

    store.set("a", json!(1)).await?; // already the default value
    store.set("b", json!(2)).await?;
    store.reset().await?;

    assert_eq!(store.entries().await?, vec![("a".to_string(), json!(1))]);

    let log = log.lock().unwrap();
    // Two sets, then reset notices only for what differed: `a` was
    // already at its default, so only `b` is announced (as absent).
    assert_eq!(log.len(), 3);
    assert_eq!(log[2].key, "b");
    assert_eq!(log[2].lookup, Lookup::Absent);
    Ok(())
}

#[tokio::test]
async fn lazy_store_is_single_flight_under_concurrency() -> anyhow::Result<()> {
    let fixture = TestFixture::new();
    let store = Arc::new(fixture.bridge.lazy("s.json", StoreOptions::new()));

    let tasks: Vec<_> = (0..10)
        .map(|i| {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.set(format!("k{i}"), json!(i)).await })
        })
        .collect();
    for task in tasks {
        task.await??;
    }

    assert_eq!(fixture.host.count("load"), 1);
    assert_eq!(store.length().await?, 10);
    Ok(())
}

#[tokio::test]
async fn key_watch_never_crosses_keys_or_stores() -> anyhow::Result<()> {
    let fixture = TestFixture::new();
    let store = fixture.bridge.open("s.json", StoreOptions::new()).await?;
    let other = fixture.bridge.open("other.json", StoreOptions::new()).await?;

    let (callback, log) = change_log();
    let _watch = fixture.bridge.watch_key(store.store_id(), "a", callback);

    store.set("a", json!(1)).await?;
    store.set("b", json!(2)).await?;
    other.set("a", json!(3)).await?;

    let log = log.lock().unwrap();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].key, "a");
    assert_eq!(log[0].lookup, Lookup::Present(json!(1)));
    Ok(())
}

#[tokio::test]
async fn unsubscribe_stops_delivery_deterministically() -> anyhow::Result<()> {
    let fixture = TestFixture::new();
    let store = fixture.bridge.open("s.json", StoreOptions::new()).await?;

    let (callback, log) = change_log();
    let mut watch = fixture.bridge.watch_store(store.store_id(), callback);

    store.set("x", json!(1)).await?;
    watch.unsubscribe();
    store.set("x", json!(2)).await?;

    assert_eq!(log.lock().unwrap().len(), 1);
    Ok(())
}

#[tokio::test]
async fn dropping_the_guard_also_unsubscribes() -> anyhow::Result<()> {
    let fixture = TestFixture::new();
    let store = fixture.bridge.open("s.json", StoreOptions::new()).await?;

    let (callback, log) = change_log();
    {
        let _watch = fixture.bridge.watch_store(store.store_id(), callback);
        store.set("x", json!(1)).await?;
    }
    store.set("x", json!(2)).await?;

    assert_eq!(log.lock().unwrap().len(), 1);
    Ok(())
}

#[tokio::test]
async fn reload_reflects_external_edits_without_notifications() -> anyhow::Result<()> {
    let fixture = TestFixture::new();
    let store = fixture.bridge.open("s.json", StoreOptions::new()).await?;

    let (callback, log) = change_log();
    let _watch = fixture.bridge.watch_store(store.store_id(), callback);

    store.set("x", json!(1)).await?;
    store.save().await?;

    // Someone else edits the persisted state behind our back.
    fixture
        .host
        .write_disk("s.json", [("x".to_string(), json!(42))]);

    store.reload().await?;
    assert_eq!(store.get("x").await?, Lookup::Present(json!(42)));

    // Only the set was announced; save and reload were silent.
    assert_eq!(log.lock().unwrap().len(), 1);
    Ok(())
}

#[tokio::test]
async fn operations_after_close_fail_locally() -> anyhow::Result<()> {
    let fixture = TestFixture::new();
    let store = fixture.bridge.open("s.json", StoreOptions::new()).await?;
    store.close().await?;

    let calls_before = fixture.host.ops().len();
    let err = store.get("x").await.unwrap_err();
    assert!(matches!(err, ClientError::UseAfterClose));
    // Nothing reached the host.
    assert_eq!(fixture.host.ops().len(), calls_before);

    // A second close is a local no-op too.
    store.close().await?;
    assert_eq!(fixture.host.count("close"), 1);
    Ok(())
}

#[tokio::test]
async fn existing_finds_live_stores_only() -> anyhow::Result<()> {
    let fixture = TestFixture::new();

    assert!(fixture.bridge.existing("s.json").await?.is_none());

    let store = fixture.bridge.open("s.json", StoreOptions::new()).await?;
    store.set("x", json!(1)).await?;

    let found = fixture
        .bridge
        .existing("s.json")
        .await?
        .expect("store should be live");
    assert_eq!(found.get("x").await?, Lookup::Present(json!(1)));

    store.close().await?;
    assert!(fixture.bridge.existing("s.json").await?.is_none());
    Ok(())
}

#[tokio::test]
async fn unreachable_host_surfaces_unmodified() -> anyhow::Result<()> {
    let fixture = TestFixture::new();
    let store = fixture.bridge.open("s.json", StoreOptions::new()).await?;

    fixture.host.set_unreachable(true);
    let err = store.get("x").await.unwrap_err();
    assert!(matches!(
        err,
        ClientError::Channel(ChannelError::Unreachable(_))
    ));
    Ok(())
}

#[tokio::test]
async fn legacy_watch_filters_by_path() -> anyhow::Result<()> {
    let fixture = TestFixture::legacy();
    let store = fixture.bridge.open("s.json", StoreOptions::new()).await?;
    let other = fixture.bridge.open("other.json", StoreOptions::new()).await?;

    let (callback, log) = change_log();
    let _watch = fixture
        .bridge
        .watch_store(StoreId::path("s.json"), callback);

    store.set("x", json!(1)).await?;
    other.set("x", json!(2)).await?;
    store.delete("x").await?;

    let log = log.lock().unwrap();
    assert_eq!(log.len(), 2);
    assert_eq!(log[0].lookup, Lookup::Present(json!(1)));
    // Legacy deletions arrive as absent (null on the wire).
    assert_eq!(log[1].lookup, Lookup::Absent);
    Ok(())
}

#[tokio::test]
async fn clear_announces_every_removed_key() -> anyhow::Result<()> {
    let fixture = TestFixture::new();
    let store = fixture.bridge.open("s.json", StoreOptions::new()).await?;

    let (callback, log) = change_log();
    let _watch = fixture.bridge.watch_store(store.store_id(), callback);

    store.set("a", json!(1)).await?;
    store.set("b", json!(2)).await?;
    store.clear().await?;

    let log = log.lock().unwrap();
    let cleared: Vec<_> = log[2..].iter().map(|n| n.key.clone()).collect();
    assert_eq!(cleared, vec!["a".to_string(), "b".to_string()]);
    assert!(log[2..].iter().all(|n| n.lookup == Lookup::Absent));
    Ok(())
}

#[tokio::test]
async fn generation_mismatch_is_rejected_by_the_host() -> anyhow::Result<()> {
    // A legacy bridge asking a legacy host for handle-generation
    // operations gets the host's own rejection, unmodified.
    let fixture = TestFixture::legacy();
    let err = fixture.bridge.existing("s.json").await.unwrap_err();
    match err {
        satchel::BridgeError::Channel(ChannelError::Rejected(msg)) => {
            assert!(msg.contains("get_store"));
        }
        other => panic!("expected host rejection, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn options_are_forwarded_but_existing_instance_wins() -> anyhow::Result<()> {
    let fixture = TestFixture::new();

    let first = fixture
        .bridge
        .open("s.json", StoreOptions::new().default_entry("a", json!(1)))
        .await?;
    assert_eq!(first.get("a").await?, Lookup::Present(json!(1)));

    // A second open with different defaults joins the existing
    // instance; its options are inert.
    let second = fixture
        .bridge
        .open("s.json", StoreOptions::new().default_entry("b", json!(2)))
        .await?;
    assert_eq!(second.get("b").await?, Lookup::Absent);
    assert_eq!(second.get("a").await?, Lookup::Present(json!(1)));
    Ok(())
}
