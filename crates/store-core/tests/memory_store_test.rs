//! Semantics of the in-memory reference store

use eresponde_store_core::{path, MemoryStore, SharedStore, StorePath};
use serde_json::json;

fn reports_path() -> StorePath {
    path::crime_reports()
}

#[tokio::test]
async fn read_returns_none_for_missing_and_written_value_after_write() {
    let store = MemoryStore::new();
    let path = StorePath::parse("voip_calls/c1").unwrap();

    assert!(store.read(&path).await.unwrap().is_none());

    store.write(&path, json!({"status": "ringing"})).await.unwrap();
    let value = store.read(&path).await.unwrap().unwrap();
    assert_eq!(value["status"], "ringing");
}

#[tokio::test]
async fn update_merges_without_clobbering_siblings() {
    let store = MemoryStore::new();
    let path = StorePath::parse("voip_calls/c1").unwrap();
    store
        .write(&path, json!({"status": "ringing", "createdAt": "t0"}))
        .await
        .unwrap();

    let mut fields = serde_json::Map::new();
    fields.insert("status".into(), json!("ended"));
    fields.insert("endedAt".into(), json!("t1"));
    store.update(&path, fields).await.unwrap();

    let value = store.read(&path).await.unwrap().unwrap();
    assert_eq!(value["status"], "ended");
    assert_eq!(value["endedAt"], "t1");
    assert_eq!(value["createdAt"], "t0");
}

#[tokio::test]
async fn value_subscription_delivers_initial_then_every_overlapping_write() {
    let store = MemoryStore::new();
    let reports = reports_path();

    let mut sub = store.subscribe_value(&reports).unwrap();
    assert_eq!(sub.recv().await.unwrap(), None, "initial snapshot is empty");

    store
        .write(&reports.child("r1"), json!({"crimeType": "Theft"}))
        .await
        .unwrap();
    let snapshot = sub.recv().await.unwrap().unwrap();
    assert_eq!(snapshot["r1"]["crimeType"], "Theft");

    // A write on an unrelated subtree does not fire the watcher.
    store
        .write(&StorePath::parse("sos_alerts/s1").unwrap(), json!({"x": 1}))
        .await
        .unwrap();
    assert!(sub.try_recv().is_none());
}

#[tokio::test]
async fn late_value_subscriber_still_sees_earlier_write() {
    let store = MemoryStore::new();
    let offer = path::signaling_offer("c1");
    store
        .write(&offer, json!({"type": "offer", "sdp": "v=0"}))
        .await
        .unwrap();

    let mut sub = store.subscribe_value(&offer).unwrap();
    let initial = sub.recv().await.unwrap().unwrap();
    assert_eq!(initial["sdp"], "v=0");
}

#[tokio::test]
async fn child_subscription_delivers_existing_then_new_children_once_each() {
    let store = MemoryStore::new();
    let candidates = path::signaling_candidates("c1", "callee");
    store.push(&candidates, json!({"candidate": "a"})).await.unwrap();

    let mut sub = store.subscribe_children(&candidates).unwrap();
    let first = sub.recv().await.unwrap();
    assert_eq!(first.value["candidate"], "a");

    store.push(&candidates, json!({"candidate": "b"})).await.unwrap();
    let second = sub.recv().await.unwrap();
    assert_eq!(second.value["candidate"], "b");
    assert_ne!(first.key, second.key);

    // Re-writing an existing child never re-delivers its key.
    store
        .write(&candidates.child(first.key.clone()), json!({"candidate": "a"}))
        .await
        .unwrap();
    assert!(sub.try_recv().is_none());
}

#[tokio::test]
async fn push_keys_preserve_insertion_order() {
    let store = MemoryStore::new();
    let list = StorePath::parse("signaling/c1/iceCandidates/caller").unwrap();
    let k1 = store.push(&list, json!(1)).await.unwrap();
    let k2 = store.push(&list, json!(2)).await.unwrap();
    assert!(k1 < k2, "push keys must sort in push order");
}

#[tokio::test]
async fn detach_and_drop_both_release_listeners() {
    let store = MemoryStore::new();
    let reports = reports_path();
    assert_eq!(store.subscription_count(), 0);

    let mut kept = store.subscribe_value(&reports).unwrap();
    let dropped = store.subscribe_children(&reports).unwrap();
    assert_eq!(store.subscription_count(), 2);

    drop(dropped);
    assert_eq!(store.subscription_count(), 1);

    kept.detach();
    assert_eq!(store.subscription_count(), 0);
}

#[tokio::test]
async fn writing_null_removes_the_subtree() {
    let store = MemoryStore::new();
    let path = StorePath::parse("sos_alerts/s1").unwrap();
    store.write(&path, json!({"status": "active"})).await.unwrap();
    store.write(&path, serde_json::Value::Null).await.unwrap();
    assert!(store.read(&path).await.unwrap().is_none());
}
