// tests/seen_snapshot.rs
use livenews_bot::SeenStore;

#[tokio::test]
async fn snapshot_round_trip_preserves_ids_and_mark_times() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("state").join("seen_items.json");

    let mut store = SeenStore::new();
    store.mark_seen("330001", 1_000);
    store.mark_seen("330002", 2_000);
    store.save(&path).await;

    let mut restored = SeenStore::load(&path).await;
    assert_eq!(restored.len(), 2);
    assert!(restored.has("330001"));
    assert!(restored.has("330002"));

    // Mark timestamps survive the round trip: eviction still cuts on the
    // original times.
    restored.evict_older_than(1_500);
    assert!(!restored.has("330001"));
    assert!(restored.has("330002"));
}

#[tokio::test]
async fn missing_or_corrupt_snapshot_starts_empty() {
    let tmp = tempfile::tempdir().unwrap();

    let missing = SeenStore::load(&tmp.path().join("nope.json")).await;
    assert!(missing.is_empty());

    let corrupt_path = tmp.path().join("corrupt.json");
    tokio::fs::write(&corrupt_path, b"{ not json").await.unwrap();
    let corrupt = SeenStore::load(&corrupt_path).await;
    assert!(corrupt.is_empty());
}
