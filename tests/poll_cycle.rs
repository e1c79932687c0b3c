// tests/poll_cycle.rs
use std::sync::Arc;

use livenews_bot::feed::ScriptedFeed;
use livenews_bot::publish::RecordingPublisher;
use livenews_bot::{NewsItem, Poller, PollerCfg, SeenStore};

fn cfg() -> PollerCfg {
    PollerCfg {
        interval_secs: 120,
        seen_retention_secs: 3600,
        max_publish_attempts: 3,
        state_path: None,
    }
}

fn item(id: &str, published_at: u64) -> NewsItem {
    NewsItem {
        id: id.to_string(),
        title: format!("headline {id}"),
        url: format!("https://xueqiu.com/9999/{id}"),
        published_at,
    }
}

#[tokio::test]
async fn second_pass_over_same_batch_publishes_nothing() {
    // The feed window is newest-first; both cycles see the same items.
    let batch = vec![item("C", 30), item("B", 20), item("A", 10)];
    let feed = ScriptedFeed::new(vec![Ok(batch.clone()), Ok(batch)]);
    let publisher = Arc::new(RecordingPublisher::new());
    let mut poller = Poller::new(feed, publisher.clone(), SeenStore::new(), cfg());

    let first = poller.run_cycle(100).await;
    let second = poller.run_cycle(200).await;

    assert_eq!(first.published, 3);
    assert_eq!(second.fresh, 0);
    assert_eq!(second.published, 0);
    assert_eq!(publisher.sent_ids(), vec!["A", "B", "C"]);
}

#[tokio::test]
async fn unseen_items_publish_oldest_first() {
    let feed = ScriptedFeed::new(vec![Ok(vec![
        item("C", 3),
        item("B", 2),
        item("A", 1),
    ])]);
    let publisher = Arc::new(RecordingPublisher::new());
    let mut poller = Poller::new(feed, publisher.clone(), SeenStore::new(), cfg());

    poller.run_cycle(100).await;

    assert_eq!(publisher.sent_ids(), vec!["A", "B", "C"]);
}

#[tokio::test]
async fn sliding_window_overlap_publishes_each_item_once() {
    let feed = ScriptedFeed::new(vec![
        Ok(vec![item("B", 20), item("A", 10)]),
        Ok(vec![item("C", 30), item("B", 20)]),
    ]);
    let publisher = Arc::new(RecordingPublisher::new());
    let mut poller = Poller::new(feed, publisher.clone(), SeenStore::new(), cfg());

    poller.run_cycle(100).await;
    let second = poller.run_cycle(200).await;

    assert_eq!(second.fetched, 2);
    assert_eq!(second.fresh, 1);
    assert_eq!(publisher.sent_ids(), vec!["A", "B", "C"]);
}

#[tokio::test]
async fn empty_window_is_a_clean_noop() {
    let feed = ScriptedFeed::new(vec![Ok(vec![])]);
    let publisher = Arc::new(RecordingPublisher::new());
    let mut poller = Poller::new(feed, publisher.clone(), SeenStore::new(), cfg());

    let stats = poller.run_cycle(100).await;

    assert_eq!(stats.fetched, 0);
    assert_eq!(stats.published, 0);
    assert!(publisher.sent_ids().is_empty());
    assert!(poller.seen().is_empty());
}
