// tests/poll_faults.rs
use std::sync::Arc;

use livenews_bot::feed::ScriptedFeed;
use livenews_bot::publish::RecordingPublisher;
use livenews_bot::{FetchError, NewsItem, Poller, PollerCfg, SeenStore};

fn cfg(max_publish_attempts: u32) -> PollerCfg {
    PollerCfg {
        interval_secs: 120,
        seen_retention_secs: 3600,
        max_publish_attempts,
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
async fn failed_fetch_leaves_seen_set_untouched_and_next_cycle_proceeds() {
    let feed = ScriptedFeed::new(vec![
        Err(FetchError::Api("503: upstream sad".into())),
        Ok(vec![item("A", 10)]),
    ]);
    let publisher = Arc::new(RecordingPublisher::new());
    let mut poller = Poller::new(feed, publisher.clone(), SeenStore::new(), cfg(3));

    let first = poller.run_cycle(100).await;
    assert!(first.fetch_failed);
    assert!(poller.seen().is_empty());

    let second = poller.run_cycle(200).await;
    assert!(!second.fetch_failed);
    assert_eq!(second.published, 1);
    assert_eq!(publisher.sent_ids(), vec!["A"]);
}

#[tokio::test]
async fn one_failing_item_does_not_block_the_rest_of_the_cycle() {
    let window = vec![item("C", 30), item("B", 20), item("A", 10)];
    let feed = ScriptedFeed::new(vec![Ok(window.clone()), Ok(window)]);
    let publisher = Arc::new(RecordingPublisher::new());
    publisher.fail_for("B");
    let mut poller = Poller::new(feed, publisher.clone(), SeenStore::new(), cfg(3));

    let first = poller.run_cycle(100).await;

    // A and C went out; B stayed unseen for the next cycle.
    assert_eq!(first.published, 2);
    assert_eq!(first.failed, 1);
    assert_eq!(publisher.sent_ids(), vec!["A", "C"]);
    assert!(poller.seen().has("A"));
    assert!(!poller.seen().has("B"));
    assert!(poller.seen().has("C"));

    publisher.recover("B");
    let second = poller.run_cycle(200).await;

    assert_eq!(second.fresh, 1);
    assert_eq!(second.published, 1);
    assert_eq!(publisher.sent_ids(), vec!["A", "C", "B"]);
}

#[tokio::test]
async fn poison_item_is_abandoned_after_the_attempt_budget() {
    let window = vec![item("B", 20)];
    let feed = ScriptedFeed::new(vec![
        Ok(window.clone()),
        Ok(window.clone()),
        Ok(window.clone()),
        Ok(window),
    ]);
    let publisher = Arc::new(RecordingPublisher::new());
    publisher.fail_for("B");
    let mut poller = Poller::new(feed, publisher.clone(), SeenStore::new(), cfg(3));

    let c1 = poller.run_cycle(100).await;
    let c2 = poller.run_cycle(200).await;
    assert_eq!((c1.failed, c1.abandoned), (1, 0));
    assert_eq!((c2.failed, c2.abandoned), (1, 0));
    assert!(!poller.seen().has("B"));

    // Third strike: marked seen so it never retries again.
    let c3 = poller.run_cycle(300).await;
    assert_eq!((c3.failed, c3.abandoned), (1, 1));
    assert!(poller.seen().has("B"));

    let c4 = poller.run_cycle(400).await;
    assert_eq!(c4.fresh, 0);
    assert!(publisher.sent_ids().is_empty());
}
