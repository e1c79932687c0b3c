// src/poller.rs
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge};
use once_cell::sync::OnceCell;
use tokio::sync::watch;

use crate::feed::FeedClient;
use crate::publish::Publisher;
use crate::seen::SeenStore;

#[derive(Clone, Debug)]
pub struct PollerCfg {
    pub interval_secs: u64,
    pub seen_retention_secs: u64,
    pub max_publish_attempts: u32,
    /// Seen-store snapshot location; `None` keeps the store memory-only.
    pub state_path: Option<PathBuf>,
}

/// Outcome of a single poll cycle, for logging and tests.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CycleStats {
    pub fetch_failed: bool,
    pub fetched: usize,
    /// Items not yet in the seen store this cycle.
    pub fresh: usize,
    pub published: usize,
    pub failed: usize,
    pub abandoned: usize,
}

/// One-time metrics registration.
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("poll_cycles_total", "Completed poll cycles.");
        describe_counter!("feed_fetch_errors_total", "Feed fetches that failed.");
        describe_counter!("feed_items_total", "Items parsed from the feed.");
        describe_counter!(
            "news_deduped_total",
            "Fetched items skipped because they were already seen."
        );
        describe_counter!("news_published_total", "Items delivered to the channel.");
        describe_counter!("publish_errors_total", "Failed publish attempts.");
        describe_counter!(
            "news_abandoned_total",
            "Items dropped after exhausting the publish attempt budget."
        );
        describe_histogram!("feed_fetch_ms", "Feed fetch+parse time in milliseconds.");
        describe_gauge!("poll_last_run_ts", "Unix ts of the last completed cycle.");
        describe_gauge!("seen_items", "Current size of the seen-item store.");
    });
}

/// The polling-and-dedup loop: fetch, evict, filter by seen, publish in
/// chronological order, mark seen, sleep. Owns the seen store; the only
/// writer, so the whole cycle is single-threaded and deterministic given
/// `now` and the feed/publisher behavior.
pub struct Poller<F, P> {
    feed: F,
    publisher: P,
    seen: SeenStore,
    attempts: HashMap<String, u32>,
    cfg: PollerCfg,
}

impl<F: FeedClient, P: Publisher> Poller<F, P> {
    pub fn new(feed: F, publisher: P, seen: SeenStore, cfg: PollerCfg) -> Self {
        Self {
            feed,
            publisher,
            seen,
            attempts: HashMap::new(),
            cfg,
        }
    }

    pub fn seen(&self) -> &SeenStore {
        &self.seen
    }

    /// Run exactly one cycle at timestamp `now` (unix seconds). Fetch and
    /// publish failures are absorbed here; one bad cycle never takes the
    /// loop down.
    pub async fn run_cycle(&mut self, now: u64) -> CycleStats {
        ensure_metrics_described();
        let mut stats = CycleStats::default();

        let items = match self.feed.fetch_latest().await {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(
                    target: "poller",
                    error = ?e,
                    feed = self.feed.name(),
                    "feed fetch failed, skipping cycle"
                );
                counter!("feed_fetch_errors_total").increment(1);
                stats.fetch_failed = true;
                return stats;
            }
        };
        stats.fetched = items.len();

        self.seen
            .evict_older_than(now.saturating_sub(self.cfg.seen_retention_secs));

        // The feed reports newest-first; flip to oldest-first so the
        // channel reads chronologically.
        let mut fresh: Vec<_> = items.into_iter().filter(|it| !self.seen.has(&it.id)).collect();
        fresh.reverse();
        stats.fresh = fresh.len();
        counter!("news_deduped_total").increment((stats.fetched - stats.fresh) as u64);

        for item in &fresh {
            match self.publisher.publish(item).await {
                Ok(()) => {
                    self.seen.mark_seen(&item.id, now);
                    self.attempts.remove(&item.id);
                    stats.published += 1;
                    counter!("news_published_total").increment(1);
                    tracing::info!(target: "poller", id = %item.id, title = %item.title, "published");
                }
                Err(e) => {
                    stats.failed += 1;
                    counter!("publish_errors_total").increment(1);
                    let made = {
                        let n = self.attempts.entry(item.id.clone()).or_insert(0);
                        *n += 1;
                        *n
                    };
                    if made >= self.cfg.max_publish_attempts {
                        // Poison item: mark it seen to stop the retry, the
                        // message is lost.
                        self.seen.mark_seen(&item.id, now);
                        self.attempts.remove(&item.id);
                        stats.abandoned += 1;
                        counter!("news_abandoned_total").increment(1);
                        tracing::warn!(
                            target: "poller",
                            id = %item.id,
                            attempts = made,
                            error = ?e,
                            "publish attempt budget exhausted, abandoning item"
                        );
                    } else {
                        tracing::warn!(
                            target: "poller",
                            id = %item.id,
                            attempt = made,
                            error = ?e,
                            "publish failed, will retry next cycle"
                        );
                    }
                }
            }
        }

        // Attempt counters only live while the item is still pending; ids
        // that got published, abandoned, or fell out of the window reset.
        let seen = &self.seen;
        self.attempts
            .retain(|id, _| !seen.has(id) && fresh.iter().any(|it| &it.id == id));

        counter!("poll_cycles_total").increment(1);
        gauge!("poll_last_run_ts").set(now as f64);
        gauge!("seen_items").set(self.seen.len() as f64);

        tracing::info!(
            target: "poller",
            fetched = stats.fetched,
            fresh = stats.fresh,
            published = stats.published,
            failed = stats.failed,
            abandoned = stats.abandoned,
            "poll cycle done"
        );
        stats
    }

    /// Drive cycles until `shutdown` flips. The signal is observed both
    /// between cycles and during the inter-cycle sleep, so shutdown waits
    /// for at most the in-flight cycle.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> anyhow::Result<()> {
        let mut ticker = tokio::time::interval(Duration::from_secs(self.cfg.interval_secs));
        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                    continue;
                }
            }
            if *shutdown.borrow() {
                break;
            }

            let now = chrono::Utc::now().timestamp().max(0) as u64;
            self.run_cycle(now).await;

            if let Some(path) = &self.cfg.state_path {
                self.seen.save(path).await;
            }
        }

        // Final snapshot so a restart resumes where we left off.
        if let Some(path) = &self.cfg.state_path {
            self.seen.save(path).await;
        }
        tracing::info!(target: "poller", "shutdown complete");
        Ok(())
    }
}
