// src/seen.rs
use std::collections::HashMap;
use std::path::Path;

use tokio::fs;

/// Tracks which item ids have already been published, with a mark
/// timestamp per id so old entries can be retired.
///
/// Owned by the poll loop; there is exactly one writer, so no interior
/// locking. An id enters the store only after its publish attempt
/// completed (success, or abandoned after the retry budget).
#[derive(Debug, Default)]
pub struct SeenStore {
    inner: HashMap<String, u64>,
}

impl SeenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has(&self, id: &str) -> bool {
        self.inner.contains_key(id)
    }

    /// Idempotent: re-marking an already-seen id keeps the original mark
    /// timestamp, so retention counts from the first publish.
    pub fn mark_seen(&mut self, id: &str, ts: u64) {
        self.inner.entry(id.to_string()).or_insert(ts);
    }

    /// Drop entries marked strictly before `cutoff` (unix seconds). The
    /// upstream window is small, so ids that old never reappear in
    /// practice; if one does, it is treated as new and republished.
    pub fn evict_older_than(&mut self, cutoff: u64) {
        self.inner.retain(|_, ts| *ts >= cutoff);
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Restore from a snapshot file; empty store when the file is missing
    /// or unreadable (first run, or a discarded corrupt snapshot).
    pub async fn load(path: &Path) -> Self {
        match fs::read_to_string(path).await {
            Ok(s) => Self {
                inner: serde_json::from_str(&s).unwrap_or_default(),
            },
            Err(_) => Self::default(),
        }
    }

    /// Best-effort snapshot. Failures are logged, not propagated: losing a
    /// snapshot only risks duplicate sends after a restart.
    pub async fn save(&self, path: &Path) {
        if let Some(dir) = path.parent() {
            if let Err(e) = fs::create_dir_all(dir).await {
                tracing::warn!("seen snapshot dir: {e:#}");
            }
        }
        let body = serde_json::to_vec_pretty(&self.inner).unwrap_or_default();
        if let Err(e) = fs::write(path, body).await {
            tracing::warn!("write seen snapshot: {e:#}");
        }
    }
}
