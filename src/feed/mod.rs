// src/feed/mod.rs
pub mod xueqiu;

use sha2::{Digest, Sha256};
use thiserror::Error;

/// One upstream news item, as consumed by the poll loop.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct NewsItem {
    /// Stable across overlapping fetch windows. Upstream numeric ids are
    /// carried as strings; see [`derive_id`] for the fallback.
    pub id: String,
    pub title: String,
    pub url: String,
    /// Unix seconds, UTC.
    pub published_at: u64,
}

/// Feed fetch failures. Recoverable: the current poll cycle is skipped and
/// the next one starts from a clean slate.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("upstream returned an error: {0}")]
    Api(String),

    #[error("malformed feed payload: {0}")]
    Parse(String),
}

/// The "fetch current batch of items" seam the poll loop depends on.
///
/// Implementations return the upstream's sliding window of recent items,
/// **newest-first**. The loop reverses before publishing.
#[async_trait::async_trait]
pub trait FeedClient: Send + Sync {
    async fn fetch_latest(&self) -> Result<Vec<NewsItem>, FetchError>;
    fn name(&self) -> &'static str;
}

/// Deterministic fallback id for upstreams that carry no stable identifier:
/// truncated SHA-256 over title and url.
pub fn derive_id(title: &str, url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(title.as_bytes());
    hasher.update(b"\0");
    hasher.update(url.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(16);
    for b in &digest[..8] {
        out.push_str(&format!("{b:02x}"));
    }
    out
}

/// Normalize item text: decode HTML entities, strip tags, collapse
/// whitespace, cap the length.
pub fn normalize_text(s: &str) -> String {
    let mut out = html_escape::decode_html_entities(s).to_string();

    static RE_TAGS: once_cell::sync::OnceCell<regex::Regex> = once_cell::sync::OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, "").to_string();

    static RE_WS: once_cell::sync::OnceCell<regex::Regex> = once_cell::sync::OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").to_string();
    out = out.trim().to_string();

    // Length cap: 1500 chars
    if out.chars().count() > 1500 {
        out = out.chars().take(1500).collect();
    }

    out
}

// --- Test helper ---
/// Feed double that replays a scripted sequence of fetch outcomes, one per
/// call. Once the script runs out it keeps returning an empty window.
pub struct ScriptedFeed {
    batches: std::sync::Mutex<std::collections::VecDeque<Result<Vec<NewsItem>, FetchError>>>,
}

impl ScriptedFeed {
    pub fn new(batches: Vec<Result<Vec<NewsItem>, FetchError>>) -> Self {
        Self {
            batches: std::sync::Mutex::new(batches.into()),
        }
    }
}

#[async_trait::async_trait]
impl FeedClient for ScriptedFeed {
    async fn fetch_latest(&self) -> Result<Vec<NewsItem>, FetchError> {
        self.batches
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}
