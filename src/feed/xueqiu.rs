// src/feed/xueqiu.rs
use async_trait::async_trait;
use metrics::{counter, histogram};
use reqwest::header::{HeaderMap, HeaderValue};
use serde::Deserialize;

use crate::feed::{derive_id, normalize_text, FeedClient, FetchError, NewsItem};

const WARMUP_URL: &str = "https://xueqiu.com/?category=livenews";
const TIMELINE_URL: &str = "https://xueqiu.com/v4/statuses/public_timeline_by_category.json";

/// Flash-news category of the public timeline.
const CATEGORY: &str = "6";
const WINDOW_COUNT: &str = "10";

/// The endpoint rejects non-browser traffic, so the request has to look
/// like the live-news page's own XHR.
fn browser_headers() -> HeaderMap {
    let mut h = HeaderMap::new();
    h.insert(
        "User-Agent",
        HeaderValue::from_static(
            "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:70.0) Gecko/20100101 Firefox/70.0",
        ),
    );
    h.insert("X-Requested-With", HeaderValue::from_static("XMLHttpRequest"));
    h.insert("Referer", HeaderValue::from_static("https://xueqiu.com/today/"));
    h.insert(
        "Accept",
        HeaderValue::from_static("application/json, text/javascript, */*; q=0.01"),
    );
    h.insert(
        "Content-Type",
        HeaderValue::from_static("application/x-www-form-urlencoded; charset=UTF-8"),
    );
    h.insert(
        "Accept-Language",
        HeaderValue::from_static("en-US,en;q=0.9,zh-CN;q=0.8,zh;q=0.7"),
    );
    h
}

#[derive(Debug, Deserialize)]
struct Timeline {
    #[serde(default)]
    list: Vec<Envelope>,
}

/// Each timeline entry wraps the actual item as a JSON document embedded in
/// a string field.
#[derive(Debug, Deserialize)]
struct Envelope {
    data: String,
}

#[derive(Debug, Deserialize)]
struct RawItem {
    id: Option<i64>,
    text: Option<String>,
    target: Option<String>,
    /// Unix milliseconds.
    created_at: Option<i64>,
}

/// Client for the Xueqiu live-news timeline. Items come back newest-first.
pub struct XueqiuFeed {
    client: reqwest::Client,
    fixture: Option<String>,
}

impl XueqiuFeed {
    pub fn new() -> Result<Self, FetchError> {
        // The session cookie from the warmup page is required by the
        // timeline endpoint; the jar carries it between the two requests.
        let client = reqwest::Client::builder()
            .default_headers(browser_headers())
            .cookie_store(true)
            .timeout(std::time::Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            fixture: None,
        })
    }

    /// Parse-only construction from a captured timeline body.
    pub fn from_fixture(content: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            fixture: Some(content.to_string()),
        }
    }

    async fn fetch_body(&self) -> Result<String, FetchError> {
        if let Some(fixture) = &self.fixture {
            return Ok(fixture.clone());
        }

        // Refresh session cookies before hitting the timeline.
        self.client.get(WARMUP_URL).send().await?;

        let resp = self
            .client
            .get(TIMELINE_URL)
            .query(&[
                ("since_id", "-1"),
                ("max_id", "-1"),
                ("count", WINDOW_COUNT),
                ("category", CATEGORY),
            ])
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(FetchError::Api(format!("{status}: {body}")));
        }

        Ok(resp.text().await?)
    }

    fn parse_timeline(&self, body: &str) -> Result<Vec<NewsItem>, FetchError> {
        let timeline: Timeline =
            serde_json::from_str(body).map_err(|e| FetchError::Parse(e.to_string()))?;

        let mut out = Vec::with_capacity(timeline.list.len());
        for envelope in timeline.list {
            let raw: RawItem = match serde_json::from_str(&envelope.data) {
                Ok(raw) => raw,
                Err(e) => {
                    tracing::warn!(error = %e, "skipping malformed timeline entry");
                    continue;
                }
            };

            let title = normalize_text(raw.text.as_deref().unwrap_or_default());
            if title.is_empty() {
                continue;
            }
            let url = match raw.target.as_deref() {
                Some(t) if t.starts_with("http") => t.to_string(),
                Some(t) => format!("https://xueqiu.com{t}"),
                None => String::new(),
            };
            out.push(NewsItem {
                id: raw
                    .id
                    .map(|i| i.to_string())
                    .unwrap_or_else(|| derive_id(&title, &url)),
                title,
                url,
                published_at: raw.created_at.map(|ms| (ms / 1000).max(0)).unwrap_or(0) as u64,
            });
        }
        Ok(out)
    }
}

#[async_trait]
impl FeedClient for XueqiuFeed {
    async fn fetch_latest(&self) -> Result<Vec<NewsItem>, FetchError> {
        let t0 = std::time::Instant::now();

        let body = self.fetch_body().await?;
        let items = self.parse_timeline(&body)?;

        let ms = t0.elapsed().as_secs_f64() * 1_000.0;
        histogram!("feed_fetch_ms").record(ms);
        counter!("feed_items_total").increment(items.len() as u64);

        Ok(items)
    }

    fn name(&self) -> &'static str {
        "Xueqiu"
    }
}
