use std::time::Duration;

use async_trait::async_trait;
use chrono::{FixedOffset, TimeZone, Utc};
use reqwest::Client;
use serde_json::json;

use super::{PublishError, Publisher};
use crate::feed::NewsItem;

/// Telegram Bot API publisher: one `sendMessage` per news item, MarkdownV2
/// body, link preview disabled.
#[derive(Clone)]
pub struct TelegramPublisher {
    client: Client,
    bot_token: String,
    chat_id: String,
    timeout: Duration,
    max_retries: u8,
}

impl TelegramPublisher {
    pub fn new(bot_token: impl Into<String>, chat_id: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            bot_token: bot_token.into(),
            chat_id: chat_id.into(),
            timeout: Duration::from_secs(5),
            max_retries: 3,
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }

    pub fn with_retries(mut self, retries: u8) -> Self {
        self.max_retries = retries;
        self
    }

    async fn send_markdown(&self, text: &str) -> Result<(), PublishError> {
        let url = format!("https://api.telegram.org/bot{}/sendMessage", self.bot_token);
        let payload = json!({
            "chat_id": self.chat_id,
            "text": text,
            "parse_mode": "MarkdownV2",
            "disable_web_page_preview": true,
        });

        let mut attempt: u8 = 0;
        loop {
            attempt += 1;
            let res = self
                .client
                .post(&url)
                .timeout(self.timeout)
                .json(&payload)
                .send()
                .await;

            match res {
                Ok(rsp) if rsp.status().is_success() => return Ok(()),
                Ok(rsp) => {
                    let status = rsp.status();
                    if attempt < self.max_retries {
                        tokio::time::sleep(Duration::from_millis(500u64 << (attempt - 1))).await;
                        continue;
                    }
                    let body = rsp.text().await.unwrap_or_default();
                    return Err(PublishError::Api(format!("{status}: {body}")));
                }
                Err(e) => {
                    if attempt < self.max_retries {
                        tokio::time::sleep(Duration::from_millis(500u64 << (attempt - 1))).await;
                        continue;
                    }
                    return Err(PublishError::Http(e));
                }
            }
        }
    }
}

#[async_trait]
impl Publisher for TelegramPublisher {
    async fn publish(&self, item: &NewsItem) -> Result<(), PublishError> {
        self.send_markdown(&render_message(item)).await
    }
}

/// Characters MarkdownV2 requires escaped in plain text.
const MARKDOWN_V2_RESERVED: [char; 18] = [
    '_', '*', '[', ']', '(', ')', '~', '`', '>', '#', '+', '-', '=', '|', '{', '}', '.', '!',
];

pub fn escape_markdown(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if MARKDOWN_V2_RESERVED.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Message body: the item text, then its publication time in Beijing time
/// (the feed's home market).
pub fn render_message(item: &NewsItem) -> String {
    let cst = FixedOffset::east_opt(8 * 3600).unwrap();
    let ts = Utc
        .timestamp_opt(item.published_at as i64, 0)
        .single()
        .unwrap_or_default()
        .with_timezone(&cst);
    let stamp = ts.format("(%Y-%m-%d %H:%M)").to_string();
    format!("{}\n\n{}", escape_markdown(&item.title), escape_markdown(&stamp))
}
