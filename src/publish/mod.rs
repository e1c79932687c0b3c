pub mod telegram;

use thiserror::Error;

use crate::feed::NewsItem;

/// Publish failures. Recoverable: the loop retries the item on later
/// cycles within its attempt budget.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("messaging API error: {0}")]
    Api(String),
}

/// The "deliver one item to the channel" seam the poll loop depends on.
///
/// Must be safe to call once per item; the loop guarantees at most one
/// call per item per cycle.
#[async_trait::async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, item: &NewsItem) -> Result<(), PublishError>;
}

#[async_trait::async_trait]
impl<P: Publisher + ?Sized> Publisher for std::sync::Arc<P> {
    async fn publish(&self, item: &NewsItem) -> Result<(), PublishError> {
        (**self).publish(item).await
    }
}

// --- Test helper ---
/// Publisher double that records published ids in call order and fails
/// every attempt for ids on its deny list.
#[derive(Default)]
pub struct RecordingPublisher {
    pub sent: std::sync::Mutex<Vec<String>>,
    failing: std::sync::Mutex<std::collections::HashSet<String>>,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_for(&self, id: &str) {
        self.failing.lock().unwrap().insert(id.to_string());
    }

    pub fn recover(&self, id: &str) {
        self.failing.lock().unwrap().remove(id);
    }

    pub fn sent_ids(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Publisher for RecordingPublisher {
    async fn publish(&self, item: &NewsItem) -> Result<(), PublishError> {
        if self.failing.lock().unwrap().contains(&item.id) {
            return Err(PublishError::Api(format!("injected failure for {}", item.id)));
        }
        self.sent.lock().unwrap().push(item.id.clone());
        Ok(())
    }
}
