//! HTTP client for the upstream park event feed.
//!
//! The feed endpoint returns a JSON array of loosely-structured event
//! items. The client fetches the array and decodes it item-by-item:
//! items of unknown kind are logged and dropped (the feed grows new
//! kinds over time), while malformed fields inside known kinds survive
//! decode and are judged downstream by the reconciler.

use std::time::Duration;

use dinopark_core::poller::{EventSource, SourceError};
use dinopark_types::FeedEvent;

use crate::error::MonitorError;

/// Client for the park event feed.
pub struct FeedClient {
    client: reqwest::Client,
    url: String,
}

impl FeedClient {
    /// Create a feed client with a bounded request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::Feed`] if the underlying HTTP client
    /// cannot be constructed.
    pub fn new(url: &str, timeout: Duration) -> Result<Self, MonitorError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MonitorError::Feed(format!("HTTP client construction failed: {e}")))?;

        Ok(Self {
            client,
            url: url.to_owned(),
        })
    }
}

impl EventSource for FeedClient {
    async fn fetch(&self) -> Result<Vec<FeedEvent>, SourceError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| SourceError(format!("feed request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unable to read error body".to_owned());
            return Err(SourceError(format!("feed returned {status}: {body}")));
        }

        let values: Vec<serde_json::Value> = response
            .json()
            .await
            .map_err(|e| SourceError(format!("feed response parse failed: {e}")))?;

        let batch = FeedEvent::decode_batch(values);
        for reason in &batch.skipped {
            tracing::warn!(reason, "dropped undecodable feed item");
        }

        Ok(batch.events)
    }
}
