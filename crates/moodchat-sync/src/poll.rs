use std::time::Duration;

use tokio::sync::mpsc;
use tracing::warn;

use moodchat_types::api::MessageResponse;

use crate::api::{ChatApi, ClientError};
use crate::feed::MessageFeed;

/// Cadence the original clients poll at.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);

/// Fixed-interval poll loop driving a [`MessageFeed`].
pub struct Poller {
    api: ChatApi,
    feed: MessageFeed,
    interval: Duration,
}

impl Poller {
    pub fn new(api: ChatApi, interval: Duration) -> Self {
        Self {
            api,
            feed: MessageFeed::new(),
            interval,
        }
    }

    /// One synchronization step: fetch everything newer than the watermark
    /// (everything there is, on a fresh session) and merge it in.
    /// Returns the newly seen messages in feed order.
    pub async fn poll_once(&mut self) -> Result<Vec<MessageResponse>, ClientError> {
        let batch = self.api.fetch_messages(self.feed.watermark(), None).await?;
        Ok(self.feed.merge(&batch))
    }

    /// Record a message this client itself produced (the POST response),
    /// so the next poll doesn't re-deliver it.
    pub fn absorb(&mut self, message: &MessageResponse) {
        self.feed.merge(std::slice::from_ref(message));
    }

    pub fn feed(&self) -> &MessageFeed {
        &self.feed
    }

    /// Poll forever, forwarding each batch of new messages to `tx`.
    /// Fetch errors are logged and the loop keeps its cadence, matching
    /// the original clients' fire-and-forget polling.
    pub async fn run(mut self, tx: mpsc::UnboundedSender<Vec<MessageResponse>>) {
        let mut ticker = tokio::time::interval(self.interval);
        loop {
            ticker.tick().await;
            match self.poll_once().await {
                Ok(fresh) => {
                    if !fresh.is_empty() && tx.send(fresh).is_err() {
                        return; // consumer hung up
                    }
                }
                Err(e) => warn!("poll failed: {e}"),
            }
        }
    }
}
