use std::collections::HashSet;

use chrono::{DateTime, Utc};

use moodchat_types::api::MessageResponse;

/// Local message state for one client: the ordered collection plus the
/// watermark used as the `since` cursor on the next poll.
#[derive(Debug, Default)]
pub struct MessageFeed {
    messages: Vec<MessageResponse>,
    last_at: Option<DateTime<Utc>>,
}

impl MessageFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a fetched batch: set union keyed by id, re-sorted by
    /// (createdAt, id), watermark advanced to the newest createdAt seen.
    /// Applying the same batch again changes nothing.
    ///
    /// Returns the messages that were actually new, in feed order.
    pub fn merge(&mut self, batch: &[MessageResponse]) -> Vec<MessageResponse> {
        let seen: HashSet<i64> = self.messages.iter().map(|m| m.id).collect();

        let mut fresh: Vec<MessageResponse> = Vec::new();
        for message in batch {
            if !seen.contains(&message.id) && !fresh.iter().any(|f| f.id == message.id) {
                fresh.push(message.clone());
            }
        }
        fresh.sort_by_key(|m| (m.created_at, m.id));

        self.messages.extend(fresh.iter().cloned());
        self.messages.sort_by_key(|m| (m.created_at, m.id));

        for message in batch {
            if self.last_at.is_none_or(|w| message.created_at > w) {
                self.last_at = Some(message.created_at);
            }
        }

        fresh
    }

    /// The `since` cursor for the next fetch. `None` means fresh session:
    /// the next fetch retrieves everything.
    pub fn watermark(&self) -> Option<DateTime<Utc>> {
        self.last_at
    }

    pub fn messages(&self) -> &[MessageResponse] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use moodchat_types::models::{Sentiment, UserSummary};

    fn msg(id: i64, at_secs: i64) -> MessageResponse {
        MessageResponse {
            id,
            text: format!("message {}", id),
            sentiment: Sentiment::Neutral,
            sentiment_score: 0.0,
            created_at: Utc.timestamp_opt(1_770_000_000 + at_secs, 0).unwrap(),
            user: UserSummary { id: 1, nickname: "ada".into() },
        }
    }

    fn ids(feed: &MessageFeed) -> Vec<i64> {
        feed.messages().iter().map(|m| m.id).collect()
    }

    #[test]
    fn merge_dedups_by_id() {
        let mut feed = MessageFeed::new();
        feed.merge(&[msg(1, 0), msg(2, 1)]);

        let fresh = feed.merge(&[msg(2, 1), msg(3, 2)]);
        assert_eq!(fresh.iter().map(|m| m.id).collect::<Vec<_>>(), vec![3]);
        assert_eq!(ids(&feed), vec![1, 2, 3]);
    }

    #[test]
    fn merge_is_idempotent() {
        let batch = [msg(1, 0), msg(2, 1), msg(3, 2)];

        let mut once = MessageFeed::new();
        once.merge(&batch);

        let mut twice = MessageFeed::new();
        twice.merge(&batch);
        let fresh = twice.merge(&batch);

        assert!(fresh.is_empty());
        assert_eq!(ids(&once), ids(&twice));
        assert_eq!(once.watermark(), twice.watermark());
    }

    #[test]
    fn merge_resorts_out_of_order_batches() {
        let mut feed = MessageFeed::new();
        feed.merge(&[msg(5, 10)]);
        feed.merge(&[msg(2, 3), msg(9, 12)]);

        assert_eq!(ids(&feed), vec![2, 5, 9]);
    }

    #[test]
    fn ties_on_created_at_break_by_id() {
        let mut feed = MessageFeed::new();
        feed.merge(&[msg(7, 5), msg(3, 5), msg(5, 5)]);

        assert_eq!(ids(&feed), vec![3, 5, 7]);
    }

    #[test]
    fn watermark_advances_to_newest_seen() {
        let mut feed = MessageFeed::new();
        assert!(feed.watermark().is_none());

        feed.merge(&[msg(1, 0), msg(2, 9)]);
        assert_eq!(feed.watermark(), Some(msg(2, 9).created_at));

        // An older replay never moves the watermark backwards.
        feed.merge(&[msg(1, 0)]);
        assert_eq!(feed.watermark(), Some(msg(2, 9).created_at));
    }

    #[test]
    fn duplicate_ids_within_one_batch_collapse() {
        let mut feed = MessageFeed::new();
        let fresh = feed.merge(&[msg(1, 0), msg(1, 0), msg(2, 1)]);

        assert_eq!(fresh.len(), 2);
        assert_eq!(ids(&feed), vec![1, 2]);
    }

    #[test]
    fn shared_state_converges_regardless_of_batch_order() {
        // Two clients polled at the same watermark and got the same set;
        // whichever order the batches land in, the states converge.
        let r1 = [msg(4, 4), msg(5, 5)];
        let r2 = [msg(5, 5), msg(4, 4), msg(6, 6)];

        let mut a = MessageFeed::new();
        a.merge(&r1);
        a.merge(&r2);

        let mut b = MessageFeed::new();
        b.merge(&r2);
        b.merge(&r1);

        assert_eq!(ids(&a), ids(&b));
        assert_eq!(a.watermark(), b.watermark());
    }
}
