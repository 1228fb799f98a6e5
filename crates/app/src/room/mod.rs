//! Shared-room state and view.

pub mod view;

pub use view::GlobalRoomView;

use sehat_cloud::GlobalMessageRecord;

/// One row in the room list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomEntry {
    /// Persisted message from the store's ordered feed.
    Stored(GlobalMessageRecord),
    /// Local error notice after a failed post. Replaced by the next snapshot.
    LocalError {
        seq: u64,
        content: String,
        timestamp_unix_ms: i64,
    },
}

/// Room list state. Every snapshot replaces the full list; a failed post
/// appends a local notice that lives until the next snapshot arrives.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RoomFeed {
    entries: Vec<RoomEntry>,
    next_error_seq: u64,
}

impl RoomFeed {
    pub fn entries(&self) -> &[RoomEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Replaces the rendered list with a store snapshot. Ordering is the
    /// store's ascending-timestamp guarantee, taken verbatim.
    pub fn apply_snapshot(&mut self, messages: Vec<GlobalMessageRecord>) {
        self.entries = messages.into_iter().map(RoomEntry::Stored).collect();
    }

    pub fn push_local_error(&mut self, content: impl Into<String>, timestamp_unix_ms: i64) {
        let seq = self.next_error_seq;
        self.next_error_seq += 1;
        self.entries.push(RoomEntry::LocalError {
            seq,
            content: content.into(),
            timestamp_unix_ms,
        });
    }
}

#[cfg(test)]
mod tests {
    use sehat_cloud::{GlobalMessageId, UserId};

    use super::*;

    fn record(id: &str, at_ms: i64) -> GlobalMessageRecord {
        GlobalMessageRecord {
            id: GlobalMessageId::new(id),
            user_id: UserId::new("u-1"),
            user_name: "Udin".to_string(),
            user_photo: None,
            content: format!("pesan {id}"),
            created_at_unix_ms: at_ms,
        }
    }

    #[test]
    fn snapshots_replace_the_full_list() {
        let mut feed = RoomFeed::default();
        feed.apply_snapshot(vec![record("g-1", 10)]);
        assert_eq!(feed.entries().len(), 1);

        feed.apply_snapshot(vec![record("g-1", 10), record("g-2", 20)]);
        assert_eq!(feed.entries().len(), 2);
    }

    #[test]
    fn local_errors_survive_until_the_next_snapshot() {
        let mut feed = RoomFeed::default();
        feed.apply_snapshot(vec![record("g-1", 10)]);
        feed.push_local_error("Maaf, terjadi kesalahan. Silakan coba lagi.", 15);

        assert_eq!(feed.entries().len(), 2);
        assert!(matches!(feed.entries()[1], RoomEntry::LocalError { .. }));

        feed.apply_snapshot(vec![record("g-1", 10), record("g-2", 20)]);
        assert!(
            feed.entries()
                .iter()
                .all(|entry| matches!(entry, RoomEntry::Stored(_)))
        );
    }

    #[test]
    fn consecutive_errors_get_distinct_sequence_numbers() {
        let mut feed = RoomFeed::default();
        feed.push_local_error("satu", 1);
        feed.push_local_error("dua", 2);

        let seqs: Vec<u64> = feed
            .entries()
            .iter()
            .filter_map(|entry| match entry {
                RoomEntry::LocalError { seq, .. } => Some(*seq),
                RoomEntry::Stored(_) => None,
            })
            .collect();
        assert_eq!(seqs, [0, 1]);
    }
}
