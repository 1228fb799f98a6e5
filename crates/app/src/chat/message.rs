//! Per-session transcript state.
//!
//! All mutation goes through [`Transcript::apply`], a pure transition from
//! (state, event) to new state. Optimistic entries are keyed by a
//! client-generated correlation id and replaced in place once the persisted
//! record arrives, so a reconciled turn can never render twice.

use sehat_cloud::{ChatMessageRecord, MessageAuthor, MessageId};
use uuid::Uuid;

/// Client-generated id linking an optimistic entry to its persisted record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CorrelationId(Uuid);

impl CorrelationId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

/// Identifier for one submit turn. Changes on every submit so stale worker
/// events can be rejected after the user moves on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TurnId(pub u64);

impl TurnId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }
}

/// Where a transcript entry's identity comes from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EntryKey {
    /// Optimistic or local-only entry, not (yet) in the store.
    Local(CorrelationId),
    /// Persisted document.
    Stored(MessageId),
}

/// Lifecycle status of one transcript entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryStatus {
    /// Optimistic echo awaiting its persisted record.
    Pending,
    /// Backed by a store document.
    Persisted,
    /// The persistence attempt failed; the entry stays visible with a reason.
    Failed(String),
    /// Local-only notice (generation fallback). Never persisted, never reconciled.
    Notice,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptEntry {
    pub key: EntryKey,
    pub author: MessageAuthor,
    pub content: String,
    pub timestamp_unix_ms: i64,
    pub status: EntryStatus,
}

impl TranscriptEntry {
    pub fn from_record(record: &ChatMessageRecord) -> Self {
        Self {
            key: EntryKey::Stored(record.id.clone()),
            author: record.author,
            content: record.content.clone(),
            timestamp_unix_ms: record.created_at_unix_ms,
            status: EntryStatus::Persisted,
        }
    }

    pub fn pending(
        correlation_id: CorrelationId,
        author: MessageAuthor,
        content: impl Into<String>,
        timestamp_unix_ms: i64,
    ) -> Self {
        Self {
            key: EntryKey::Local(correlation_id),
            author,
            content: content.into(),
            timestamp_unix_ms,
            status: EntryStatus::Pending,
        }
    }

    pub fn notice(
        correlation_id: CorrelationId,
        content: impl Into<String>,
        timestamp_unix_ms: i64,
    ) -> Self {
        Self {
            key: EntryKey::Local(correlation_id),
            author: MessageAuthor::Assistant,
            content: content.into(),
            timestamp_unix_ms,
            status: EntryStatus::Notice,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.status, EntryStatus::Pending)
    }
}

/// State transition input for the transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscriptEvent {
    /// Clears everything, e.g. when the active session changes.
    Reset,
    /// Replaces the transcript with a fetched message list.
    Loaded(Vec<ChatMessageRecord>),
    /// Pushes an optimistic entry stamped with the client clock.
    PushPending {
        correlation_id: CorrelationId,
        author: MessageAuthor,
        content: String,
        timestamp_unix_ms: i64,
    },
    /// Replaces the matching optimistic entry with its persisted record.
    Reconcile {
        correlation_id: CorrelationId,
        record: ChatMessageRecord,
    },
    /// Marks the matching optimistic entry as failed.
    MarkFailed {
        correlation_id: CorrelationId,
        reason: String,
    },
    /// Appends a freshly persisted record (assistant replies).
    AppendPersisted { record: ChatMessageRecord },
    /// Appends a local-only notice, e.g. the generation fallback message.
    PushNotice {
        correlation_id: CorrelationId,
        content: String,
        timestamp_unix_ms: i64,
    },
}

/// Rejection reason for transcript events that do not apply cleanly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscriptRejection {
    UnknownCorrelation(CorrelationId),
    DuplicateCorrelation(CorrelationId),
    DuplicateMessage(MessageId),
}

pub type TranscriptResult = Result<(), TranscriptRejection>;

/// Aggregate transcript for the active session.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Transcript {
    entries: Vec<TranscriptEntry>,
}

impl Transcript {
    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn apply(&mut self, event: TranscriptEvent) -> TranscriptResult {
        match event {
            TranscriptEvent::Reset => {
                self.entries.clear();
                Ok(())
            }
            TranscriptEvent::Loaded(mut records) => {
                // The store assigns timestamps server-side but returns the
                // equality query unordered; the stable ascending sort here is
                // the ordering guarantee the views rely on.
                records.sort_by_key(|record| record.created_at_unix_ms);
                self.entries = records.iter().map(TranscriptEntry::from_record).collect();
                Ok(())
            }
            TranscriptEvent::PushPending {
                correlation_id,
                author,
                content,
                timestamp_unix_ms,
            } => {
                if self.find_local(correlation_id).is_some() {
                    return Err(TranscriptRejection::DuplicateCorrelation(correlation_id));
                }

                self.entries.push(TranscriptEntry::pending(
                    correlation_id,
                    author,
                    content,
                    timestamp_unix_ms,
                ));
                Ok(())
            }
            TranscriptEvent::Reconcile {
                correlation_id,
                record,
            } => {
                let Some(index) = self.find_local(correlation_id) else {
                    return Err(TranscriptRejection::UnknownCorrelation(correlation_id));
                };

                // The optimistic position holds; the store id and server
                // clock take over, so no duplicate-looking entry survives.
                self.entries[index] = TranscriptEntry::from_record(&record);
                Ok(())
            }
            TranscriptEvent::MarkFailed {
                correlation_id,
                reason,
            } => {
                let Some(index) = self.find_local(correlation_id) else {
                    return Err(TranscriptRejection::UnknownCorrelation(correlation_id));
                };

                self.entries[index].status = EntryStatus::Failed(reason);
                Ok(())
            }
            TranscriptEvent::AppendPersisted { record } => {
                if self.contains_stored(&record.id) {
                    return Err(TranscriptRejection::DuplicateMessage(record.id));
                }

                self.entries.push(TranscriptEntry::from_record(&record));
                Ok(())
            }
            TranscriptEvent::PushNotice {
                correlation_id,
                content,
                timestamp_unix_ms,
            } => {
                if self.find_local(correlation_id).is_some() {
                    return Err(TranscriptRejection::DuplicateCorrelation(correlation_id));
                }

                self.entries.push(TranscriptEntry::notice(
                    correlation_id,
                    content,
                    timestamp_unix_ms,
                ));
                Ok(())
            }
        }
    }

    /// True when persisted entries appear in non-decreasing timestamp order.
    pub fn is_ordered_non_decreasing(&self) -> bool {
        self.entries
            .iter()
            .filter(|entry| matches!(entry.status, EntryStatus::Persisted))
            .map(|entry| entry.timestamp_unix_ms)
            .is_sorted()
    }

    fn find_local(&self, correlation_id: CorrelationId) -> Option<usize> {
        self.entries
            .iter()
            .position(|entry| entry.key == EntryKey::Local(correlation_id))
    }

    fn contains_stored(&self, message_id: &MessageId) -> bool {
        self.entries
            .iter()
            .any(|entry| matches!(&entry.key, EntryKey::Stored(id) if id == message_id))
    }
}

#[cfg(test)]
mod tests {
    use sehat_cloud::SessionId;

    use super::*;

    fn record(id: &str, content: &str, author: MessageAuthor, at_ms: i64) -> ChatMessageRecord {
        ChatMessageRecord {
            id: MessageId::new(id),
            session_id: SessionId::new("s-1"),
            content: content.to_string(),
            author,
            created_at_unix_ms: at_ms,
        }
    }

    #[test]
    fn loading_sorts_messages_ascending_by_timestamp() {
        let mut transcript = Transcript::default();
        transcript
            .apply(TranscriptEvent::Loaded(vec![
                record("m-3", "ketiga", MessageAuthor::User, 300),
                record("m-1", "pertama", MessageAuthor::User, 100),
                record("m-2", "kedua", MessageAuthor::Assistant, 200),
            ]))
            .expect("load applies");

        let contents: Vec<&str> = transcript
            .entries()
            .iter()
            .map(|entry| entry.content.as_str())
            .collect();
        assert_eq!(contents, ["pertama", "kedua", "ketiga"]);
        assert!(transcript.is_ordered_non_decreasing());
    }

    #[test]
    fn reconcile_replaces_the_pending_entry_in_place() {
        let mut transcript = Transcript::default();
        let correlation_id = CorrelationId::generate();

        transcript
            .apply(TranscriptEvent::PushPending {
                correlation_id,
                author: MessageAuthor::User,
                content: "Apa itu diabetes?".to_string(),
                timestamp_unix_ms: 1_000,
            })
            .expect("pending applies");

        transcript
            .apply(TranscriptEvent::Reconcile {
                correlation_id,
                record: record("m-1", "Apa itu diabetes?", MessageAuthor::User, 1_050),
            })
            .expect("reconcile applies");

        assert_eq!(transcript.entries().len(), 1);
        let entry = &transcript.entries()[0];
        assert_eq!(entry.key, EntryKey::Stored(MessageId::new("m-1")));
        assert_eq!(entry.status, EntryStatus::Persisted);
        assert_eq!(entry.timestamp_unix_ms, 1_050);
    }

    #[test]
    fn duplicate_correlation_and_message_ids_are_rejected() {
        let mut transcript = Transcript::default();
        let correlation_id = CorrelationId::generate();

        transcript
            .apply(TranscriptEvent::PushPending {
                correlation_id,
                author: MessageAuthor::User,
                content: "halo".to_string(),
                timestamp_unix_ms: 1,
            })
            .expect("first pending applies");

        let rejected = transcript.apply(TranscriptEvent::PushPending {
            correlation_id,
            author: MessageAuthor::User,
            content: "halo lagi".to_string(),
            timestamp_unix_ms: 2,
        });
        assert_eq!(
            rejected,
            Err(TranscriptRejection::DuplicateCorrelation(correlation_id))
        );

        transcript
            .apply(TranscriptEvent::AppendPersisted {
                record: record("m-1", "jawaban", MessageAuthor::Assistant, 3),
            })
            .expect("append applies");
        let rejected = transcript.apply(TranscriptEvent::AppendPersisted {
            record: record("m-1", "jawaban", MessageAuthor::Assistant, 3),
        });
        assert_eq!(
            rejected,
            Err(TranscriptRejection::DuplicateMessage(MessageId::new("m-1")))
        );
    }

    #[test]
    fn failed_persistence_keeps_the_entry_with_a_reason() {
        let mut transcript = Transcript::default();
        let correlation_id = CorrelationId::generate();

        transcript
            .apply(TranscriptEvent::PushPending {
                correlation_id,
                author: MessageAuthor::User,
                content: "halo".to_string(),
                timestamp_unix_ms: 1,
            })
            .expect("pending applies");
        transcript
            .apply(TranscriptEvent::MarkFailed {
                correlation_id,
                reason: "store unavailable".to_string(),
            })
            .expect("mark failed applies");

        assert_eq!(
            transcript.entries()[0].status,
            EntryStatus::Failed("store unavailable".to_string())
        );
    }

    #[test]
    fn notices_stay_local_and_never_reconcile() {
        let mut transcript = Transcript::default();
        let correlation_id = CorrelationId::generate();

        transcript
            .apply(TranscriptEvent::PushNotice {
                correlation_id,
                content: "Maaf, terjadi kesalahan. Silakan coba lagi.".to_string(),
                timestamp_unix_ms: 9,
            })
            .expect("notice applies");

        assert_eq!(transcript.entries()[0].status, EntryStatus::Notice);
        assert_eq!(transcript.entries()[0].author, MessageAuthor::Assistant);
        // A notice still occupies its correlation id.
        let rejected = transcript.apply(TranscriptEvent::PushNotice {
            correlation_id,
            content: "lagi".to_string(),
            timestamp_unix_ms: 10,
        });
        assert!(rejected.is_err());
    }
}
