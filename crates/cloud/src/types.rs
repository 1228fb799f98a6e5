use serde::{Deserialize, Serialize};

use crate::ids::{GlobalMessageId, MessageId, SessionId, UserId};

/// Title assigned to a session until its first message arrives.
pub const PLACEHOLDER_SESSION_TITLE: &str = "New Chat";

/// Message authorship. Stored on the wire as the `isUser` flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageAuthor {
    User,
    Assistant,
}

impl MessageAuthor {
    pub fn is_user(self) -> bool {
        matches!(self, Self::User)
    }

    pub fn from_is_user(is_user: bool) -> Self {
        if is_user { Self::User } else { Self::Assistant }
    }
}

/// One consultation session document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatSessionRecord {
    pub id: SessionId,
    pub user_id: UserId,
    pub title: String,
    pub last_message: String,
    pub updated_at_unix_ms: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewChatSession {
    pub user_id: UserId,
    pub title: String,
}

/// Partial session update. `None` fields are left untouched by the store.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionPatch {
    pub title: Option<String>,
    pub last_message: Option<String>,
}

/// One persisted consultation message. Immutable once written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessageRecord {
    pub id: MessageId,
    pub session_id: SessionId,
    pub content: String,
    pub author: MessageAuthor,
    /// Assigned by the store at write time, not by the submitting client.
    pub created_at_unix_ms: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewChatMessage {
    pub session_id: SessionId,
    pub content: String,
    pub author: MessageAuthor,
}

/// One shared-room message document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobalMessageRecord {
    pub id: GlobalMessageId,
    pub user_id: UserId,
    pub user_name: String,
    pub user_photo: Option<String>,
    pub content: String,
    pub created_at_unix_ms: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewGlobalMessage {
    pub user_id: UserId,
    pub user_name: String,
    pub user_photo: Option<String>,
    pub content: String,
}

/// The signed-in account as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub display_name: String,
    pub email: String,
    pub photo_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_author_maps_to_and_from_the_wire_flag() {
        assert!(MessageAuthor::User.is_user());
        assert!(!MessageAuthor::Assistant.is_user());
        assert_eq!(MessageAuthor::from_is_user(true), MessageAuthor::User);
        assert_eq!(MessageAuthor::from_is_user(false), MessageAuthor::Assistant);
    }
}
