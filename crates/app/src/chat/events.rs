use sehat_cloud::{ChatMessageRecord, ChatSessionRecord, SessionId};

use crate::chat::message::{CorrelationId, TurnId};

/// Emitted when sidebar selection changes the active session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSelected {
    pub session_id: SessionId,
}

/// Emitted when the sidebar's new-chat button is pressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewChatRequested;

/// Emitted when the user submits consultation input, either typed or via a
/// quick-prompt button.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submit {
    pub content: String,
}

impl Submit {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }
}

/// Emitted from the sidebar footer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignOutRequested;

/// Worker-to-view event for one consultation turn, routed by turn id so
/// stale workers can never touch a newer transcript.
#[derive(Debug, Clone)]
pub struct TurnEventMapped {
    pub turn_id: TurnId,
    pub payload: TurnEventPayload,
}

#[derive(Debug, Clone)]
pub enum TurnEventPayload {
    /// A first-message turn created its session before writing anything.
    SessionCreated { record: ChatSessionRecord },
    /// The user's message was persisted; reconcile the optimistic entry.
    UserPersisted {
        correlation_id: CorrelationId,
        record: ChatMessageRecord,
    },
    /// The user's message could not be persisted; the turn ends here.
    UserPersistFailed {
        correlation_id: CorrelationId,
        reason: String,
    },
    /// The session document was patched (preview text, maybe title).
    SessionPatched { record: ChatSessionRecord },
    /// The assistant reply was persisted.
    AssistantPersisted { record: ChatMessageRecord },
    /// Generation (or the reply write) failed; render the fallback locally.
    GenerationFailed { message: String },
    /// Terminal event; the turn is over either way.
    Finished,
}
