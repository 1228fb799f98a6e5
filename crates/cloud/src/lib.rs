#![deny(unsafe_code)]

//! Clients for the hosted collaborators: the identity provider and the
//! document store. Both sit behind traits so orchestration code and tests
//! never depend on the wire.

pub mod error;
pub mod identity;
pub mod ids;
pub mod rest;
pub mod subscription;
pub mod types;

use std::future::Future;
use std::pin::Pin;

pub use error::{CloudError, CloudResult};
pub use identity::{
    IdentityConfig, IdentityError, IdentityProvider, IdentityResult, RestIdentityProvider,
    StoredCredentials,
};
pub use ids::{GlobalMessageId, MessageId, SessionId, UserId};
pub use rest::{
    COLLECTION_GLOBAL_MESSAGES, COLLECTION_MESSAGES, COLLECTION_SESSIONS, RestDocumentStore,
    StoreConfig,
};
pub use subscription::{
    DEFAULT_ROOM_POLL_INTERVAL, RoomSnapshot, RoomSubscription, RoomSubscriptionHandle, RoomWorker,
    subscribe_room,
};
pub use types::{
    ChatMessageRecord, ChatSessionRecord, GlobalMessageRecord, MessageAuthor, NewChatMessage,
    NewChatSession, NewGlobalMessage, PLACEHOLDER_SESSION_TITLE, SessionPatch, UserProfile,
};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait SessionStore: Send + Sync {
    /// Lists every session owned by `user_id`. Order is whatever the store
    /// returns; callers sort client-side.
    fn list_sessions<'a>(
        &'a self,
        user_id: &'a UserId,
    ) -> BoxFuture<'a, CloudResult<Vec<ChatSessionRecord>>>;

    fn create_session<'a>(
        &'a self,
        input: NewChatSession,
    ) -> BoxFuture<'a, CloudResult<ChatSessionRecord>>;

    fn update_session<'a>(
        &'a self,
        session_id: &'a SessionId,
        patch: SessionPatch,
    ) -> BoxFuture<'a, CloudResult<ChatSessionRecord>>;
}

pub trait MessageStore: Send + Sync {
    /// Equality-filtered fetch by session id. Order is whatever the store
    /// returns; callers sort client-side by timestamp.
    fn list_messages<'a>(
        &'a self,
        session_id: &'a SessionId,
    ) -> BoxFuture<'a, CloudResult<Vec<ChatMessageRecord>>>;

    fn append_message<'a>(
        &'a self,
        input: NewChatMessage,
    ) -> BoxFuture<'a, CloudResult<ChatMessageRecord>>;
}

pub trait RoomStore: Send + Sync {
    /// Store-native ordered read, ascending by server timestamp.
    fn list_room_messages<'a>(&'a self)
    -> BoxFuture<'a, CloudResult<Vec<GlobalMessageRecord>>>;

    fn post_room_message<'a>(
        &'a self,
        input: NewGlobalMessage,
    ) -> BoxFuture<'a, CloudResult<GlobalMessageRecord>>;
}

pub trait ChatStore: SessionStore + MessageStore + RoomStore {}

impl<T> ChatStore for T where T: SessionStore + MessageStore + RoomStore {}
