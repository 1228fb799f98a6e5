//! One consultation turn, run to completion on the tokio side.
//!
//! The worker persists the user's message, patches the session document,
//! issues the single generation call, and persists the reply, emitting
//! [`TurnEventMapped`]s over an unbounded channel as it goes. Every failure
//! is terminal for the turn: store errors are logged and degraded, and any
//! generation-side failure collapses into one local fallback notice that is
//! never written to the store.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use sehat_cloud::{ChatStore, MessageAuthor, NewChatMessage, NewChatSession, SessionId, SessionPatch, UserId};
use sehat_cloud::PLACEHOLDER_SESSION_TITLE;
use sehat_llm::{GENERATION_FALLBACK_MESSAGE, Generator};
use tokio::sync::mpsc;

use crate::chat::events::{TurnEventMapped, TurnEventPayload};
use crate::chat::message::{CorrelationId, TurnId};
use crate::chat::session::derive_session_title;

/// How the turn resolves its session before any message is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnSessionPlan {
    Existing {
        session_id: SessionId,
        needs_title: bool,
    },
    /// No session is active yet; the turn creates one first.
    CreateFirst { user_id: UserId },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnRequest {
    pub turn_id: TurnId,
    pub correlation_id: CorrelationId,
    pub content: String,
    pub plan: TurnSessionPlan,
}

pub type TurnWorker = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

pub struct TurnEventStream {
    events: mpsc::UnboundedReceiver<TurnEventMapped>,
}

impl TurnEventStream {
    pub async fn recv(&mut self) -> Option<TurnEventMapped> {
        self.events.recv().await
    }
}

pub struct TurnHandle {
    pub events: TurnEventStream,
    pub worker: TurnWorker,
}

pub fn spawn_turn(
    store: Arc<dyn ChatStore>,
    generator: Option<Arc<dyn Generator>>,
    request: TurnRequest,
) -> TurnHandle {
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let worker: TurnWorker = Box::pin(run_turn(store, generator, request, event_tx));

    TurnHandle {
        events: TurnEventStream { events: event_rx },
        worker,
    }
}

async fn run_turn(
    store: Arc<dyn ChatStore>,
    generator: Option<Arc<dyn Generator>>,
    request: TurnRequest,
    event_tx: mpsc::UnboundedSender<TurnEventMapped>,
) {
    let turn_id = request.turn_id;
    let send = |payload: TurnEventPayload| {
        let _ = event_tx.send(TurnEventMapped { turn_id, payload });
    };

    let (session_id, needs_title) = match request.plan {
        TurnSessionPlan::Existing {
            session_id,
            needs_title,
        } => (session_id, needs_title),
        TurnSessionPlan::CreateFirst { user_id } => {
            let created = store
                .create_session(NewChatSession {
                    user_id,
                    title: PLACEHOLDER_SESSION_TITLE.to_string(),
                })
                .await;

            match created {
                Ok(record) => {
                    let session_id = record.id.clone();
                    send(TurnEventPayload::SessionCreated { record });
                    (session_id, true)
                }
                Err(error) => {
                    tracing::error!("failed to create chat session: {error}");
                    send(TurnEventPayload::UserPersistFailed {
                        correlation_id: request.correlation_id,
                        reason: error.to_string(),
                    });
                    send(TurnEventPayload::Finished);
                    return;
                }
            }
        }
    };

    let user_record = match store
        .append_message(NewChatMessage {
            session_id: session_id.clone(),
            content: request.content.clone(),
            author: MessageAuthor::User,
        })
        .await
    {
        Ok(record) => record,
        Err(error) => {
            tracing::error!("failed to persist user message: {error}");
            send(TurnEventPayload::UserPersistFailed {
                correlation_id: request.correlation_id,
                reason: error.to_string(),
            });
            send(TurnEventPayload::Finished);
            return;
        }
    };
    send(TurnEventPayload::UserPersisted {
        correlation_id: request.correlation_id,
        record: user_record,
    });

    // The preview always moves; the title is assigned once, from the first
    // message, and never rewritten afterwards.
    let patch = SessionPatch {
        title: needs_title.then(|| derive_session_title(&request.content)),
        last_message: Some(request.content.clone()),
    };
    match store.update_session(&session_id, patch).await {
        Ok(record) => send(TurnEventPayload::SessionPatched { record }),
        Err(error) => {
            tracing::error!("failed to patch chat session: {error}");
        }
    }

    let Some(generator) = generator else {
        tracing::warn!("generation provider is not configured");
        send(TurnEventPayload::GenerationFailed {
            message: GENERATION_FALLBACK_MESSAGE.to_string(),
        });
        send(TurnEventPayload::Finished);
        return;
    };

    let reply = match generator.ask(&request.content).await {
        Ok(reply) => reply,
        Err(error) => {
            tracing::error!("generation call failed: {error}");
            send(TurnEventPayload::GenerationFailed {
                message: GENERATION_FALLBACK_MESSAGE.to_string(),
            });
            send(TurnEventPayload::Finished);
            return;
        }
    };

    match store
        .append_message(NewChatMessage {
            session_id,
            content: reply,
            author: MessageAuthor::Assistant,
        })
        .await
    {
        Ok(record) => send(TurnEventPayload::AssistantPersisted { record }),
        Err(error) => {
            tracing::error!("failed to persist assistant reply: {error}");
            send(TurnEventPayload::GenerationFailed {
                message: GENERATION_FALLBACK_MESSAGE.to_string(),
            });
        }
    }

    send(TurnEventPayload::Finished);
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};

    use sehat_cloud::{
        BoxFuture, ChatMessageRecord, ChatSessionRecord, CloudResult, GlobalMessageRecord,
        MessageId, MessageStore, NewGlobalMessage, RoomStore, SessionStore,
    };
    use sehat_llm::{GenerationError, GenerationResult};

    use super::*;

    #[derive(Default)]
    struct InMemoryStore {
        sessions: Mutex<Vec<ChatSessionRecord>>,
        messages: Mutex<Vec<ChatMessageRecord>>,
        clock_ms: AtomicI64,
        fail_message_writes: std::sync::atomic::AtomicBool,
    }

    impl InMemoryStore {
        fn tick(&self) -> i64 {
            self.clock_ms.fetch_add(10, Ordering::SeqCst) + 10
        }

        fn session_titles(&self) -> Vec<String> {
            self.sessions
                .lock()
                .unwrap()
                .iter()
                .map(|session| session.title.clone())
                .collect()
        }

        fn stored_messages(&self) -> Vec<ChatMessageRecord> {
            self.messages.lock().unwrap().clone()
        }
    }

    impl SessionStore for InMemoryStore {
        fn list_sessions<'a>(
            &'a self,
            user_id: &'a UserId,
        ) -> BoxFuture<'a, CloudResult<Vec<ChatSessionRecord>>> {
            Box::pin(async move {
                Ok(self
                    .sessions
                    .lock()
                    .unwrap()
                    .iter()
                    .filter(|session| &session.user_id == user_id)
                    .cloned()
                    .collect())
            })
        }

        fn create_session<'a>(
            &'a self,
            input: NewChatSession,
        ) -> BoxFuture<'a, CloudResult<ChatSessionRecord>> {
            Box::pin(async move {
                let mut sessions = self.sessions.lock().unwrap();
                let record = ChatSessionRecord {
                    id: SessionId::new(format!("s-{}", sessions.len() + 1)),
                    user_id: input.user_id,
                    title: input.title,
                    last_message: String::new(),
                    updated_at_unix_ms: self.tick(),
                };
                sessions.push(record.clone());
                Ok(record)
            })
        }

        fn update_session<'a>(
            &'a self,
            session_id: &'a SessionId,
            patch: SessionPatch,
        ) -> BoxFuture<'a, CloudResult<ChatSessionRecord>> {
            Box::pin(async move {
                let mut sessions = self.sessions.lock().unwrap();
                let session = sessions
                    .iter_mut()
                    .find(|session| &session.id == session_id)
                    .expect("session exists in fake store");

                if let Some(title) = patch.title {
                    session.title = title;
                }
                if let Some(last_message) = patch.last_message {
                    session.last_message = last_message;
                }
                session.updated_at_unix_ms = self.tick();
                Ok(session.clone())
            })
        }
    }

    impl MessageStore for InMemoryStore {
        fn list_messages<'a>(
            &'a self,
            session_id: &'a SessionId,
        ) -> BoxFuture<'a, CloudResult<Vec<ChatMessageRecord>>> {
            Box::pin(async move {
                Ok(self
                    .messages
                    .lock()
                    .unwrap()
                    .iter()
                    .filter(|message| &message.session_id == session_id)
                    .cloned()
                    .collect())
            })
        }

        fn append_message<'a>(
            &'a self,
            input: NewChatMessage,
        ) -> BoxFuture<'a, CloudResult<ChatMessageRecord>> {
            Box::pin(async move {
                if self.fail_message_writes.load(Ordering::SeqCst) {
                    return Err(sehat_cloud::CloudError::Status {
                        stage: "append-message",
                        status: 503,
                        body: "unavailable".to_string(),
                    });
                }

                let mut messages = self.messages.lock().unwrap();
                let record = ChatMessageRecord {
                    id: MessageId::new(format!("m-{}", messages.len() + 1)),
                    session_id: input.session_id,
                    content: input.content,
                    author: input.author,
                    created_at_unix_ms: self.tick(),
                };
                messages.push(record.clone());
                Ok(record)
            })
        }
    }

    impl RoomStore for InMemoryStore {
        fn list_room_messages<'a>(
            &'a self,
        ) -> BoxFuture<'a, CloudResult<Vec<GlobalMessageRecord>>> {
            Box::pin(async move { Ok(Vec::new()) })
        }

        fn post_room_message<'a>(
            &'a self,
            _input: NewGlobalMessage,
        ) -> BoxFuture<'a, CloudResult<GlobalMessageRecord>> {
            unreachable!("turn tests never post to the room");
        }
    }

    struct ScriptedGenerator {
        reply: GenerationResult<String>,
        calls: AtomicUsize,
    }

    impl ScriptedGenerator {
        fn replying(reply: &str) -> Self {
            Self {
                reply: Ok(reply.to_string()),
                calls: AtomicUsize::new(0),
            }
        }

        fn failing() -> Self {
            Self {
                reply: Err(GenerationError::EmptyResponse { stage: "test" }),
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl Generator for ScriptedGenerator {
        fn id(&self) -> &str {
            "scripted"
        }

        fn model_id(&self) -> &str {
            "scripted-model"
        }

        fn ask<'a>(
            &'a self,
            _user_text: &'a str,
        ) -> sehat_llm::BoxFuture<'a, GenerationResult<String>> {
            Box::pin(async move {
                self.calls.fetch_add(1, Ordering::SeqCst);
                match &self.reply {
                    Ok(reply) => Ok(reply.clone()),
                    Err(_) => Err(GenerationError::EmptyResponse { stage: "test" }),
                }
            })
        }
    }

    async fn drain(handle: TurnHandle) -> Vec<TurnEventPayload> {
        handle.worker.await;
        let mut events = handle.events;
        let mut payloads = Vec::new();
        while let Some(event) = events.recv().await {
            payloads.push(event.payload);
        }
        payloads
    }

    fn request(plan: TurnSessionPlan, content: &str) -> TurnRequest {
        TurnRequest {
            turn_id: TurnId::new(1),
            correlation_id: CorrelationId::generate(),
            content: content.to_string(),
            plan,
        }
    }

    #[tokio::test]
    async fn first_message_creates_titles_and_persists_both_sides() {
        let store = Arc::new(InMemoryStore::default());
        let generator = Arc::new(ScriptedGenerator::replying(
            "Diabetes adalah gangguan metabolisme gula darah.",
        ));

        let handle = spawn_turn(
            store.clone(),
            Some(generator.clone()),
            request(
                TurnSessionPlan::CreateFirst {
                    user_id: UserId::new("u-1"),
                },
                "Apa itu diabetes?",
            ),
        );
        let payloads = drain(handle).await;

        assert!(matches!(payloads[0], TurnEventPayload::SessionCreated { .. }));
        assert!(matches!(payloads[1], TurnEventPayload::UserPersisted { .. }));
        assert!(matches!(payloads[2], TurnEventPayload::SessionPatched { .. }));
        assert!(matches!(
            payloads[3],
            TurnEventPayload::AssistantPersisted { .. }
        ));
        assert!(matches!(payloads.last(), Some(TurnEventPayload::Finished)));

        assert_eq!(store.session_titles(), ["Apa itu diabetes?"]);
        assert_eq!(generator.calls.load(Ordering::SeqCst), 1);

        let messages = store.stored_messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].author, MessageAuthor::User);
        assert_eq!(messages[1].author, MessageAuthor::Assistant);
        assert!(messages[0].created_at_unix_ms <= messages[1].created_at_unix_ms);
    }

    #[tokio::test]
    async fn later_messages_never_rewrite_the_title() {
        let store = Arc::new(InMemoryStore::default());
        let generator = Arc::new(ScriptedGenerator::replying("Baik, saya jelaskan."));

        let first = spawn_turn(
            store.clone(),
            Some(generator.clone()),
            request(
                TurnSessionPlan::CreateFirst {
                    user_id: UserId::new("u-1"),
                },
                "Apa itu diabetes?",
            ),
        );
        drain(first).await;

        let session_id = store.sessions.lock().unwrap()[0].id.clone();
        let second = spawn_turn(
            store.clone(),
            Some(generator),
            request(
                TurnSessionPlan::Existing {
                    session_id,
                    needs_title: false,
                },
                "Bagaimana cara mencegahnya supaya tidak kambuh lagi nanti?",
            ),
        );
        drain(second).await;

        assert_eq!(store.session_titles(), ["Apa itu diabetes?"]);
        assert_eq!(
            store.sessions.lock().unwrap()[0].last_message,
            "Bagaimana cara mencegahnya supaya tidak kambuh lagi nanti?"
        );
    }

    #[tokio::test]
    async fn generation_failure_yields_one_fallback_and_no_persisted_reply() {
        let store = Arc::new(InMemoryStore::default());
        let generator = Arc::new(ScriptedGenerator::failing());

        let handle = spawn_turn(
            store.clone(),
            Some(generator),
            request(
                TurnSessionPlan::CreateFirst {
                    user_id: UserId::new("u-1"),
                },
                "Apa itu diabetes?",
            ),
        );
        let payloads = drain(handle).await;

        let fallbacks: Vec<_> = payloads
            .iter()
            .filter_map(|payload| match payload {
                TurnEventPayload::GenerationFailed { message } => Some(message.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(fallbacks, [GENERATION_FALLBACK_MESSAGE.to_string()]);

        // Only the user's message reached the store.
        let messages = store.stored_messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].author, MessageAuthor::User);
    }

    #[tokio::test]
    async fn user_persist_failure_ends_the_turn_without_a_generation_call() {
        let store = Arc::new(InMemoryStore::default());
        store
            .fail_message_writes
            .store(true, Ordering::SeqCst);
        let generator = Arc::new(ScriptedGenerator::replying("tidak terpakai"));

        let session = {
            let store = store.clone();
            SessionStore::create_session(
                &*store,
                NewChatSession {
                    user_id: UserId::new("u-1"),
                    title: PLACEHOLDER_SESSION_TITLE.to_string(),
                },
            )
            .await
            .expect("session created")
        };

        let handle = spawn_turn(
            store.clone(),
            Some(generator.clone()),
            request(
                TurnSessionPlan::Existing {
                    session_id: session.id,
                    needs_title: true,
                },
                "halo",
            ),
        );
        let payloads = drain(handle).await;

        assert!(matches!(
            payloads[0],
            TurnEventPayload::UserPersistFailed { .. }
        ));
        assert!(matches!(payloads[1], TurnEventPayload::Finished));
        assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
        // The placeholder title survives a failed first write.
        assert_eq!(store.session_titles(), [PLACEHOLDER_SESSION_TITLE]);
    }
}
