use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use gpui::prelude::FluentBuilder;
use gpui::*;
use gpui_component::{
    ActiveTheme, IconName, Sizable,
    button::{Button, ButtonVariants},
    h_flex, v_flex,
};
use gpui_tokio_bridge::Tokio;
use sehat_cloud::{
    ChatStore, MessageAuthor, NewChatSession, PLACEHOLDER_SESSION_TITLE, SessionId, UserProfile,
};
use sehat_llm::Generator;
use tokio::sync::oneshot;

use crate::chat::events::{
    NewChatRequested, SessionSelected, SignOutRequested, Submit, TurnEventMapped, TurnEventPayload,
};
use crate::chat::message::{CorrelationId, Transcript, TranscriptEvent, TurnId};
use crate::chat::turn::{TurnRequest, TurnSessionPlan, spawn_turn};
use crate::chat::{MessageInput, SessionSidebar, TranscriptList};

const SIDEBAR_WIDTH: Pixels = px(280.);

/// Parent coordinator for sidebar/transcript/input/turn orchestration on the
/// consultation screen.
pub struct ConsultationView {
    user: UserProfile,
    store: Arc<dyn ChatStore>,
    generator: Option<Arc<dyn Generator>>,
    sidebar: Entity<SessionSidebar>,
    message_list: Entity<TranscriptList>,
    message_input: Entity<MessageInput>,
    transcript: Transcript,
    active_session_id: Option<SessionId>,
    sidebar_open: bool,
    next_turn_id: u64,
    active_turn: Option<TurnId>,
    turn_worker_task: Option<Task<Result<(), gpui_tokio_bridge::JoinError>>>,
    turn_reader_task: Option<Task<()>>,
    load_worker_task: Option<Task<Result<(), gpui_tokio_bridge::JoinError>>>,
    load_reader_task: Option<Task<()>>,
    create_worker_task: Option<Task<Result<(), gpui_tokio_bridge::JoinError>>>,
    create_reader_task: Option<Task<()>>,
}

impl EventEmitter<SignOutRequested> for ConsultationView {}

impl ConsultationView {
    pub fn new(
        user: UserProfile,
        store: Arc<dyn ChatStore>,
        generator: Option<Arc<dyn Generator>>,
        window: &mut Window,
        cx: &mut Context<Self>,
    ) -> Self {
        let sidebar = cx.new(|cx| SessionSidebar::new(user.clone(), store.clone(), cx));
        let message_list = cx.new(TranscriptList::new);
        let message_input = cx.new(|cx| MessageInput::new(window, cx));

        cx.subscribe(&sidebar, |this, _, event: &SessionSelected, cx| {
            this.handle_session_selected(event.clone(), cx);
        })
        .detach();

        cx.subscribe(&sidebar, |this, _, _event: &NewChatRequested, cx| {
            this.create_session(cx);
        })
        .detach();

        cx.subscribe(&sidebar, |_, _, _event: &SignOutRequested, cx| {
            cx.emit(SignOutRequested);
        })
        .detach();

        cx.subscribe(&message_input, |this, _, event: &Submit, cx| {
            this.handle_submit(event.clone(), cx);
        })
        .detach();

        // Quick prompts on the welcome screen submit through the same path.
        cx.subscribe(&message_list, |this, _, event: &Submit, cx| {
            this.handle_submit(event.clone(), cx);
        })
        .detach();

        Self {
            user,
            store,
            generator,
            sidebar,
            message_list,
            message_input,
            transcript: Transcript::default(),
            active_session_id: None,
            sidebar_open: true,
            next_turn_id: 1,
            active_turn: None,
            turn_worker_task: None,
            turn_reader_task: None,
            load_worker_task: None,
            load_reader_task: None,
            create_worker_task: None,
            create_reader_task: None,
        }
    }

    pub fn toggle_sidebar(&mut self, cx: &mut Context<Self>) {
        self.sidebar_open = !self.sidebar_open;
        cx.notify();
    }

    fn handle_session_selected(&mut self, event: SessionSelected, cx: &mut Context<Self>) {
        if self.active_session_id.as_ref() == Some(&event.session_id) {
            return;
        }

        self.activate_session(event.session_id, cx);
    }

    fn activate_session(&mut self, session_id: SessionId, cx: &mut Context<Self>) {
        // Any in-flight turn now belongs to a previous session; its events
        // fail the turn-id check and are dropped.
        self.active_turn = None;
        self.turn_worker_task = None;
        self.turn_reader_task = None;
        self.active_session_id = Some(session_id.clone());

        let _ = self.transcript.apply(TranscriptEvent::Reset);
        self.sync_transcript(cx);
        self.message_input.update(cx, |input, cx| {
            input.set_busy(false, cx);
        });

        self.load_messages(session_id, cx);
        cx.notify();
    }

    fn load_messages(&mut self, session_id: SessionId, cx: &mut Context<Self>) {
        let store = self.store.clone();
        let worker_session_id = session_id.clone();
        let (result_tx, result_rx) = oneshot::channel();

        self.load_worker_task = Some(Tokio::spawn(cx, async move {
            let records = match store.list_messages(&worker_session_id).await {
                Ok(records) => records,
                Err(error) => {
                    // Masked per the failure policy: render an empty chat.
                    tracing::error!("failed to load session messages: {error}");
                    Vec::new()
                }
            };
            let _ = result_tx.send(records);
        }));

        self.load_reader_task = Some(cx.spawn(async move |this, cx| {
            let Ok(records) = result_rx.await else {
                return;
            };
            let _ = this.update(cx, |this, cx| {
                if this.active_session_id.as_ref() != Some(&session_id) {
                    // The user switched sessions while the fetch was in
                    // flight; this payload belongs to a torn-down view state.
                    return;
                }

                let _ = this.transcript.apply(TranscriptEvent::Loaded(records));
                this.sync_transcript(cx);
            });
        }));
    }

    /// Explicit "Chat Baru": creates the session up front and activates it.
    fn create_session(&mut self, cx: &mut Context<Self>) {
        let store = self.store.clone();
        let user_id = self.user.id.clone();
        let (result_tx, result_rx) = oneshot::channel();

        self.create_worker_task = Some(Tokio::spawn(cx, async move {
            let created = store
                .create_session(NewChatSession {
                    user_id,
                    title: PLACEHOLDER_SESSION_TITLE.to_string(),
                })
                .await;
            let _ = result_tx.send(created);
        }));

        self.create_reader_task = Some(cx.spawn(async move |this, cx| {
            let Ok(created) = result_rx.await else {
                return;
            };
            let _ = this.update(cx, |this, cx| match created {
                Ok(record) => {
                    let session_id = record.id.clone();
                    this.sidebar.update(cx, |sidebar, cx| {
                        sidebar.adopt_session(record, cx);
                    });
                    this.activate_session(session_id, cx);
                }
                Err(error) => {
                    tracing::error!("failed to create chat session: {error}");
                }
            });
        }));
    }

    fn handle_submit(&mut self, event: Submit, cx: &mut Context<Self>) {
        let content = event.content.trim().to_string();
        if content.is_empty() {
            return;
        }

        if self.active_turn.is_some() {
            // One turn at a time; the input is disabled, but quick prompts
            // share this path and need the same guard.
            return;
        }

        let turn_id = self.alloc_turn_id();
        let correlation_id = CorrelationId::generate();

        let plan = match &self.active_session_id {
            Some(session_id) => TurnSessionPlan::Existing {
                session_id: session_id.clone(),
                needs_title: self.sidebar.read(cx).session_needs_title(session_id),
            },
            None => TurnSessionPlan::CreateFirst {
                user_id: self.user.id.clone(),
            },
        };

        // Optimistic echo with the client clock; the persisted record
        // replaces it through the correlation id.
        let _ = self.transcript.apply(TranscriptEvent::PushPending {
            correlation_id,
            author: MessageAuthor::User,
            content: content.clone(),
            timestamp_unix_ms: unix_now_ms(),
        });

        self.active_turn = Some(turn_id);
        self.message_input.update(cx, |input, cx| {
            input.set_busy(true, cx);
        });
        self.sync_transcript(cx);

        let handle = spawn_turn(
            self.store.clone(),
            self.generator.clone(),
            TurnRequest {
                turn_id,
                correlation_id,
                content,
                plan,
            },
        );

        self.turn_worker_task = Some(Tokio::spawn(cx, handle.worker));

        let mut events = handle.events;
        self.turn_reader_task = Some(cx.spawn(async move |this, cx| {
            while let Some(event) = events.recv().await {
                let updated = this.update(cx, |this, cx| {
                    this.handle_turn_event(event, cx);
                });
                if updated.is_err() {
                    return;
                }
            }

            let _ = this.update(cx, |this, cx| {
                this.handle_turn_stream_closed(turn_id, cx);
            });
        }));
    }

    fn handle_turn_event(&mut self, event: TurnEventMapped, cx: &mut Context<Self>) {
        if self.active_turn != Some(event.turn_id) {
            // Stale worker; the user has moved on.
            return;
        }

        match event.payload {
            TurnEventPayload::SessionCreated { record } => {
                self.active_session_id = Some(record.id.clone());
                self.sidebar.update(cx, |sidebar, cx| {
                    sidebar.adopt_session(record, cx);
                });
            }
            TurnEventPayload::UserPersisted {
                correlation_id,
                record,
            } => {
                if let Err(rejection) = self.transcript.apply(TranscriptEvent::Reconcile {
                    correlation_id,
                    record,
                }) {
                    tracing::debug!("dropped reconcile event: {rejection:?}");
                }
                self.sync_transcript(cx);
            }
            TurnEventPayload::UserPersistFailed {
                correlation_id,
                reason,
            } => {
                let _ = self.transcript.apply(TranscriptEvent::MarkFailed {
                    correlation_id,
                    reason,
                });
                self.sync_transcript(cx);
            }
            TurnEventPayload::SessionPatched { record } => {
                self.sidebar.update(cx, |sidebar, cx| {
                    sidebar.upsert_session(record, cx);
                });
            }
            TurnEventPayload::AssistantPersisted { record } => {
                if let Err(rejection) = self
                    .transcript
                    .apply(TranscriptEvent::AppendPersisted { record })
                {
                    tracing::debug!("dropped assistant append: {rejection:?}");
                }
                self.sync_transcript(cx);
            }
            TurnEventPayload::GenerationFailed { message } => {
                let _ = self.transcript.apply(TranscriptEvent::PushNotice {
                    correlation_id: CorrelationId::generate(),
                    content: message,
                    timestamp_unix_ms: unix_now_ms(),
                });
                self.sync_transcript(cx);
            }
            TurnEventPayload::Finished => {
                self.finish_turn(cx);
            }
        }
    }

    fn handle_turn_stream_closed(&mut self, turn_id: TurnId, cx: &mut Context<Self>) {
        if self.active_turn == Some(turn_id) {
            // The worker died without a terminal event; release the input.
            self.finish_turn(cx);
        }
    }

    fn finish_turn(&mut self, cx: &mut Context<Self>) {
        self.active_turn = None;
        self.turn_worker_task = None;
        self.message_input.update(cx, |input, cx| {
            input.set_busy(false, cx);
        });
        self.sync_transcript(cx);
        cx.notify();
    }

    fn sync_transcript(&mut self, cx: &mut Context<Self>) {
        let entries = self.transcript.entries().to_vec();
        let is_busy = self.active_turn.is_some();

        self.message_list.update(cx, |list, cx| {
            list.set_entries(entries, is_busy, cx);
        });
    }

    fn alloc_turn_id(&mut self) -> TurnId {
        let turn_id = TurnId::new(self.next_turn_id);
        self.next_turn_id = self.next_turn_id.saturating_add(1);
        turn_id
    }
}

impl Render for ConsultationView {
    fn render(&mut self, _window: &mut Window, cx: &mut Context<Self>) -> impl IntoElement {
        let theme = cx.theme();
        let sidebar_open = self.sidebar_open;

        h_flex()
            .size_full()
            .min_h_0()
            .overflow_hidden()
            .bg(theme.background)
            .when(sidebar_open, |el| {
                el.child(
                    div()
                        .w(SIDEBAR_WIDTH)
                        .h_full()
                        .flex_shrink_0()
                        .border_r_1()
                        .border_color(theme.border)
                        .child(self.sidebar.clone()),
                )
            })
            .child(
                v_flex()
                    .flex_1()
                    .h_full()
                    .min_w_0()
                    .min_h_0()
                    .overflow_hidden()
                    .child(
                        h_flex()
                            .h(px(48.))
                            .px_4()
                            .items_center()
                            .gap_2()
                            .border_b_1()
                            .border_color(theme.border)
                            .child(
                                Button::new("toggle-sidebar")
                                    .ghost()
                                    .small()
                                    .icon(IconName::PanelLeft)
                                    .on_click(cx.listener(|this, _, _window, cx| {
                                        this.toggle_sidebar(cx);
                                    })),
                            )
                            .child(
                                div()
                                    .text_sm()
                                    .font_weight(FontWeight::MEDIUM)
                                    .text_color(theme.foreground)
                                    .child("Konsultasi Kesehatan"),
                            ),
                    )
                    .child(
                        div()
                            .flex_1()
                            .min_h_0()
                            .child(self.message_list.clone()),
                    )
                    .child(
                        div()
                            .flex_shrink_0()
                            .w_full()
                            .child(self.message_input.clone()),
                    ),
            )
    }
}

fn unix_now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_millis() as i64
}
