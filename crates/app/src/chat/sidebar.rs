use std::rc::Rc;
use std::sync::Arc;

use gpui::*;
use gpui_component::{
    ActiveTheme, Icon, IconName, Sizable, VirtualListScrollHandle,
    button::{Button, ButtonVariants},
    h_flex,
    list::ListItem,
    v_flex, v_virtual_list,
};
use gpui_tokio_bridge::Tokio;
use sehat_cloud::{ChatSessionRecord, ChatStore, SessionId, UserProfile};
use tokio::sync::oneshot;

use crate::chat::events::{NewChatRequested, SessionSelected, SignOutRequested};
use crate::chat::session::{needs_title, sort_sessions_newest_first};

const SESSION_ROW_HEIGHT: f32 = 52.0;

/// Session list for the signed-in user, newest first, with the last-message
/// preview under each title. Store failures degrade to an empty list.
pub struct SessionSidebar {
    user: UserProfile,
    store: Arc<dyn ChatStore>,
    sessions: Vec<ChatSessionRecord>,
    selected: Option<SessionId>,
    item_sizes: Rc<Vec<Size<Pixels>>>,
    scroll_handle: VirtualListScrollHandle,
    refresh_worker: Option<Task<Result<(), gpui_tokio_bridge::JoinError>>>,
    refresh_reader: Option<Task<()>>,
}

impl EventEmitter<SessionSelected> for SessionSidebar {}
impl EventEmitter<NewChatRequested> for SessionSidebar {}
impl EventEmitter<SignOutRequested> for SessionSidebar {}

impl SessionSidebar {
    pub fn new(user: UserProfile, store: Arc<dyn ChatStore>, cx: &mut Context<Self>) -> Self {
        let mut sidebar = Self {
            user,
            store,
            sessions: Vec::new(),
            selected: None,
            item_sizes: Rc::new(Vec::new()),
            scroll_handle: VirtualListScrollHandle::new(),
            refresh_worker: None,
            refresh_reader: None,
        };
        sidebar.refresh(cx);
        sidebar
    }

    pub fn selected_session(&self) -> Option<&SessionId> {
        self.selected.as_ref()
    }

    /// True until the session's first message assigns a real title. Unknown
    /// ids answer true so a fresh session is titled on its first turn.
    pub fn session_needs_title(&self, session_id: &SessionId) -> bool {
        self.sessions
            .iter()
            .find(|session| &session.id == session_id)
            .map(needs_title)
            .unwrap_or(true)
    }

    pub fn refresh(&mut self, cx: &mut Context<Self>) {
        let store = self.store.clone();
        let user_id = self.user.id.clone();
        let (result_tx, result_rx) = oneshot::channel();

        self.refresh_worker = Some(Tokio::spawn(cx, async move {
            let sessions = match store.list_sessions(&user_id).await {
                Ok(sessions) => sessions,
                Err(error) => {
                    // Masked per the failure policy: the sidebar shows an
                    // empty list instead of an error state.
                    tracing::error!("failed to load chat sessions: {error}");
                    Vec::new()
                }
            };
            let _ = result_tx.send(sessions);
        }));

        self.refresh_reader = Some(cx.spawn(async move |this, cx| {
            let Ok(sessions) = result_rx.await else {
                return;
            };
            let _ = this.update(cx, |this, cx| {
                this.set_sessions(sessions, cx);
            });
        }));
    }

    fn set_sessions(&mut self, mut sessions: Vec<ChatSessionRecord>, cx: &mut Context<Self>) {
        sort_sessions_newest_first(&mut sessions);
        self.sessions = sessions;
        self.rebuild_item_sizes();

        let selection_gone = self.selected.as_ref().is_some_and(|selected| {
            !self.sessions.iter().any(|session| &session.id == selected)
        });
        if selection_gone {
            self.selected = None;
        }

        // Mirror the source behavior: with no explicit selection, the most
        // recent session becomes active.
        if self.selected.is_none()
            && let Some(latest) = self.sessions.first()
        {
            let session_id = latest.id.clone();
            self.select_session(session_id, cx);
            return;
        }

        cx.notify();
    }

    /// Inserts or replaces one session record, keeping newest-first order.
    pub fn upsert_session(&mut self, record: ChatSessionRecord, cx: &mut Context<Self>) {
        self.sessions.retain(|session| session.id != record.id);
        self.sessions.push(record);
        sort_sessions_newest_first(&mut self.sessions);
        self.rebuild_item_sizes();
        cx.notify();
    }

    /// Used when a turn created its own session: the record becomes selected
    /// without re-emitting `SessionSelected`, so the optimistic transcript
    /// stays in place.
    pub fn adopt_session(&mut self, record: ChatSessionRecord, cx: &mut Context<Self>) {
        self.selected = Some(record.id.clone());
        self.upsert_session(record, cx);
    }

    pub fn select_session(&mut self, session_id: SessionId, cx: &mut Context<Self>) {
        self.selected = Some(session_id.clone());
        cx.emit(SessionSelected { session_id });
        cx.notify();
    }

    fn rebuild_item_sizes(&mut self) {
        let sizes = self
            .sessions
            .iter()
            .map(|_| size(px(0.), px(SESSION_ROW_HEIGHT)))
            .collect::<Vec<_>>();
        self.item_sizes = Rc::new(sizes);
    }

    fn render_toolbar(&mut self, cx: &mut Context<Self>) -> impl IntoElement {
        h_flex().w_full().min_w_0().px_3().pt(px(8.)).pb_2().child(
            Button::new("new-chat")
                .small()
                .primary()
                .icon(IconName::Plus)
                .child("Chat Baru")
                .on_click(cx.listener(|_, _, _window, cx| {
                    cx.emit(NewChatRequested);
                })),
        )
    }

    fn render_empty_state(&mut self, cx: &mut Context<Self>) -> AnyElement {
        let theme = cx.theme();

        v_flex()
            .flex_1()
            .items_center()
            .justify_center()
            .px_4()
            .child(
                div()
                    .text_sm()
                    .text_color(theme.foreground.opacity(0.55))
                    .child("Belum ada percakapan"),
            )
            .into_any_element()
    }

    fn render_session_list(&mut self, cx: &mut Context<Self>) -> AnyElement {
        if self.sessions.is_empty() {
            return self.render_empty_state(cx);
        }

        let selected = self.selected.clone();
        let item_sizes = self.item_sizes.clone();
        let sessions = self.sessions.clone();

        v_flex()
            .flex_1()
            .min_h_0()
            .child(
                v_virtual_list(
                    cx.entity().clone(),
                    "session-list",
                    item_sizes,
                    move |_this, visible_range, _scroll_handle, cx| {
                        let theme = cx.theme();

                        visible_range
                            .map(|index| {
                                let session = &sessions[index];
                                let session_id = session.id.clone();
                                let is_selected = selected.as_ref() == Some(&session_id);
                                let title = session.title.clone();
                                let preview = session.last_message.clone();

                                div()
                                    .w_full()
                                    .h(px(SESSION_ROW_HEIGHT))
                                    .px_2()
                                    .child(
                                        ListItem::new(("session", index))
                                            .w_full()
                                            .h_full()
                                            .px_3()
                                            .py_1()
                                            .rounded_md()
                                            .selected(is_selected)
                                            .on_click(cx.listener(
                                                move |this, _event: &ClickEvent, _window, cx| {
                                                    this.select_session(session_id.clone(), cx);
                                                },
                                            ))
                                            .child(
                                                v_flex()
                                                    .w_full()
                                                    .min_w_0()
                                                    .child(
                                                        div()
                                                            .w_full()
                                                            .min_w_0()
                                                            .truncate()
                                                            .text_sm()
                                                            .text_color(theme.foreground)
                                                            .child(title),
                                                    )
                                                    .child(
                                                        div()
                                                            .w_full()
                                                            .min_w_0()
                                                            .truncate()
                                                            .text_xs()
                                                            .text_color(
                                                                theme.foreground.opacity(0.55),
                                                            )
                                                            .child(preview),
                                                    ),
                                            ),
                                    )
                                    .into_any_element()
                            })
                            .collect()
                    },
                )
                .w_full()
                .flex_1()
                .track_scroll(&self.scroll_handle),
            )
            .into_any_element()
    }

    fn render_footer(&mut self, cx: &mut Context<Self>) -> impl IntoElement {
        let theme = cx.theme();
        let display_name = self.user.display_name.clone();
        let email = self.user.email.clone();

        h_flex()
            .w_full()
            .min_w_0()
            .items_center()
            .justify_between()
            .gap_2()
            .px_3()
            .py_2()
            .border_t_1()
            .border_color(theme.border)
            .child(
                h_flex()
                    .min_w_0()
                    .items_center()
                    .gap_2()
                    .child(
                        div()
                            .size(px(32.))
                            .rounded_full()
                            .border_1()
                            .border_color(theme.border)
                            .bg(theme.muted)
                            .flex()
                            .items_center()
                            .justify_center()
                            .child(
                                Icon::new(IconName::CircleUser)
                                    .size(px(18.))
                                    .text_color(theme.foreground),
                            ),
                    )
                    .child(
                        v_flex()
                            .min_w_0()
                            .child(
                                div()
                                    .min_w_0()
                                    .truncate()
                                    .text_sm()
                                    .text_color(theme.foreground)
                                    .child(display_name),
                            )
                            .child(
                                div()
                                    .min_w_0()
                                    .truncate()
                                    .text_xs()
                                    .text_color(theme.foreground.opacity(0.55))
                                    .child(email),
                            ),
                    ),
            )
            .child(
                Button::new("sign-out")
                    .ghost()
                    .small()
                    .child("Keluar")
                    .on_click(cx.listener(|_, _, _window, cx| {
                        cx.emit(SignOutRequested);
                    })),
            )
    }
}

impl Render for SessionSidebar {
    fn render(&mut self, _window: &mut Window, cx: &mut Context<Self>) -> impl IntoElement {
        let theme = cx.theme();

        v_flex()
            .size_full()
            .min_w_0()
            .overflow_hidden()
            .bg(theme.background)
            .child(self.render_toolbar(cx))
            .child(self.render_session_list(cx))
            .child(self.render_footer(cx))
    }
}
