use std::rc::Rc;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use gpui::*;
use gpui_component::{
    ActiveTheme, IconName, Sizable, VirtualListScrollHandle,
    button::{Button, ButtonVariants},
    h_flex,
    input::{Input, InputEvent, InputState},
    v_flex, v_virtual_list,
};
use gpui_tokio_bridge::Tokio;
use sehat_cloud::{
    ChatStore, DEFAULT_ROOM_POLL_INTERVAL, NewGlobalMessage, UserId, UserProfile, subscribe_room,
};
use tokio::sync::oneshot;

use crate::room::{RoomEntry, RoomFeed};

/// Shown in place of a message that could not be posted.
const POST_FAILURE_MESSAGE: &str = "Maaf, terjadi kesalahan. Silakan coba lagi.";

const NAME_ROW_HEIGHT: Pixels = px(16.);
const TIME_ROW_HEIGHT: Pixels = px(14.);
const BUBBLE_MAX_WIDTH: Pixels = px(520.);
const BUBBLE_PADDING_X: Pixels = px(14.);
const BUBBLE_PADDING_Y: Pixels = px(10.);
const ROW_GAP: Pixels = px(12.);
const LIST_PADDING_X: Pixels = px(16.);
const ESTIMATED_LINE_HEIGHT: Pixels = px(18.);
const ESTIMATED_CHAR_WIDTH: f32 = 7.0;

/// Shared room. The subscription is acquired on construction and torn down
/// with the view: dropping the reader task drops the stream, which cancels
/// the polling worker, so no update can land after navigation away.
pub struct GlobalRoomView {
    user: UserProfile,
    store: Arc<dyn ChatStore>,
    feed: RoomFeed,
    input_state: Entity<InputState>,
    item_sizes: Rc<Vec<Size<Pixels>>>,
    scroll_handle: VirtualListScrollHandle,
    pending_scroll_to_bottom: bool,
    is_sending: bool,
    _subscription_worker: Task<Result<(), gpui_tokio_bridge::JoinError>>,
    _subscription_reader: Task<()>,
    post_worker_task: Option<Task<Result<(), gpui_tokio_bridge::JoinError>>>,
    post_reader_task: Option<Task<()>>,
}

impl GlobalRoomView {
    pub fn new(
        user: UserProfile,
        store: Arc<dyn ChatStore>,
        window: &mut Window,
        cx: &mut Context<Self>,
    ) -> Self {
        let input_state =
            cx.new(|cx| InputState::new(window, cx).placeholder("Ketik pesan Anda..."));

        cx.subscribe_in(
            &input_state,
            window,
            |this, _, event: &InputEvent, window, cx| {
                if let InputEvent::PressEnter { secondary } = event
                    && !*secondary
                {
                    this.handle_send(window, cx);
                }
            },
        )
        .detach();

        let handle = subscribe_room(store.clone(), DEFAULT_ROOM_POLL_INTERVAL);
        let subscription_worker = Tokio::spawn(cx, handle.worker);

        let mut stream = handle.stream;
        let subscription_reader = cx.spawn(async move |this, cx| {
            while let Some(snapshot) = stream.recv().await {
                let updated = this.update(cx, |this, cx| {
                    this.feed.apply_snapshot(snapshot.messages);
                    this.pending_scroll_to_bottom = true;
                    this.rebuild_item_sizes();
                    cx.notify();
                });
                if updated.is_err() {
                    break;
                }
            }
        });

        Self {
            user,
            store,
            feed: RoomFeed::default(),
            input_state,
            item_sizes: Rc::new(Vec::new()),
            scroll_handle: VirtualListScrollHandle::new(),
            pending_scroll_to_bottom: false,
            is_sending: false,
            _subscription_worker: subscription_worker,
            _subscription_reader: subscription_reader,
            post_worker_task: None,
            post_reader_task: None,
        }
    }

    fn handle_send(&mut self, window: &mut Window, cx: &mut Context<Self>) {
        if self.is_sending {
            return;
        }

        let content = self.input_state.read(cx).value().trim().to_string();
        if content.is_empty() {
            return;
        }

        self.input_state.update(cx, |state, cx| {
            state.set_value("", window, cx);
        });
        self.is_sending = true;
        cx.notify();

        let store = self.store.clone();
        let input = NewGlobalMessage {
            user_id: self.user.id.clone(),
            user_name: self.user.display_name.clone(),
            user_photo: self.user.photo_url.clone(),
            content,
        };
        let (result_tx, result_rx) = oneshot::channel();

        self.post_worker_task = Some(Tokio::spawn(cx, async move {
            let result = store.post_room_message(input).await;
            let _ = result_tx.send(result);
        }));

        self.post_reader_task = Some(cx.spawn(async move |this, cx| {
            let Ok(result) = result_rx.await else {
                return;
            };
            let _ = this.update(cx, |this, cx| {
                this.is_sending = false;
                if let Err(error) = result {
                    tracing::error!("failed to post room message: {error}");
                    this.feed
                        .push_local_error(POST_FAILURE_MESSAGE, unix_now_ms());
                    this.pending_scroll_to_bottom = true;
                    this.rebuild_item_sizes();
                }
                // A successful post shows up through the next snapshot.
                cx.notify();
            });
        }));
    }

    fn rebuild_item_sizes(&mut self) {
        let own_user_id = self.user.id.clone();
        let sizes = self
            .feed
            .entries()
            .iter()
            .map(|entry| size(px(0.), estimate_room_entry_height(entry, &own_user_id)))
            .collect::<Vec<_>>();
        self.item_sizes = Rc::new(sizes);
    }

    fn apply_pending_scroll(&mut self) {
        if !self.pending_scroll_to_bottom {
            return;
        }

        let max_offset = self.scroll_handle.max_offset().height;
        if max_offset > Pixels::ZERO {
            let current_x = self.scroll_handle.offset().x;
            self.scroll_handle.set_offset(point(current_x, -max_offset));
            self.pending_scroll_to_bottom = false;
        }
    }

    fn render_feed(&mut self, cx: &mut Context<Self>) -> AnyElement {
        if self.feed.is_empty() {
            let theme = cx.theme();
            return v_flex()
                .flex_1()
                .items_center()
                .justify_center()
                .child(
                    div()
                        .text_sm()
                        .text_color(theme.foreground.opacity(0.55))
                        .child("Belum ada pesan. Mulai percakapan!"),
                )
                .into_any_element();
        }

        self.apply_pending_scroll();

        let entries: Vec<RoomEntry> = self.feed.entries().to_vec();
        let item_sizes = self.item_sizes.clone();
        let own_user_id = self.user.id.clone();

        v_virtual_list(
            cx.entity().clone(),
            "room-feed",
            item_sizes,
            move |_this, visible_range, _scroll_handle, cx| {
                let theme = cx.theme();

                visible_range
                    .map(|index| match &entries[index] {
                        RoomEntry::Stored(record) => {
                            let is_own = record.user_id == own_user_id;
                            render_stored_row(
                                &record.user_name,
                                &record.content,
                                record.created_at_unix_ms,
                                is_own,
                                theme,
                            )
                        }
                        RoomEntry::LocalError {
                            content,
                            timestamp_unix_ms,
                            ..
                        } => render_error_row(content, *timestamp_unix_ms, theme, theme.danger),
                    })
                    .collect()
            },
        )
        .w_full()
        .flex_1()
        .track_scroll(&self.scroll_handle)
        .into_any_element()
    }
}

impl Render for GlobalRoomView {
    fn render(&mut self, _window: &mut Window, cx: &mut Context<Self>) -> impl IntoElement {
        let feed = self.render_feed(cx);
        let theme = cx.theme();
        let is_sending = self.is_sending;

        v_flex()
            .size_full()
            .min_h_0()
            .overflow_hidden()
            .bg(theme.background)
            .child(
                v_flex()
                    .px_4()
                    .py_3()
                    .border_b_1()
                    .border_color(theme.border)
                    .child(
                        div()
                            .text_lg()
                            .font_weight(FontWeight::BOLD)
                            .text_color(theme.foreground)
                            .child("Global Chat"),
                    )
                    .child(
                        div()
                            .text_sm()
                            .text_color(theme.foreground.opacity(0.6))
                            .child("Chat dengan semua pengguna Sehat"),
                    ),
            )
            .child(div().flex_1().min_h_0().child(feed))
            .child(
                h_flex()
                    .w_full()
                    .items_center()
                    .gap_2()
                    .p_3()
                    .border_t_1()
                    .border_color(theme.border)
                    .child(
                        div()
                            .flex_1()
                            .child(Input::new(&self.input_state).w_full().disabled(is_sending)),
                    )
                    .child(
                        Button::new("room-send")
                            .small()
                            .primary()
                            .icon(IconName::ArrowUp)
                            .child("Kirim")
                            .on_click(cx.listener(|this, _, window, cx| {
                                this.handle_send(window, cx);
                            })),
                    ),
            )
    }
}

fn render_stored_row(
    user_name: &str,
    content: &str,
    timestamp_unix_ms: i64,
    is_own: bool,
    theme: &gpui_component::Theme,
) -> AnyElement {
    let mut column = v_flex().w_full().px(LIST_PADDING_X).pb(ROW_GAP);
    column = if is_own {
        column.items_end()
    } else {
        column.items_start()
    };

    let bubble = if is_own {
        div()
            .bg(theme.primary)
            .text_color(theme.primary_foreground)
    } else {
        div().bg(theme.muted).text_color(theme.foreground)
    };

    column
        .child(
            div()
                .h(NAME_ROW_HEIGHT)
                .text_xs()
                .text_color(theme.foreground.opacity(0.55))
                .child(if user_name.is_empty() {
                    "Anonim".to_string()
                } else {
                    user_name.to_string()
                }),
        )
        .child(
            bubble
                .max_w(BUBBLE_MAX_WIDTH)
                .px(BUBBLE_PADDING_X)
                .py(BUBBLE_PADDING_Y)
                .rounded_lg()
                .text_sm()
                .child(content.to_string()),
        )
        .child(
            div()
                .h(TIME_ROW_HEIGHT)
                .text_xs()
                .text_color(theme.foreground.opacity(0.4))
                .child(format_clock_time(timestamp_unix_ms)),
        )
        .into_any_element()
}

fn render_error_row(
    content: &str,
    timestamp_unix_ms: i64,
    theme: &gpui_component::Theme,
    danger: Hsla,
) -> AnyElement {
    v_flex()
        .w_full()
        .px(LIST_PADDING_X)
        .pb(ROW_GAP)
        .items_start()
        .child(
            div()
                .max_w(BUBBLE_MAX_WIDTH)
                .px(BUBBLE_PADDING_X)
                .py(BUBBLE_PADDING_Y)
                .rounded_lg()
                .bg(danger.opacity(0.1))
                .text_sm()
                .text_color(danger)
                .child(content.to_string()),
        )
        .child(
            div()
                .h(TIME_ROW_HEIGHT)
                .text_xs()
                .text_color(theme.foreground.opacity(0.4))
                .child(format_clock_time(timestamp_unix_ms)),
        )
        .into_any_element()
}

fn estimate_room_entry_height(entry: &RoomEntry, _own_user_id: &UserId) -> Pixels {
    let content = match entry {
        RoomEntry::Stored(record) => record.content.as_str(),
        RoomEntry::LocalError { content, .. } => content.as_str(),
    };

    let text_width = max_pixels(px(1.), BUBBLE_MAX_WIDTH - BUBBLE_PADDING_X * 2);
    let text_height = estimate_text_height(content, text_width);
    let name_row = match entry {
        RoomEntry::Stored(_) => NAME_ROW_HEIGHT,
        RoomEntry::LocalError { .. } => px(0.),
    };

    name_row + text_height + BUBBLE_PADDING_Y * 2 + TIME_ROW_HEIGHT + ROW_GAP
}

fn estimate_text_height(content: &str, width: Pixels) -> Pixels {
    if content.is_empty() {
        return ESTIMATED_LINE_HEIGHT;
    }

    let chars_per_line = (f32::from(width) / ESTIMATED_CHAR_WIDTH).floor().max(1.0) as usize;

    let mut line_count = 0usize;
    for line in content.lines() {
        let char_count = line.chars().count().max(1);
        line_count += char_count.div_ceil(chars_per_line);
    }

    ESTIMATED_LINE_HEIGHT * line_count.max(1)
}

fn max_pixels(a: Pixels, b: Pixels) -> Pixels {
    if f32::from(a) >= f32::from(b) { a } else { b }
}

/// Wall-clock hh:mm (UTC) for the per-message time row.
fn format_clock_time(unix_ms: i64) -> String {
    let seconds_of_day = (unix_ms / 1000).rem_euclid(86_400);
    format!(
        "{:02}:{:02}",
        seconds_of_day / 3600,
        (seconds_of_day % 3600) / 60
    )
}

fn unix_now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_millis() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_time_formats_as_utc_hours_and_minutes() {
        // 1970-01-01 00:00:00 plus 9 hours 5 minutes.
        let unix_ms = (9 * 3600 + 5 * 60) * 1000;
        assert_eq!(format_clock_time(unix_ms), "09:05");
        assert_eq!(format_clock_time(0), "00:00");
    }
}
