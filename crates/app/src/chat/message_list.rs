use std::rc::Rc;

use gpui::*;
use gpui_component::{
    ActiveTheme, Sizable, VirtualListScrollHandle,
    button::{Button, ButtonVariants},
    h_flex, v_flex, v_virtual_list,
};
use sehat_cloud::MessageAuthor;

use crate::chat::events::Submit;
use crate::chat::message::{EntryStatus, TranscriptEntry};

/// Quick prompts shown on the empty-transcript welcome screen. Clicking one
/// submits it as if typed.
pub const QUICK_PROMPTS: &[&str] = &[
    "Apa itu diabetes?",
    "Gejala demam berdarah",
    "Tips hidup sehat",
    "Cara menjaga kesehatan mental",
    "Manfaat olahraga teratur",
];

pub const CONSULTATION_DISCLAIMER: &str =
    "Konsultasi ini hanya untuk informasi umum, bukan pengganti konsultasi dokter";

const CONTENT_WIDTH: Pixels = px(640.);
const LIST_PADDING_X: Pixels = px(16.);
const BUBBLE_MAX_WIDTH: Pixels = px(540.);
const BUBBLE_PADDING_X: Pixels = px(14.);
const BUBBLE_PADDING_Y: Pixels = px(10.);
const AUTHOR_LABEL_HEIGHT: Pixels = px(16.);
const ROW_GAP: Pixels = px(12.);
const FAILED_ROW_HEIGHT: Pixels = px(18.);
const ESTIMATED_LINE_HEIGHT: Pixels = px(18.);
const ESTIMATED_CHAR_WIDTH: f32 = 7.0;

/// Transcript list for the consultation screen. Rendering follows the tail
/// whenever new entries arrive, matching the submit-then-scroll flow.
pub struct TranscriptList {
    entries: Vec<TranscriptEntry>,
    item_sizes: Rc<Vec<Size<Pixels>>>,
    scroll_handle: VirtualListScrollHandle,
    pending_scroll_to_bottom: bool,
    is_busy: bool,
}

impl EventEmitter<Submit> for TranscriptList {}

impl TranscriptList {
    pub fn new(_cx: &mut Context<Self>) -> Self {
        Self {
            entries: Vec::new(),
            item_sizes: Rc::new(Vec::new()),
            scroll_handle: VirtualListScrollHandle::new(),
            pending_scroll_to_bottom: false,
            is_busy: false,
        }
    }

    pub fn set_entries(
        &mut self,
        entries: Vec<TranscriptEntry>,
        is_busy: bool,
        cx: &mut Context<Self>,
    ) {
        if entries.len() > self.entries.len() {
            self.pending_scroll_to_bottom = true;
        }

        self.entries = entries;
        self.is_busy = is_busy;
        self.rebuild_item_sizes();
        cx.notify();
    }

    fn rebuild_item_sizes(&mut self) {
        let sizes = self
            .entries
            .iter()
            .map(|entry| size(px(0.), estimate_entry_height(entry, CONTENT_WIDTH)))
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

    fn render_welcome(&self, cx: &mut Context<Self>) -> AnyElement {
        let theme = cx.theme();

        v_flex()
            .flex_1()
            .items_center()
            .justify_center()
            .gap_3()
            .px_8()
            .child(
                div()
                    .text_xl()
                    .font_weight(FontWeight::BOLD)
                    .text_color(theme.foreground)
                    .child("Selamat datang di Konsultasi Kesehatan"),
            )
            .child(
                div()
                    .text_sm()
                    .text_color(theme.foreground.opacity(0.6))
                    .child("Tanyakan apa saja seputar kesehatan kepada asisten AI kami"),
            )
            .child(
                div()
                    .pt_4()
                    .text_sm()
                    .font_weight(FontWeight::MEDIUM)
                    .text_color(theme.foreground)
                    .child("Pertanyaan populer:"),
            )
            .child(
                h_flex()
                    .flex_wrap()
                    .justify_center()
                    .gap_2()
                    .children(QUICK_PROMPTS.iter().enumerate().map(|(index, prompt)| {
                        Button::new(("quick-prompt", index))
                            .small()
                            .ghost()
                            .child(*prompt)
                            .on_click(cx.listener(move |_, _, _window, cx| {
                                cx.emit(Submit::new(*prompt));
                            }))
                    })),
            )
            .child(
                div()
                    .pt_4()
                    .text_xs()
                    .text_color(theme.foreground.opacity(0.55))
                    .child(CONSULTATION_DISCLAIMER),
            )
            .into_any_element()
    }

    fn render_entries(&mut self, cx: &mut Context<Self>) -> AnyElement {
        let theme_danger = cx.theme().danger;
        let entries = self.entries.clone();
        let item_sizes = self.item_sizes.clone();

        self.apply_pending_scroll();

        v_virtual_list(
            cx.entity().clone(),
            "transcript-list",
            item_sizes,
            move |_this, visible_range, _scroll_handle, cx| {
                let theme = cx.theme();

                visible_range
                    .map(|index| {
                        let entry = &entries[index];
                        match entry.author {
                            MessageAuthor::User => render_user_row(entry, theme, theme_danger),
                            MessageAuthor::Assistant => render_assistant_row(entry, theme),
                        }
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

impl Render for TranscriptList {
    fn render(&mut self, _window: &mut Window, cx: &mut Context<Self>) -> impl IntoElement {
        let show_welcome = self.entries.is_empty() && !self.is_busy;
        let body = if show_welcome {
            self.render_welcome(cx)
        } else {
            self.render_entries(cx)
        };

        let theme = cx.theme();
        let busy_row = self.is_busy.then(|| {
            h_flex().px(LIST_PADDING_X).py_2().child(
                div()
                    .text_sm()
                    .text_color(theme.foreground.opacity(0.55))
                    .child("Asisten sedang mengetik..."),
            )
        });

        v_flex()
            .size_full()
            .min_h_0()
            .bg(theme.background)
            .child(body)
            .children(busy_row)
    }
}

fn render_user_row(
    entry: &TranscriptEntry,
    theme: &gpui_component::Theme,
    danger: Hsla,
) -> AnyElement {
    let mut row = v_flex()
        .w_full()
        .px(LIST_PADDING_X)
        .pb(ROW_GAP)
        .items_end()
        .child(
            div()
                .max_w(BUBBLE_MAX_WIDTH)
                .px(BUBBLE_PADDING_X)
                .py(BUBBLE_PADDING_Y)
                .rounded_lg()
                .bg(theme.primary)
                .text_sm()
                .text_color(theme.primary_foreground)
                .child(entry.content.clone()),
        );

    if let EntryStatus::Failed(reason) = &entry.status {
        row = row.child(
            div()
                .pt_1()
                .text_xs()
                .text_color(danger)
                .child(format!("Gagal terkirim: {reason}")),
        );
    }

    row.into_any_element()
}

fn render_assistant_row(entry: &TranscriptEntry, theme: &gpui_component::Theme) -> AnyElement {
    v_flex()
        .w_full()
        .px(LIST_PADDING_X)
        .pb(ROW_GAP)
        .items_start()
        .child(
            div()
                .h(AUTHOR_LABEL_HEIGHT)
                .text_xs()
                .text_color(theme.foreground.opacity(0.55))
                .child("Asisten Sehat"),
        )
        .child(
            div()
                .max_w(BUBBLE_MAX_WIDTH)
                .px(BUBBLE_PADDING_X)
                .py(BUBBLE_PADDING_Y)
                .rounded_lg()
                .bg(theme.muted)
                .text_sm()
                .text_color(theme.foreground)
                .child(entry.content.clone()),
        )
        .into_any_element()
}

fn estimate_entry_height(entry: &TranscriptEntry, content_width: Pixels) -> Pixels {
    let bubble_width = min_pixels(content_width, BUBBLE_MAX_WIDTH);
    let text_width = max_pixels(px(1.), bubble_width - BUBBLE_PADDING_X * 2);
    let text_height = estimate_text_height(&entry.content, text_width);

    let mut total = text_height + BUBBLE_PADDING_Y * 2 + ROW_GAP;
    if matches!(entry.author, MessageAuthor::Assistant) {
        total = total + AUTHOR_LABEL_HEIGHT;
    }
    if matches!(entry.status, EntryStatus::Failed(_)) {
        total = total + FAILED_ROW_HEIGHT;
    }

    total
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

fn min_pixels(a: Pixels, b: Pixels) -> Pixels {
    if f32::from(a) <= f32::from(b) { a } else { b }
}

#[cfg(test)]
mod tests {
    use crate::chat::message::{CorrelationId, EntryKey};

    use super::*;

    #[test]
    fn taller_entries_get_taller_estimates() {
        let short = TranscriptEntry::pending(
            CorrelationId::generate(),
            MessageAuthor::User,
            "halo",
            1,
        );
        let long = TranscriptEntry::pending(
            CorrelationId::generate(),
            MessageAuthor::User,
            "halo ".repeat(120),
            2,
        );

        assert!(
            estimate_entry_height(&long, CONTENT_WIDTH)
                > estimate_entry_height(&short, CONTENT_WIDTH)
        );
    }

    #[test]
    fn assistant_rows_reserve_space_for_the_author_label() {
        let correlation_id = CorrelationId::generate();
        let user = TranscriptEntry::pending(correlation_id, MessageAuthor::User, "halo", 1);
        let assistant = TranscriptEntry {
            key: EntryKey::Local(CorrelationId::generate()),
            author: MessageAuthor::Assistant,
            content: "halo".to_string(),
            timestamp_unix_ms: 2,
            status: EntryStatus::Persisted,
        };

        let delta = estimate_entry_height(&assistant, CONTENT_WIDTH)
            - estimate_entry_height(&user, CONTENT_WIDTH);
        assert_eq!(delta, AUTHOR_LABEL_HEIGHT);
    }
}
