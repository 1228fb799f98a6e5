use std::collections::HashSet;

use gpui::*;
use gpui_component::{
    ActiveTheme, Sizable,
    button::{Button, ButtonVariants},
    h_flex,
    input::{Input, InputEvent, InputState},
    v_flex,
};

use crate::articles::{Article, Category, CategoryFilter, filter_catalog};

/// Article catalog screen: text search, category pills, and a save toggle
/// held purely in view state.
pub struct ArticlesView {
    search_input: Entity<InputState>,
    search_query: String,
    selected_category: CategoryFilter,
    saved: HashSet<u32>,
}

impl ArticlesView {
    pub fn new(window: &mut Window, cx: &mut Context<Self>) -> Self {
        let search_input =
            cx.new(|cx| InputState::new(window, cx).placeholder("Cari artikel kesehatan..."));

        cx.subscribe_in(
            &search_input,
            window,
            |this, _, _event: &InputEvent, _window, cx| {
                this.search_query = this.search_input.read(cx).value().to_string();
                cx.notify();
            },
        )
        .detach();

        Self {
            search_input,
            search_query: String::new(),
            selected_category: CategoryFilter::All,
            saved: HashSet::new(),
        }
    }

    fn select_category(&mut self, category: CategoryFilter, cx: &mut Context<Self>) {
        self.selected_category = category;
        cx.notify();
    }

    fn toggle_saved(&mut self, article_id: u32, cx: &mut Context<Self>) {
        if !self.saved.insert(article_id) {
            self.saved.remove(&article_id);
        }
        cx.notify();
    }

    fn render_category_pills(&self, cx: &mut Context<Self>) -> impl IntoElement {
        let filters = std::iter::once(CategoryFilter::All)
            .chain(Category::ALL.into_iter().map(CategoryFilter::Only))
            .collect::<Vec<_>>();
        let selected = self.selected_category;

        h_flex()
            .flex_wrap()
            .justify_center()
            .gap_2()
            .children(filters.into_iter().enumerate().map(|(index, filter)| {
                let button = Button::new(("category", index))
                    .small()
                    .child(filter.label())
                    .on_click(cx.listener(move |this, _, _window, cx| {
                        this.select_category(filter, cx);
                    }));

                if filter == selected {
                    button.primary()
                } else {
                    button.ghost()
                }
            }))
    }

    fn render_card(&self, article: &'static Article, cx: &mut Context<Self>) -> impl IntoElement {
        let theme = cx.theme();
        let article_id = article.id;
        let is_saved = self.saved.contains(&article_id);

        v_flex()
            .w_full()
            .gap_1()
            .p_4()
            .rounded_lg()
            .border_1()
            .border_color(theme.border)
            .bg(theme.background)
            .child(
                h_flex()
                    .w_full()
                    .items_center()
                    .justify_between()
                    .gap_2()
                    .child(
                        div()
                            .min_w_0()
                            .truncate()
                            .text_sm()
                            .font_weight(FontWeight::MEDIUM)
                            .text_color(theme.foreground)
                            .child(article.title),
                    )
                    .child(
                        Button::new(("save", article_id as usize))
                            .small()
                            .ghost()
                            .child(if is_saved { "Tersimpan" } else { "Simpan" })
                            .on_click(cx.listener(move |this, _, _window, cx| {
                                this.toggle_saved(article_id, cx);
                            })),
                    ),
            )
            .child(
                div()
                    .w_full()
                    .min_w_0()
                    .truncate()
                    .text_sm()
                    .text_color(theme.foreground.opacity(0.6))
                    .child(article.excerpt),
            )
            .child(
                div()
                    .text_xs()
                    .text_color(theme.foreground.opacity(0.5))
                    .child(format!(
                        "{} • {} • {}",
                        article.category.label(),
                        article.date,
                        article.read_time
                    )),
            )
    }
}

impl Render for ArticlesView {
    fn render(&mut self, _window: &mut Window, cx: &mut Context<Self>) -> impl IntoElement {
        let filtered = filter_catalog(&self.search_query, self.selected_category);
        let cards = filtered
            .into_iter()
            .map(|article| self.render_card(article, cx).into_any_element())
            .collect::<Vec<_>>();
        let pills = self.render_category_pills(cx).into_any_element();
        let theme = cx.theme();

        let body: AnyElement = if cards.is_empty() {
            div()
                .w_full()
                .py_8()
                .flex()
                .justify_center()
                .text_sm()
                .text_color(theme.foreground.opacity(0.55))
                .child("Tidak ada artikel yang cocok")
                .into_any_element()
        } else {
            v_flex().w_full().gap_3().children(cards).into_any_element()
        };

        v_flex()
            .size_full()
            .min_h_0()
            .overflow_hidden()
            .bg(theme.background)
            .child(
                v_flex()
                    .w_full()
                    .items_center()
                    .gap_3()
                    .px_4()
                    .py_6()
                    .border_b_1()
                    .border_color(theme.border)
                    .child(
                        div()
                            .text_xl()
                            .font_weight(FontWeight::BOLD)
                            .text_color(theme.foreground)
                            .child("Artikel Kesehatan Terpercaya"),
                    )
                    .child(
                        div()
                            .text_sm()
                            .text_color(theme.foreground.opacity(0.6))
                            .child("Temukan informasi kesehatan terkini dari sumber terpercaya"),
                    )
                    .child(
                        div()
                            .w(px(480.))
                            .child(Input::new(&self.search_input).w_full().small()),
                    )
                    .child(pills),
            )
            .child(
                v_flex()
                    .flex_1()
                    .min_h_0()
                    .w_full()
                    .items_center()
                    .py_4()
                    .child(div().w(px(640.)).child(body)),
            )
    }
}
