use gpui::*;
use gpui_component::{
    ActiveTheme,
    button::{Button, ButtonVariants},
    h_flex, v_flex,
};

use crate::app::{NavigateRequested, Screen};

/// Landing screen with the two entry points into the app.
pub struct LandingView;

impl EventEmitter<NavigateRequested> for LandingView {}

impl LandingView {
    pub fn new(_cx: &mut Context<Self>) -> Self {
        Self
    }
}

impl Render for LandingView {
    fn render(&mut self, _window: &mut Window, cx: &mut Context<Self>) -> impl IntoElement {
        let theme = cx.theme();

        v_flex()
            .size_full()
            .items_center()
            .justify_center()
            .gap_3()
            .bg(theme.background)
            .child(
                div()
                    .text_2xl()
                    .font_weight(FontWeight::BOLD)
                    .text_color(theme.foreground)
                    .child("Sehat"),
            )
            .child(
                div()
                    .text_sm()
                    .text_color(theme.foreground.opacity(0.6))
                    .child("Konsultasi kesehatan dengan asisten AI, kapan saja."),
            )
            .child(
                h_flex()
                    .pt_4()
                    .gap_2()
                    .child(
                        Button::new("start-consultation")
                            .primary()
                            .child("Mulai Konsultasi")
                            .on_click(cx.listener(|_, _, _window, cx| {
                                cx.emit(NavigateRequested {
                                    screen: Screen::Consultation,
                                });
                            })),
                    )
                    .child(
                        Button::new("browse-articles")
                            .ghost()
                            .child("Baca Artikel")
                            .on_click(cx.listener(|_, _, _window, cx| {
                                cx.emit(NavigateRequested {
                                    screen: Screen::Articles,
                                });
                            })),
                    ),
            )
            .child(
                div()
                    .pt_6()
                    .text_xs()
                    .text_color(theme.foreground.opacity(0.5))
                    .child("Informasi umum, bukan pengganti konsultasi dokter."),
            )
    }
}
