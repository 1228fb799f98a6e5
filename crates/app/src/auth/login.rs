use gpui::prelude::FluentBuilder;
use gpui::*;
use gpui_component::{
    ActiveTheme,
    button::{Button, ButtonVariants},
    v_flex,
};

use crate::auth::AuthState;

/// Sign-in screen. Shown for direct navigation and whenever a gated screen
/// is visited without a signed-in user.
pub struct LoginView {
    auth: Entity<AuthState>,
}

impl LoginView {
    pub fn new(auth: Entity<AuthState>, cx: &mut Context<Self>) -> Self {
        cx.observe(&auth, |_, _, cx| cx.notify()).detach();
        Self { auth }
    }

    fn handle_sign_in(&mut self, cx: &mut Context<Self>) {
        self.auth.update(cx, |auth, cx| auth.sign_in(cx));
    }
}

impl Render for LoginView {
    fn render(&mut self, _window: &mut Window, cx: &mut Context<Self>) -> impl IntoElement {
        let theme = cx.theme();
        let auth = self.auth.read(cx);
        let signing_in = auth.signing_in();
        let error = auth.error();

        let button_label = if signing_in {
            "Sedang Masuk..."
        } else {
            "Lanjutkan dengan Google"
        };

        v_flex()
            .size_full()
            .items_center()
            .justify_center()
            .bg(theme.background)
            .child(
                v_flex()
                    .w(px(420.))
                    .gap_4()
                    .p_8()
                    .rounded_lg()
                    .border_1()
                    .border_color(theme.border)
                    .bg(theme.background)
                    .child(
                        v_flex()
                            .items_center()
                            .gap_2()
                            .child(
                                div()
                                    .text_lg()
                                    .font_weight(FontWeight::BOLD)
                                    .text_color(theme.foreground)
                                    .child("Selamat Datang di Sehat"),
                            )
                            .child(
                                div()
                                    .text_sm()
                                    .text_color(theme.foreground.opacity(0.6))
                                    .child("Masuk untuk mengakses konsultasi kesehatan personal"),
                            ),
                    )
                    .when_some(error, |el, message| {
                        el.child(
                            div()
                                .w_full()
                                .p_3()
                                .rounded_md()
                                .bg(theme.danger.opacity(0.1))
                                .text_sm()
                                .text_color(theme.danger)
                                .child(message),
                        )
                    })
                    .child(
                        div().w_full().flex().justify_center().child(
                            Button::new("sign-in")
                                .primary()
                                .child(button_label)
                                .on_click(cx.listener(|this, _, _window, cx| {
                                    this.handle_sign_in(cx);
                                })),
                        ),
                    )
                    .child(
                        div()
                            .text_xs()
                            .text_color(theme.foreground.opacity(0.6))
                            .child("Dengan melanjutkan, Anda menyetujui ketentuan layanan kami."),
                    ),
            )
    }
}
