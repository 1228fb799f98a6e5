use std::path::PathBuf;
use std::sync::Arc;

use gpui::prelude::FluentBuilder;
use gpui::*;
use gpui_component::notification::NotificationList;
use gpui_component::{
    ActiveTheme, Sizable,
    button::{Button, ButtonVariants},
    h_flex, v_flex,
};
use sehat_cloud::ChatStore;
use sehat_llm::Generator;

use crate::articles::ArticlesView;
use crate::auth::{AuthChanged, AuthState, LoginView};
use crate::chat::ConsultationView;
use crate::chat::events::SignOutRequested;
use crate::home::LandingView;
use crate::room::GlobalRoomView;

/// Returns the default themes directory path.
/// This is a pure function to allow deterministic testing of path resolution.
pub fn default_themes_path() -> PathBuf {
    PathBuf::from("./themes")
}

const NAVBAR_HEIGHT: Pixels = px(52.);

gpui::actions!(sehat, [Quit]);

/// Top-level navigation target, mirroring the source's route surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Screen {
    Landing,
    Login,
    Consultation,
    GlobalRoom,
    Articles,
}

impl Screen {
    pub fn nav_label(self) -> &'static str {
        match self {
            Screen::Landing => "Beranda",
            Screen::Login => "Masuk",
            Screen::Consultation => "Konsultasi",
            Screen::GlobalRoom => "Global Chat",
            Screen::Articles => "Artikel",
        }
    }
}

/// Emitted by child screens that want the shell to navigate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavigateRequested {
    pub screen: Screen,
}

/// Resolves a navigation request against the auth state: the consultation
/// screen is gated behind sign-in, the room falls back to the landing page,
/// and a signed-in user never sees the login screen.
pub fn resolve_screen(requested: Screen, signed_in: bool) -> Screen {
    match requested {
        Screen::Consultation if !signed_in => Screen::Login,
        Screen::GlobalRoom if !signed_in => Screen::Landing,
        Screen::Login if signed_in => Screen::Landing,
        other => other,
    }
}

/// Main application shell: navbar, screen routing, and auth gating.
pub struct AppShell {
    notification_list: Entity<NotificationList>,
    auth: Entity<AuthState>,
    store: Arc<dyn ChatStore>,
    generator: Option<Arc<dyn Generator>>,
    screen: Screen,
    landing: Entity<LandingView>,
    login: Entity<LoginView>,
    articles: Entity<ArticlesView>,
    // Gated screens are created on entry and dropped on exit, so their
    // collaborator resources (the room subscription in particular) never
    // outlive the visible view.
    consultation: Option<Entity<ConsultationView>>,
    room: Option<Entity<GlobalRoomView>>,
}

impl AppShell {
    pub fn new(
        auth: Entity<AuthState>,
        store: Arc<dyn ChatStore>,
        generator: Option<Arc<dyn Generator>>,
        notification_list: Entity<NotificationList>,
        window: &mut Window,
        cx: &mut Context<Self>,
    ) -> Self {
        let landing = cx.new(LandingView::new);
        let login = cx.new(|cx| LoginView::new(auth.clone(), cx));
        let articles = cx.new(|cx| ArticlesView::new(window, cx));

        cx.subscribe_in(
            &landing,
            window,
            |this, _, event: &NavigateRequested, window, cx| {
                this.navigate(event.screen, window, cx);
            },
        )
        .detach();

        cx.subscribe_in(&auth, window, |this, _, _event: &AuthChanged, window, cx| {
            this.handle_auth_changed(window, cx);
        })
        .detach();

        Self {
            notification_list,
            auth,
            store,
            generator,
            screen: Screen::Landing,
            landing,
            login,
            articles,
            consultation: None,
            room: None,
        }
    }

    pub fn navigate(&mut self, requested: Screen, window: &mut Window, cx: &mut Context<Self>) {
        let signed_in = self.auth.read(cx).is_signed_in();
        let resolved = resolve_screen(requested, signed_in);

        if resolved != Screen::GlobalRoom {
            // Dropping the room view tears down its subscription.
            self.room = None;
        }

        match resolved {
            Screen::Consultation => self.ensure_consultation(window, cx),
            Screen::GlobalRoom => self.ensure_room(window, cx),
            Screen::Landing | Screen::Login | Screen::Articles => {}
        }

        self.screen = resolved;
        cx.notify();
    }

    fn ensure_consultation(&mut self, window: &mut Window, cx: &mut Context<Self>) {
        if self.consultation.is_some() {
            return;
        }

        let Some(user) = self.auth.read(cx).user().cloned() else {
            return;
        };

        let store = self.store.clone();
        let generator = self.generator.clone();
        let consultation =
            cx.new(|cx| ConsultationView::new(user, store, generator, window, cx));

        cx.subscribe_in(
            &consultation,
            window,
            |this, _, _event: &SignOutRequested, window, cx| {
                this.auth.update(cx, |auth, cx| auth.sign_out(cx));
                this.navigate(Screen::Landing, window, cx);
            },
        )
        .detach();

        self.consultation = Some(consultation);
    }

    fn ensure_room(&mut self, window: &mut Window, cx: &mut Context<Self>) {
        if self.room.is_some() {
            return;
        }

        let Some(user) = self.auth.read(cx).user().cloned() else {
            return;
        };

        let store = self.store.clone();
        self.room = Some(cx.new(|cx| GlobalRoomView::new(user, store, window, cx)));
    }

    fn handle_auth_changed(&mut self, window: &mut Window, cx: &mut Context<Self>) {
        let signed_in = self.auth.read(cx).is_signed_in();

        if !signed_in {
            self.consultation = None;
            self.room = None;
        }

        if signed_in && self.screen == Screen::Login {
            // Mirror the source: a successful login lands on the home page.
            self.navigate(Screen::Landing, window, cx);
            return;
        }

        // Re-resolve the current screen against the new auth state.
        self.navigate(self.screen, window, cx);
    }

    fn handle_sign_out_click(&mut self, window: &mut Window, cx: &mut Context<Self>) {
        self.auth.update(cx, |auth, cx| auth.sign_out(cx));
        self.navigate(Screen::Landing, window, cx);
    }

    fn render_navbar(&self, cx: &mut Context<Self>) -> impl IntoElement {
        let theme = cx.theme();
        let signed_in = self.auth.read(cx).is_signed_in();
        let user_name = self
            .auth
            .read(cx)
            .user()
            .map(|user| user.display_name.clone());
        let current = self.screen;

        let nav_targets = [
            Screen::Landing,
            Screen::Consultation,
            Screen::GlobalRoom,
            Screen::Articles,
        ];

        h_flex()
            .w_full()
            .h(NAVBAR_HEIGHT)
            .flex_shrink_0()
            .items_center()
            .justify_between()
            .px_4()
            .border_b_1()
            .border_color(theme.border)
            .bg(theme.background)
            .child(
                h_flex()
                    .items_center()
                    .gap_3()
                    .child(
                        div()
                            .text_lg()
                            .font_weight(FontWeight::BOLD)
                            .text_color(theme.primary)
                            .child("Sehat"),
                    )
                    .child(h_flex().items_center().gap_1().children(
                        nav_targets.into_iter().enumerate().map(|(index, target)| {
                            let button = Button::new(("nav", index))
                                .small()
                                .child(target.nav_label())
                                .on_click(cx.listener(move |this, _, window, cx| {
                                    this.navigate(target, window, cx);
                                }));

                            if target == current {
                                button.primary()
                            } else {
                                button.ghost()
                            }
                        }),
                    )),
            )
            .child(
                h_flex()
                    .items_center()
                    .gap_2()
                    .when_some(user_name, |el, name| {
                        el.child(
                            div()
                                .text_sm()
                                .text_color(theme.foreground.opacity(0.6))
                                .child(name),
                        )
                    })
                    .child(if signed_in {
                        Button::new("navbar-sign-out")
                            .small()
                            .ghost()
                            .child("Keluar")
                            .on_click(cx.listener(|this, _, window, cx| {
                                this.handle_sign_out_click(window, cx);
                            }))
                    } else {
                        Button::new("navbar-sign-in")
                            .small()
                            .primary()
                            .child("Masuk")
                            .on_click(cx.listener(|this, _, window, cx| {
                                this.navigate(Screen::Login, window, cx);
                            }))
                    }),
            )
    }

    fn render_screen(&self, cx: &mut Context<Self>) -> AnyElement {
        match self.screen {
            Screen::Landing => self.landing.clone().into_any_element(),
            Screen::Login => self.login.clone().into_any_element(),
            Screen::Articles => self.articles.clone().into_any_element(),
            Screen::Consultation => match &self.consultation {
                Some(consultation) => consultation.clone().into_any_element(),
                None => self.login.clone().into_any_element(),
            },
            Screen::GlobalRoom => match &self.room {
                Some(room) => room.clone().into_any_element(),
                None => self.landing.clone().into_any_element(),
            },
        }
    }
}

impl Render for AppShell {
    fn render(&mut self, _window: &mut Window, cx: &mut Context<Self>) -> impl IntoElement {
        let show_navbar = self.screen != Screen::Login;
        let navbar = show_navbar.then(|| self.render_navbar(cx).into_any_element());
        let screen = self.render_screen(cx);
        let theme = cx.theme();

        v_flex()
            .size_full()
            .min_h_0()
            .overflow_hidden()
            .bg(theme.background)
            .children(navbar)
            .child(div().flex_1().min_h_0().overflow_hidden().child(screen))
            .child(self.notification_list.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn consultation_requires_sign_in() {
        assert_eq!(
            resolve_screen(Screen::Consultation, false),
            Screen::Login
        );
        assert_eq!(
            resolve_screen(Screen::Consultation, true),
            Screen::Consultation
        );
    }

    #[test]
    fn the_room_falls_back_to_landing_when_signed_out() {
        assert_eq!(resolve_screen(Screen::GlobalRoom, false), Screen::Landing);
        assert_eq!(
            resolve_screen(Screen::GlobalRoom, true),
            Screen::GlobalRoom
        );
    }

    #[test]
    fn signed_in_users_skip_the_login_screen() {
        assert_eq!(resolve_screen(Screen::Login, true), Screen::Landing);
        assert_eq!(resolve_screen(Screen::Login, false), Screen::Login);
    }

    #[test]
    fn public_screens_resolve_to_themselves() {
        for signed_in in [false, true] {
            assert_eq!(
                resolve_screen(Screen::Landing, signed_in),
                Screen::Landing
            );
            assert_eq!(
                resolve_screen(Screen::Articles, signed_in),
                Screen::Articles
            );
        }
    }
}
