use std::sync::Arc;

use gpui::*;
use gpui_component::notification::NotificationList;
use gpui_component::{Root, ThemeRegistry};
use sehat_cloud::{ChatStore, IdentityProvider, RestDocumentStore, RestIdentityProvider};
use sehat_llm::create_generator;

use sehat::app::{AppShell, Quit, default_themes_path};
use sehat::auth::AuthState;
use sehat::settings::SettingsStore;

/// Application entry point.
///
/// Bootstraps the GPUI application with:
/// 1. Asset loading via gpui-component-assets
/// 2. gpui-component initialization (required for Root, themes, notifications)
/// 3. Theme loading/watching from ./themes directory (non-fatal if missing)
/// 4. Collaborator clients built from persisted settings
/// 5. Window creation with Root wrapper for gpui-component composition
fn main() {
    // Initialize tracing for development debugging
    tracing_subscriber::fmt::init();

    // Create application with bundled assets
    let app = Application::new().with_assets(gpui_component_assets::Assets);

    app.run(|cx| {
        gpui_tokio_bridge::init(cx);

        // Initialize gpui-component - REQUIRED before any Root usage
        gpui_component::init(cx);

        // Attempt to load and watch themes from ./themes directory.
        // Non-fatal: without it the app falls back to built-in themes.
        if let Err(err) = ThemeRegistry::watch_dir(default_themes_path(), cx, |_cx| {
            let settings_store = SettingsStore::load();
            settings_store.settings().apply_theme(None, _cx);
            tracing::info!("Theme directory watch initialized");
        }) {
            tracing::warn!(
                "Failed to watch themes directory: {}. Using default themes.",
                err
            );
            let settings_store = SettingsStore::load();
            settings_store.settings().apply_theme(None, cx);
        }

        cx.on_action(|_: &Quit, cx| {
            cx.quit();
        });

        cx.bind_keys([KeyBinding::new("cmd-q", Quit, None)]);

        // Collaborator clients come from persisted settings; credentials are
        // never compiled in.
        let settings_store = SettingsStore::load();
        let settings = settings_store.settings();

        let store: Arc<dyn ChatStore> = Arc::new(RestDocumentStore::new(settings.store_config()));
        let identity: Arc<dyn IdentityProvider> =
            Arc::new(RestIdentityProvider::new(settings.identity_config()));
        let generator = settings
            .generator_config()
            .and_then(|config| match create_generator(config) {
                Ok(generator) => Some(generator),
                Err(error) => {
                    tracing::error!("failed to initialize generation provider: {error}");
                    None
                }
            });
        if generator.is_none() {
            tracing::warn!("no generation key configured; consultations will degrade");
        }

        // Spawn async window creation to ensure all initialization is complete
        cx.spawn(async move |cx| {
            cx.update(|cx| {
                let options = WindowOptions {
                    window_bounds: Some(WindowBounds::Windowed(Bounds::centered(
                        None,
                        size(px(1200.), px(800.)),
                        cx,
                    ))),
                    titlebar: Some(TitlebarOptions {
                        appears_transparent: true,
                        traffic_light_position: Some(point(px(9.), px(9.))),
                        ..Default::default()
                    }),
                    // Match Zed-style client decorations on Linux/FreeBSD so the app
                    // draws its own title area instead of a system titlebar.
                    #[cfg(any(target_os = "linux", target_os = "freebsd"))]
                    window_decorations: Some(WindowDecorations::Client),
                    #[cfg(not(any(target_os = "linux", target_os = "freebsd")))]
                    window_decorations: None,
                    ..Default::default()
                };

                cx.open_window(options, move |window, cx| {
                    let notification_list = cx.new(|cx| NotificationList::new(window, cx));
                    let auth = cx.new(|cx| AuthState::new(identity.clone(), cx));

                    let shell = cx.new(|cx| {
                        AppShell::new(
                            auth,
                            store.clone(),
                            generator.clone(),
                            notification_list,
                            window,
                            cx,
                        )
                    });

                    // Root is REQUIRED by gpui-component for notifications/dialogs
                    cx.new(|cx| Root::new(shell, window, cx))
                })
                .expect("failed to open main window");

                cx.activate(true);
            })
        })
        .detach();
    });
}
