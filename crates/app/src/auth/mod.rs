//! Auth state shared across the shell.
//!
//! The identity provider's watch feed is mirrored into an entity so views
//! can observe the current-user-or-none value; sign-in runs on the tokio
//! side with the result read back on the UI thread.

pub mod login;

pub use login::LoginView;

use std::sync::Arc;

use gpui::*;
use gpui_tokio_bridge::Tokio;
use sehat_cloud::{IdentityProvider, IdentityResult, UserProfile};
use tokio::sync::oneshot;

/// Emitted whenever the signed-in user or the sign-in flow state changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthChanged;

pub struct AuthState {
    identity: Arc<dyn IdentityProvider>,
    user: Option<UserProfile>,
    signing_in: bool,
    error: Option<&'static str>,
    _watch_task: Task<()>,
    sign_in_worker: Option<Task<Result<(), gpui_tokio_bridge::JoinError>>>,
    sign_in_reader: Option<Task<()>>,
    sign_out_task: Option<Task<Result<(), gpui_tokio_bridge::JoinError>>>,
}

impl EventEmitter<AuthChanged> for AuthState {}

impl AuthState {
    pub fn new(identity: Arc<dyn IdentityProvider>, cx: &mut Context<Self>) -> Self {
        let mut receiver = identity.subscribe();
        let watch_task = cx.spawn(async move |this, cx| {
            loop {
                let current = receiver.borrow_and_update().clone();
                let updated = this.update(cx, |this, cx| {
                    this.set_user(current, cx);
                });
                if updated.is_err() {
                    break;
                }

                if receiver.changed().await.is_err() {
                    break;
                }
            }
        });

        Self {
            user: identity.current_user(),
            identity,
            signing_in: false,
            error: None,
            _watch_task: watch_task,
            sign_in_worker: None,
            sign_in_reader: None,
            sign_out_task: None,
        }
    }

    pub fn user(&self) -> Option<&UserProfile> {
        self.user.as_ref()
    }

    pub fn is_signed_in(&self) -> bool {
        self.user.is_some()
    }

    pub fn signing_in(&self) -> bool {
        self.signing_in
    }

    pub fn error(&self) -> Option<&'static str> {
        self.error
    }

    pub fn sign_in(&mut self, cx: &mut Context<Self>) {
        if self.signing_in {
            return;
        }

        self.signing_in = true;
        self.error = None;
        cx.emit(AuthChanged);
        cx.notify();

        let identity = self.identity.clone();
        let (result_tx, result_rx) = oneshot::channel();

        self.sign_in_worker = Some(Tokio::spawn(cx, async move {
            let result = identity.sign_in().await;
            let _ = result_tx.send(result);
        }));

        self.sign_in_reader = Some(cx.spawn(async move |this, cx| {
            let Ok(result) = result_rx.await else {
                return;
            };
            let _ = this.update(cx, |this, cx| {
                this.finish_sign_in(result, cx);
            });
        }));
    }

    pub fn sign_out(&mut self, cx: &mut Context<Self>) {
        let identity = self.identity.clone();
        // The watch feed delivers the resulting None back to set_user.
        self.sign_out_task = Some(Tokio::spawn(cx, async move {
            identity.sign_out().await;
        }));
    }

    fn finish_sign_in(&mut self, result: IdentityResult<UserProfile>, cx: &mut Context<Self>) {
        self.signing_in = false;
        match result {
            Ok(profile) => {
                tracing::info!(user_id = %profile.id, "sign-in completed");
                self.error = None;
            }
            Err(error) => {
                tracing::warn!("sign-in failed: {error}");
                self.error = Some(error.user_message());
            }
        }

        cx.emit(AuthChanged);
        cx.notify();
    }

    fn set_user(&mut self, user: Option<UserProfile>, cx: &mut Context<Self>) {
        if self.user == user {
            return;
        }

        self.user = user;
        if self.user.is_some() {
            self.error = None;
        }

        cx.emit(AuthChanged);
        cx.notify();
    }
}
