//! Page controllers.
//!
//! Each page takes a [`PageCtx`], performs its backend calls, reports the
//! result through the injected notifier and returns the [`View`] to navigate
//! to. Validation failures never reach the network, and no page error
//! escapes as a process failure.

use std::sync::Arc;

use bookshelf_client::{ApiClient, ClientError, ImageGenerator, PublicClient};
use bookshelf_events::{Notifier, PendingToastStore, Toast};
use bookshelf_session::SessionStore;

pub mod auth;
pub mod home;
pub mod posts;
pub mod profile;
pub mod search;

pub(crate) const LOGIN_REQUIRED: &str = "This page requires you to be logged in.";
pub(crate) const SERVER_UNREACHABLE: &str = "Could not reach the server.";

/// Where the user ends up after a page action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Home,
    Login,
    Profile,
    PostView(i64),
    PostEdit(i64),
    /// Remain on the current page.
    Stay,
}

/// A navigation target plus whatever the page loaded for display.
#[derive(Debug)]
pub struct Outcome<T> {
    pub view: View,
    pub data: Option<T>,
}

impl<T> Outcome<T> {
    pub fn navigate(view: View) -> Self {
        Self { view, data: None }
    }

    pub fn show(data: T) -> Self {
        Self {
            view: View::Stay,
            data: Some(data),
        }
    }
}

/// Yes/no prompt shown before destructive or publishing actions.
pub trait Confirm: Send + Sync {
    fn confirm(&self, title: &str, message: &str) -> bool;
}

/// Everything a page may touch.
#[derive(Clone)]
pub struct PageCtx {
    pub api: ApiClient,
    pub public: PublicClient,
    pub session: Arc<dyn SessionStore>,
    pub notifier: Arc<dyn Notifier>,
    pub pending: PendingToastStore,
    pub confirm: Arc<dyn Confirm>,
    pub images: Arc<dyn ImageGenerator>,
    pub search_page_size: u32,
    pub list_page_size: u32,
}

impl PageCtx {
    pub fn toast(&self, toast: Toast) {
        self.notifier.notify(toast);
    }

    /// Show the toast stashed by the previous invocation, once.
    pub fn enter(&self) {
        if let Err(err) = self.pending.replay(self.notifier.as_ref()) {
            tracing::warn!(error = %err, "failed to replay pending toast");
        }
    }

    /// Carry a toast over to the next invocation.
    pub fn stash(&self, toast: Toast) {
        if let Err(err) = self.pending.stash(toast) {
            tracing::warn!(error = %err, "failed to stash pending toast");
        }
    }

    /// Guard for pages that need a session. Emits exactly one danger toast
    /// and returns `false` when no token is stored.
    pub fn require_login(&self) -> bool {
        if self.session.is_authenticated() {
            return true;
        }
        tracing::debug!("page requires a session; redirecting home");
        self.toast(Toast::danger(LOGIN_REQUIRED));
        false
    }

    /// Drop the session and any pending toast.
    pub fn forget_session(&self) {
        if let Err(err) = self.session.clear() {
            tracing::warn!(error = %err, "failed to clear session");
        }
        if let Err(err) = self.pending.clear() {
            tracing::warn!(error = %err, "failed to clear pending toast");
        }
    }
}

/// Toast text for a failed call: the backend's own message when it sent
/// one, `fallback` for other failures.
pub(crate) fn describe(err: &ClientError, fallback: &str) -> String {
    match err {
        ClientError::Transport(_) => SERVER_UNREACHABLE.to_string(),
        other => other
            .backend_message()
            .filter(|message| !message.is_empty())
            .unwrap_or(fallback)
            .to_string(),
    }
}

/// Returns `None` for blank input, the text exactly as typed otherwise.
pub(crate) fn non_blank(value: &str) -> Option<&str> {
    (!value.trim().is_empty()).then_some(value)
}
