//! UI-facing authentication state
//!
//! The client never renders anything; it only flips `show_login_modal` so that
//! whatever draws the page can present a login prompt.

use std::sync::Arc;
use tokio::sync::watch;

/// Observable authentication UI state
#[derive(Debug, Clone)]
pub struct AuthStore {
    show_login_modal: Arc<watch::Sender<bool>>,
}

impl Default for AuthStore {
    fn default() -> Self {
        let (show_login_modal, _) = watch::channel(false);
        Self {
            show_login_modal: Arc::new(show_login_modal),
        }
    }
}

impl AuthStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the login prompt should be shown
    pub fn show_login_modal(&self) -> bool {
        *self.show_login_modal.borrow()
    }

    pub fn set_show_login_modal(&self, show: bool) {
        // send_replace updates the value even with no receivers attached
        let previous = self.show_login_modal.send_replace(show);
        if show && !previous {
            tracing::debug!("Login prompt requested");
        }
    }

    /// Watch the login prompt flag
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.show_login_modal.subscribe()
    }
}
