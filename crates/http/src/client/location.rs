//! Current page address shared between the app and the client
//!
//! The client reads the page path to decide whether an authorization failure
//! may be recovered by refreshing the token, and reads the query string once
//! to pick up a token handed over in the address.

use std::sync::{Arc, PoisonError, RwLock};
use url::Url;

/// Page path of the login screen
pub const LOGIN_PATH: &str = "/login";
/// Page path of the product enrollment form
pub const ENROLL_PATH: &str = "/enroll";

/// Page the user is currently on, as far as failure handling cares
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageContext {
    /// Authorization failures surface immediately
    Login,
    /// Authorization failures raise the login prompt and surface immediately
    Enroll,
    /// Authorization failures trigger a token refresh
    Other,
}

impl PageContext {
    pub fn from_path(path: &str) -> Self {
        match path {
            LOGIN_PATH => Self::Login,
            ENROLL_PATH => Self::Enroll,
            _ => Self::Other,
        }
    }
}

/// Shared, mutable page address
#[derive(Debug, Clone)]
pub struct Location {
    url: Arc<RwLock<Url>>,
}

impl Location {
    pub fn new(url: Url) -> Self {
        Self {
            url: Arc::new(RwLock::new(url)),
        }
    }

    /// Parse an absolute address
    pub fn parse(href: &str) -> Result<Self, url::ParseError> {
        Ok(Self::new(Url::parse(href)?))
    }

    /// Full address as currently visible
    pub fn href(&self) -> String {
        self.read().to_string()
    }

    pub fn pathname(&self) -> String {
        self.read().path().to_string()
    }

    /// Context derived from the current path
    pub fn page(&self) -> PageContext {
        PageContext::from_path(self.read().path())
    }

    /// Move to another path on the same origin, dropping query and fragment
    pub fn navigate_to_path(&self, path: &str) {
        let mut url = self.write();
        url.set_path(path);
        url.set_query(None);
        url.set_fragment(None);
    }

    /// Value of the first query parameter called `name`
    pub fn query_param(&self, name: &str) -> Option<String> {
        self.read()
            .query_pairs()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.into_owned())
    }

    /// Strip every `name` parameter from the visible address, keeping the rest
    pub fn remove_query_param(&self, name: &str) {
        let mut url = self.write();
        let kept: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(key, _)| key != name)
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect();

        if kept.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut().clear().extend_pairs(kept);
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Url> {
        self.url.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Url> {
        self.url.write().unwrap_or_else(PoisonError::into_inner)
    }
}
