//! Durable session cookies
//!
//! The refresh endpoint authenticates with the session cookie set at login.
//! [`FileCookieStore`] keeps that cookie jar in `<dir>/cookies.json`, next to
//! the token store, so a client built later can still refresh.

use crate::client::token::StoreError;
use reqwest::cookie::CookieStore;
use reqwest::header::HeaderValue;
use reqwest_cookie_store::CookieStoreMutex;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, warn};
use url::Url;

/// Cookie jar persisted to a JSON file
pub struct FileCookieStore {
    path: PathBuf,
    jar: CookieStoreMutex,
    // serializes writes of the backing file
    lock: Mutex<()>,
}

impl FileCookieStore {
    /// File name used inside the storage directory
    pub const FILE_NAME: &'static str = "cookies.json";

    /// Open the jar stored in `<dir>/cookies.json`, starting empty if there is none
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = dir.as_ref().join(Self::FILE_NAME);
        let store = match std::fs::File::open(&path) {
            Ok(file) => cookie_store::serde::json::load(BufReader::new(file)).map_err(|err| {
                StoreError::Unavailable(format!("cannot read {}: {err}", path.display()))
            })?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                cookie_store::CookieStore::default()
            }
            Err(err) => return Err(err.into()),
        };

        Ok(Self {
            path,
            jar: CookieStoreMutex::new(store),
            lock: Mutex::new(()),
        })
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the current jar to disk
    ///
    /// Session cookies are kept as well; the jar outlives a single process.
    pub fn persist(&self) -> Result<(), StoreError> {
        let mut buf = Vec::new();
        {
            let store = self.jar.lock().unwrap_or_else(PoisonError::into_inner);
            cookie_store::serde::json::save_incl_expired_and_nonpersistent(&store, &mut buf)
                .map_err(|err| StoreError::Unavailable(format!("cannot encode cookies: {err}")))?;
        }

        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, buf)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl CookieStore for FileCookieStore {
    fn set_cookies(&self, cookie_headers: &mut dyn Iterator<Item = &HeaderValue>, url: &Url) {
        self.jar.set_cookies(cookie_headers, url);
        match self.persist() {
            Ok(()) => debug!(path = %self.path.display(), "Session cookies saved"),
            Err(err) => warn!(error = %err, "Failed to save session cookies"),
        }
    }

    fn cookies(&self, url: &Url) -> Option<HeaderValue> {
        self.jar.cookies(url)
    }
}

/// Forwards to a cookie provider chosen at runtime
pub(crate) struct SharedCookies(pub(crate) Arc<dyn CookieStore>);

impl CookieStore for SharedCookies {
    fn set_cookies(&self, cookie_headers: &mut dyn Iterator<Item = &HeaderValue>, url: &Url) {
        self.0.set_cookies(cookie_headers, url);
    }

    fn cookies(&self, url: &Url) -> Option<HeaderValue> {
        self.0.cookies(url)
    }
}
