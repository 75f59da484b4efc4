//! Durable access-token storage
//!
//! The access token lives in a single named slot, [`ACCESS_TOKEN_KEY`]. The
//! file-backed store keeps every slot in one JSON object, the way browser local
//! storage keeps string keys.

use std::sync::{PoisonError, RwLock};
use thiserror::Error;

#[cfg(not(target_arch = "wasm32"))]
use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    sync::Mutex,
};

/// Storage slot holding the current access token
pub const ACCESS_TOKEN_KEY: &str = "access_token";

/// Token storage errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt storage file: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// Durable slot for the current access token
#[cfg_attr(test, mockall::automock)]
pub trait TokenStore: Send + Sync {
    /// Read the stored token, if any
    fn load(&self) -> Result<Option<String>, StoreError>;

    /// Replace the stored token
    fn save(&self, token: &str) -> Result<(), StoreError>;

    /// Remove the stored token
    fn clear(&self) -> Result<(), StoreError>;
}

/// In-process token store
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: RwLock<Option<String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that already holds `token`
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: RwLock::new(Some(token.into())),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Result<Option<String>, StoreError> {
        Ok(self
            .token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn save(&self, token: &str) -> Result<(), StoreError> {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}

/// Token store persisted as a JSON file of named slots
#[cfg(not(target_arch = "wasm32"))]
#[derive(Debug)]
pub struct FileTokenStore {
    path: PathBuf,
    // serializes read-modify-write cycles within the process
    lock: Mutex<()>,
}

#[cfg(not(target_arch = "wasm32"))]
impl FileTokenStore {
    /// File name used inside the storage directory
    pub const FILE_NAME: &'static str = "storage.json";

    /// Create a store backed by `<dir>/storage.json`
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(Self::FILE_NAME),
            lock: Mutex::new(()),
        }
    }

    /// Platform data directory shared by the token and cookie files
    pub fn default_dir() -> Result<PathBuf, StoreError> {
        let dirs = directories::ProjectDirs::from("", "", "nutrilabel").ok_or_else(|| {
            StoreError::Unavailable("no home directory for the current user".to_string())
        })?;
        Ok(dirs.data_dir().to_path_buf())
    }

    /// Create a store in the platform data directory
    pub fn default_location() -> Result<Self, StoreError> {
        Ok(Self::new(Self::default_dir()?))
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_slots(&self) -> Result<BTreeMap<String, String>, StoreError> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) if content.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(err) => Err(err.into()),
        }
    }

    fn write_slots(&self, slots: &BTreeMap<String, String>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_vec_pretty(slots)?)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn update<F>(&self, f: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut BTreeMap<String, String>),
    {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut slots = self.read_slots()?;
        f(&mut slots);
        self.write_slots(&slots)
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl TokenStore for FileTokenStore {
    fn load(&self) -> Result<Option<String>, StoreError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(self.read_slots()?.remove(ACCESS_TOKEN_KEY))
    }

    fn save(&self, token: &str) -> Result<(), StoreError> {
        self.update(|slots| {
            slots.insert(ACCESS_TOKEN_KEY.to_string(), token.to_string());
        })
    }

    fn clear(&self) -> Result<(), StoreError> {
        self.update(|slots| {
            slots.remove(ACCESS_TOKEN_KEY);
        })
    }
}
