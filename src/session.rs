//! Persisted session state: the bearer token under fixed storage keys.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use tracing::{debug, warn};

use crate::error::ApiError;

pub const ADMIN_TOKEN_KEY: &str = "admin_token";
/// Key written by older client-portal sessions; still honoured on read.
pub const CLIENT_TOKEN_KEY: &str = "client_token";
/// Keys checked, in order, when looking for a token.
pub const AUTH_KEYS: [&str; 2] = [ADMIN_TOKEN_KEY, CLIENT_TOKEN_KEY];

/// Key/value storage for session credentials.
pub trait TokenStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    fn set(&self, key: &str, value: &str) -> Result<(), ApiError>;

    /// Drop every stored key.
    fn clear(&self) -> Result<(), ApiError>;

    /// First non-empty token found under [`AUTH_KEYS`].
    fn token(&self) -> Option<String> {
        AUTH_KEYS
            .iter()
            .find_map(|key| self.get(key).filter(|token| !token.trim().is_empty()))
    }
}

/// In-process store, gone when the process exits.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(key: &str, token: &str) -> Self {
        let store = Self::new();
        store
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), token.to_string());
        store
    }
}

impl TokenStore for MemoryTokenStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), ApiError> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<(), ApiError> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        Ok(())
    }
}

/// Token file on disk holding a small JSON object of key → token.
///
/// A file containing a bare token (the format older consoles wrote) is read
/// as the `admin_token` entry.
#[derive(Debug)]
pub struct FileTokenStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<BTreeMap<String, String>, ApiError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => {
                return Err(ApiError::storage(format!(
                    "failed to read {}: {}",
                    self.path.display(),
                    e
                )))
            }
        };

        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(BTreeMap::new());
        }
        if trimmed.starts_with('{') {
            return serde_json::from_str(trimmed).map_err(|e| {
                ApiError::storage(format!("corrupt token file {}: {}", self.path.display(), e))
            });
        }

        debug!("Reading legacy plain-text token file {}", self.path.display());
        Ok(BTreeMap::from([(ADMIN_TOKEN_KEY.to_string(), trimmed.to_string())]))
    }
}

impl TokenStore for FileTokenStore {
    fn get(&self, key: &str) -> Option<String> {
        match self.load() {
            Ok(mut entries) => entries.remove(key),
            Err(e) => {
                warn!("{}", e);
                None
            }
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), ApiError> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut entries = self.load()?;
        entries.insert(key.to_string(), value.to_string());

        let json = serde_json::to_string_pretty(&entries)?;
        fs::write(&self.path, json).map_err(|e| {
            ApiError::storage(format!("failed to write {}: {}", self.path.display(), e))
        })
    }

    fn clear(&self) -> Result<(), ApiError> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ApiError::storage(format!(
                "failed to remove {}: {}",
                self.path.display(),
                e
            ))),
        }
    }
}
