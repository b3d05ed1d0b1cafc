//! Client-side key-value storage for the credential and the login redirect
//! target. `FileStorage` is durable and survives restarts; `MemoryStorage` lives
//! as long as the process and plays the role of tab-scoped storage.

use crate::{auth::types::Token, errors::AppError};
use std::{
    collections::{BTreeMap, HashMap},
    fs,
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};
use tracing::{debug, warn};

/// Durable key holding the raw token.
pub const AUTH_TOKEN_KEY: &str = "auth_token";
/// Transient key holding the path a signed-out user tried to open.
pub const LOGIN_REDIRECT_KEY: &str = "loginRedirectPath";

/// Single-key string storage. Last write wins.
pub trait KeyValueStore: Send + Sync {
    /// # Errors
    /// Returns `AppError::Storage` if the backend cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, AppError>;

    /// # Errors
    /// Returns `AppError::Storage` if the backend cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<(), AppError>;

    /// Removing a missing key is not an error.
    ///
    /// # Errors
    /// Returns `AppError::Storage` if the backend cannot be written.
    fn remove(&self, key: &str) -> Result<(), AppError>;
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for Arc<T> {
    fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), AppError> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), AppError> {
        (**self).remove(key)
    }
}

#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>, AppError> {
        self.entries
            .lock()
            .map_err(|_| AppError::Storage("memory storage lock poisoned".to_string()))
    }
}

impl KeyValueStore for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), AppError> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), AppError> {
        self.lock()?.remove(key);
        Ok(())
    }
}

/// JSON object on disk, rewritten whole on every change with owner-only permissions.
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<Option<String>, AppError> {
        match fs::read_to_string(&self.path) {
            Ok(content) if content.trim().is_empty() => Ok(None),
            Ok(content) => Ok(Some(content)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(AppError::Storage(format!(
                "Failed to read {}: {err}",
                self.path.display()
            ))),
        }
    }

    fn load(&self) -> Result<BTreeMap<String, String>, AppError> {
        let Some(content) = self.read()? else {
            return Ok(BTreeMap::new());
        };

        serde_json::from_str(&content).map_err(|err| {
            AppError::Storage(format!("Failed to parse {}: {err}", self.path.display()))
        })
    }

    /// Entries to rewrite, plus whether the file on disk has to be replaced
    /// even if nothing changes. Contents that do not parse are dropped so the
    /// next write repairs the file.
    fn load_for_write(&self) -> Result<(BTreeMap<String, String>, bool), AppError> {
        let Some(content) = self.read()? else {
            return Ok((BTreeMap::new(), false));
        };

        match serde_json::from_str(&content) {
            Ok(entries) => Ok((entries, false)),
            Err(err) => {
                warn!(
                    "discarding unreadable storage file {}: {err}",
                    self.path.display()
                );
                Ok((BTreeMap::new(), true))
            }
        }
    }

    fn save(&self, entries: &BTreeMap<String, String>) -> Result<(), AppError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|err| {
                AppError::Storage(format!(
                    "Failed to create data directory {}: {err}",
                    parent.display()
                ))
            })?;
        }

        let content = serde_json::to_string_pretty(entries)
            .map_err(|err| AppError::Storage(format!("Failed to encode storage: {err}")))?;

        let tmp = self.path.with_extension("json.tmp");
        let mut options = fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        options
            .open(&tmp)
            .and_then(|mut file| file.write_all(content.as_bytes()))
            .map_err(|err| AppError::Storage(format!("Failed to write {}: {err}", tmp.display())))?;

        // A leftover temp file keeps its old mode; tighten it either way.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&tmp, fs::Permissions::from_mode(0o600)).map_err(|err| {
                AppError::Storage(format!("Failed to set file permissions: {err}"))
            })?;
        }

        fs::rename(&tmp, &self.path).map_err(|err| {
            AppError::Storage(format!(
                "Failed to replace {}: {err}",
                self.path.display()
            ))
        })?;

        debug!("storage written to {}", self.path.display());

        Ok(())
    }
}

impl KeyValueStore for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        Ok(self.load()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), AppError> {
        let (mut entries, _) = self.load_for_write()?;
        entries.insert(key.to_string(), value.to_string());
        self.save(&entries)
    }

    fn remove(&self, key: &str) -> Result<(), AppError> {
        let (mut entries, repair) = self.load_for_write()?;
        if entries.remove(key).is_none() && !repair {
            return Ok(());
        }
        self.save(&entries)
    }
}

/// Durable home of the auth token under [`AUTH_TOKEN_KEY`].
#[derive(Debug, Clone)]
pub struct CredentialStore<K> {
    storage: K,
}

impl<K: KeyValueStore> CredentialStore<K> {
    pub const fn new(storage: K) -> Self {
        Self { storage }
    }

    /// A blank stored value counts as no token.
    ///
    /// # Errors
    /// Returns `AppError::Storage` if the backend cannot be read.
    pub fn get(&self) -> Result<Option<Token>, AppError> {
        Ok(self
            .storage
            .get(AUTH_TOKEN_KEY)?
            .filter(|value| !value.trim().is_empty())
            .map(Token::new))
    }

    /// # Errors
    /// Returns `AppError::Storage` if the backend cannot be written.
    pub fn set(&self, token: &Token) -> Result<(), AppError> {
        self.storage.set(AUTH_TOKEN_KEY, token.expose())
    }

    /// # Errors
    /// Returns `AppError::Storage` if the backend cannot be written.
    pub fn remove(&self) -> Result<(), AppError> {
        self.storage.remove(AUTH_TOKEN_KEY)
    }
}

/// Tab-scoped record of where a signed-out user was headed.
#[derive(Debug, Clone)]
pub struct RedirectTargetStore<K> {
    storage: K,
}

impl<K: KeyValueStore> RedirectTargetStore<K> {
    pub const fn new(storage: K) -> Self {
        Self { storage }
    }

    /// # Errors
    /// Returns `AppError::Storage` if the backend cannot be written.
    pub fn record(&self, path: &str) -> Result<(), AppError> {
        self.storage.set(LOGIN_REDIRECT_KEY, path)
    }

    /// # Errors
    /// Returns `AppError::Storage` if the backend cannot be read.
    pub fn peek(&self) -> Result<Option<String>, AppError> {
        self.storage.get(LOGIN_REDIRECT_KEY)
    }

    /// Returns the recorded path and clears it.
    ///
    /// # Errors
    /// Returns `AppError::Storage` if the backend cannot be read or cleared.
    pub fn take(&self) -> Result<Option<String>, AppError> {
        let path = self.storage.get(LOGIN_REDIRECT_KEY)?;
        if path.is_some() {
            self.storage.remove(LOGIN_REDIRECT_KEY)?;
        }
        Ok(path)
    }
}
