//! Persisted credential pair and the storage seam behind it
//!
//! Tokens live in a [`CredentialStore`] under two fixed string keys,
//! `access_token` and `refresh_token`. Values are stored as plain strings
//! with no structured encoding. Stores are shared across concurrent requests
//! and must synchronise internally.

use crate::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info};

/// Storage slot for one half of the credential pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKey {
    /// Short-lived bearer credential
    Access,
    /// Long-lived credential used only to mint new access tokens
    Refresh,
}

impl TokenKey {
    /// Both slots, in the order they are written on login
    pub const ALL: [Self; 2] = [Self::Access, Self::Refresh];

    /// The persisted key name
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Access => "access_token",
            Self::Refresh => "refresh_token",
        }
    }
}

impl fmt::Display for TokenKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Access and refresh token as issued by the token endpoint
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialPair {
    pub access_token: String,
    pub refresh_token: String,
}

impl CredentialPair {
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
        }
    }
}

// Tokens never end up in logs.
impl fmt::Debug for CredentialPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialPair")
            .field("access_token", &format_args!("<{} chars>", self.access_token.len()))
            .field("refresh_token", &format_args!("<{} chars>", self.refresh_token.len()))
            .finish()
    }
}

/// Key/value storage for the credential pair
pub trait CredentialStore: Send + Sync {
    /// Read a slot; `None` when nothing is stored
    fn get(&self, key: TokenKey) -> CoreResult<Option<String>>;

    /// Overwrite a slot
    fn set(&self, key: TokenKey, value: &str) -> CoreResult<()>;

    /// Remove a slot; clearing an empty slot is not an error
    fn clear(&self, key: TokenKey) -> CoreResult<()>;
}

fn lock<T>(mutex: &Mutex<T>) -> CoreResult<MutexGuard<'_, T>> {
    mutex
        .lock()
        .map_err(|_| CoreError::storage_error("credential store lock poisoned"))
}

/// In-process store, used by tests and short-lived tooling
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    slots: Mutex<BTreeMap<&'static str, String>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with a credential pair
    pub fn with_pair(pair: &CredentialPair) -> Self {
        let store = Self::new();
        if let Ok(mut slots) = store.slots.lock() {
            slots.insert(TokenKey::Access.as_str(), pair.access_token.clone());
            slots.insert(TokenKey::Refresh.as_str(), pair.refresh_token.clone());
        }
        store
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get(&self, key: TokenKey) -> CoreResult<Option<String>> {
        Ok(lock(&self.slots)?.get(key.as_str()).cloned())
    }

    fn set(&self, key: TokenKey, value: &str) -> CoreResult<()> {
        lock(&self.slots)?.insert(key.as_str(), value.to_string());
        Ok(())
    }

    fn clear(&self, key: TokenKey) -> CoreResult<()> {
        lock(&self.slots)?.remove(key.as_str());
        Ok(())
    }
}

/// Store backed by a small JSON document on disk
///
/// The whole document is rewritten on every mutation through a temporary
/// file and a rename, so readers never observe a half-written file. A
/// missing file is an empty store.
#[derive(Debug)]
pub struct FileCredentialStore {
    path: PathBuf,
    guard: Mutex<()>,
}

impl FileCredentialStore {
    /// File name used inside a state directory
    pub const FILE_NAME: &'static str = "credentials.json";

    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            guard: Mutex::new(()),
        }
    }

    /// Create a store at the default location inside `state_dir`
    pub fn in_dir(state_dir: impl AsRef<Path>) -> Self {
        Self::new(state_dir.as_ref().join(Self::FILE_NAME))
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_slots(&self) -> CoreResult<BTreeMap<String, String>> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) if content.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(err) => Err(err.into()),
        }
    }

    fn write_slots(&self, slots: &BTreeMap<String, String>) -> CoreResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let tmp_path = self.path.with_extension("json.tmp");
        let content = serde_json::to_string_pretty(slots)?;

        // A leftover temp file may carry wider permissions
        match std::fs::remove_file(&tmp_path) {
            Ok(()) => {}
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => return Err(err.into()),
        }

        let mut options = OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options.open(&tmp_path)?;
        file.write_all(content.as_bytes())?;
        file.sync_all()?;
        drop(file);

        std::fs::rename(&tmp_path, &self.path)?;
        debug!(path = %self.path.display(), slots = slots.len(), "Credential file written");
        Ok(())
    }

    fn mutate(&self, apply: impl FnOnce(&mut BTreeMap<String, String>) -> bool) -> CoreResult<()> {
        let _guard = lock(&self.guard)?;
        let mut slots = self.read_slots()?;
        if apply(&mut slots) {
            self.write_slots(&slots)?;
        }
        Ok(())
    }
}

impl CredentialStore for FileCredentialStore {
    fn get(&self, key: TokenKey) -> CoreResult<Option<String>> {
        let _guard = lock(&self.guard)?;
        Ok(self.read_slots()?.remove(key.as_str()))
    }

    fn set(&self, key: TokenKey, value: &str) -> CoreResult<()> {
        self.mutate(|slots| {
            slots.insert(key.as_str().to_string(), value.to_string());
            true
        })
    }

    fn clear(&self, key: TokenKey) -> CoreResult<()> {
        self.mutate(|slots| slots.remove(key.as_str()).is_some())
    }
}

/// Typed view over a shared [`CredentialStore`]
#[derive(Clone)]
pub struct Credentials {
    store: Arc<dyn CredentialStore>,
}

impl Credentials {
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self { store }
    }

    /// Current access token, if any
    pub fn access_token(&self) -> CoreResult<Option<String>> {
        self.store.get(TokenKey::Access)
    }

    /// Current refresh token, if any
    pub fn refresh_token(&self) -> CoreResult<Option<String>> {
        self.store.get(TokenKey::Refresh)
    }

    /// Both tokens, when both are present
    pub fn pair(&self) -> CoreResult<Option<CredentialPair>> {
        let access = self.access_token()?;
        let refresh = self.refresh_token()?;
        Ok(access
            .zip(refresh)
            .map(|(access, refresh)| CredentialPair::new(access, refresh)))
    }

    /// Persist a freshly issued pair
    pub fn store_pair(&self, pair: &CredentialPair) -> CoreResult<()> {
        self.store.set(TokenKey::Access, &pair.access_token)?;
        self.store.set(TokenKey::Refresh, &pair.refresh_token)?;
        info!("Stored new credential pair");
        Ok(())
    }

    /// Overwrite the access token, leaving the refresh token untouched
    pub fn replace_access_token(&self, token: &str) -> CoreResult<()> {
        self.store.set(TokenKey::Access, token)
    }

    /// Remove both tokens
    pub fn purge(&self) -> CoreResult<()> {
        for key in TokenKey::ALL {
            self.store.clear(key)?;
        }
        info!("Cleared stored credentials");
        Ok(())
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials").finish_non_exhaustive()
    }
}
