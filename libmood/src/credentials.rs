//! Persisted credential storage for Mood
//!
//! Remembered sessions survive restarts as two entries, `@mood/token` and
//! `@mood/user`, kept in one of several backends:
//!
//! - `CredentialStore` trait: common key-value interface
//! - `KeyringStore`: OS-native secure storage (primary)
//! - `EncryptedFileStore`: age-encrypted files behind a master password (fallback)
//! - `MemoryStore`: process-local storage for tests and ephemeral sessions
//! - `CredentialManager`: facade that picks backends and falls back between them
//! - `CredentialVault`: reads and writes the remembered-session record
//!
//! # Example
//!
//! ```no_run
//! use libmood::credentials::{CredentialConfig, CredentialManager, CredentialVault};
//!
//! # fn example() -> libmood::Result<()> {
//! let manager = CredentialManager::new(CredentialConfig::default())?;
//! let vault = CredentialVault::new(Box::new(manager));
//!
//! if let Some(record) = vault.load()? {
//!     println!("Remembered user {}", record.user.display_name());
//! }
//! # Ok(())
//! # }
//! ```

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use crate::error::{CredentialError, MoodError, Result};
use crate::types::UserProfile;

/// Storage key for the bearer token
pub const TOKEN_KEY: &str = "@mood/token";

/// Storage key for the JSON-serialized user profile
pub const USER_KEY: &str = "@mood/user";

/// Keyring service name under which all entries live
pub const KEYRING_SERVICE: &str = "mood";

/// Trait for credential storage backends
///
/// Keys are opaque strings such as [`TOKEN_KEY`]. Deleting a missing key is
/// not an error.
pub trait CredentialStore: Send + Sync {
    /// Store a value, replacing any previous one
    fn store(&self, key: &str, value: &str) -> Result<()>;

    /// Retrieve a value
    ///
    /// # Errors
    ///
    /// Returns `CredentialError::NotFound` when the key is absent.
    fn retrieve(&self, key: &str) -> Result<String>;

    /// Delete a value
    fn delete(&self, key: &str) -> Result<()>;

    /// Check whether a value exists
    fn exists(&self, key: &str) -> Result<bool>;

    /// Backend identifier used in logs ("keyring", "encrypted_file", ...)
    fn backend_name(&self) -> &str;
}

fn is_not_found(error: &MoodError) -> bool {
    matches!(error, MoodError::Credential(CredentialError::NotFound(_)))
}

/// OS-native keyring storage backend
///
/// - **macOS**: Keychain
/// - **Windows**: Credential Manager
/// - **Linux**: Secret Service (GNOME Keyring/KWallet) via D-Bus
///
/// Every key is an entry of the [`KEYRING_SERVICE`] service.
pub struct KeyringStore {
    service: String,
}

impl KeyringStore {
    /// Create a new KeyringStore
    ///
    /// # Errors
    ///
    /// Returns `CredentialError::KeyringUnavailable` if the OS keyring
    /// cannot be accessed (e.g., headless Linux without Secret Service).
    pub fn new() -> Result<Self> {
        Self::with_service(KEYRING_SERVICE)
    }

    /// Create a KeyringStore under a custom service name
    pub fn with_service(service: &str) -> Result<Self> {
        match keyring::Entry::new(service, "availability_check") {
            Ok(_) => Ok(Self {
                service: service.to_string(),
            }),
            Err(e) => Err(CredentialError::KeyringUnavailable(format!(
                "OS keyring not accessible: {}",
                e
            ))
            .into()),
        }
    }

    fn entry(&self, key: &str) -> Result<keyring::Entry> {
        keyring::Entry::new(&self.service, key)
            .map_err(|e| CredentialError::KeyringUnavailable(e.to_string()).into())
    }
}

impl CredentialStore for KeyringStore {
    fn store(&self, key: &str, value: &str) -> Result<()> {
        self.entry(key)?
            .set_password(value)
            .map_err(|e| CredentialError::Keyring(e.to_string()))?;

        tracing::debug!("Stored {} in OS keyring", key);
        Ok(())
    }

    fn retrieve(&self, key: &str) -> Result<String> {
        match self.entry(key)?.get_password() {
            Ok(value) => {
                tracing::debug!("Retrieved {} from OS keyring", key);
                Ok(value)
            }
            Err(keyring::Error::NoEntry) => Err(CredentialError::NotFound(key.to_string()).into()),
            Err(e) => Err(CredentialError::Keyring(e.to_string()).into()),
        }
    }

    fn delete(&self, key: &str) -> Result<()> {
        match self.entry(key)?.delete_password() {
            Ok(_) => {
                tracing::debug!("Deleted {} from OS keyring", key);
                Ok(())
            }
            Err(keyring::Error::NoEntry) => {
                tracing::debug!("{} not found in OS keyring (already deleted)", key);
                Ok(())
            }
            Err(e) => Err(CredentialError::Keyring(e.to_string()).into()),
        }
    }

    fn exists(&self, key: &str) -> Result<bool> {
        match self.entry(key)?.get_password() {
            Ok(_) => Ok(true),
            Err(keyring::Error::NoEntry) => Ok(false),
            Err(e) => Err(CredentialError::Keyring(e.to_string()).into()),
        }
    }

    fn backend_name(&self) -> &str {
        "keyring"
    }
}

/// Validate that a path is not a symlink
///
/// Credential files must be regular files; following a planted symlink
/// would read or overwrite an arbitrary file.
pub fn validate_not_symlink(path: &Path) -> Result<()> {
    let metadata = std::fs::symlink_metadata(path).map_err(|e| {
        CredentialError::Io(std::io::Error::new(
            e.kind(),
            format!("Failed to read metadata for '{}': {}", path.display(), e),
        ))
    })?;

    if metadata.is_symlink() {
        return Err(CredentialError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!(
                "Credential file '{}' is a symbolic link; refusing to use it",
                path.display()
            ),
        ))
        .into());
    }

    Ok(())
}

/// Encrypted file storage backend
///
/// Each key is stored in its own `age` passphrase-encrypted file under the
/// base directory. Files are created with mode 600 on Unix.
pub struct EncryptedFileStore {
    base_path: PathBuf,
    master_password: RwLock<Option<SecretString>>,
}

impl EncryptedFileStore {
    /// Create a new EncryptedFileStore rooted at `base_path`
    pub fn new(base_path: PathBuf) -> Self {
        Self {
            base_path,
            master_password: RwLock::new(None),
        }
    }

    /// Set the master password for encryption/decryption
    ///
    /// # Errors
    ///
    /// Returns `CredentialError::WeakPassword` if the password is less than 8 characters.
    pub fn set_master_password(&self, password: String) -> Result<()> {
        if password.chars().count() < 8 {
            return Err(CredentialError::WeakPassword.into());
        }

        *self
            .master_password
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(SecretString::from(password));
        tracing::debug!("Master password set for encrypted file store");
        Ok(())
    }

    fn passphrase(&self) -> Result<age::secrecy::SecretString> {
        let guard = self
            .master_password
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        let password = guard
            .as_ref()
            .ok_or(CredentialError::MasterPasswordNotSet)?;
        Ok(age::secrecy::Secret::new(password.expose_secret().to_string()))
    }

    fn encrypt(&self, data: &str) -> Result<Vec<u8>> {
        let encryptor = age::Encryptor::with_user_passphrase(self.passphrase()?);

        let mut encrypted = vec![];
        let mut writer = encryptor
            .wrap_output(&mut encrypted)
            .map_err(|e| CredentialError::Encryption(e.to_string()))?;

        writer
            .write_all(data.as_bytes())
            .map_err(|e| CredentialError::Encryption(e.to_string()))?;

        writer
            .finish()
            .map_err(|e| CredentialError::Encryption(e.to_string()))?;

        Ok(encrypted)
    }

    fn decrypt(&self, data: &[u8]) -> Result<String> {
        let passphrase = self.passphrase()?;

        let decryptor = match age::Decryptor::new(data) {
            Ok(age::Decryptor::Passphrase(d)) => d,
            Ok(_) => {
                return Err(CredentialError::Encryption(
                    "Invalid encryption format (expected passphrase)".to_string(),
                )
                .into())
            }
            Err(e) => return Err(CredentialError::Encryption(e.to_string()).into()),
        };

        let mut decrypted = vec![];
        let mut reader = decryptor.decrypt(&passphrase, None).map_err(|e| {
            if e.to_string().contains("decryption") || e.to_string().contains("MAC") {
                CredentialError::DecryptionFailed
            } else {
                CredentialError::Encryption(e.to_string())
            }
        })?;

        reader
            .read_to_end(&mut decrypted)
            .map_err(|e| CredentialError::Encryption(e.to_string()))?;

        Ok(String::from_utf8(decrypted)
            .map_err(|e| CredentialError::Encryption(format!("Invalid UTF-8: {}", e)))?)
    }

    /// File holding `key`; characters unsafe in file names become `_`
    fn file_path(&self, key: &str) -> PathBuf {
        let file_name: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.base_path.join(format!("{}.age", file_name))
    }
}

impl CredentialStore for EncryptedFileStore {
    fn store(&self, key: &str, value: &str) -> Result<()> {
        let encrypted = self.encrypt(value)?;
        let file_path = self.file_path(key);

        if let Some(parent) = file_path.parent() {
            std::fs::create_dir_all(parent).map_err(CredentialError::Io)?;
        }

        if file_path.exists() {
            validate_not_symlink(&file_path)?;
        }

        std::fs::write(&file_path, encrypted).map_err(CredentialError::Io)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            std::fs::set_permissions(&file_path, perms).map_err(CredentialError::Io)?;
        }

        tracing::debug!("Stored encrypted {} at {:?}", key, file_path);
        Ok(())
    }

    fn retrieve(&self, key: &str) -> Result<String> {
        let file_path = self.file_path(key);

        if !file_path.exists() {
            return Err(CredentialError::NotFound(key.to_string()).into());
        }

        validate_not_symlink(&file_path)?;

        let encrypted = std::fs::read(&file_path).map_err(CredentialError::Io)?;
        let decrypted = self.decrypt(&encrypted)?;

        tracing::debug!("Retrieved encrypted {} from {:?}", key, file_path);
        Ok(decrypted)
    }

    fn delete(&self, key: &str) -> Result<()> {
        let file_path = self.file_path(key);

        if file_path.exists() {
            std::fs::remove_file(&file_path).map_err(CredentialError::Io)?;
            tracing::debug!("Deleted encrypted {} at {:?}", key, file_path);
        }

        Ok(())
    }

    fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.file_path(key).exists())
    }

    fn backend_name(&self) -> &str {
        "encrypted_file"
    }
}

/// In-memory storage backend
///
/// Clones share the same map, so a test can keep a handle and inspect what
/// was written after handing the store to a vault.
#[derive(Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
    writes: Arc<Mutex<usize>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful `store` calls so far
    pub fn write_count(&self) -> usize {
        *self.writes.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Snapshot of the current entries
    pub fn entries(&self) -> HashMap<String, String> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl CredentialStore for MemoryStore {
    fn store(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
        *self.writes.lock().unwrap_or_else(PoisonError::into_inner) += 1;
        Ok(())
    }

    fn retrieve(&self, key: &str) -> Result<String> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
            .ok_or_else(|| CredentialError::NotFound(key.to_string()).into())
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        Ok(())
    }

    fn exists(&self, key: &str) -> Result<bool> {
        Ok(self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(key))
    }

    fn backend_name(&self) -> &str {
        "memory"
    }
}

/// Storage backend type
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// OS-native keyring (macOS Keychain, Windows Credential Manager, Linux Secret Service)
    #[default]
    Keyring,
    /// Encrypted files with master password
    Encrypted,
    /// Nothing survives the process; "remember me" becomes a no-op across restarts
    Memory,
}

/// Credential storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialConfig {
    #[serde(default)]
    pub storage: StorageBackend,

    /// Directory for encrypted file storage (keyring doesn't use files)
    #[serde(default = "default_credential_path")]
    pub path: String,

    /// Master password for encrypted storage (never serialized)
    #[serde(skip)]
    pub master_password: Option<String>,
}

fn default_credential_path() -> String {
    "~/.config/mood/credentials".to_string()
}

impl Default for CredentialConfig {
    fn default() -> Self {
        Self {
            storage: StorageBackend::Keyring,
            path: default_credential_path(),
            master_password: None,
        }
    }
}

impl CredentialConfig {
    /// Load master password from `MOOD_MASTER_PASSWORD` if set
    pub fn load_master_password_from_env(&mut self) {
        if let Ok(password) = std::env::var("MOOD_MASTER_PASSWORD") {
            if !password.is_empty() {
                self.master_password = Some(password);
                tracing::debug!("Loaded master password from MOOD_MASTER_PASSWORD");
            }
        }
    }

    /// Expand `~` in the credential path
    pub fn expand_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.path).to_string())
    }
}

/// Credential manager facade
///
/// Builds a priority list of backends:
///
/// 1. KeyringStore (if configured and available)
/// 2. EncryptedFileStore (if configured, or as keyring fallback, once a
///    master password is known)
///
/// Writes go to the first backend; reads try each in order; deletes hit all.
pub struct CredentialManager {
    stores: Vec<Box<dyn CredentialStore>>,
    config: CredentialConfig,
}

impl CredentialManager {
    /// Create a new CredentialManager
    ///
    /// # Errors
    ///
    /// Returns `CredentialError::NoStoreAvailable` if no backend could be set up.
    pub fn new(config: CredentialConfig) -> Result<Self> {
        let mut stores: Vec<Box<dyn CredentialStore>> = vec![];

        if config.storage == StorageBackend::Memory {
            tracing::info!("Using in-memory credential storage; nothing will be remembered");
            stores.push(Box::new(MemoryStore::new()));
            return Ok(Self { stores, config });
        }

        if config.storage == StorageBackend::Keyring {
            match KeyringStore::new() {
                Ok(store) => {
                    tracing::info!("Using OS keyring for credential storage");
                    stores.push(Box::new(store));
                }
                Err(e) => {
                    tracing::warn!(
                        "OS keyring unavailable: {}. Falling back to encrypted files.",
                        e
                    );
                }
            }
        }

        if config.storage == StorageBackend::Encrypted || stores.is_empty() {
            let encrypted_store = EncryptedFileStore::new(config.expand_path());

            if let Some(password) = &config.master_password {
                encrypted_store.set_master_password(password.clone())?;
                tracing::info!("Using encrypted file storage for credentials");
                stores.push(Box::new(encrypted_store));
            } else if atty::is(atty::Stream::Stdin) {
                match rpassword::prompt_password("Enter master password for credential encryption: ")
                {
                    Ok(password) if !password.is_empty() => {
                        match encrypted_store.set_master_password(password) {
                            Ok(_) => {
                                tracing::info!("Using encrypted file storage for credentials");
                                stores.push(Box::new(encrypted_store));
                            }
                            Err(e) => {
                                tracing::error!("Failed to set master password: {}", e);
                            }
                        }
                    }
                    Ok(_) => {
                        tracing::error!("Empty master password provided");
                    }
                    Err(e) => {
                        tracing::error!("Failed to prompt for master password: {}", e);
                    }
                }
            } else {
                tracing::error!("Master password not set and no TTY available");
            }
        }

        if stores.is_empty() {
            return Err(CredentialError::NoStoreAvailable.into());
        }

        Ok(Self { stores, config })
    }

    /// Build a manager over explicit backends
    pub fn from_stores(stores: Vec<Box<dyn CredentialStore>>, config: CredentialConfig) -> Result<Self> {
        if stores.is_empty() {
            return Err(CredentialError::NoStoreAvailable.into());
        }
        Ok(Self { stores, config })
    }

    pub fn config(&self) -> &CredentialConfig {
        &self.config
    }

    /// Names of the active backends, in priority order
    pub fn backends(&self) -> Vec<&str> {
        self.stores.iter().map(|s| s.backend_name()).collect()
    }
}

impl CredentialStore for CredentialManager {
    fn store(&self, key: &str, value: &str) -> Result<()> {
        let store = self
            .stores
            .first()
            .ok_or(CredentialError::NoStoreAvailable)?;
        store.store(key, value)?;
        tracing::debug!("Stored {} using {} backend", key, store.backend_name());
        Ok(())
    }

    fn retrieve(&self, key: &str) -> Result<String> {
        let mut last_error: Option<MoodError> = None;

        for store in &self.stores {
            match store.retrieve(key) {
                Ok(value) => {
                    tracing::debug!("Retrieved {} from {} backend", key, store.backend_name());
                    return Ok(value);
                }
                Err(e) if is_not_found(&e) => {
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error.unwrap_or_else(|| CredentialError::NotFound(key.to_string()).into()))
    }

    fn delete(&self, key: &str) -> Result<()> {
        for store in &self.stores {
            store.delete(key)?;
        }
        tracing::debug!("Deleted {} from all backends", key);
        Ok(())
    }

    fn exists(&self, key: &str) -> Result<bool> {
        for store in &self.stores {
            if store.exists(key)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn backend_name(&self) -> &str {
        self.stores
            .first()
            .map(|s| s.backend_name())
            .unwrap_or("none")
    }
}

/// A remembered session: token plus the profile it belongs to
#[derive(Debug, Clone, PartialEq)]
pub struct CredentialRecord {
    pub token: String,
    pub user: UserProfile,
}

/// Reads and writes the remembered-session record
///
/// Both keys are written together and cleared together. A record with only
/// one of the two keys is treated as absent.
pub struct CredentialVault {
    store: Box<dyn CredentialStore>,
}

impl CredentialVault {
    pub fn new(store: Box<dyn CredentialStore>) -> Self {
        Self { store }
    }

    pub fn backend_name(&self) -> &str {
        self.store.backend_name()
    }

    /// Persist a record
    ///
    /// If the second write fails the first is rolled back, so storage never
    /// holds a token without its user.
    pub fn save(&self, record: &CredentialRecord) -> Result<()> {
        let user_json = serde_json::to_string(&record.user)
            .map_err(|e| CredentialError::CorruptRecord(e.to_string()))?;

        self.store.store(TOKEN_KEY, &record.token)?;

        if let Err(e) = self.store.store(USER_KEY, &user_json) {
            if let Err(cleanup) = self.store.delete(TOKEN_KEY) {
                tracing::warn!("Failed to roll back {} after error: {}", TOKEN_KEY, cleanup);
            }
            return Err(e);
        }

        tracing::debug!("Remembered session in {} backend", self.store.backend_name());
        Ok(())
    }

    /// Load the remembered record, if a complete one exists
    ///
    /// # Errors
    ///
    /// Returns `CredentialError::CorruptRecord` when the stored user is not
    /// valid JSON, or the backend's own error when it cannot be read.
    pub fn load(&self) -> Result<Option<CredentialRecord>> {
        let token = self.fetch(TOKEN_KEY)?;
        let user = self.fetch(USER_KEY)?;

        match (token, user) {
            (Some(token), Some(user_json)) => {
                let user: UserProfile = serde_json::from_str(&user_json)
                    .map_err(|e| CredentialError::CorruptRecord(e.to_string()))?;
                Ok(Some(CredentialRecord { token, user }))
            }
            (None, None) => Ok(None),
            (token, _) => {
                tracing::warn!(
                    "Ignoring incomplete remembered session (token present: {})",
                    token.is_some()
                );
                Ok(None)
            }
        }
    }

    /// Remove both keys
    pub fn forget(&self) -> Result<()> {
        self.store.delete(TOKEN_KEY)?;
        self.store.delete(USER_KEY)?;
        tracing::debug!("Forgot remembered session");
        Ok(())
    }

    fn fetch(&self, key: &str) -> Result<Option<String>> {
        match self.store.retrieve(key) {
            Ok(value) => Ok(Some(value)),
            Err(e) if is_not_found(&e) => Ok(None),
            Err(e) => Err(e),
        }
    }
}
