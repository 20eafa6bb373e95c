use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

/// Fixed key under which the bearer token is persisted.
pub const TOKEN_KEY: &str = "auth_token";

#[derive(Debug, thiserror::Error)]
pub enum TokenStoreError {
    #[error("Could not find config directory")]
    NoConfigDir,
    #[error("Token storage unavailable: {0}")]
    Io(#[from] io::Error),
}

/// Durable slot holding at most one authentication token.
pub trait TokenStore: Send + Sync {
    fn get(&self) -> Result<Option<String>, TokenStoreError>;
    fn set(&self, token: &str) -> Result<(), TokenStoreError>;
    fn delete(&self) -> Result<(), TokenStoreError>;
}

/// Token persisted as a plain file named [`TOKEN_KEY`] in a config directory.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    dir: PathBuf,
}

impl FileTokenStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Store under the platform config directory, e.g.
    /// `~/.config/session-client/auth_token`.
    pub fn in_user_config_dir() -> Result<Self, TokenStoreError> {
        let dir = dirs::config_dir()
            .ok_or(TokenStoreError::NoConfigDir)?
            .join("session-client");
        Ok(Self::new(dir))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Get the path to the token file
    fn token_path(&self) -> PathBuf {
        self.dir.join(TOKEN_KEY)
    }
}

impl TokenStore for FileTokenStore {
    fn get(&self) -> Result<Option<String>, TokenStoreError> {
        let path = self.token_path();

        if !path.exists() {
            return Ok(None);
        }

        let token = fs::read_to_string(&path)?;

        if token.is_empty() {
            return Ok(None);
        }

        Ok(Some(token))
    }

    fn set(&self, token: &str) -> Result<(), TokenStoreError> {
        fs::create_dir_all(&self.dir)?;
        fs::write(self.token_path(), token)?;
        Ok(())
    }

    fn delete(&self) -> Result<(), TokenStoreError> {
        let path = self.token_path();

        if path.exists() {
            fs::remove_file(&path)?;
        }

        Ok(())
    }
}

/// Write recorded by [`MemoryTokenStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenWrite {
    Set(String),
    Delete,
}

/// In-process token slot. Records every write so callers can assert on
/// persistence behavior without touching the filesystem.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    slot: Mutex<Option<String>>,
    writes: Mutex<Vec<TokenWrite>>,
    unavailable: bool,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: &str) -> Self {
        Self {
            slot: Mutex::new(Some(token.to_string())),
            ..Self::default()
        }
    }

    /// A store whose every operation fails, as when local storage is disabled.
    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }

    /// Current slot contents, bypassing the failure mode.
    pub fn peek(&self) -> Option<String> {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn writes(&self) -> Vec<TokenWrite> {
        self.writes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn check_available(&self) -> Result<(), TokenStoreError> {
        if self.unavailable {
            return Err(TokenStoreError::Io(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "storage disabled",
            )));
        }
        Ok(())
    }

    fn record(&self, write: TokenWrite) {
        self.writes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(write);
    }
}

impl TokenStore for MemoryTokenStore {
    fn get(&self) -> Result<Option<String>, TokenStoreError> {
        self.check_available()?;
        Ok(self.peek())
    }

    fn set(&self, token: &str) -> Result<(), TokenStoreError> {
        self.check_available()?;
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(token.to_string());
        self.record(TokenWrite::Set(token.to_string()));
        Ok(())
    }

    fn delete(&self) -> Result<(), TokenStoreError> {
        self.check_available()?;
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = None;
        self.record(TokenWrite::Delete);
        Ok(())
    }
}
