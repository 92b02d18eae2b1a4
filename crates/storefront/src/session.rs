//! Session and auth token persistence.
//!
//! The session is either unauthenticated or holds one opaque auth token. The
//! token survives restarts through a [`TokenStore`]; the store is synchronous
//! and small, so writes happen inline and failures are only logged.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

/// Opaque auth token issued by the user service.
///
/// Never empty. `Debug` output is redacted.
#[derive(Clone)]
pub struct AuthToken(SecretString);

impl AuthToken {
    /// Wrap a raw token, kept byte-for-byte. Blank input yields `None`.
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Option<Self> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            return None;
        }
        Some(Self(SecretString::from(raw)))
    }

    /// The raw token, for request headers and persistence.
    #[must_use]
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthToken([REDACTED])")
    }
}

impl PartialEq for AuthToken {
    fn eq(&self, other: &Self) -> bool {
        self.expose() == other.expose()
    }
}

impl Eq for AuthToken {}

/// Who the shopper is, as far as the client knows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Session {
    #[default]
    Unauthenticated,
    Authenticated { token: AuthToken },
}

impl Session {
    /// Session for an optional raw token; blank tokens are unauthenticated.
    #[must_use]
    pub fn from_raw(raw: &str) -> Self {
        AuthToken::new(raw).map_or(Self::Unauthenticated, |token| Self::Authenticated { token })
    }

    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated { .. })
    }

    #[must_use]
    pub const fn token(&self) -> Option<&AuthToken> {
        match self {
            Self::Authenticated { token } => Some(token),
            Self::Unauthenticated => None,
        }
    }
}

/// Errors from token persistence.
#[derive(Debug, Error)]
pub enum TokenStoreError {
    #[error("failed to access token file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Synchronous key-value persistence for the auth token.
pub trait TokenStore: Send + Sync {
    /// Load the persisted token, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be read.
    fn load(&self) -> Result<Option<AuthToken>, TokenStoreError>;

    /// Persist `token`, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be written.
    fn save(&self, token: &AuthToken) -> Result<(), TokenStoreError>;

    /// Forget the persisted token. Removing an absent token is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be written.
    fn remove(&self) -> Result<(), TokenStoreError>;
}

/// Token persisted to a single file.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: io::Error) -> TokenStoreError {
        TokenStoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Result<Option<AuthToken>, TokenStoreError> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => Ok(AuthToken::new(contents)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(self.io_error(e)),
        }
    }

    fn save(&self, token: &AuthToken) -> Result<(), TokenStoreError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }

        let mut options = fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let mut file = options.open(&self.path).map_err(|e| self.io_error(e))?;
        io::Write::write_all(&mut file, token.expose().as_bytes()).map_err(|e| self.io_error(e))
    }

    fn remove(&self) -> Result<(), TokenStoreError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.io_error(e)),
        }
    }
}

/// In-memory token store, for embedding and tests.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: Mutex<Option<AuthToken>>,
}

impl MemoryTokenStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with `token`.
    #[must_use]
    pub fn with_token(token: AuthToken) -> Self {
        Self {
            token: Mutex::new(Some(token)),
        }
    }

    /// The currently stored token.
    #[must_use]
    pub fn current(&self) -> Option<AuthToken> {
        self.token
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Result<Option<AuthToken>, TokenStoreError> {
        Ok(self.current())
    }

    fn save(&self, token: &AuthToken) -> Result<(), TokenStoreError> {
        *self.token.lock().unwrap_or_else(PoisonError::into_inner) = Some(token.clone());
        Ok(())
    }

    fn remove(&self) -> Result<(), TokenStoreError> {
        *self.token.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}
