//! Session context: the single owner of the bearer token.
//!
//! Every component that needs the token receives a [`SessionStore`] instead
//! of reading persisted state directly. A missing token means the user is
//! unauthenticated.

use std::path::{Path, PathBuf};
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Key the token is persisted under.
pub const TOKEN_KEY: &str = "accessToken";

/// Scheme prefix of an `Authorization` header value.
pub const BEARER_PREFIX: &str = "Bearer ";

const SESSION_FILE: &str = "session.json";

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("no session token stored")]
    Missing,

    #[error("session file {path} is unreadable: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("session file {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Explicit get/set/clear access to the bearer token.
pub trait SessionStore: Send + Sync {
    fn token(&self) -> Result<Option<String>, SessionError>;

    fn set_token(&self, token: &str) -> Result<(), SessionError>;

    fn clear(&self) -> Result<(), SessionError>;

    /// A store that cannot be read counts as logged out.
    fn is_authenticated(&self) -> bool {
        matches!(self.token(), Ok(Some(_)))
    }
}

/// Return the stored token or [`SessionError::Missing`].
pub fn require_session(store: &dyn SessionStore) -> Result<String, SessionError> {
    store.token()?.ok_or(SessionError::Missing)
}

/// Extract `<token>` from a `Bearer <token>` header value.
pub fn bearer_token(header_value: &str) -> Option<&str> {
    header_value
        .strip_prefix(BEARER_PREFIX)
        .filter(|token| !token.is_empty())
}

/// Process-local store, used by tests and short-lived tooling.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    token: RwLock<Option<String>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: RwLock::new(Some(token.into())),
        }
    }
}

impl SessionStore for MemorySessionStore {
    fn token(&self) -> Result<Option<String>, SessionError> {
        let guard = self.token.read().unwrap_or_else(|e| e.into_inner());
        Ok(guard.clone())
    }

    fn set_token(&self, token: &str) -> Result<(), SessionError> {
        let mut guard = self.token.write().unwrap_or_else(|e| e.into_inner());
        *guard = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<(), SessionError> {
        let mut guard = self.token.write().unwrap_or_else(|e| e.into_inner());
        *guard = None;
        Ok(())
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct SessionFile {
    #[serde(rename = "accessToken", default, skip_serializing_if = "Option::is_none")]
    access_token: Option<String>,
}

/// Durable store backed by `<state_dir>/session.json`.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(state_dir: impl AsRef<Path>) -> Self {
        Self {
            path: state_dir.as_ref().join(SESSION_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<SessionFile, SessionError> {
        let raw = match std::fs::read(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(SessionFile::default())
            }
            Err(source) => {
                return Err(SessionError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        serde_json::from_slice(&raw).map_err(|source| SessionError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }

    fn write(&self, file: &SessionFile) -> Result<(), SessionError> {
        let io_err = |source| SessionError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }

        let raw = serde_json::to_vec_pretty(file).map_err(|source| SessionError::Corrupt {
            path: self.path.clone(),
            source,
        })?;

        // Write-then-rename so a crash never leaves half a token behind.
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, raw).map_err(io_err)?;
        std::fs::rename(&tmp, &self.path).map_err(io_err)
    }
}

impl SessionStore for FileSessionStore {
    fn token(&self) -> Result<Option<String>, SessionError> {
        Ok(self.read()?.access_token)
    }

    fn set_token(&self, token: &str) -> Result<(), SessionError> {
        self.write(&SessionFile {
            access_token: Some(token.to_string()),
        })?;
        tracing::debug!(path = %self.path.display(), "session token stored");
        Ok(())
    }

    fn clear(&self) -> Result<(), SessionError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                tracing::debug!(path = %self.path.display(), "session cleared");
                Ok(())
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(SessionError::Io {
                path: self.path.clone(),
                source,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_prefix_is_stripped_exactly() {
        assert_eq!(bearer_token("Bearer abc.def.ghi"), Some("abc.def.ghi"));
        assert_eq!(bearer_token("Bearer  padded"), Some(" padded"));
        assert_eq!(bearer_token("Bearer "), None);
        assert_eq!(bearer_token("bearer abc"), None);
        assert_eq!(bearer_token("Basic abc"), None);
    }

    #[test]
    fn memory_store_lifecycle() {
        let store = MemorySessionStore::new();
        assert!(!store.is_authenticated());
        assert!(matches!(require_session(&store), Err(SessionError::Missing)));

        store.set_token("t-1").unwrap();
        assert_eq!(require_session(&store).unwrap(), "t-1");

        store.clear().unwrap();
        assert_eq!(store.token().unwrap(), None);
    }

    #[test]
    fn file_store_persists_under_fixed_key() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::new(dir.path().join("state"));
        assert_eq!(store.token().unwrap(), None);

        store.set_token("jwt-token").unwrap();

        let raw = std::fs::read_to_string(store.path()).unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(json[TOKEN_KEY], "jwt-token");

        let reopened = FileSessionStore::new(dir.path().join("state"));
        assert_eq!(reopened.token().unwrap().as_deref(), Some("jwt-token"));

        reopened.clear().unwrap();
        assert!(!store.is_authenticated());
        // Clearing twice is fine.
        store.clear().unwrap();
    }

    #[test]
    fn corrupt_file_is_reported_and_treated_as_logged_out() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::new(dir.path());
        std::fs::write(store.path(), b"not json").unwrap();

        assert!(matches!(store.token(), Err(SessionError::Corrupt { .. })));
        assert!(!store.is_authenticated());
    }
}
