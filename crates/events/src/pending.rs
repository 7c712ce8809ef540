use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::toast::{Notifier, Toast};
use crate::EventError;

const PENDING_FILE: &str = "pending_toast.json";
const DEFAULT_MAX_AGE: Duration = Duration::from_secs(10 * 60);

#[derive(Debug, Serialize, Deserialize)]
struct PendingEntry {
    toast: Toast,
    stashed_at: i64,
}

/// One pending toast that survives a full navigation.
///
/// A stash overwrites any earlier one; [`take`](Self::take) yields it once
/// and removes it. Entries older than `max_age` are dropped unread.
#[derive(Debug, Clone)]
pub struct PendingToastStore {
    path: PathBuf,
    max_age: Duration,
}

impl PendingToastStore {
    pub fn new(state_dir: impl AsRef<Path>) -> Self {
        Self {
            path: state_dir.as_ref().join(PENDING_FILE),
            max_age: DEFAULT_MAX_AGE,
        }
    }

    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }

    pub fn stash(&self, toast: Toast) -> Result<(), EventError> {
        let entry = PendingEntry {
            toast,
            stashed_at: OffsetDateTime::now_utc().unix_timestamp(),
        };
        let raw = serde_json::to_vec(&entry).map_err(|source| EventError::Corrupt {
            path: self.path.clone(),
            source,
        })?;

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| self.io(source))?;
        }
        std::fs::write(&self.path, raw).map_err(|source| self.io(source))
    }

    pub fn take(&self) -> Result<Option<Toast>, EventError> {
        let raw = match std::fs::read(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(self.io(source)),
        };
        self.clear()?;

        let entry: PendingEntry =
            serde_json::from_slice(&raw).map_err(|source| EventError::Corrupt {
                path: self.path.clone(),
                source,
            })?;

        let age = OffsetDateTime::now_utc().unix_timestamp() - entry.stashed_at;
        if age < 0 || age as u64 > self.max_age.as_secs() {
            tracing::debug!(age, "discarding stale pending toast");
            return Ok(None);
        }

        Ok(Some(entry.toast))
    }

    pub fn clear(&self) -> Result<(), EventError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(self.io(source)),
        }
    }

    /// Broadcast the pending toast, if any. Returns whether one was shown.
    pub fn replay(&self, notifier: &dyn Notifier) -> Result<bool, EventError> {
        match self.take()? {
            Some(toast) => {
                notifier.notify(toast);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn io(&self, source: std::io::Error) -> EventError {
        EventError::Io {
            path: self.path.clone(),
            source,
        }
    }
}
