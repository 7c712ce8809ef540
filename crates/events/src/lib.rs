//! Notification primitives: toasts, the channel that carries them, the single
//! display that renders them, and a one-shot store that carries a toast
//! across a full navigation.

pub mod channel;
pub mod pending;
pub mod toast;

pub use channel::{ToastChannel, ToastDisplay, ToastRenderer};
pub use pending::PendingToastStore;
pub use toast::{Notifier, Severity, Toast};

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EventError {
    #[error("pending toast file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("pending toast file {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
