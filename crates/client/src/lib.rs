//! Thin request builders for the book catalogue backend.
//!
//! [`ApiClient`] attaches the session's bearer token and treats a 401 as a
//! logout; [`PublicClient`] never sends a token. Neither retries, queues, or
//! sets explicit timeouts.

pub mod api;
pub mod error;
pub mod images;
pub mod models;
pub mod public;
pub mod transport;

pub use api::ApiClient;
pub use error::ClientError;
pub use images::{CoverPrompt, ImageGenerator, OpenAiImages};
pub use public::PublicClient;
pub use transport::{Reply, Transport};

/// Response header carrying the user's image service credential.
pub const API_KEY_HEADER: &str = "api-key";
