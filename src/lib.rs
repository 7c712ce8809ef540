//! Bookshelf application library
//!
//! The server side registers the request proxy as a module; the client side
//! is a set of page controllers driven by the `bookshelf` CLI.

pub mod modules;
pub mod pages;
pub mod server;

pub use modules::register_all;
pub use pages::{Confirm, Outcome, PageCtx, View};
