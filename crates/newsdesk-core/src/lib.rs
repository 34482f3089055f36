//! Shared types, configuration, and errors for the newsdesk client.

pub mod config;
pub mod error;
pub mod types;

pub use config::NewsdeskConfig;
pub use error::{NewsdeskError, Result, TransportError, TransportErrorKind};
pub use types::*;
