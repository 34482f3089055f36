use std::fmt;

use thiserror::Error;

/// Category of a failed backend call.
///
/// Callers never branch on the message text; the kind is what the error
/// policy table keys on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportErrorKind {
    /// No response was obtained (connection refused, DNS, timeout).
    Network,
    /// The backend answered with a non-2xx status.
    Backend { status: u16 },
    /// The body could not be parsed into the expected shape.
    Malformed,
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportErrorKind::Network => write!(f, "network"),
            TransportErrorKind::Backend { status } => write!(f, "backend ({status})"),
            TransportErrorKind::Malformed => write!(f, "malformed"),
        }
    }
}

/// The single error type returned by every backend call.
///
/// `Display` renders the human-readable message only, which is what the
/// rendering layer shows in an error banner.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub message: String,
}

impl TransportError {
    pub fn network(message: impl Into<String>) -> Self {
        Self {
            kind: TransportErrorKind::Network,
            message: message.into(),
        }
    }

    /// Build a backend error, preferring the server-supplied `detail` and
    /// falling back to `HTTP <status>`.
    pub fn backend(status: u16, detail: Option<String>) -> Self {
        let message = match detail {
            Some(d) if !d.trim().is_empty() => d,
            _ => format!("HTTP {status}"),
        };
        Self {
            kind: TransportErrorKind::Backend { status },
            message,
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self {
            kind: TransportErrorKind::Malformed,
            message: message.into(),
        }
    }
}

/// Top-level error type for the newsdesk client.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum NewsdeskError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("{0}")]
    Transport(#[from] TransportError),

    #[error("query cannot be empty")]
    EmptyQuery,

    /// The backend answered its health check but reported itself unhealthy.
    #[error("backend reported unhealthy (index {index})")]
    Degraded { index: String },
}

impl From<toml::de::Error> for NewsdeskError {
    fn from(err: toml::de::Error) -> Self {
        NewsdeskError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for NewsdeskError {
    fn from(err: toml::ser::Error) -> Self {
        NewsdeskError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for NewsdeskError {
    fn from(err: serde_json::Error) -> Self {
        NewsdeskError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for newsdesk operations.
pub type Result<T> = std::result::Result<T, NewsdeskError>;
