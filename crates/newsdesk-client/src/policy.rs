//! Error policy table: which failures reach the user and which are absorbed.
//!
//! Each operation class looks up `(operation, error class)` instead of
//! deciding inline, so an operation can opt into stricter handling by
//! overriding a single entry.

use std::collections::HashMap;

use newsdesk_core::error::{TransportError, TransportErrorKind};

/// Operation classes that issue backend calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Suggest,
    Search,
    Chat,
    ClearSession,
    HealthProbe,
}

/// Error taxonomy as seen by the policy table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// No response obtained.
    Network,
    /// Non-2xx response, with or without a detail message.
    Backend,
    /// Body not parseable as the expected shape.
    Malformed,
    /// Health probe answered but reported itself unhealthy.
    Degraded,
}

impl From<TransportErrorKind> for ErrorClass {
    fn from(kind: TransportErrorKind) -> Self {
        match kind {
            TransportErrorKind::Network => ErrorClass::Network,
            TransportErrorKind::Backend { .. } => ErrorClass::Backend,
            TransportErrorKind::Malformed => ErrorClass::Malformed,
        }
    }
}

impl From<&TransportError> for ErrorClass {
    fn from(err: &TransportError) -> Self {
        err.kind.into()
    }
}

/// What to do with a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Disposition {
    /// Show it to the user (error banner, returned `Err`).
    Surface,
    /// Resolve it locally to a quiet, well-defined state.
    Absorb,
}

/// Lookup table from `(Operation, ErrorClass)` to [`Disposition`].
#[derive(Debug, Clone, Default)]
pub struct ErrorPolicy {
    overrides: HashMap<(Operation, ErrorClass), Disposition>,
}

impl ErrorPolicy {
    /// Override the disposition for one table entry.
    pub fn with(mut self, operation: Operation, class: ErrorClass, disposition: Disposition) -> Self {
        self.overrides.insert((operation, class), disposition);
        self
    }

    pub fn disposition(&self, operation: Operation, class: ErrorClass) -> Disposition {
        if let Some(d) = self.overrides.get(&(operation, class)) {
            return *d;
        }
        default_disposition(operation, class)
    }

    pub fn for_error(&self, operation: Operation, err: &TransportError) -> Disposition {
        self.disposition(operation, err.into())
    }
}

/// Built-in table.
///
/// Suggestions are best-effort and absorb everything. Probe failures of any
/// class collapse into the `Disconnected` status, which is itself the
/// user-visible signal, so the failure is absorbed into that state.
fn default_disposition(operation: Operation, _class: ErrorClass) -> Disposition {
    match operation {
        Operation::Suggest | Operation::HealthProbe => Disposition::Absorb,
        Operation::Search | Operation::Chat | Operation::ClearSession => Disposition::Surface,
    }
}
