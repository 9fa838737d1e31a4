//! Error taxonomy for running machines.
//!
//! Two kinds of error exist:
//!
//! - [`MachineError`] reports misuse: an unregistered event, an undeclared
//!   context key or an external write to a protected key. It indicates a
//!   bug in the code driving the machine. Callers must not retry; log it,
//!   abort the owning task or escalate it to a crash handler.
//! - [`RoutedError`] is what error hooks receive. It covers runtime
//!   conditions such as a failing context updater or an error reported
//!   through `Machine::error`.

use std::error::Error as StdError;
use std::sync::Arc;
use thiserror::Error;

/// Boxed error returned by context updaters and passed to `Machine::error`.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Programmer error returned from public machine operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MachineError {
    #[error("[{machine}] event '{event}' is not registered; register every event at construction")]
    UnknownEvent { machine: String, event: String },

    #[error("[{machine}] context key '{key}' is not declared; declare every key at construction")]
    UnknownContextKey { machine: String, key: String },

    #[error("[{machine}] context key '{key}' is protected and can only change through a transition")]
    ProtectedContextKey { machine: String, key: String },
}

/// Classification of a routed error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    UnknownEvent,
    UnknownContextKey,
    /// Only routed when rejection reporting is enabled.
    GuardRejected,
    /// Only routed when rejection reporting is enabled.
    NoTransition,
    ContextUpdate,
    External,
}

/// Error delivered to an error hook.
#[derive(Debug, Clone, Error)]
pub enum RoutedError {
    #[error("event '{event}' is not registered")]
    UnknownEvent { event: String },

    #[error("context key '{key}' is not declared")]
    UnknownContextKey { key: String },

    #[error("guard rejected '{event}' from '{from}' to '{to}'")]
    GuardRejected {
        event: String,
        from: String,
        to: String,
    },

    #[error("no transition for '{event}' in '{state}'")]
    NoTransition { event: String, state: String },

    #[error("context update failed: {0}")]
    ContextUpdate(Arc<dyn StdError + Send + Sync>),

    #[error("external error: {0}")]
    External(Arc<dyn StdError + Send + Sync>),
}

impl RoutedError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnknownEvent { .. } => ErrorKind::UnknownEvent,
            Self::UnknownContextKey { .. } => ErrorKind::UnknownContextKey,
            Self::GuardRejected { .. } => ErrorKind::GuardRejected,
            Self::NoTransition { .. } => ErrorKind::NoTransition,
            Self::ContextUpdate(_) => ErrorKind::ContextUpdate,
            Self::External(_) => ErrorKind::External,
        }
    }

    pub(crate) fn context_update(err: BoxError) -> Self {
        Self::ContextUpdate(Arc::from(err))
    }

    pub(crate) fn external(err: BoxError) -> Self {
        Self::External(Arc::from(err))
    }
}
