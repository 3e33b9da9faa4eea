//! Dispatch error taxonomy.
//!
//! Every failure that leaves the router or a service resolver is one of these
//! four kinds. Each carries a stable kind name and an HTTP-like status so the
//! transport can report it without knowing where it came from.

use thiserror::Error;

use crate::service::Method;

/// Status used for handler faults that carry none.
pub const DEFAULT_FAULT_STATUS: u16 = 500;

/// Errors that can occur while dispatching a call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// No route or record matched.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The named action does not exist or shadows a CRUD verb.
    #[error("No such **{verb}** action: {action}")]
    ActionNotImplemented { verb: Method, action: String },

    /// A required identifier was omitted.
    #[error("id for '{verb}' can not be undefined")]
    MissingIdentifier { verb: Method },

    /// A handler failed.
    #[error("{message}")]
    HandlerFault { message: String, status: Option<u16> },
}

/// Result type for dispatch operations.
pub type DispatchResult<T> = Result<T, DispatchError>;

impl DispatchError {
    /// A handler fault without an explicit status.
    pub fn fault(message: impl Into<String>) -> Self {
        Self::HandlerFault {
            message: message.into(),
            status: None,
        }
    }

    /// A handler fault with an explicit status.
    pub fn fault_with_status(message: impl Into<String>, status: u16) -> Self {
        Self::HandlerFault {
            message: message.into(),
            status: Some(status),
        }
    }

    /// Fault raised by a service that does not implement a verb.
    pub fn not_implemented(verb: Method) -> Self {
        Self::fault_with_status(format!("Not implemented: {verb}"), 501)
    }

    /// Effective status code.
    pub fn status(&self) -> u16 {
        match self {
            Self::NotFound(_) => 404,
            Self::ActionNotImplemented { .. } => 501,
            Self::MissingIdentifier { .. } => 400,
            Self::HandlerFault { status, .. } => status.unwrap_or(DEFAULT_FAULT_STATUS),
        }
    }

    /// Fills in the default status on handler faults that carry none.
    pub fn with_default_status(self) -> Self {
        match self {
            Self::HandlerFault {
                message,
                status: None,
            } => Self::HandlerFault {
                message,
                status: Some(DEFAULT_FAULT_STATUS),
            },
            other => other,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NotFound",
            Self::ActionNotImplemented { .. } => "ActionNotImplemented",
            Self::MissingIdentifier { .. } => "MissingIdentifier",
            Self::HandlerFault { .. } => "HandlerFault",
        }
    }
}
