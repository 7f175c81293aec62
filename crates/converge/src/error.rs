//! Error types for reconciliation.
//!
//! Errors are categorized so callers can tell "the remote call kept
//! failing" apart from "we gave up waiting for convergence" and from
//! "the caller cancelled the wait". Remote errors are carried verbatim:
//! the engine never rewrites a remote message.

use crate::types::{ResourceHandle, Status};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// A native error returned by the remote control plane.
///
/// Carries the classifiable code and message exactly as the remote API
/// reported them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteError {
    /// Error code (e.g., "ResourceNotFoundException")
    pub code: String,
    /// Human-readable message from the remote API
    pub message: String,
}

impl RemoteError {
    /// Create a remote error from a code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for RemoteError {}

/// Why a wait stopped before it finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    /// The caller cancelled the operation
    Requested,
    /// The caller-supplied deadline passed
    DeadlineExceeded,
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Requested => write!(f, "cancelled by caller"),
            Self::DeadlineExceeded => write!(f, "caller deadline exceeded"),
        }
    }
}

/// Categories of reconciliation errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The resource does not exist
    Absent,
    /// A remote call failed (transient budget exhausted, or fatal)
    Remote,
    /// Convergence did not happen within the poll timeout
    PollTimeout,
    /// The remote reported a status the wait does not model
    UnexpectedStatus,
    /// Required configuration was missing before any remote call
    PreconditionViolation,
    /// The caller cancelled the wait
    Cancelled,
    /// The engine was wired up incorrectly (unknown kind, bad config shape)
    Configuration,
}

impl ErrorCategory {
    /// Get a user-friendly description of this error category.
    pub fn description(&self) -> &'static str {
        match self {
            Self::Absent => "Resource does not exist",
            Self::Remote => "Remote call failed",
            Self::PollTimeout => "Timed out waiting for convergence",
            Self::UnexpectedStatus => "Unexpected resource status",
            Self::PreconditionViolation => "Invalid configuration",
            Self::Cancelled => "Operation cancelled",
            Self::Configuration => "Engine configuration error",
        }
    }
}

/// Errors that can occur while reconciling a resource.
#[derive(Debug, Error)]
pub enum Error {
    /// The resource no longer exists.
    #[error("resource not found: {handle}")]
    Absent {
        /// Handle of the missing resource
        handle: ResourceHandle,
    },

    /// A remote call failed; the native error is carried unchanged.
    #[error("{0}")]
    Remote(#[source] RemoteError),

    /// The resource did not converge within the poll timeout.
    #[error(
        "timeout after {timeout:?} waiting for {handle} to reach {target} (last status: {last_status}{})",
        .reason.as_deref().map(|r| format!(", reason: {r}")).unwrap_or_default()
    )]
    PollTimeout {
        /// Handle being waited on
        handle: ResourceHandle,
        /// Human-readable target set
        target: String,
        /// Configured timeout
        timeout: Duration,
        /// Last observed status
        last_status: Status,
        /// Last observed status reason
        reason: Option<String>,
    },

    /// The remote reported a status that is neither pending nor target.
    #[error(
        "unexpected status {status} for {handle}{}",
        .reason.as_deref().map(|r| format!(": {r}")).unwrap_or_default()
    )]
    UnexpectedStatus {
        /// Handle being waited on
        handle: ResourceHandle,
        /// The unmodeled status
        status: Status,
        /// Status reason, if any
        reason: Option<String>,
    },

    /// Required configuration combination is missing.
    #[error("invalid {kind} configuration: {message}")]
    Precondition {
        /// Resource kind being configured
        kind: String,
        /// What is missing or inconsistent
        message: String,
    },

    /// The wait was cancelled by the caller.
    #[error("{operation}: {reason}")]
    Cancelled {
        /// Operation that was interrupted
        operation: String,
        /// Why it stopped
        reason: CancelReason,
    },

    /// No resource kind registered under this name.
    #[error("unknown resource kind: {0}")]
    UnknownKind(String),

    /// Config could not be decoded into the kind's typed config.
    #[error("invalid {kind} config: {source}")]
    Config {
        /// Resource kind
        kind: String,
        /// Decode error
        #[source]
        source: serde_json::Error,
    },
}

impl Error {
    /// Get the error category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Absent { .. } => ErrorCategory::Absent,
            Error::Remote(_) => ErrorCategory::Remote,
            Error::PollTimeout { .. } => ErrorCategory::PollTimeout,
            Error::UnexpectedStatus { .. } => ErrorCategory::UnexpectedStatus,
            Error::Precondition { .. } => ErrorCategory::PreconditionViolation,
            Error::Cancelled { .. } => ErrorCategory::Cancelled,
            Error::UnknownKind(_) | Error::Config { .. } => ErrorCategory::Configuration,
        }
    }

    /// Whether this is a poll timeout.
    pub fn is_timeout(&self) -> bool {
        self.category() == ErrorCategory::PollTimeout
    }

    /// Whether the caller cancelled the operation.
    pub fn is_cancelled(&self) -> bool {
        self.category() == ErrorCategory::Cancelled
    }

    /// Whether the resource was found to be absent.
    pub fn is_absent(&self) -> bool {
        self.category() == ErrorCategory::Absent
    }

    /// The underlying remote error, if this is one.
    pub fn remote(&self) -> Option<&RemoteError> {
        match self {
            Error::Remote(e) => Some(e),
            _ => None,
        }
    }

    /// Shorthand for a precondition violation.
    pub fn precondition(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Precondition {
            kind: kind.into(),
            message: message.into(),
        }
    }
}

impl From<RemoteError> for Error {
    fn from(e: RemoteError) -> Self {
        Error::Remote(e)
    }
}

/// Result type for reconciliation operations.
pub type Result<T> = std::result::Result<T, Error>;
