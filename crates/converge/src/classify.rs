//! Error classification
//!
//! The engine only ever asks two questions of a remote error: "does this
//! mean the resource is gone?" and "does it contain one of these
//! substrings?". Everything else about the remote taxonomy stays in the
//! transport layer.

use crate::error::RemoteError;

/// Translates native remote errors into the two predicates the engine uses.
pub trait ErrorClassifier: Send + Sync {
    /// Whether the error is the remote's authoritative not-found signal.
    fn is_absent(&self, error: &RemoteError) -> bool;

    /// Whether the error code or message contains any of `patterns`.
    ///
    /// Matching is case-sensitive, like the remote's own messages.
    fn matches(&self, error: &RemoteError, patterns: &[&str]) -> bool {
        patterns
            .iter()
            .any(|p| error.code.contains(p) || error.message.contains(p))
    }
}

/// Classifier that recognizes absence by error code.
#[derive(Debug, Clone)]
pub struct CodeClassifier {
    absent_codes: Vec<String>,
}

impl CodeClassifier {
    /// Create a classifier treating any of `codes` as not-found.
    pub fn new(codes: &[&str]) -> Self {
        Self {
            absent_codes: codes.iter().map(|c| (*c).to_string()).collect(),
        }
    }
}

impl ErrorClassifier for CodeClassifier {
    fn is_absent(&self, error: &RemoteError) -> bool {
        self.absent_codes.iter().any(|c| *c == error.code)
    }
}
