//! Error types for bug records.
//!
//! [`BugError`] is returned by every fallible operation on a
//! [`Bug`](crate::bug::Bug). Store failures are wrapped verbatim in
//! [`BugError::Store`] and never retried.
//!
//! Calling [`Bug::id`](crate::bug::Bug::id) before the first commit is not
//! an error path: it panics, because it is a programming mistake.

use bugtrail_git::GitError;
use thiserror::Error;

/// Errors returned by bug operations.
#[derive(Debug, Error)]
pub enum BugError {
    /// No bug ref matched a prefix lookup.
    #[error("no matching bug found for prefix `{prefix}`")]
    NotFound {
        /// The prefix that was searched for.
        prefix: String,
    },

    /// More than one bug ref matched a prefix lookup.
    #[error("multiple matching bugs found for prefix `{prefix}`:\n{}", matches.join("\n"))]
    Ambiguous {
        /// The prefix that was searched for.
        prefix: String,
        /// Every matching identifier.
        matches: Vec<String>,
    },

    /// Stored data does not have the expected shape.
    #[error("malformed bug data: {reason}")]
    Malformed {
        /// What was wrong.
        reason: String,
    },

    /// The operation is not allowed in the bug's current state.
    #[error("{reason}")]
    InvalidState {
        /// Why the operation was refused.
        reason: String,
    },

    /// The underlying store failed.
    #[error(transparent)]
    Store(#[from] GitError),
}

impl BugError {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Self::Malformed {
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_state(reason: impl Into<String>) -> Self {
        Self::InvalidState {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ambiguous_lists_every_match() {
        let err = BugError::Ambiguous {
            prefix: "ab".to_owned(),
            matches: vec!["abc".to_owned(), "abd".to_owned()],
        };
        let msg = err.to_string();
        assert!(msg.contains("\nabc"), "got: {msg}");
        assert!(msg.contains("\nabd"), "got: {msg}");
    }

    #[test]
    fn invalid_state_displays_bare_reason() {
        let err = BugError::invalid_state("can't commit an empty bug");
        assert_eq!(err.to_string(), "can't commit an empty bug");
    }

    #[test]
    fn store_errors_pass_through() {
        let err: BugError = GitError::BackendError {
            message: "boom".to_owned(),
        }
        .into();
        assert_eq!(err.to_string(), "git backend error: boom");
    }
}
