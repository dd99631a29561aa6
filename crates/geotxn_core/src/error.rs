//! Error types for GeoTxn.

use crate::types::Key;
use std::fmt;
use std::io;
use thiserror::Error;

/// Result type for transaction operations.
pub type TxnResult<T> = Result<T, TxnError>;

/// Result type reported by [`State`](crate::State) callbacks.
pub type StateResult<T> = Result<T, StateError>;

/// An operation that a transaction fans out to every registered state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FanOut {
    /// `State::commit`.
    Commit,
    /// `State::rollback`.
    Rollback,
    /// `State::add_authorization`.
    AddAuthorization,
}

impl FanOut {
    /// Returns the operation name used in log fields and messages.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Commit => "commit",
            Self::Rollback => "rollback",
            Self::AddAuthorization => "add_authorization",
        }
    }
}

impl fmt::Display for FanOut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure reported by a single state.
#[derive(Debug, Error)]
pub enum StateError {
    /// The backing store failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The state could not complete the requested operation.
    #[error("{message}")]
    Failed {
        /// Description of the failure.
        message: String,
    },

    /// The state refused an authorization token.
    #[error("authorization rejected: {token}")]
    Unauthorized {
        /// The rejected token.
        token: String,
    },
}

impl StateError {
    /// Creates a generic state failure.
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
        }
    }

    /// Creates an authorization rejection.
    pub fn unauthorized(token: impl Into<String>) -> Self {
        Self::Unauthorized {
            token: token.into(),
        }
    }
}

/// Errors that can occur in transaction operations.
#[derive(Debug, Error)]
pub enum TxnError {
    /// The transaction has already been closed.
    #[error("transaction has been closed: {handle}")]
    Closed {
        /// Handle of the closed transaction.
        handle: String,
    },

    /// A state is already registered under the key.
    #[error("transaction already has a state for key {key}; check for an existing state before creating your own")]
    DuplicateKey {
        /// The contested key.
        key: Key,
    },

    /// No state is registered under the key.
    #[error("transaction has no state for key {key}; has it already been removed?")]
    UnknownKey {
        /// The missing key.
        key: Key,
    },

    /// Exactly one state failed; its error is passed through unchanged.
    #[error(transparent)]
    State(#[from] StateError),

    /// Two or more states failed during one fan-out pass.
    #[error("{operation} encountered {count} problems - the last was: {last}")]
    Aggregated {
        /// The fanned-out operation.
        operation: FanOut,
        /// Number of states that failed.
        count: usize,
        /// The last failure encountered in the pass.
        #[source]
        last: StateError,
    },

    /// The operation is not available in auto-commit mode.
    #[error("{operation} is not supported in auto-commit mode")]
    Unsupported {
        /// Name of the refused operation.
        operation: &'static str,
    },
}

impl TxnError {
    /// Creates a closed transaction error.
    pub fn closed(handle: impl Into<String>) -> Self {
        Self::Closed {
            handle: handle.into(),
        }
    }

    /// Creates a duplicate key error.
    pub fn duplicate_key(key: Key) -> Self {
        Self::DuplicateKey { key }
    }

    /// Creates an unknown key error.
    pub fn unknown_key(key: Key) -> Self {
        Self::UnknownKey { key }
    }

    /// Creates an auto-commit refusal.
    pub fn unsupported(operation: &'static str) -> Self {
        Self::Unsupported { operation }
    }

    /// Returns true if this error reports a closed transaction.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed { .. })
    }

    /// Number of state failures this error stands for.
    ///
    /// Zero for contract violations raised by the transaction itself.
    #[must_use]
    pub fn failure_count(&self) -> usize {
        match self {
            Self::State(_) => 1,
            Self::Aggregated { count, .. } => *count,
            _ => 0,
        }
    }
}
