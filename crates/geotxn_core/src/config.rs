//! Transaction configuration.

/// What a second call to `close` does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClosePolicy {
    /// Closing a closed transaction is a no-op.
    #[default]
    Idempotent,
    /// Closing a closed transaction fails with `TxnError::Closed`.
    Strict,
}

/// Configuration for creating a transaction.
#[derive(Debug, Clone, Default)]
pub struct TransactionConfig {
    /// Human readable label. Derived from the caller's location when unset.
    pub handle: Option<String>,

    /// Behavior of repeated `close` calls.
    pub close_policy: ClosePolicy,
}

impl TransactionConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the transaction handle.
    #[must_use]
    pub fn handle(mut self, handle: impl Into<String>) -> Self {
        self.handle = Some(handle.into());
        self
    }

    /// Sets the close policy.
    #[must_use]
    pub const fn close_policy(mut self, policy: ClosePolicy) -> Self {
        self.close_policy = policy;
        self
    }
}
