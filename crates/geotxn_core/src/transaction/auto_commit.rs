//! Immediate-mode stand-in for a transaction.

use crate::error::{TxnError, TxnResult};
use crate::transaction::Transactional;
use crate::types::{Key, PropertyValue};
use std::collections::HashSet;

/// Marks requests that are applied immediately.
///
/// `AutoCommit` holds no state: commit and close do nothing, lookups find
/// nothing, and anything that would need to be remembered until a later
/// commit (rollback, authorizations, properties) is refused with
/// [`TxnError::Unsupported`].
#[derive(Debug, Default)]
pub struct AutoCommit {
    none: HashSet<String>,
}

impl AutoCommit {
    /// Creates the stand-in.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Transactional for AutoCommit {
    fn handle(&self) -> &str {
        "AUTO_COMMIT"
    }

    fn is_auto_commit(&self) -> bool {
        true
    }

    fn commit(&mut self) -> TxnResult<()> {
        Ok(())
    }

    fn rollback(&mut self) -> TxnResult<()> {
        Err(TxnError::unsupported("rollback"))
    }

    fn add_authorization(&mut self, _token: &str) -> TxnResult<()> {
        Err(TxnError::unsupported("add_authorization"))
    }

    fn authorizations(&self) -> TxnResult<&HashSet<String>> {
        Ok(&self.none)
    }

    fn property(&self, _key: &Key) -> TxnResult<Option<&PropertyValue>> {
        Ok(None)
    }

    fn put_property(&mut self, _key: Key, _value: PropertyValue) -> TxnResult<Option<PropertyValue>> {
        Err(TxnError::unsupported("put_property"))
    }

    fn close(&mut self) -> TxnResult<()> {
        Ok(())
    }
}
