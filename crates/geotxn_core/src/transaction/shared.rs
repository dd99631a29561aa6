//! Thread-shareable transaction handle.

use crate::error::TxnResult;
use crate::transaction::Transaction;
use parking_lot::{Mutex, MutexGuard};
use std::fmt;
use std::sync::Arc;

/// A [`Transaction`] behind a lock, cloneable across threads.
///
/// Every operation, `close` included, runs under the same mutex, so a
/// close can never interleave with a commit on another thread.
#[derive(Clone)]
pub struct SharedTransaction {
    inner: Arc<Mutex<Transaction>>,
}

impl SharedTransaction {
    /// Wraps a transaction.
    #[must_use]
    pub fn new(txn: Transaction) -> Self {
        Self {
            inner: Arc::new(Mutex::new(txn)),
        }
    }

    /// Locks the transaction for a sequence of operations.
    pub fn lock(&self) -> MutexGuard<'_, Transaction> {
        self.inner.lock()
    }

    /// Runs `f` with exclusive access to the transaction.
    pub fn with<R>(&self, f: impl FnOnce(&mut Transaction) -> R) -> R {
        f(&mut self.inner.lock())
    }

    /// Returns a copy of the handle.
    #[must_use]
    pub fn handle(&self) -> String {
        self.inner.lock().handle().to_owned()
    }

    /// Commits every registered state.
    pub fn commit(&self) -> TxnResult<()> {
        self.inner.lock().commit()
    }

    /// Rolls back every registered state.
    pub fn rollback(&self) -> TxnResult<()> {
        self.inner.lock().rollback()
    }

    /// Closes the transaction.
    pub fn close(&self) -> TxnResult<()> {
        self.inner.lock().close()
    }

    /// Checks if the transaction has been closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.lock().is_closed()
    }
}

impl From<Transaction> for SharedTransaction {
    fn from(txn: Transaction) -> Self {
        Self::new(txn)
    }
}

impl fmt::Debug for SharedTransaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inner.try_lock() {
            Some(txn) => f.debug_tuple("SharedTransaction").field(&*txn).finish(),
            None => f.write_str("SharedTransaction(<locked>)"),
        }
    }
}
