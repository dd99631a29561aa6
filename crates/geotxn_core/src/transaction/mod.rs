//! Transaction control for feature stores.
//!
//! A [`Transaction`] keeps externalized [`State`](crate::State) by key and
//! fans `commit`, `rollback` and `add_authorization` out to every state:
//! - **Best effort**: a failing state never stops the pass
//! - **Aggregation**: one failure is passed through, two or more are
//!   reported as a count plus the last cause
//! - **Scoped authorizations**: tokens are dropped after each
//!   commit/rollback pass
//!
//! [`AutoCommit`] stands in where changes are applied immediately. Both
//! implement [`Transactional`].

mod auto_commit;
mod registry;
mod shared;

pub use auto_commit::AutoCommit;
pub use registry::Transaction;
pub use shared::SharedTransaction;

use crate::error::TxnResult;
use crate::types::{Key, PropertyValue};
use std::collections::HashSet;

/// Operations shared by explicit and auto-commit transactions.
///
/// Feature stores that accept either mode take `&mut dyn Transactional`.
pub trait Transactional {
    /// Label identifying the transaction to the user.
    fn handle(&self) -> &str;

    /// Returns true for the immediate-mode stand-in.
    fn is_auto_commit(&self) -> bool {
        false
    }

    /// Makes all changes since the previous commit/rollback permanent.
    fn commit(&mut self) -> TxnResult<()>;

    /// Undoes all changes since the previous commit/rollback.
    fn rollback(&mut self) -> TxnResult<()>;

    /// Provides an authorization token for locked features.
    fn add_authorization(&mut self, token: &str) -> TxnResult<()>;

    /// Authorization tokens held until the next commit/rollback.
    fn authorizations(&self) -> TxnResult<&HashSet<String>>;

    /// Looks up a hint.
    fn property(&self, key: &Key) -> TxnResult<Option<&PropertyValue>>;

    /// Stores a hint, returning the value it replaced.
    fn put_property(&mut self, key: Key, value: PropertyValue) -> TxnResult<Option<PropertyValue>>;

    /// Frees all state held by the transaction.
    fn close(&mut self) -> TxnResult<()>;
}
