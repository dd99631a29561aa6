//! Externalized state participating in a transaction.

use crate::error::StateResult;
use crate::types::{Key, PropertyValue, TransactionId};
use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Upcast to [`Any`], used to recover the concrete type of a registered state.
///
/// Implemented for every `'static` type; state implementors never write it.
pub trait AsAny: Any {
    /// Returns `self` as `&dyn Any`.
    fn as_any(&self) -> &dyn Any;

    /// Returns `self` as `&mut dyn Any`.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// One unit of pending work managed by a [`Transaction`](crate::Transaction).
///
/// A feature store externalizes whatever it needs for transaction support
/// (a diff map, a pooled connection, a set of feature locks) as a `State`
/// and registers it under a key. Several feature stores may share one
/// state by agreeing on the key.
pub trait State: AsAny + Send {
    /// Called with `Some` when the state is registered and with `None` when
    /// it is unregistered or the transaction closes.
    fn set_transaction(&mut self, owner: Option<Owner<'_>>);

    /// Called for every token passed to `Transaction::add_authorization`.
    fn add_authorization(&mut self, token: &str) -> StateResult<()>;

    /// Makes pending work permanent.
    fn commit(&mut self) -> StateResult<()>;

    /// Discards pending work.
    fn rollback(&mut self) -> StateResult<()>;
}

/// Read-only view of the transaction that owns a state.
///
/// Only valid for the duration of `State::set_transaction`; a state that
/// needs to remember its owner keeps the [`TransactionId`].
#[derive(Clone, Copy)]
pub struct Owner<'a> {
    id: TransactionId,
    handle: &'a str,
    properties: &'a HashMap<Key, PropertyValue>,
    authorizations: &'a HashSet<String>,
}

impl<'a> Owner<'a> {
    pub(crate) fn new(
        id: TransactionId,
        handle: &'a str,
        properties: &'a HashMap<Key, PropertyValue>,
        authorizations: &'a HashSet<String>,
    ) -> Self {
        Self {
            id,
            handle,
            properties,
            authorizations,
        }
    }

    /// Returns the owning transaction's ID.
    #[must_use]
    pub fn id(&self) -> TransactionId {
        self.id
    }

    /// Returns the owning transaction's handle.
    #[must_use]
    pub fn handle(&self) -> &'a str {
        self.handle
    }

    /// Looks up a hint stored with `Transaction::put_property`.
    pub fn property(&self, key: impl Into<Key>) -> Option<&'a PropertyValue> {
        self.properties.get(&key.into())
    }

    /// Authorization tokens currently held by the owner.
    #[must_use]
    pub fn authorizations(&self) -> &'a HashSet<String> {
        self.authorizations
    }
}

impl fmt::Debug for Owner<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Owner")
            .field("id", &self.id)
            .field("handle", &self.handle)
            .field("property_count", &self.properties.len())
            .field("authorizations", &self.authorizations)
            .finish()
    }
}
