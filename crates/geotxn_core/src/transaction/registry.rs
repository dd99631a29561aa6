//! The transaction registry.

use crate::config::{ClosePolicy, TransactionConfig};
use crate::error::{FanOut, StateError, StateResult, TxnError, TxnResult};
use crate::state::{AsAny, Owner, State};
use crate::transaction::Transactional;
use crate::types::{Key, PropertyValue, TransactionId};
use std::any::Any;
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::panic::Location;
use tracing::{debug, trace, warn};

/// Collections owned by an open transaction.
#[derive(Default)]
struct Registry {
    /// Externalized state by key.
    states: HashMap<Key, Box<dyn State>>,
    /// Tokens valid until the next commit/rollback.
    authorizations: HashSet<String>,
    /// Hints by key.
    properties: HashMap<Key, PropertyValue>,
}

/// Coordinates commit and rollback across registered states.
///
/// A transaction starts open and is closed exactly once, either explicitly
/// with [`close`](Self::close) or when dropped. Every operation other than
/// `close` fails with [`TxnError::Closed`] afterwards.
///
/// Mutating operations take `&mut self`, so a transaction has a single
/// owner at a time. Wrap it in a [`SharedTransaction`](crate::SharedTransaction)
/// to hand it to several threads.
///
/// ## Fan-out
///
/// `commit`, `rollback` and `add_authorization` visit every registered
/// state once, in no particular order, even when earlier states fail. A
/// single failure is returned as [`TxnError::State`] unchanged; two or more
/// become [`TxnError::Aggregated`] carrying the count and the last failure.
/// No atomicity across states is implied.
pub struct Transaction {
    /// Transaction ID.
    id: TransactionId,
    /// Label for the user.
    handle: String,
    /// Behavior of repeated `close` calls.
    close_policy: ClosePolicy,
    /// `None` once closed.
    registry: Option<Registry>,
}

impl Transaction {
    /// Creates an open transaction with the given handle.
    pub fn new(handle: impl Into<String>) -> Self {
        Self::with_config(TransactionConfig::new().handle(handle))
    }

    /// Creates an open transaction from a configuration.
    ///
    /// Without a configured handle, the handle names the calling source
    /// location.
    #[track_caller]
    pub fn with_config(config: TransactionConfig) -> Self {
        let caller = Location::caller();
        let handle = config
            .handle
            .unwrap_or_else(|| format!("{}:{} Transaction", caller.file(), caller.line()));
        let id = TransactionId::new();
        debug!(%id, %handle, "opened transaction");

        Self {
            id,
            handle,
            close_policy: config.close_policy,
            registry: Some(Registry::default()),
        }
    }

    /// Returns the transaction ID.
    #[must_use]
    pub fn id(&self) -> TransactionId {
        self.id
    }

    /// Returns the handle.
    #[must_use]
    pub fn handle(&self) -> &str {
        &self.handle
    }

    /// Returns the close policy.
    #[must_use]
    pub fn close_policy(&self) -> ClosePolicy {
        self.close_policy
    }

    /// Checks if the transaction has been closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.registry.is_none()
    }

    /// Registers `state` under `key` and hands it its owner.
    ///
    /// Fails with [`TxnError::DuplicateKey`] if a state is already
    /// registered under `key`; the registry is left unchanged and the
    /// rejected state is dropped without notification.
    pub fn register(&mut self, key: impl Into<Key>, state: Box<dyn State>) -> TxnResult<()> {
        let registry = Self::open_mut(&mut self.registry, &self.handle)?;
        let Registry {
            states,
            authorizations,
            properties,
        } = registry;

        match states.entry(key.into()) {
            Entry::Occupied(entry) => {
                debug!(handle = %self.handle, key = %entry.key(), "rejected duplicate state");
                Err(TxnError::duplicate_key(entry.key().clone()))
            }
            Entry::Vacant(entry) => {
                debug!(handle = %self.handle, key = %entry.key(), "registered state");
                let state = entry.insert(state);
                state.set_transaction(Some(Owner::new(
                    self.id,
                    &self.handle,
                    properties,
                    authorizations,
                )));
                Ok(())
            }
        }
    }

    /// Removes the state registered under `key` and returns it.
    ///
    /// The state is told it no longer has an owner.
    pub fn unregister(&mut self, key: impl Into<Key>) -> TxnResult<Box<dyn State>> {
        let key = key.into();
        let registry = Self::open_mut(&mut self.registry, &self.handle)?;

        let Some(mut state) = registry.states.remove(&key) else {
            return Err(TxnError::unknown_key(key));
        };
        state.set_transaction(None);
        debug!(handle = %self.handle, %key, "unregistered state");
        Ok(state)
    }

    /// Returns the state registered under `key`, if any.
    pub fn lookup(&self, key: impl Into<Key>) -> TxnResult<Option<&(dyn State + 'static)>> {
        let key = key.into();
        let registry = Self::open(&self.registry, &self.handle)?;
        trace!(handle = %self.handle, %key, "state lookup");
        Ok(registry.states.get(&key).map(|state| &**state))
    }

    /// Returns the state registered under `key` for modification, if any.
    pub fn lookup_mut(
        &mut self,
        key: impl Into<Key>,
    ) -> TxnResult<Option<&mut (dyn State + 'static)>> {
        let key = key.into();
        let registry = Self::open_mut(&mut self.registry, &self.handle)?;
        trace!(handle = %self.handle, %key, "mutable state lookup");
        Ok(registry.states.get_mut(&key).map(|state| &mut **state))
    }

    /// Returns the state registered under `key` if it is a `T`.
    pub fn state_as<T: State>(&self, key: impl Into<Key>) -> TxnResult<Option<&T>> {
        let key = key.into();
        let registry = Self::open(&self.registry, &self.handle)?;
        trace!(handle = %self.handle, %key, "typed state lookup");
        Ok(registry
            .states
            .get(&key)
            .and_then(|state| <dyn State as AsAny>::as_any(&**state).downcast_ref::<T>()))
    }

    /// Returns the state registered under `key` for modification if it is a `T`.
    pub fn state_as_mut<T: State>(&mut self, key: impl Into<Key>) -> TxnResult<Option<&mut T>> {
        let key = key.into();
        let registry = Self::open_mut(&mut self.registry, &self.handle)?;
        trace!(handle = %self.handle, %key, "typed mutable state lookup");
        Ok(registry
            .states
            .get_mut(&key)
            .and_then(|state| <dyn State as AsAny>::as_any_mut(&mut **state).downcast_mut::<T>()))
    }

    /// Checks if a state is registered under `key`.
    pub fn contains(&self, key: impl Into<Key>) -> TxnResult<bool> {
        let registry = Self::open(&self.registry, &self.handle)?;
        Ok(registry.states.contains_key(&key.into()))
    }

    /// Returns the number of registered states.
    pub fn len(&self) -> TxnResult<usize> {
        Ok(Self::open(&self.registry, &self.handle)?.states.len())
    }

    /// Checks if no state is registered.
    pub fn is_empty(&self) -> TxnResult<bool> {
        Ok(Self::open(&self.registry, &self.handle)?.states.is_empty())
    }

    /// Returns the registered keys in unspecified order.
    pub fn keys(&self) -> TxnResult<impl Iterator<Item = &Key>> {
        Ok(Self::open(&self.registry, &self.handle)?.states.keys())
    }

    /// Commits every registered state.
    ///
    /// Authorizations are cleared afterwards whether or not a state failed.
    pub fn commit(&mut self) -> TxnResult<()> {
        let result = self.fan_out(FanOut::Commit, |state| state.commit());
        self.clear_authorizations();
        result
    }

    /// Rolls back every registered state.
    ///
    /// Authorizations are cleared afterwards whether or not a state failed.
    pub fn rollback(&mut self) -> TxnResult<()> {
        let result = self.fan_out(FanOut::Rollback, |state| state.rollback());
        self.clear_authorizations();
        result
    }

    /// Records `token` and passes it to every registered state.
    ///
    /// The token is kept even if some states reject it.
    pub fn add_authorization(&mut self, token: impl Into<String>) -> TxnResult<()> {
        let token = token.into();
        let registry = Self::open_mut(&mut self.registry, &self.handle)?;
        registry.authorizations.insert(token.clone());
        self.fan_out(FanOut::AddAuthorization, |state| {
            state.add_authorization(&token)
        })
    }

    /// Authorization tokens held until the next commit/rollback.
    pub fn authorizations(&self) -> TxnResult<&HashSet<String>> {
        Ok(&Self::open(&self.registry, &self.handle)?.authorizations)
    }

    /// Looks up a hint.
    pub fn property(&self, key: impl Into<Key>) -> TxnResult<Option<&PropertyValue>> {
        let registry = Self::open(&self.registry, &self.handle)?;
        Ok(registry.properties.get(&key.into()))
    }

    /// Looks up a hint of type `T`.
    pub fn property_as<T: Any>(&self, key: impl Into<Key>) -> TxnResult<Option<&T>> {
        Ok(self.property(key)?.and_then(PropertyValue::downcast_ref::<T>))
    }

    /// Stores a hint, returning the value it replaced.
    pub fn put_property(
        &mut self,
        key: impl Into<Key>,
        value: PropertyValue,
    ) -> TxnResult<Option<PropertyValue>> {
        let registry = Self::open_mut(&mut self.registry, &self.handle)?;
        Ok(registry.properties.insert(key.into(), value))
    }

    /// Closes the transaction.
    ///
    /// Every registered state is told it no longer has an owner, then all
    /// states, authorizations and properties are released. States are not
    /// committed or rolled back. A second call is governed by the
    /// [`ClosePolicy`].
    pub fn close(&mut self) -> TxnResult<()> {
        match self.registry.take() {
            Some(registry) => {
                self.release(registry);
                Ok(())
            }
            None => match self.close_policy {
                ClosePolicy::Idempotent => Ok(()),
                ClosePolicy::Strict => Err(TxnError::closed(&self.handle)),
            },
        }
    }

    fn release(&self, mut registry: Registry) {
        for state in registry.states.values_mut() {
            state.set_transaction(None);
        }
        debug!(
            handle = %self.handle,
            states = registry.states.len(),
            "closed transaction"
        );
    }

    fn clear_authorizations(&mut self) {
        if let Some(registry) = self.registry.as_mut() {
            registry.authorizations.clear();
        }
    }

    /// Calls `call` on every state and aggregates the failures.
    fn fan_out<F>(&mut self, operation: FanOut, mut call: F) -> TxnResult<()>
    where
        F: FnMut(&mut (dyn State + 'static)) -> StateResult<()>,
    {
        let registry = Self::open_mut(&mut self.registry, &self.handle)?;
        let mut count = 0;
        let mut last: Option<StateError> = None;

        for (key, state) in &mut registry.states {
            if let Err(err) = call(&mut **state) {
                warn!(
                    handle = %self.handle,
                    %key,
                    %operation,
                    error = %err,
                    "state failed"
                );
                count += 1;
                last = Some(err);
            }
        }

        debug!(
            handle = %self.handle,
            %operation,
            states = registry.states.len(),
            failures = count,
            "fan-out complete"
        );

        match last {
            None => Ok(()),
            Some(err) if count == 1 => Err(TxnError::State(err)),
            Some(last) => Err(TxnError::Aggregated {
                operation,
                count,
                last,
            }),
        }
    }

    fn open<'r>(registry: &'r Option<Registry>, handle: &str) -> TxnResult<&'r Registry> {
        registry.as_ref().ok_or_else(|| TxnError::closed(handle))
    }

    fn open_mut<'r>(
        registry: &'r mut Option<Registry>,
        handle: &str,
    ) -> TxnResult<&'r mut Registry> {
        registry.as_mut().ok_or_else(|| TxnError::closed(handle))
    }
}

impl Default for Transaction {
    #[track_caller]
    fn default() -> Self {
        Self::with_config(TransactionConfig::default())
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.take() {
            self.release(registry);
        }
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.handle)
    }
}

impl fmt::Debug for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transaction")
            .field("id", &self.id)
            .field("handle", &self.handle)
            .field("closed", &self.is_closed())
            .field(
                "state_count",
                &self.registry.as_ref().map_or(0, |r| r.states.len()),
            )
            .finish_non_exhaustive()
    }
}

impl Transactional for Transaction {
    fn handle(&self) -> &str {
        &self.handle
    }

    fn commit(&mut self) -> TxnResult<()> {
        Transaction::commit(self)
    }

    fn rollback(&mut self) -> TxnResult<()> {
        Transaction::rollback(self)
    }

    fn add_authorization(&mut self, token: &str) -> TxnResult<()> {
        Transaction::add_authorization(self, token)
    }

    fn authorizations(&self) -> TxnResult<&HashSet<String>> {
        Transaction::authorizations(self)
    }

    fn property(&self, key: &Key) -> TxnResult<Option<&PropertyValue>> {
        Transaction::property(self, key)
    }

    fn put_property(&mut self, key: Key, value: PropertyValue) -> TxnResult<Option<PropertyValue>> {
        Transaction::put_property(self, key, value)
    }

    fn close(&mut self) -> TxnResult<()> {
        Transaction::close(self)
    }
}
