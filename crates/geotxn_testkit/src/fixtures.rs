//! Recording states and call logs.
//!
//! A [`RecordingState`] is moved into the transaction on registration, so
//! its calls are written to a [`CallLog`] the test keeps a clone of.

use geotxn_core::{FanOut, Owner, State, StateError, StateResult, Transaction, TransactionId};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// A callback received by a state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    /// `set_transaction`, with the owner's ID or `None`.
    SetTransaction(Option<TransactionId>),
    /// `add_authorization` with the token.
    AddAuthorization(String),
    /// `commit`.
    Commit,
    /// `rollback`.
    Rollback,
}

/// A call received by a named state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    /// Name of the state.
    pub state: String,
    /// The call.
    pub call: Call,
}

/// Shared, append-only record of state callbacks.
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    events: Arc<Mutex<Vec<Event>>>,
}

impl CallLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, state: &str, call: Call) {
        self.events.lock().push(Event {
            state: state.to_owned(),
            call,
        });
    }

    /// Returns every event in the order received.
    #[must_use]
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }

    /// Returns the calls received by one state.
    #[must_use]
    pub fn calls_for(&self, state: &str) -> Vec<Call> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.state == state)
            .map(|e| e.call.clone())
            .collect()
    }

    /// Counts how often `state` received `call`.
    #[must_use]
    pub fn count(&self, state: &str, call: &Call) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|e| e.state == state && &e.call == call)
            .count()
    }

    /// Counts how often any state received `call`.
    #[must_use]
    pub fn total(&self, call: &Call) -> usize {
        self.events.lock().iter().filter(|e| &e.call == call).count()
    }

    /// Returns the owner notifications received by one state.
    #[must_use]
    pub fn owners(&self, state: &str) -> Vec<Option<TransactionId>> {
        self.calls_for(state)
            .into_iter()
            .filter_map(|call| match call {
                Call::SetTransaction(owner) => Some(owner),
                _ => None,
            })
            .collect()
    }

    /// Forgets all events.
    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

/// A state that records its callbacks and fails on demand.
#[derive(Debug)]
pub struct RecordingState {
    name: String,
    log: CallLog,
    failures: HashMap<FanOut, String>,
    rejected_tokens: HashSet<String>,
}

impl RecordingState {
    /// Creates a state that succeeds at everything.
    pub fn new(name: impl Into<String>, log: &CallLog) -> Self {
        Self {
            name: name.into(),
            log: log.clone(),
            failures: HashMap::new(),
            rejected_tokens: HashSet::new(),
        }
    }

    /// Makes `operation` fail with `message`.
    #[must_use]
    pub fn fail_on(mut self, operation: FanOut, message: impl Into<String>) -> Self {
        self.failures.insert(operation, message.into());
        self
    }

    /// Makes `add_authorization` refuse `token` as unauthorized.
    #[must_use]
    pub fn reject_token(mut self, token: impl Into<String>) -> Self {
        self.rejected_tokens.insert(token.into());
        self
    }

    /// Returns the state's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    fn outcome(&self, operation: FanOut) -> StateResult<()> {
        match self.failures.get(&operation) {
            Some(message) => Err(StateError::failed(message.clone())),
            None => Ok(()),
        }
    }
}

impl State for RecordingState {
    fn set_transaction(&mut self, owner: Option<Owner<'_>>) {
        self.log
            .record(&self.name, Call::SetTransaction(owner.map(|o| o.id())));
    }

    fn add_authorization(&mut self, token: &str) -> StateResult<()> {
        self.log
            .record(&self.name, Call::AddAuthorization(token.to_owned()));
        if self.rejected_tokens.contains(token) {
            return Err(StateError::unauthorized(token));
        }
        self.outcome(FanOut::AddAuthorization)
    }

    fn commit(&mut self) -> StateResult<()> {
        self.log.record(&self.name, Call::Commit);
        self.outcome(FanOut::Commit)
    }

    fn rollback(&mut self) -> StateResult<()> {
        self.log.record(&self.name, Call::Rollback);
        self.outcome(FanOut::Rollback)
    }
}

/// Registers one recording state per entry of `plan`.
///
/// State `i` is named `state-i` and fails on `operation` when `plan[i]` is
/// true. Returns the names in registration order.
pub fn register_states(
    txn: &mut Transaction,
    log: &CallLog,
    plan: &[bool],
    operation: FanOut,
) -> Vec<String> {
    plan.iter()
        .enumerate()
        .map(|(i, &fails)| {
            let name = format!("state-{i}");
            let mut state = RecordingState::new(name.clone(), log);
            if fails {
                state = state.fail_on(operation, format!("{name} failed"));
            }
            txn.register(name.clone(), Box::new(state))
                .expect("state names are unique");
            name
        })
        .collect()
}
