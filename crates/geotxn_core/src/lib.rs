//! # GeoTxn Core
//!
//! Transaction registry for feature stores.
//!
//! A [`Transaction`] coordinates several independent units of pending work
//! ([`State`]s) under one commit/rollback boundary. This crate provides:
//! - Registration of externalized state by [`Key`]
//! - Best-effort commit, rollback and authorization fan-out with aggregated
//!   failure reporting
//! - Authorization tokens scoped to one commit/rollback cycle
//! - A property blackboard for hints between callers and states
//! - [`AutoCommit`], the immediate-mode stand-in
//!
//! ## Example
//!
//! ```
//! use geotxn_core::{Owner, State, StateResult, Transaction};
//!
//! struct Connection {
//!     pending: Vec<String>,
//! }
//!
//! impl State for Connection {
//!     fn set_transaction(&mut self, _owner: Option<Owner<'_>>) {}
//!     fn add_authorization(&mut self, _token: &str) -> StateResult<()> {
//!         Ok(())
//!     }
//!     fn commit(&mut self) -> StateResult<()> {
//!         self.pending.clear();
//!         Ok(())
//!     }
//!     fn rollback(&mut self) -> StateResult<()> {
//!         self.pending.clear();
//!         Ok(())
//!     }
//! }
//!
//! let mut txn = Transaction::new("roads");
//! txn.register("jdbc:postgresql://gis", Box::new(Connection { pending: Vec::new() }))?;
//! txn.add_authorization("LOCK-1")?;
//! txn.commit()?;
//! assert!(txn.authorizations()?.is_empty());
//! txn.close()?;
//! # Ok::<(), geotxn_core::TxnError>(())
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
mod state;
mod transaction;
mod types;

pub use config::{ClosePolicy, TransactionConfig};
pub use error::{FanOut, StateError, StateResult, TxnError, TxnResult};
pub use state::{AsAny, Owner, State};
pub use transaction::{AutoCommit, SharedTransaction, Transaction, Transactional};
pub use types::{Key, KeyToken, PropertyValue, TransactionId};
