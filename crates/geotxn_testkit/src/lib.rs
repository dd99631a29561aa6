//! # GeoTxn Testkit
//!
//! Test utilities for GeoTxn.
//!
//! This crate provides:
//! - Recording [`State`](geotxn_core::State) fixtures with configurable failures
//! - Property-based test generators using proptest
//! - Opt-in log output for tests
//!
//! ## Usage
//!
//! ```rust,ignore
//! use geotxn_testkit::prelude::*;
//!
//! #[test]
//! fn commit_reaches_every_state() {
//!     let log = CallLog::new();
//!     let mut txn = Transaction::new("T1");
//!     txn.register("a", Box::new(RecordingState::new("a", &log))).unwrap();
//!     txn.commit().unwrap();
//!     assert_eq!(log.count("a", &Call::Commit), 1);
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod logging;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::logging::*;
    pub use geotxn_core::{
        AutoCommit, ClosePolicy, FanOut, Key, KeyToken, Owner, PropertyValue, SharedTransaction,
        State, StateError, StateResult, Transaction, TransactionConfig, TransactionId,
        Transactional, TxnError, TxnResult,
    };
}

pub use fixtures::*;
pub use generators::*;
pub use logging::*;
