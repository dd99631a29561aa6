//! End-to-end transaction scenarios.

use geotxn_testkit::prelude::*;
use std::error::Error as _;

fn transaction(handle: &str) -> Transaction {
    init_test_logging();
    Transaction::new(handle)
}

#[test]
fn authorized_commit_reaches_every_state() {
    let log = CallLog::new();
    let mut txn = transaction("T1");
    txn.register("conn1", Box::new(RecordingState::new("A", &log)))
        .unwrap();
    txn.register("conn2", Box::new(RecordingState::new("B", &log)))
        .unwrap();

    txn.add_authorization("AUTH-7").unwrap();
    let held: Vec<_> = txn.authorizations().unwrap().iter().cloned().collect();
    assert_eq!(held, vec!["AUTH-7".to_owned()]);

    txn.commit().unwrap();

    assert_eq!(log.count("A", &Call::Commit), 1);
    assert_eq!(log.count("B", &Call::Commit), 1);
    assert_eq!(log.count("A", &Call::AddAuthorization("AUTH-7".into())), 1);
    assert!(txn.authorizations().unwrap().is_empty());
}

#[test]
fn single_commit_failure_passes_through() {
    let log = CallLog::new();
    let mut txn = transaction("T1");
    txn.register(
        "conn1",
        Box::new(RecordingState::new("A", &log).fail_on(FanOut::Commit, "disk full")),
    )
    .unwrap();
    txn.register("conn2", Box::new(RecordingState::new("B", &log)))
        .unwrap();

    let err = txn.commit().unwrap_err();

    match err {
        TxnError::State(StateError::Failed { message }) => assert_eq!(message, "disk full"),
        other => panic!("expected passthrough, got {other:?}"),
    }
    assert_eq!(log.count("B", &Call::Commit), 1);
}

#[test]
fn rollback_failures_are_aggregated_without_short_circuit() {
    let log = CallLog::new();
    let mut txn = transaction("T1");
    txn.register(
        "a",
        Box::new(RecordingState::new("A", &log).fail_on(FanOut::Rollback, "a broke")),
    )
    .unwrap();
    txn.register(
        "b",
        Box::new(RecordingState::new("B", &log).fail_on(FanOut::Rollback, "b broke")),
    )
    .unwrap();
    txn.register("c", Box::new(RecordingState::new("C", &log)))
        .unwrap();

    let err = txn.rollback().unwrap_err();

    assert!(matches!(
        err,
        TxnError::Aggregated {
            operation: FanOut::Rollback,
            count: 2,
            ..
        }
    ));
    let cause = err.source().map(ToString::to_string).unwrap();
    assert!(cause == "a broke" || cause == "b broke");
    for name in ["A", "B", "C"] {
        assert_eq!(log.count(name, &Call::Rollback), 1);
    }
}

#[test]
fn property_after_close_fails() {
    let mut txn = transaction("T1");
    txn.close().unwrap();

    let err = txn.property("k").unwrap_err();
    assert!(err.is_closed());
}

#[test]
fn duplicate_registration_leaves_registry_unchanged() {
    let log = CallLog::new();
    let mut txn = transaction("T1");
    txn.register("k", Box::new(RecordingState::new("s1", &log)))
        .unwrap();

    let err = txn
        .register("k", Box::new(RecordingState::new("s2", &log)))
        .unwrap_err();

    assert!(matches!(err, TxnError::DuplicateKey { .. }));
    let current = txn.state_as::<RecordingState>("k").unwrap().unwrap();
    assert_eq!(current.name(), "s1");
    assert!(log.calls_for("s2").is_empty());
}

#[test]
fn token_keys_are_distinct_from_each_other() {
    let log = CallLog::new();
    let mut txn = transaction("T1");
    let first = KeyToken::new();
    txn.register(first, Box::new(RecordingState::new("s1", &log)))
        .unwrap();
    txn.register(KeyToken::new(), Box::new(RecordingState::new("s2", &log)))
        .unwrap();

    assert_eq!(txn.len().unwrap(), 2);
    assert!(txn.register(first, Box::new(RecordingState::new("s3", &log))).is_err());
}

#[test]
fn unregister_unknown_key_changes_nothing() {
    let log = CallLog::new();
    let mut txn = transaction("T1");
    txn.register("k", Box::new(RecordingState::new("s1", &log)))
        .unwrap();
    let before = log.events();

    let err = txn.unregister("missing").err().unwrap();

    assert!(matches!(err, TxnError::UnknownKey { .. }));
    assert_eq!(txn.len().unwrap(), 1);
    assert_eq!(log.events(), before);
}

#[test]
fn every_operation_fails_after_close() {
    let log = CallLog::new();
    let mut txn = transaction("T1");
    txn.register("k", Box::new(RecordingState::new("s1", &log)))
        .unwrap();
    txn.close().unwrap();

    assert!(txn
        .register("k2", Box::new(RecordingState::new("s2", &log)))
        .unwrap_err()
        .is_closed());
    assert!(txn.unregister("k").err().unwrap().is_closed());
    assert!(txn.lookup("k").err().unwrap().is_closed());
    assert!(txn.property("k").unwrap_err().is_closed());
    assert!(txn
        .put_property("k", PropertyValue::new(1_u8))
        .unwrap_err()
        .is_closed());
    assert!(txn.authorizations().unwrap_err().is_closed());
    assert!(txn.add_authorization("AUTH").unwrap_err().is_closed());
    assert!(txn.commit().unwrap_err().is_closed());
    assert!(txn.rollback().unwrap_err().is_closed());
}

#[test]
fn owner_notifications_follow_registration() {
    let log = CallLog::new();
    let mut txn = transaction("T1");
    txn.register("a", Box::new(RecordingState::new("A", &log)))
        .unwrap();
    txn.register("b", Box::new(RecordingState::new("B", &log)))
        .unwrap();

    assert_eq!(log.owners("A"), vec![Some(txn.id())]);

    txn.unregister("a").unwrap();
    assert_eq!(log.owners("A"), vec![Some(txn.id()), None]);

    txn.close().unwrap();
    assert_eq!(log.owners("B"), vec![Some(txn.id()), None]);
}

#[test]
fn close_does_not_commit_or_rollback() {
    let log = CallLog::new();
    let mut txn = transaction("T1");
    txn.register("a", Box::new(RecordingState::new("A", &log)))
        .unwrap();

    txn.close().unwrap();

    assert_eq!(log.total(&Call::Commit), 0);
    assert_eq!(log.total(&Call::Rollback), 0);
}

#[test]
fn close_policies() {
    let mut lenient = transaction("T1");
    lenient.close().unwrap();
    lenient.close().unwrap();

    let mut strict = Transaction::with_config(
        TransactionConfig::new()
            .handle("T2")
            .close_policy(ClosePolicy::Strict),
    );
    strict.close().unwrap();
    assert!(strict.close().unwrap_err().is_closed());
}

#[test]
fn dropping_open_transaction_releases_states() {
    let log = CallLog::new();
    let id = {
        let mut txn = transaction("T1");
        txn.register("a", Box::new(RecordingState::new("A", &log)))
            .unwrap();
        txn.id()
    };

    assert_eq!(log.owners("A"), vec![Some(id), None]);
}

#[test]
fn authorization_failures_keep_the_token() {
    let log = CallLog::new();
    let mut txn = transaction("T1");
    for name in ["A", "B"] {
        let state = RecordingState::new(name, &log).fail_on(FanOut::AddAuthorization, "locked");
        txn.register(name, Box::new(state)).unwrap();
    }

    let err = txn.add_authorization("AUTH-1").unwrap_err();

    assert!(matches!(
        err,
        TxnError::Aggregated {
            operation: FanOut::AddAuthorization,
            count: 2,
            ..
        }
    ));
    assert!(txn.authorizations().unwrap().contains("AUTH-1"));
}

#[test]
fn unauthorized_token_passes_through() {
    let log = CallLog::new();
    let mut txn = transaction("T1");
    txn.register(
        "a",
        Box::new(RecordingState::new("A", &log).reject_token("AUTH-9")),
    )
    .unwrap();
    txn.register("b", Box::new(RecordingState::new("B", &log)))
        .unwrap();

    let err = txn.add_authorization("AUTH-9").unwrap_err();

    match err {
        TxnError::State(StateError::Unauthorized { token }) => assert_eq!(token, "AUTH-9"),
        other => panic!("expected unauthorized passthrough, got {other:?}"),
    }
    assert_eq!(log.count("B", &Call::AddAuthorization("AUTH-9".into())), 1);
    assert!(txn.authorizations().unwrap().contains("AUTH-9"));
}

/// Reads a hint while being connected to its transaction.
struct HintReader {
    hint: Option<u32>,
}

impl State for HintReader {
    fn set_transaction(&mut self, owner: Option<Owner<'_>>) {
        if let Some(owner) = owner {
            self.hint = owner
                .property("fetch_size")
                .and_then(|v| v.downcast_ref::<u32>())
                .copied();
        }
    }

    fn add_authorization(&mut self, _token: &str) -> StateResult<()> {
        Ok(())
    }

    fn commit(&mut self) -> StateResult<()> {
        Ok(())
    }

    fn rollback(&mut self) -> StateResult<()> {
        Ok(())
    }
}

#[test]
fn state_reads_hints_when_connected() {
    let mut txn = transaction("T1");
    txn.put_property("fetch_size", PropertyValue::new(500_u32))
        .unwrap();

    txn.register("reader", Box::new(HintReader { hint: None }))
        .unwrap();

    let reader = txn.state_as::<HintReader>("reader").unwrap().unwrap();
    assert_eq!(reader.hint, Some(500));
    assert!(txn.state_as::<RecordingState>("reader").unwrap().is_none());
}

#[test]
fn storage_layer_accepts_either_mode() {
    fn save(txn: &mut dyn Transactional) -> TxnResult<()> {
        if txn.is_auto_commit() {
            return Ok(());
        }
        txn.put_property(Key::from("saved"), PropertyValue::new(true))?;
        txn.commit()
    }

    let mut auto = AutoCommit::new();
    save(&mut auto).unwrap();
    assert!(auto.rollback().is_err());

    let mut txn = transaction("T1");
    save(&mut txn).unwrap();
    assert_eq!(txn.property_as::<bool>("saved").unwrap(), Some(&true));
}

#[test]
fn shared_transaction_close_locks_out_other_handles() {
    let log = CallLog::new();
    let mut txn = transaction("T1");
    txn.register("a", Box::new(RecordingState::new("A", &log)))
        .unwrap();
    let shared = SharedTransaction::new(txn);
    let worker = shared.clone();

    std::thread::spawn(move || worker.commit())
        .join()
        .unwrap()
        .unwrap();
    shared.close().unwrap();

    assert_eq!(log.count("A", &Call::Commit), 1);
    assert!(shared.commit().unwrap_err().is_closed());
}
