//! End-to-end suite exercising the transfer engine against on-disk stores:
//! durability across reopen and serialization of concurrent writers.

use std::path::{Path, PathBuf};
use std::thread;

use rust_decimal::Decimal;
use tempfile::TempDir;

use transfer_core::engine::TransferEngine;
use transfer_core::errors::TransferError;
use transfer_core::ledger::Movement;
use transfer_core::storage::LedgerStore;

fn dec(raw: &str) -> Decimal {
    raw.parse().expect("decimal literal")
}

fn ledger_path(dir: &TempDir) -> PathBuf {
    dir.path().join("ledger.db")
}

fn seed_accounts(path: &Path) -> (i64, i64) {
    let store = LedgerStore::open(path).expect("open store");
    let origin = store
        .create_account("checking", Some(1), dec("100.00"))
        .expect("seed origin")
        .id;
    let destination = store
        .create_account("savings", Some(1), dec("0.00"))
        .expect("seed destination")
        .id;
    (origin, destination)
}

#[test]
fn committed_transfers_survive_reopen() {
    let dir = TempDir::new().expect("temp dir");
    let path = ledger_path(&dir);
    let (origin, destination) = seed_accounts(&path);

    let movement = {
        let mut store = LedgerStore::open(&path).expect("open store");
        TransferEngine::new(&mut store)
            .transfer(origin, destination, dec("40.00"))
            .expect("transfer")
    };

    let reopened = LedgerStore::open(&path).expect("reopen store");
    assert_eq!(
        reopened.account(origin).unwrap().unwrap().balance,
        dec("60.00")
    );
    assert_eq!(
        reopened.account(destination).unwrap().unwrap().balance,
        dec("40.00")
    );
    let history = reopened.movements_for_account(origin).expect("history");
    assert_eq!(history, vec![movement]);
}

#[test]
fn failed_transfer_leaves_no_trace_after_reopen() {
    let dir = TempDir::new().expect("temp dir");
    let path = ledger_path(&dir);
    let (origin, destination) = seed_accounts(&path);

    {
        let mut store = LedgerStore::open(&path).expect("open store");
        let err = TransferEngine::new(&mut store)
            .transfer(origin, destination, dec("250.00"))
            .unwrap_err();
        assert!(matches!(err, TransferError::InsufficientFunds { .. }));
    }

    let reopened = LedgerStore::open(&path).expect("reopen store");
    assert_eq!(
        reopened.account(origin).unwrap().unwrap().balance,
        dec("100.00")
    );
    assert_eq!(reopened.movement_count().unwrap(), 0);
}

#[test]
fn worked_example_sequence() {
    let dir = TempDir::new().expect("temp dir");
    let path = ledger_path(&dir);
    let (origin, destination) = seed_accounts(&path);
    let mut store = LedgerStore::open(&path).expect("open store");
    let mut engine = TransferEngine::new(&mut store);

    engine
        .transfer(origin, destination, dec("40.00"))
        .expect("first transfer");
    engine
        .transfer(origin, destination, dec("50.00"))
        .expect("second transfer");
    let err = engine
        .transfer(origin, destination, dec("20.00"))
        .unwrap_err();

    match err {
        TransferError::InsufficientFunds { balance, requested } => {
            assert_eq!(balance, dec("10.00"));
            assert_eq!(requested, dec("20.00"));
        }
        other => panic!("expected InsufficientFunds, got {other}"),
    }
    assert_eq!(
        store.account(origin).unwrap().unwrap().balance,
        dec("10.00")
    );
    assert_eq!(
        store.account(destination).unwrap().unwrap().balance,
        dec("90.00")
    );
    assert_eq!(store.movement_count().unwrap(), 2);
}

#[test]
fn auto_transfer_adjusts_by_exact_amount_either_sign() {
    let dir = TempDir::new().expect("temp dir");
    let path = ledger_path(&dir);
    let (origin, _) = seed_accounts(&path);
    let mut store = LedgerStore::open(&path).expect("open store");
    let mut engine = TransferEngine::new(&mut store);

    engine
        .auto_transfer(origin, dec("0.05"))
        .expect("deposit");
    engine
        .auto_transfer(origin, dec("-50.05"))
        .expect("withdrawal");

    assert_eq!(
        store.account(origin).unwrap().unwrap().balance,
        dec("50.00")
    );
    let history = store.movements_for_account(origin).expect("history");
    assert_eq!(history.len(), 2);
    assert!(history.iter().all(Movement::is_self_transfer));
}

/// Concurrent debits against one origin account must never drive its
/// balance negative: some subset commits, the rest fail cleanly.
#[test]
fn concurrent_debits_never_overdraw() {
    let dir = TempDir::new().expect("temp dir");
    let path = ledger_path(&dir);
    let (origin, destination) = seed_accounts(&path);

    // Four attempts of 40.00 against 100.00: only two can fit.
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let path = path.clone();
            thread::spawn(move || {
                let mut store = LedgerStore::open(&path).expect("open store");
                TransferEngine::new(&mut store).transfer(origin, destination, dec("40.00"))
            })
        })
        .collect();

    let mut committed = 0u32;
    for handle in handles {
        match handle.join().expect("thread panicked") {
            Ok(_) => committed += 1,
            Err(TransferError::InsufficientFunds { balance, .. }) => {
                assert!(balance >= Decimal::ZERO);
            }
            Err(TransferError::TransactionFailure(_)) => {
                // Lock contention is an acceptable failure mode; a partial
                // commit is not.
            }
            Err(other) => panic!("unexpected failure: {other}"),
        }
    }

    let store = LedgerStore::open(&path).expect("reopen store");
    let origin_balance = store.account(origin).unwrap().unwrap().balance;
    let destination_balance = store.account(destination).unwrap().unwrap().balance;

    assert!(committed <= 2, "more debits committed than the balance held");
    assert_eq!(
        origin_balance,
        dec("100.00") - dec("40.00") * Decimal::from(committed)
    );
    assert_eq!(
        destination_balance,
        dec("40.00") * Decimal::from(committed)
    );
    assert!(origin_balance >= Decimal::ZERO);
    assert_eq!(store.movement_count().unwrap(), i64::from(committed));
}
