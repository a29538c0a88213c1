//! Integration tests for the SafeFlow client core
//!
//! Run with: cargo test --test integration_test
//!
//! These exercise the full reconciliation flow against a temp-file store
//! and walk a stream through its lifecycle. No network required.

use tempfile::tempdir;

use safeflow_client::address;
use safeflow_client::amount;
use safeflow_client::stream::{Stream, StreamStatus};
use safeflow_client::tracker::{ReconciliationTracker, TransferStatus, TransferStore, RETENTION_MS};
use safeflow_client::vesting::{compute_vesting, DripInterval};

const ADMIN: &str = "ST1PQHQKV0RJXZFY1DGX8MNSNYVE3VGZJSRTPGZGM";
const RECIPIENT: &str = "ST2CY5V39NHDPWSXMW9QDT3HC3GD6Q6XX4CFRK9AG";

fn funded_stream() -> Stream {
    Stream {
        id: 1,
        admin: ADMIN.to_string(),
        recipient: RECIPIENT.to_string(),
        title: "Payroll".to_string(),
        description: "Monthly retainer".to_string(),
        total_amount: 1_000_000_000,
        claimed_amount: 0,
        drip_rate: 100_000_000,
        drip_interval: DripInterval::Daily,
        start_block: 0,
        last_claim_block: 0,
        status: StreamStatus::Active,
    }
}

#[test]
fn reconciliation_flow_end_to_end() {
    let dir = tempdir().unwrap();
    let store = TransferStore::new(dir.path().join("transfers.json"));
    let mut tracker = ReconciliationTracker::load(store.clone(), 0, RETENTION_MS).unwrap();

    // Submit an outbound deposit
    let micro = amount::to_micro("1,000").unwrap();
    assert_eq!(micro, 1_000_000_000);
    tracker
        .record_pending("0xdeadbeef", "1000", RECIPIENT, 1_000)
        .unwrap();
    assert!(tracker.has_pending());

    // First balance observation seeds the baseline only
    assert!(tracker.reconcile(500_000_000).unwrap().is_none());
    assert!(tracker.has_pending());

    // The bridged value lands: delta completes the transfer
    let completed = tracker.reconcile(1_500_000_000).unwrap().unwrap();
    assert_eq!(completed.delta, 1_000_000_000);
    assert_eq!(completed.completed, 1);
    assert_eq!(amount::to_display(completed.delta), "1,000");

    // The completion survives a reload from disk
    let reloaded = ReconciliationTracker::load(store, 2_000, RETENTION_MS).unwrap();
    assert_eq!(reloaded.transfers().len(), 1);
    assert_eq!(reloaded.transfers()[0].status, TransferStatus::Completed);
    assert!(!reloaded.has_pending());
}

#[test]
fn stale_transfers_pruned_across_restart() {
    let dir = tempdir().unwrap();
    let store = TransferStore::new(dir.path().join("transfers.json"));

    let mut tracker = ReconciliationTracker::load(store.clone(), 0, RETENTION_MS).unwrap();
    tracker
        .record_pending("0xold", "5", RECIPIENT, 1_000)
        .unwrap();

    // Reload well past the retention window
    let reloaded =
        ReconciliationTracker::load(store, 1_000 + RETENTION_MS + 1, RETENTION_MS).unwrap();
    assert!(reloaded.transfers().is_empty());
}

#[test]
fn stream_lifecycle_walkthrough() {
    let mut stream = funded_stream();

    // Vest two periods, recipient claims
    let info = compute_vesting(&stream, 288);
    assert_eq!(info.claimable, 200_000_000);
    let claimed = stream.claim(RECIPIENT, 288).unwrap();
    assert_eq!(claimed, 200_000_000);
    assert_eq!(stream.claimed_amount, 200_000_000);
    assert_eq!(stream.last_claim_block, 288);

    // Admin freezes, claims are blocked
    stream.freeze(ADMIN).unwrap();
    assert_eq!(stream.status, StreamStatus::Frozen);
    assert!(stream.claim(RECIPIENT, 432).is_err());

    // Unfreeze, claiming resumes
    stream.unfreeze(ADMIN).unwrap();
    let claimed = stream.claim(RECIPIENT, 432).unwrap();
    assert_eq!(claimed, 100_000_000);

    // Rate update changes only rate and interval
    stream
        .update_drip_rate(ADMIN, 50_000_000, DripInterval::Monthly)
        .unwrap();
    assert_eq!(stream.drip_rate, 50_000_000);
    assert_eq!(stream.drip_interval, DripInterval::Monthly);
    assert_eq!(stream.total_amount, 1_000_000_000);
    assert_eq!(stream.claimed_amount, 300_000_000);

    // Cancel is terminal
    let returned = stream.cancel(ADMIN).unwrap();
    assert_eq!(returned, 700_000_000);
    assert_eq!(stream.status, StreamStatus::Cancelled);
    assert!(stream.claim(RECIPIENT, 10_000).is_err());
    assert!(stream.freeze(ADMIN).is_err());
    assert!(stream
        .update_drip_rate(ADMIN, 1, DripInterval::Daily)
        .is_err());
}

#[test]
fn bridge_recipient_encoding_for_claimed_stream() {
    // A valid recipient address encodes into the bridge payload shape
    assert!(address::validate(RECIPIENT));
    let encoded = address::encode_recipient32(RECIPIENT).unwrap();
    assert!(encoded[..11].iter().all(|b| *b == 0));
    assert_eq!(encoded[11], address::TESTNET_P2PKH);

    // A recipient that fails validation never reaches the bridge
    assert!(!address::validate("XY1PQHQKV0RJXZFY1DGX8MNSNYVE3VGZJSRTPGZGM"));
    assert!(address::encode_recipient32("XY1PQHQKV0RJXZFY1DGX8MNSNYVE3VGZJSRTPGZGM").is_err());
}
