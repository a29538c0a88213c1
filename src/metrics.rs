//! Prometheus metrics for the SafeFlow client
//!
//! Exposes metrics on the /metrics endpoint for Prometheus scraping.

#![allow(dead_code)]

use lazy_static::lazy_static;
use prometheus::{register_counter, register_gauge, Counter, Gauge};

lazy_static! {
    // Reconciliation metrics
    pub static ref BALANCE_POLLS: Counter = register_counter!(
        "safeflow_balance_polls_total",
        "Total number of destination balance polls"
    ).unwrap();

    pub static ref BALANCE_POLL_FAILURES: Counter = register_counter!(
        "safeflow_balance_poll_failures_total",
        "Total number of failed destination balance reads"
    ).unwrap();

    pub static ref COMPLETIONS_DETECTED: Counter = register_counter!(
        "safeflow_bridge_completions_total",
        "Total number of bridge completions detected by balance delta"
    ).unwrap();

    pub static ref COMPLETED_DELTA: Gauge = register_gauge!(
        "safeflow_last_completed_delta_micro",
        "Balance delta of the most recent detected completion (micro units)"
    ).unwrap();

    pub static ref PENDING_TRANSFERS: Gauge = register_gauge!(
        "safeflow_pending_transfers",
        "Number of bridge transfers currently pending"
    ).unwrap();

    // Ledger write metrics
    pub static ref TRANSACTIONS_SUBMITTED: Counter = register_counter!(
        "safeflow_transactions_submitted_total",
        "Total number of ledger transactions submitted"
    ).unwrap();

    pub static ref TRANSACTION_FAILURES: Counter = register_counter!(
        "safeflow_transaction_failures_total",
        "Total number of rejected ledger transaction submissions"
    ).unwrap();

    // Health metrics
    pub static ref UP: Gauge = register_gauge!(
        "safeflow_up",
        "Whether the client is up and running"
    ).unwrap();

    pub static ref LAST_SUCCESSFUL_POLL: Gauge = register_gauge!(
        "safeflow_last_successful_poll_timestamp",
        "Unix timestamp of the last successful balance poll"
    ).unwrap();
}

/// Record a successful balance poll
pub fn record_successful_poll() {
    use std::time::{SystemTime, UNIX_EPOCH};
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs_f64();
    BALANCE_POLLS.inc();
    LAST_SUCCESSFUL_POLL.set(timestamp);
}

/// Record a ledger write submission
pub fn record_submission(success: bool) {
    if success {
        TRANSACTIONS_SUBMITTED.inc();
    } else {
        TRANSACTION_FAILURES.inc();
    }
}
