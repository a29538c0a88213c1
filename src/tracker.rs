//! Bridge reconciliation tracker
//!
//! Outbound bridge deposits complete asynchronously with no push
//! notification, so completion is observed indirectly: the tracker records
//! each submitted deposit locally, and when a destination balance reading
//! exceeds the previous one, every pending entry is reclassified as
//! completed. The delta cannot be attributed to a specific transaction
//! hash without a stronger oracle; all concurrently pending entries
//! complete together.
//!
//! The persisted list is the only mutable shared resource: it is read once
//! at startup, pruned, and rewritten whole on every mutation.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info, warn};

use crate::error::{Result, SafeFlowError};
use crate::metrics;

/// Namespace key under which the transfer array is persisted.
pub const STORE_NAMESPACE: &str = "safeflow.bridge.transfers";

/// Default retention window; entries older than the configured window are
/// purged on load and on prune ticks.
pub const RETENTION_MS: u64 = 2 * 60 * 60 * 1000;

/// Local status of an outbound bridge transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferStatus {
    Pending,
    Completed,
    Failed,
}

impl TransferStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferStatus::Pending => "pending",
            TransferStatus::Completed => "completed",
            TransferStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for TransferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A locally tracked outbound bridge deposit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingTransfer {
    /// Source-chain transaction hash
    pub tx_hash: String,
    /// Source-chain amount as submitted, decimal string
    pub amount: String,
    /// Creation time, milliseconds since epoch
    pub timestamp: u64,
    pub status: TransferStatus,
    /// Ledger address expected to receive the bridged value
    pub destination_recipient: String,
}

/// Outcome of a reconcile pass that detected a completed bridge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedBridge {
    /// Observed balance increase, micro units
    pub delta: u128,
    /// Number of entries flipped from pending to completed
    pub completed: usize,
}

/// File-backed store holding the transfer array under a fixed namespace.
#[derive(Debug, Clone)]
pub struct TransferStore {
    path: PathBuf,
}

impl TransferStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the persisted array. A missing file is an empty list; a
    /// corrupt file is logged and treated as empty rather than fatal.
    pub fn load(&self) -> Vec<PendingTransfer> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(_) => return Vec::new(),
        };
        let parsed: serde_json::Value = match serde_json::from_str(&raw) {
            Ok(v) => v,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Corrupt transfer store, starting empty");
                return Vec::new();
            }
        };
        match parsed
            .get(STORE_NAMESPACE)
            .cloned()
            .map(serde_json::from_value)
        {
            Some(Ok(transfers)) => transfers,
            _ => {
                warn!(path = %self.path.display(), "Transfer store missing namespace, starting empty");
                Vec::new()
            }
        }
    }

    /// Rewrite the whole array atomically (temp file + rename), so a crash
    /// mid-write never leaves a truncated store.
    pub fn save(&self, transfers: &[PendingTransfer]) -> Result<()> {
        let record = serde_json::json!({ STORE_NAMESPACE: transfers });
        let serialized = serde_json::to_string_pretty(&record)
            .map_err(|e| SafeFlowError::TransferFailed(format!("serialize store: {}", e)))?;

        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, serialized)
            .and_then(|_| fs::rename(&tmp, &self.path))
            .map_err(|e| {
                SafeFlowError::TransferFailed(format!(
                    "persist store at {}: {}",
                    self.path.display(),
                    e
                ))
            })
    }
}

/// Tracks pending bridge transfers and reconciles them against observed
/// destination balances.
pub struct ReconciliationTracker {
    transfers: Vec<PendingTransfer>,
    store: TransferStore,
    retention_ms: u64,
    /// Last observed destination balance; zero means "never observed".
    previous_balance: u128,
}

impl ReconciliationTracker {
    /// Load from the store, pruning stale entries immediately.
    pub fn load(store: TransferStore, now_ms: u64, retention_ms: u64) -> Result<Self> {
        let mut tracker = Self {
            transfers: store.load(),
            store,
            retention_ms,
            previous_balance: 0,
        };
        tracker.prune(now_ms)?;
        metrics::PENDING_TRANSFERS.set(tracker.pending_count() as f64);
        Ok(tracker)
    }

    /// Record a newly submitted outbound deposit and persist.
    pub fn record_pending(
        &mut self,
        tx_hash: &str,
        amount: &str,
        destination_recipient: &str,
        now_ms: u64,
    ) -> Result<()> {
        self.transfers.push(PendingTransfer {
            tx_hash: tx_hash.to_string(),
            amount: amount.to_string(),
            timestamp: now_ms,
            status: TransferStatus::Pending,
            destination_recipient: destination_recipient.to_string(),
        });
        self.store.save(&self.transfers)?;
        metrics::PENDING_TRANSFERS.set(self.pending_count() as f64);
        info!(tx_hash = %tx_hash, amount = %amount, "Recorded pending bridge transfer");
        Ok(())
    }

    /// Reconcile against a fresh destination balance reading.
    ///
    /// A balance increase over a previously observed non-zero reading is
    /// treated as a completed bridge: all pending entries flip to
    /// completed. The first observation only seeds the baseline — it can
    /// never complete anything, which guards against false completion
    /// when the destination account already held funds.
    pub fn reconcile(&mut self, observed_balance: u128) -> Result<Option<CompletedBridge>> {
        let previous = self.previous_balance;
        self.previous_balance = observed_balance;

        if previous == 0 || observed_balance <= previous {
            debug!(observed = observed_balance, previous, "No bridge completion detected");
            return Ok(None);
        }

        let delta = observed_balance - previous;
        let mut completed = 0;
        for transfer in &mut self.transfers {
            if transfer.status == TransferStatus::Pending {
                transfer.status = TransferStatus::Completed;
                completed += 1;
            }
        }

        if completed == 0 {
            return Ok(None);
        }

        self.store.save(&self.transfers)?;
        metrics::COMPLETIONS_DETECTED.inc();
        metrics::COMPLETED_DELTA.set(delta as f64);
        metrics::PENDING_TRANSFERS.set(0.0);
        info!(delta, completed, "Bridge completion detected by balance delta");
        Ok(Some(CompletedBridge { delta, completed }))
    }

    /// Mark a specific transfer failed (submission-side failure).
    pub fn mark_failed(&mut self, tx_hash: &str) -> Result<()> {
        let mut changed = false;
        for transfer in &mut self.transfers {
            if transfer.tx_hash == tx_hash && transfer.status == TransferStatus::Pending {
                transfer.status = TransferStatus::Failed;
                changed = true;
            }
        }
        if changed {
            self.store.save(&self.transfers)?;
            metrics::PENDING_TRANSFERS.set(self.pending_count() as f64);
        }
        Ok(())
    }

    /// Drop entries past the retention window, persisting when anything
    /// was removed.
    pub fn prune(&mut self, now_ms: u64) -> Result<()> {
        let before = self.transfers.len();
        let retention_ms = self.retention_ms;
        self.transfers
            .retain(|t| now_ms.saturating_sub(t.timestamp) <= retention_ms);
        if self.transfers.len() != before {
            debug!(pruned = before - self.transfers.len(), "Pruned stale bridge transfers");
            self.store.save(&self.transfers)?;
            metrics::PENDING_TRANSFERS.set(self.pending_count() as f64);
        }
        Ok(())
    }

    pub fn has_pending(&self) -> bool {
        self.transfers
            .iter()
            .any(|t| t.status == TransferStatus::Pending)
    }

    pub fn pending_count(&self) -> usize {
        self.transfers
            .iter()
            .filter(|t| t.status == TransferStatus::Pending)
            .count()
    }

    pub fn transfers(&self) -> &[PendingTransfer] {
        &self.transfers
    }
}
