//! Destination balance polling loop.
//!
//! Drives the reconciliation tracker: reads the destination-chain token
//! balance of the connected identity, feeds it to the tracker, and prunes
//! stale entries. Cadence tightens to 30s while transfers are pending and
//! relaxes to 60s otherwise. Transient balance-read failures are logged at
//! debug level and retried on the next tick, never surfaced.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info};

use crate::ledger::LedgerClient;
use crate::metrics;
use crate::session::SessionHandle;
use crate::tracker::ReconciliationTracker;

pub struct BridgePoller {
    ledger: Arc<LedgerClient>,
    session: SessionHandle,
    tracker: Arc<Mutex<ReconciliationTracker>>,
    pending_poll: Duration,
    idle_poll: Duration,
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

impl BridgePoller {
    pub fn new(
        ledger: Arc<LedgerClient>,
        session: SessionHandle,
        tracker: Arc<Mutex<ReconciliationTracker>>,
        pending_poll: Duration,
        idle_poll: Duration,
    ) -> Self {
        Self {
            ledger,
            session,
            tracker,
            pending_poll,
            idle_poll,
        }
    }

    /// Run until a shutdown signal arrives.
    pub async fn run(&self, mut shutdown: mpsc::Receiver<()>) {
        info!(
            pending_poll_secs = self.pending_poll.as_secs(),
            idle_poll_secs = self.idle_poll.as_secs(),
            "Bridge poller started"
        );

        loop {
            let interval = self.tick().await;

            tokio::select! {
                _ = shutdown.recv() => {
                    info!("Bridge poller shutting down");
                    break;
                }
                _ = tokio::time::sleep(interval) => {}
            }
        }
    }

    /// One poll pass. Returns the delay before the next pass.
    async fn tick(&self) -> Duration {
        let session = match self.session.current().await {
            Some(session) => session,
            None => {
                debug!("No connected identity, skipping balance poll");
                return self.idle_poll;
            }
        };

        match self.ledger.get_token_balance(&session.address).await {
            Ok(balance) => {
                metrics::record_successful_poll();
                let mut tracker = self.tracker.lock().await;
                match tracker.reconcile(balance) {
                    Ok(Some(completed)) => {
                        info!(
                            delta = completed.delta,
                            transfers = completed.completed,
                            "Bridge transfer completed"
                        );
                    }
                    Ok(None) => {}
                    Err(e) => debug!(error = %e, "Failed to persist reconciliation result"),
                }
                if let Err(e) = tracker.prune(now_ms()) {
                    debug!(error = %e, "Failed to persist prune result");
                }
                if tracker.has_pending() {
                    self.pending_poll
                } else {
                    self.idle_poll
                }
            }
            Err(e) => {
                metrics::BALANCE_POLL_FAILURES.inc();
                debug!(error = %e, "Balance read failed, will retry next tick");
                let tracker = self.tracker.lock().await;
                if tracker.has_pending() {
                    self.pending_poll
                } else {
                    self.idle_poll
                }
            }
        }
    }
}
