//! SafeFlow client core: drippable payment stream tracking and
//! cross-chain bridge reconciliation.

pub mod address;
pub mod amount;
pub mod api;
pub mod bridge;
pub mod config;
pub mod error;
pub mod evm;
pub mod ledger;
pub mod metrics;
pub mod poller;
pub mod rpc;
pub mod session;
pub mod stream;
pub mod tracker;
pub mod vesting;

pub use error::{Result, SafeFlowError};
pub use stream::{Stream, StreamStatus};
pub use tracker::{PendingTransfer, ReconciliationTracker, TransferStatus, TransferStore};
pub use vesting::{compute_vesting, DripInterval, VestingInfo};
