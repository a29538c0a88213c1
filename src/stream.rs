//! Stream record and lifecycle state machine
//!
//! The ledger owns the authoritative stream record; the client mirrors it
//! and pre-validates every mutating operation against the status table
//! before submission. Guard failures produce no mutation.
//!
//! | Operation        | Allowed from     | Requires                         |
//! |------------------|------------------|----------------------------------|
//! | claim            | Active           | caller == recipient, claimable>0 |
//! | freeze           | Active           | caller == admin                  |
//! | unfreeze         | Frozen           | caller == admin                  |
//! | cancel           | Active or Frozen | caller == admin                  |
//! | update_drip_rate | Active or Frozen | caller == admin                  |

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SafeFlowError};
use crate::vesting::{compute_vesting, DripInterval};

/// Stream status, matching the on-chain u1/u2/u3 encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamStatus {
    Active = 1,
    Frozen = 2,
    Cancelled = 3,
}

impl StreamStatus {
    pub fn as_u8(&self) -> u8 {
        *self as u8
    }

    pub fn from_u8(value: u8) -> Result<Self> {
        match value {
            1 => Ok(StreamStatus::Active),
            2 => Ok(StreamStatus::Frozen),
            3 => Ok(StreamStatus::Cancelled),
            other => Err(SafeFlowError::InvalidState(format!(
                "unknown stream status {}",
                other
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StreamStatus::Active => "active",
            StreamStatus::Frozen => "frozen",
            StreamStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for StreamStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A SafeFlow payment stream record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stream {
    pub id: u64,
    pub admin: String,
    pub recipient: String,
    pub title: String,
    pub description: String,
    /// Total value ever deposited, micro units
    pub total_amount: u128,
    /// Monotonically non-decreasing, bounded by total_amount
    pub claimed_amount: u128,
    /// Amount released per elapsed period, micro units
    pub drip_rate: u128,
    pub drip_interval: DripInterval,
    pub start_block: u64,
    /// Starts equal to start_block; advanced only by a successful claim
    pub last_claim_block: u64,
    pub status: StreamStatus,
}

impl Stream {
    /// Pre-validate a claim without mutating.
    pub fn check_claim(&self, caller: &str, current_block: u64) -> Result<u128> {
        if self.status != StreamStatus::Active {
            return Err(SafeFlowError::InvalidState(format!(
                "cannot claim from {} stream {}",
                self.status, self.id
            )));
        }
        if caller != self.recipient {
            return Err(SafeFlowError::Unauthorized(format!(
                "only the recipient may claim stream {}",
                self.id
            )));
        }
        let claimable = compute_vesting(self, current_block).claimable;
        if claimable == 0 {
            return Err(SafeFlowError::InsufficientBalance(format!(
                "nothing claimable on stream {} at block {}",
                self.id, current_block
            )));
        }
        Ok(claimable)
    }

    pub fn check_freeze(&self, caller: &str) -> Result<()> {
        self.require_admin(caller)?;
        if self.status != StreamStatus::Active {
            return Err(SafeFlowError::InvalidState(format!(
                "cannot freeze {} stream {}",
                self.status, self.id
            )));
        }
        Ok(())
    }

    pub fn check_unfreeze(&self, caller: &str) -> Result<()> {
        self.require_admin(caller)?;
        if self.status != StreamStatus::Frozen {
            return Err(SafeFlowError::InvalidState(format!(
                "cannot unfreeze {} stream {}",
                self.status, self.id
            )));
        }
        Ok(())
    }

    pub fn check_cancel(&self, caller: &str) -> Result<()> {
        self.require_admin(caller)?;
        if self.status == StreamStatus::Cancelled {
            return Err(SafeFlowError::InvalidState(format!(
                "stream {} is already cancelled",
                self.id
            )));
        }
        Ok(())
    }

    pub fn check_update_drip_rate(&self, caller: &str) -> Result<()> {
        self.require_admin(caller)?;
        if self.status == StreamStatus::Cancelled {
            return Err(SafeFlowError::InvalidState(format!(
                "cannot update rate on cancelled stream {}",
                self.id
            )));
        }
        Ok(())
    }

    /// Claim all currently vested funds. Returns the claimed amount.
    ///
    /// Mirrors the ledger arithmetic: claimed_amount grows by the claimable
    /// amount and last_claim_block advances to the claim height. All-or-
    /// nothing: a guard failure leaves the record untouched.
    pub fn claim(&mut self, caller: &str, current_block: u64) -> Result<u128> {
        let claimable = self.check_claim(caller, current_block)?;
        self.claimed_amount += claimable;
        self.last_claim_block = current_block;
        Ok(claimable)
    }

    pub fn freeze(&mut self, caller: &str) -> Result<()> {
        self.check_freeze(caller)?;
        self.status = StreamStatus::Frozen;
        Ok(())
    }

    pub fn unfreeze(&mut self, caller: &str) -> Result<()> {
        self.check_unfreeze(caller)?;
        self.status = StreamStatus::Active;
        Ok(())
    }

    /// Cancel the stream. Returns the unclaimed amount that goes back to
    /// the admin. Terminal: no further claims, freezes, or rate updates.
    pub fn cancel(&mut self, caller: &str) -> Result<u128> {
        self.check_cancel(caller)?;
        self.status = StreamStatus::Cancelled;
        Ok(self.total_amount - self.claimed_amount)
    }

    /// Administrative rate change. Never touches totals or claim history.
    pub fn update_drip_rate(
        &mut self,
        caller: &str,
        drip_rate: u128,
        drip_interval: DripInterval,
    ) -> Result<()> {
        self.check_update_drip_rate(caller)?;
        self.drip_rate = drip_rate;
        self.drip_interval = drip_interval;
        Ok(())
    }

    fn require_admin(&self, caller: &str) -> Result<()> {
        if caller != self.admin {
            return Err(SafeFlowError::Unauthorized(format!(
                "only the admin may manage stream {}",
                self.id
            )));
        }
        Ok(())
    }
}

/// Aggregate view over a set of streams
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StreamStats {
    pub total_streams: u64,
    pub active_streams: u64,
    pub total_allocated: u128,
}

/// Compute aggregate stats the way the ledger's read-only view does.
pub fn stream_stats(streams: &[Stream]) -> StreamStats {
    StreamStats {
        total_streams: streams.len() as u64,
        active_streams: streams
            .iter()
            .filter(|s| s.status == StreamStatus::Active)
            .count() as u64,
        total_allocated: streams.iter().map(|s| s.total_amount).sum(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ADMIN: &str = "ST1ADMIN";
    const RECIPIENT: &str = "ST2RECIPIENT";
    const ATTACKER: &str = "ST3ATTACKER";

    fn stream() -> Stream {
        Stream {
            id: 7,
            admin: ADMIN.to_string(),
            recipient: RECIPIENT.to_string(),
            title: "Security Test".to_string(),
            description: "guard checks".to_string(),
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
    fn test_claim_by_recipient() {
        let mut s = stream();
        let claimed = s.claim(RECIPIENT, 288).unwrap();
        assert_eq!(claimed, 200_000_000);
        assert_eq!(s.claimed_amount, 200_000_000);
        assert_eq!(s.last_claim_block, 288);
    }

    #[test]
    fn test_claim_by_non_recipient_is_unauthorized() {
        let mut s = stream();
        let err = s.claim(ATTACKER, 288).unwrap_err();
        assert!(matches!(err, SafeFlowError::Unauthorized(_)));
        assert_eq!(s.claimed_amount, 0);
        assert_eq!(s.last_claim_block, 0);
    }

    #[test]
    fn test_claim_with_nothing_vested() {
        let mut s = stream();
        let err = s.claim(RECIPIENT, 143).unwrap_err();
        assert!(matches!(err, SafeFlowError::InsufficientBalance(_)));
    }

    #[test]
    fn test_claim_from_frozen_is_invalid_state() {
        let mut s = stream();
        s.freeze(ADMIN).unwrap();
        let err = s.claim(RECIPIENT, 288).unwrap_err();
        assert!(matches!(err, SafeFlowError::InvalidState(_)));
    }

    #[test]
    fn test_freeze_unfreeze_cycle() {
        let mut s = stream();
        s.freeze(ADMIN).unwrap();
        assert_eq!(s.status, StreamStatus::Frozen);
        s.unfreeze(ADMIN).unwrap();
        assert_eq!(s.status, StreamStatus::Active);
    }

    #[test]
    fn test_freeze_by_non_admin() {
        let mut s = stream();
        assert!(matches!(
            s.freeze(ATTACKER).unwrap_err(),
            SafeFlowError::Unauthorized(_)
        ));
        assert_eq!(s.status, StreamStatus::Active);
    }

    #[test]
    fn test_freeze_cancelled_is_invalid_state() {
        let mut s = stream();
        s.cancel(ADMIN).unwrap();
        assert!(matches!(
            s.freeze(ADMIN).unwrap_err(),
            SafeFlowError::InvalidState(_)
        ));
    }

    #[test]
    fn test_cancel_returns_unclaimed() {
        let mut s = stream();
        s.claim(RECIPIENT, 288).unwrap();
        let returned = s.cancel(ADMIN).unwrap();
        assert_eq!(returned, 800_000_000);
        assert_eq!(s.status, StreamStatus::Cancelled);
    }

    #[test]
    fn test_cancel_from_frozen() {
        let mut s = stream();
        s.freeze(ADMIN).unwrap();
        let returned = s.cancel(ADMIN).unwrap();
        assert_eq!(returned, 1_000_000_000);
    }

    #[test]
    fn test_cancel_is_terminal() {
        let mut s = stream();
        s.cancel(ADMIN).unwrap();
        assert!(matches!(
            s.cancel(ADMIN).unwrap_err(),
            SafeFlowError::InvalidState(_)
        ));
        assert!(matches!(
            s.claim(RECIPIENT, 144_000).unwrap_err(),
            SafeFlowError::InvalidState(_)
        ));
        assert!(matches!(
            s.update_drip_rate(ADMIN, 1, DripInterval::Daily)
                .unwrap_err(),
            SafeFlowError::InvalidState(_)
        ));
    }

    #[test]
    fn test_update_drip_rate_leaves_totals() {
        let mut s = stream();
        s.update_drip_rate(ADMIN, 200_000_000, DripInterval::Monthly)
            .unwrap();
        assert_eq!(s.drip_rate, 200_000_000);
        assert_eq!(s.drip_interval, DripInterval::Monthly);
        assert_eq!(s.total_amount, 1_000_000_000);
        assert_eq!(s.claimed_amount, 0);
    }

    #[test]
    fn test_update_drip_rate_allowed_while_frozen() {
        let mut s = stream();
        s.freeze(ADMIN).unwrap();
        assert!(s.update_drip_rate(ADMIN, 1, DripInterval::Daily).is_ok());
    }

    #[test]
    fn test_status_round_trip() {
        for status in [
            StreamStatus::Active,
            StreamStatus::Frozen,
            StreamStatus::Cancelled,
        ] {
            assert_eq!(StreamStatus::from_u8(status.as_u8()).unwrap(), status);
        }
        assert!(StreamStatus::from_u8(0).is_err());
        assert!(StreamStatus::from_u8(4).is_err());
    }

    #[test]
    fn test_stream_stats() {
        let mut frozen = stream();
        frozen.freeze(ADMIN).unwrap();
        let mut second = stream();
        second.id = 8;
        second.total_amount = 2_000_000_000;
        let stats = stream_stats(&[stream(), second, frozen]);
        assert_eq!(stats.total_streams, 3);
        assert_eq!(stats.active_streams, 2);
        assert_eq!(stats.total_allocated, 4_000_000_000);
    }
}
