//! Drip vesting arithmetic
//!
//! Pure integer math over a stream record and a block height. This must
//! agree bit-for-bit with the ledger's own on-chain computation, so the
//! constants and formulas mirror the contract exactly: only whole elapsed
//! periods vest, never a pro-rated partial period.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SafeFlowError;
use crate::stream::Stream;

/// Blocks per day at the ledger's target block time
pub const BLOCKS_PER_DAY: u64 = 144;

/// Blocks per month at the ledger's target block time
pub const BLOCKS_PER_MONTH: u64 = 4320;

/// Drip release cadence, stored on-chain as an ASCII string
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DripInterval {
    Daily,
    Monthly,
}

impl DripInterval {
    pub fn as_str(&self) -> &'static str {
        match self {
            DripInterval::Daily => "daily",
            DripInterval::Monthly => "monthly",
        }
    }

    /// Block-count divisor used for elapsed-period computation
    pub fn blocks_per_period(&self) -> u64 {
        match self {
            DripInterval::Daily => BLOCKS_PER_DAY,
            DripInterval::Monthly => BLOCKS_PER_MONTH,
        }
    }
}

impl FromStr for DripInterval {
    type Err = SafeFlowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "daily" => Ok(DripInterval::Daily),
            "monthly" => Ok(DripInterval::Monthly),
            other => Err(SafeFlowError::InvalidState(format!(
                "unknown drip interval '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for DripInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result of a vesting computation at a given block height
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VestingInfo {
    /// Amount claimable right now, in micro units
    pub claimable: u128,
    /// Total never-claimed remainder, in micro units
    pub remaining: u128,
    /// Claimed percentage of total, floored, 0..=100
    pub percent: u32,
}

/// Compute claimable/remaining/percent for a stream at `current_block`.
///
/// Callable with any historical or current height; has no side effects.
pub fn compute_vesting(stream: &Stream, current_block: u64) -> VestingInfo {
    let elapsed_blocks = current_block.saturating_sub(stream.last_claim_block);
    let periods_elapsed = elapsed_blocks / stream.drip_interval.blocks_per_period();

    let remaining = stream.total_amount.saturating_sub(stream.claimed_amount);

    let vested = (periods_elapsed as u128)
        .checked_mul(stream.drip_rate)
        .unwrap_or(u128::MAX);
    let claimable = vested.min(remaining);

    let percent = if stream.total_amount == 0 {
        0
    } else {
        (stream.claimed_amount * 100 / stream.total_amount) as u32
    };

    VestingInfo {
        claimable,
        remaining,
        percent,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::{Stream, StreamStatus};

    fn daily_stream() -> Stream {
        Stream {
            id: 0,
            admin: "ST1ADMIN".to_string(),
            recipient: "ST2RECIPIENT".to_string(),
            title: "Developer Salary".to_string(),
            description: "Daily drip".to_string(),
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
    fn test_no_vesting_before_first_full_period() {
        let stream = daily_stream();
        assert_eq!(compute_vesting(&stream, 0).claimable, 0);
        assert_eq!(compute_vesting(&stream, 143).claimable, 0);
    }

    #[test]
    fn test_one_period_vests_one_drip() {
        let stream = daily_stream();
        assert_eq!(compute_vesting(&stream, 144).claimable, 100_000_000);
    }

    #[test]
    fn test_two_periods_vest_two_drips() {
        let stream = daily_stream();
        assert_eq!(compute_vesting(&stream, 288).claimable, 200_000_000);
    }

    #[test]
    fn test_partial_period_does_not_vest() {
        let stream = daily_stream();
        // 287 blocks = 1 full period + 143 blocks
        assert_eq!(compute_vesting(&stream, 287).claimable, 100_000_000);
    }

    #[test]
    fn test_claimable_capped_at_total() {
        let stream = daily_stream();
        // 1000 periods worth of drip far exceeds the total
        let info = compute_vesting(&stream, 144_000);
        assert_eq!(info.claimable, 1_000_000_000);
        assert_eq!(info.remaining, 1_000_000_000);
    }

    #[test]
    fn test_cap_accounts_for_claimed() {
        let mut stream = daily_stream();
        stream.claimed_amount = 900_000_000;
        let info = compute_vesting(&stream, 144_000);
        assert_eq!(info.claimable, 100_000_000);
        assert_eq!(info.remaining, 100_000_000);
        assert_eq!(info.percent, 90);
    }

    #[test]
    fn test_monthly_interval_divisor() {
        let mut stream = daily_stream();
        stream.drip_interval = DripInterval::Monthly;
        assert_eq!(compute_vesting(&stream, 4319).claimable, 0);
        assert_eq!(compute_vesting(&stream, 4320).claimable, 100_000_000);
    }

    #[test]
    fn test_elapsed_measured_from_last_claim() {
        let mut stream = daily_stream();
        stream.last_claim_block = 144;
        stream.claimed_amount = 100_000_000;
        assert_eq!(compute_vesting(&stream, 287).claimable, 0);
        assert_eq!(compute_vesting(&stream, 288).claimable, 100_000_000);
    }

    #[test]
    fn test_current_block_before_last_claim() {
        let mut stream = daily_stream();
        stream.last_claim_block = 1000;
        assert_eq!(compute_vesting(&stream, 500).claimable, 0);
    }

    #[test]
    fn test_zero_total_has_zero_percent() {
        let mut stream = daily_stream();
        stream.total_amount = 0;
        let info = compute_vesting(&stream, 10_000);
        assert_eq!(info.percent, 0);
        assert_eq!(info.claimable, 0);
        assert_eq!(info.remaining, 0);
    }

    #[test]
    fn test_interval_round_trip() {
        assert_eq!("daily".parse::<DripInterval>().unwrap(), DripInterval::Daily);
        assert_eq!(
            "monthly".parse::<DripInterval>().unwrap(),
            DripInterval::Monthly
        );
        assert!("weekly".parse::<DripInterval>().is_err());
    }
}
