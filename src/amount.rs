//! Fixed-point amount codec
//!
//! Token amounts are 6-decimal fixed point ("micro" units). Parsing
//! truncates excess fractional digits instead of rounding, matching the
//! on-chain integer arithmetic exactly.

use crate::error::{Result, SafeFlowError};

/// Decimal places of the token's micro unit representation
pub const DECIMALS: u32 = 6;

const MICRO_DIVISOR: u128 = 10u128.pow(DECIMALS);

/// Parse a human decimal string (`[digits]['.' digits]`) into micro units.
///
/// The fractional part is right-padded to 6 digits, or truncated when it
/// carries more than 6. Grouping commas in the whole part are accepted so
/// displayed values parse back unchanged.
pub fn to_micro(amount: &str) -> Result<u128> {
    let trimmed = amount.trim();
    let (whole_raw, fraction_raw) = match trimmed.split_once('.') {
        Some((w, f)) => (w, f),
        None => (trimmed, ""),
    };

    let whole: String = whole_raw.chars().filter(|c| *c != ',').collect();
    if whole.is_empty() || !whole.bytes().all(|b| b.is_ascii_digit()) {
        return Err(SafeFlowError::InvalidAmount(format!(
            "whole part of '{}' is not numeric",
            amount
        )));
    }
    if !fraction_raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(SafeFlowError::InvalidAmount(format!(
            "fractional part of '{}' is not numeric",
            amount
        )));
    }

    // Truncation, not rounding: digits beyond the sixth are discarded
    let mut fraction: String = fraction_raw.chars().take(DECIMALS as usize).collect();
    while fraction.len() < DECIMALS as usize {
        fraction.push('0');
    }

    let whole: u128 = whole
        .parse()
        .map_err(|_| SafeFlowError::InvalidAmount(format!("'{}' overflows", amount)))?;
    let fraction: u128 = fraction
        .parse()
        .map_err(|_| SafeFlowError::InvalidAmount(format!("'{}' overflows", amount)))?;

    whole
        .checked_mul(MICRO_DIVISOR)
        .and_then(|w| w.checked_add(fraction))
        .ok_or_else(|| SafeFlowError::InvalidAmount(format!("'{}' overflows", amount)))
}

/// Format micro units as a human decimal string.
///
/// Trailing fraction zeros are stripped; a zero fraction yields just the
/// grouped whole part.
pub fn to_display(micro: u128) -> String {
    let whole = micro / MICRO_DIVISOR;
    let fraction = micro % MICRO_DIVISOR;

    let whole_str = group_thousands(whole);
    if fraction == 0 {
        return whole_str;
    }

    let fraction_str = format!("{:06}", fraction);
    let fraction_str = fraction_str.trim_end_matches('0');
    format!("{}.{}", whole_str, fraction_str)
}

/// Insert comma separators every three digits of a non-negative integer.
fn group_thousands(value: u128) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
