//! Stacks c32 address validation and bridge recipient encoding
//!
//! The bridge contract takes the cross-chain recipient as a 32-byte value:
//! one network version byte followed by the 20-byte hash160, left-padded
//! with zeros. The c32 payload carries a 4-byte checksum which is dropped
//! without verification; a malformed checksum is only caught by the
//! destination chain's own structural decode.

use crate::error::{Result, SafeFlowError};

/// c32 alphabet: 32 symbols, visually ambiguous I/L/O/U excluded
const C32_ALPHABET: &[u8; 32] = b"0123456789ABCDEFGHJKMNPQRSTVWXYZ";

/// Version byte for testnet (ST) single-sig addresses
pub const TESTNET_P2PKH: u8 = 26;

/// Version byte for mainnet (SP) single-sig addresses
pub const MAINNET_P2PKH: u8 = 22;

/// Decoded c32 payload: 20-byte hash160 + 4-byte checksum
const PAYLOAD_LEN: usize = 24;

/// Structural address validation.
///
/// Valid iff the length is in [39, 41], the prefix is a recognized network
/// prefix, and the c32 body decodes to the expected payload length.
pub fn validate(address: &str) -> bool {
    if address.len() < 39 || address.len() > 41 {
        return false;
    }
    if version_byte(address).is_none() {
        return false;
    }
    encode_recipient32(address).is_ok()
}

/// Encode an address into the 32-byte recipient value the bridge expects.
///
/// Layout: 11 zero bytes | version byte | 20-byte hash160.
pub fn encode_recipient32(address: &str) -> Result<[u8; 32]> {
    let version = version_byte(address).ok_or_else(|| {
        SafeFlowError::InvalidAddress(format!(
            "unrecognized network prefix in '{}'",
            truncate_for_log(address)
        ))
    })?;

    let decoded = c32_decode(&address[2..])?;
    if decoded.len() != PAYLOAD_LEN {
        return Err(SafeFlowError::InvalidAddress(format!(
            "decoded payload is {} bytes, expected {}",
            decoded.len(),
            PAYLOAD_LEN
        )));
    }

    // Drop the 4-byte checksum, keep the hash160
    let mut out = [0u8; 32];
    out[11] = version;
    out[12..32].copy_from_slice(&decoded[..20]);
    Ok(out)
}

/// Map the two-character network prefix to its version byte.
fn version_byte(address: &str) -> Option<u8> {
    let prefix: String = address.chars().take(2).collect::<String>().to_uppercase();
    match prefix.as_str() {
        "ST" => Some(TESTNET_P2PKH),
        "SP" => Some(MAINNET_P2PKH),
        _ => None,
    }
}

/// Decode a c32 string (5 bits per symbol) into bytes.
///
/// Leading zero bits are trimmed down to the byte boundary, then the bit
/// string is left-padded back up if still unaligned.
fn c32_decode(body: &str) -> Result<Vec<u8>> {
    let mut bits: Vec<bool> = Vec::with_capacity(body.len() * 5);
    for ch in body.chars() {
        let upper = ch.to_ascii_uppercase();
        let index = C32_ALPHABET
            .iter()
            .position(|&a| a as char == upper)
            .ok_or_else(|| {
                SafeFlowError::InvalidAddress(format!("invalid c32 character '{}'", ch))
            })?;
        for shift in (0..5).rev() {
            bits.push((index >> shift) & 1 == 1);
        }
    }

    while bits.len() % 8 != 0 && bits.first() == Some(&false) {
        bits.remove(0);
    }
    while bits.len() % 8 != 0 {
        bits.insert(0, false);
    }

    let bytes = bits
        .chunks(8)
        .map(|chunk| chunk.iter().fold(0u8, |acc, &b| (acc << 1) | b as u8))
        .collect();
    Ok(bytes)
}

fn truncate_for_log(address: &str) -> &str {
    &address[..address.len().min(8)]
}

#[cfg(test)]
mod tests {
    use super::*;

    // Known-good testnet address (41 chars)
    const TESTNET_ADDR: &str = "ST1PQHQKV0RJXZFY1DGX8MNSNYVE3VGZJSRTPGZGM";

    #[test]
    fn test_validate_accepts_testnet_address() {
        assert!(validate(TESTNET_ADDR));
    }

    #[test]
    fn test_validate_is_case_insensitive_on_prefix() {
        let lower = format!("st{}", &TESTNET_ADDR[2..]);
        assert!(validate(&lower));
    }

    #[test]
    fn test_validate_rejects_bad_prefix() {
        let bad = format!("XY{}", &TESTNET_ADDR[2..]);
        assert!(!validate(&bad));
    }

    #[test]
    fn test_validate_rejects_bad_length() {
        assert!(!validate("ST123"));
        assert!(!validate(""));
        let long = format!("{}AAAA", TESTNET_ADDR);
        assert!(!validate(&long));
    }

    #[test]
    fn test_encode_shape() {
        let encoded = encode_recipient32(TESTNET_ADDR).unwrap();
        // 11 zero bytes, then the testnet version byte, then hash160
        assert!(encoded[..11].iter().all(|&b| b == 0));
        assert_eq!(encoded[11], TESTNET_P2PKH);
        assert!(encoded[12..].iter().any(|&b| b != 0));
    }

    #[test]
    fn test_encode_mainnet_version_byte() {
        let mainnet = format!("SP{}", &TESTNET_ADDR[2..]);
        let encoded = encode_recipient32(&mainnet).unwrap();
        assert_eq!(encoded[11], MAINNET_P2PKH);
    }

    #[test]
    fn test_encode_rejects_invalid_symbol() {
        // 'O' is excluded from the c32 alphabet
        let bad = format!("ST{}O", &TESTNET_ADDR[2..40]);
        assert!(matches!(
            encode_recipient32(&bad),
            Err(SafeFlowError::InvalidAddress(_))
        ));
    }

    #[test]
    fn test_encode_rejects_short_payload() {
        // Too few symbols to decode to 24 bytes
        assert!(matches!(
            encode_recipient32("ST1PQHQKV0RJXZ"),
            Err(SafeFlowError::InvalidAddress(_))
        ));
    }

    #[test]
    fn test_encode_rejects_unknown_prefix_before_decode() {
        let bad = format!("XY{}", &TESTNET_ADDR[2..]);
        assert!(matches!(
            encode_recipient32(&bad),
            Err(SafeFlowError::InvalidAddress(_))
        ));
    }

    #[test]
    fn test_c32_decode_known_width() {
        // 39 symbols = 195 bits; 3 leading zero bits trim to 24 bytes
        let decoded = c32_decode(&TESTNET_ADDR[2..]).unwrap();
        assert_eq!(decoded.len(), 24);
    }
}
