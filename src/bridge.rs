//! Bridge deposit submission: ERC-20 approval gating plus the reserve
//! contract's `depositToRemote` call.
//!
//! Calldata is assembled by hand. The ABI surface is three ERC-20 views
//! and one deposit function, which does not justify a full codegen stack.

use tiny_keccak::{Hasher, Keccak};
use tracing::info;

use crate::error::{Result, SafeFlowError};
use crate::evm::EvmClient;

/// First four bytes of the keccak-256 of a solidity function signature.
fn selector(signature: &str) -> [u8; 4] {
    let mut hasher = Keccak::v256();
    hasher.update(signature.as_bytes());
    let mut out = [0u8; 32];
    hasher.finalize(&mut out);
    [out[0], out[1], out[2], out[3]]
}

fn parse_evm_address(address: &str) -> Result<[u8; 20]> {
    let stripped = address.trim_start_matches("0x");
    let bytes = hex::decode(stripped)
        .map_err(|_| SafeFlowError::InvalidAddress(address.to_string()))?;
    bytes
        .try_into()
        .map_err(|_| SafeFlowError::InvalidAddress(address.to_string()))
}

fn push_u256(buf: &mut Vec<u8>, value: u128) {
    buf.extend_from_slice(&[0u8; 16]);
    buf.extend_from_slice(&value.to_be_bytes());
}

fn push_address(buf: &mut Vec<u8>, address: [u8; 20]) {
    buf.extend_from_slice(&[0u8; 12]);
    buf.extend_from_slice(&address);
}

/// `balanceOf(address)` calldata.
pub fn balance_of_calldata(owner: &str) -> Result<String> {
    let owner = parse_evm_address(owner)?;
    let mut data = selector("balanceOf(address)").to_vec();
    push_address(&mut data, owner);
    Ok(format!("0x{}", hex::encode(data)))
}

/// `allowance(address,address)` calldata.
pub fn allowance_calldata(owner: &str, spender: &str) -> Result<String> {
    let owner = parse_evm_address(owner)?;
    let spender = parse_evm_address(spender)?;
    let mut data = selector("allowance(address,address)").to_vec();
    push_address(&mut data, owner);
    push_address(&mut data, spender);
    Ok(format!("0x{}", hex::encode(data)))
}

/// `approve(address,uint256)` calldata.
pub fn approve_calldata(spender: &str, amount: u128) -> Result<String> {
    let spender = parse_evm_address(spender)?;
    let mut data = selector("approve(address,uint256)").to_vec();
    push_address(&mut data, spender);
    push_u256(&mut data, amount);
    Ok(format!("0x{}", hex::encode(data)))
}

/// `depositToRemote(uint256,uint32,bytes32,address,uint256,bytes)`
/// calldata with empty hook data. Head is six words; the dynamic bytes
/// tail is a single zero length word at offset 0xc0.
pub fn deposit_calldata(
    value: u128,
    destination_domain: u32,
    recipient: [u8; 32],
    local_token: &str,
    max_fee: u128,
) -> Result<String> {
    let token = parse_evm_address(local_token)?;
    let mut data =
        selector("depositToRemote(uint256,uint32,bytes32,address,uint256,bytes)").to_vec();
    push_u256(&mut data, value);
    push_u256(&mut data, destination_domain as u128);
    data.extend_from_slice(&recipient);
    push_address(&mut data, token);
    push_u256(&mut data, max_fee);
    push_u256(&mut data, 0xc0); // offset of the bytes tail
    push_u256(&mut data, 0); // hook data length
    Ok(format!("0x{}", hex::encode(data)))
}

/// Submits deposits to the reserve contract, approving the token spend
/// first when the current allowance does not cover the amount.
pub struct BridgeSubmitter {
    evm: EvmClient,
    usdc_address: String,
    xreserve_address: String,
    destination_domain: u32,
}

impl BridgeSubmitter {
    pub fn new(
        evm: EvmClient,
        usdc_address: String,
        xreserve_address: String,
        destination_domain: u32,
    ) -> Self {
        Self {
            evm,
            usdc_address,
            xreserve_address,
            destination_domain,
        }
    }

    /// Source-chain token balance of `owner`, micro units.
    pub async fn source_balance(&self, owner: &str) -> Result<u128> {
        let data = balance_of_calldata(owner)?;
        self.evm.eth_call_u256(&self.usdc_address, &data).await
    }

    /// Current reserve-contract allowance granted by `owner`.
    pub async fn allowance(&self, owner: &str) -> Result<u128> {
        let data = allowance_calldata(owner, &self.xreserve_address)?;
        self.evm.eth_call_u256(&self.usdc_address, &data).await
    }

    /// Submit an outbound deposit for `amount` micro units, returning the
    /// source-chain transaction hash. Checks balance, then allowance,
    /// approving exactly the shortfall-covering amount when needed.
    pub async fn deposit(&self, from: &str, amount: u128, recipient: [u8; 32]) -> Result<String> {
        if amount == 0 {
            return Err(SafeFlowError::InvalidAmount(
                "deposit amount must be positive".to_string(),
            ));
        }

        let balance = self.source_balance(from).await?;
        if balance < amount {
            return Err(SafeFlowError::InsufficientBalance(format!(
                "source balance {} is below deposit amount {}",
                balance, amount
            )));
        }

        let allowance = self.allowance(from).await?;
        if allowance < amount {
            info!(allowance, amount, "Allowance insufficient, submitting approval");
            let approve = approve_calldata(&self.xreserve_address, amount)?;
            let approval_tx = self
                .evm
                .send_transaction(from, &self.usdc_address, &approve)
                .await?;
            info!(tx_hash = %approval_tx, "Approval submitted");
        }

        let calldata = deposit_calldata(
            amount,
            self.destination_domain,
            recipient,
            &self.usdc_address,
            0,
        )?;
        let tx_hash = self
            .evm
            .send_transaction(from, &self.xreserve_address, &calldata)
            .await?;
        info!(tx_hash = %tx_hash, amount, "Bridge deposit submitted");
        Ok(tx_hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOKEN: &str = "0x1c7D4B196Cb0C7B01d743Fbc6116a902379C7238";
    const OWNER: &str = "0x0000000000000000000000000000000000000001";
    const SPENDER: &str = "0x0000000000000000000000000000000000000002";

    #[test]
    fn test_known_erc20_selectors() {
        assert_eq!(selector("approve(address,uint256)"), [0x09, 0x5e, 0xa7, 0xb3]);
        assert_eq!(selector("balanceOf(address)"), [0x70, 0xa0, 0x82, 0x31]);
        assert_eq!(selector("allowance(address,address)"), [0xdd, 0x62, 0xed, 0x3e]);
    }

    #[test]
    fn test_balance_of_calldata_shape() {
        let data = balance_of_calldata(OWNER).unwrap();
        // 4 selector bytes + one word
        assert_eq!(data.len(), 2 + (4 + 32) * 2);
        assert!(data.starts_with("0x70a08231"));
        assert!(data.ends_with("01"));
    }

    #[test]
    fn test_allowance_calldata_shape() {
        let data = allowance_calldata(OWNER, SPENDER).unwrap();
        assert_eq!(data.len(), 2 + (4 + 64) * 2);
        assert!(data.starts_with("0xdd62ed3e"));
    }

    #[test]
    fn test_approve_calldata_encodes_amount() {
        let data = approve_calldata(SPENDER, 1_000_000).unwrap();
        assert_eq!(data.len(), 2 + (4 + 64) * 2);
        assert!(data.starts_with("0x095ea7b3"));
        assert!(data.ends_with(&format!("{:064x}", 1_000_000u128)));
    }

    #[test]
    fn test_deposit_calldata_length() {
        let recipient = [0u8; 32];
        let data = deposit_calldata(500_000_000, 10003, recipient, TOKEN, 0).unwrap();
        // 4 selector bytes + 6 head words + 1 tail word = 228 bytes
        assert_eq!((data.len() - 2) / 2, 228);
    }

    #[test]
    fn test_deposit_calldata_embeds_recipient_and_domain() {
        let mut recipient = [0u8; 32];
        recipient[11] = 26;
        recipient[31] = 0xaa;
        let data = deposit_calldata(1, 10003, recipient, TOKEN, 0).unwrap();
        let bytes = hex::decode(&data[2..]).unwrap();
        // word 1: domain
        assert_eq!(&bytes[4 + 32..4 + 64], &{
            let mut w = [0u8; 32];
            w[28..].copy_from_slice(&10003u32.to_be_bytes());
            w
        });
        // word 2: recipient verbatim
        assert_eq!(&bytes[4 + 64..4 + 96], &recipient);
        // word 5: tail offset 0xc0
        assert_eq!(bytes[4 + 160 + 31], 0xc0);
        // tail: zero length
        assert!(bytes[4 + 192..].iter().all(|b| *b == 0));
    }

    #[test]
    fn test_bad_evm_address_rejected() {
        assert!(balance_of_calldata("0x1234").is_err());
        assert!(balance_of_calldata("not-hex").is_err());
    }
}
