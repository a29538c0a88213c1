//! Minimal EVM JSON-RPC client for the source chain.
//!
//! Only the calls the deposit flow needs: `eth_call` for ERC-20 reads and
//! `eth_sendTransaction` for submissions routed through the connected
//! wallet provider. Reads rotate through the configured endpoints;
//! submissions go to the primary only, since a resubmitted transaction is
//! not idempotent.

use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::error::{classify_write_error, Result, SafeFlowError};
use crate::rpc::Endpoints;

/// EVM RPC response wrapper
#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcError>,
}

/// EVM RPC error
#[derive(Debug, Deserialize)]
struct RpcError {
    code: i32,
    message: String,
}

/// EVM JSON-RPC client with endpoint fallback for reads.
pub struct EvmClient {
    endpoints: Endpoints,
    client: Client,
}

impl EvmClient {
    pub fn new(endpoints: Endpoints) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| SafeFlowError::NetworkUnavailable(format!("http client: {}", e)))?;

        Ok(Self { endpoints, client })
    }

    /// Execute `eth_call` against the contract at `to` with raw calldata,
    /// returning the hex result string.
    pub async fn eth_call(&self, to: &str, data: &str) -> Result<String> {
        let to = to.to_string();
        let data = data.to_string();
        self.endpoints
            .try_each(|url| {
                let client = self.client.clone();
                let to = to.clone();
                let data = data.clone();
                async move {
                    let body = serde_json::json!({
                        "jsonrpc": "2.0",
                        "method": "eth_call",
                        "params": [{ "to": to, "data": data }, "latest"],
                        "id": 1
                    });

                    let response = client
                        .post(&url)
                        .json(&body)
                        .send()
                        .await
                        .map_err(|e| SafeFlowError::NetworkUnavailable(e.to_string()))?
                        .json::<RpcResponse<String>>()
                        .await
                        .map_err(|e| SafeFlowError::NetworkUnavailable(e.to_string()))?;

                    if let Some(error) = response.error {
                        return Err(SafeFlowError::NetworkUnavailable(format!(
                            "RPC error: {} - {}",
                            error.code, error.message
                        )));
                    }

                    response.result.ok_or_else(|| {
                        SafeFlowError::NetworkUnavailable("empty eth_call result".to_string())
                    })
                }
            })
            .await
    }

    /// Read a uint256 result from an `eth_call`, e.g. an ERC-20 view.
    pub async fn eth_call_u256(&self, to: &str, data: &str) -> Result<u128> {
        let hex = self.eth_call(to, data).await?;
        decode_u256(&hex)
    }

    /// Submit a transaction through the connected provider. No fallback:
    /// resubmission could double-spend.
    pub async fn send_transaction(&self, from: &str, to: &str, data: &str) -> Result<String> {
        let body = serde_json::json!({
            "jsonrpc": "2.0",
            "method": "eth_sendTransaction",
            "params": [{ "from": from, "to": to, "data": data }],
            "id": 1
        });

        debug!(to = %to, "Submitting EVM transaction");
        let response = self
            .client
            .post(self.endpoints.primary())
            .json(&body)
            .send()
            .await
            .map_err(|e| SafeFlowError::NetworkUnavailable(e.to_string()))?
            .json::<RpcResponse<String>>()
            .await
            .map_err(|e| SafeFlowError::NetworkUnavailable(e.to_string()))?;

        if let Some(error) = response.error {
            return Err(classify_write_error(&error.message));
        }

        response
            .result
            .ok_or_else(|| SafeFlowError::TransferFailed("no transaction hash returned".to_string()))
    }
}

/// Decode a 32-byte hex word into a u128. Values above u128::MAX are
/// rejected rather than truncated.
pub fn decode_u256(hex: &str) -> Result<u128> {
    let stripped = hex.trim_start_matches("0x");
    if stripped.is_empty() {
        return Ok(0);
    }
    // Quantities arrive in minimal hex, so the digit count may be odd
    let normalized = if stripped.len() % 2 == 1 {
        format!("0{}", stripped)
    } else {
        stripped.to_string()
    };
    let bytes = hex::decode(&normalized)
        .map_err(|e| SafeFlowError::NetworkUnavailable(format!("bad hex result: {}", e)))?;
    if bytes.len() > 32 {
        return Err(SafeFlowError::NetworkUnavailable(format!(
            "oversized result: {} bytes",
            bytes.len()
        )));
    }
    let mut padded = [0u8; 32];
    padded[32 - bytes.len()..].copy_from_slice(&bytes);
    if padded[..16].iter().any(|b| *b != 0) {
        return Err(SafeFlowError::NetworkUnavailable(
            "result exceeds u128 range".to_string(),
        ));
    }
    let mut value = [0u8; 16];
    value.copy_from_slice(&padded[16..]);
    Ok(u128::from_be_bytes(value))
}
