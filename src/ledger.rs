//! Ledger read/write interface
//!
//! All loosely-typed read results are normalized here, once, into typed
//! records; nothing outside this module unwraps raw query JSON. Reads go
//! through the ordered endpoint fallback; writes hit the primary endpoint
//! only and are never auto-retried. The ledger's own enforcement is the
//! authoritative check for every guarded operation — after a write the
//! caller must re-fetch the record rather than trust local state.

use std::fmt;

use serde_json::{json, Value};
use tracing::{debug, info};

use crate::address;
use crate::error::{classify_write_error, Result, SafeFlowError};
use crate::metrics;
use crate::rpc::Endpoints;
use crate::session::Session;
use crate::stream::{Stream, StreamStatus};
use crate::vesting::DripInterval;

/// A contract principal: deployer address plus contract name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractId {
    pub address: String,
    pub name: String,
}

impl ContractId {
    /// Parse `"ST....name"` form.
    pub fn parse(raw: &str) -> Result<Self> {
        let (addr, name) = raw.split_once('.').ok_or_else(|| {
            SafeFlowError::InvalidAddress(format!("'{}' is not an ADDRESS.name contract id", raw))
        })?;
        if !address::validate(addr) {
            return Err(SafeFlowError::InvalidAddress(format!(
                "contract deployer address in '{}' is invalid",
                raw
            )));
        }
        if name.is_empty() {
            return Err(SafeFlowError::InvalidAddress(format!(
                "contract name in '{}' is empty",
                raw
            )));
        }
        Ok(Self {
            address: addr.to_string(),
            name: name.to_string(),
        })
    }
}

impl fmt::Display for ContractId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.address, self.name)
    }
}

/// Arguments for creating a new stream.
#[derive(Debug, Clone)]
pub struct CreateStreamParams {
    pub recipient: String,
    pub title: String,
    pub description: String,
    pub total_amount: u128,
    pub drip_rate: u128,
    pub drip_interval: DripInterval,
}

/// HTTP client for the stream ledger's query and transaction API.
pub struct LedgerClient {
    endpoints: Endpoints,
    http: reqwest::Client,
    safeflow_contract: ContractId,
    token_contract: ContractId,
}

impl LedgerClient {
    pub fn new(
        endpoints: Endpoints,
        safeflow_contract: ContractId,
        token_contract: ContractId,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| SafeFlowError::NetworkUnavailable(e.to_string()))?;
        Ok(Self {
            endpoints,
            http,
            safeflow_contract,
            token_contract,
        })
    }

    // ------------------------------------------------------------------
    // Reads (fallback across all endpoints)
    // ------------------------------------------------------------------

    /// Current burn block height from the node info endpoint.
    pub async fn get_block_height(&self) -> Result<u64> {
        let http = self.http.clone();
        let body = self
            .endpoints
            .try_each(|url| {
                let http = http.clone();
                async move {
                    let response = http
                        .get(format!("{}/v2/info", url))
                        .send()
                        .await
                        .map_err(|e| SafeFlowError::NetworkUnavailable(e.to_string()))?;
                    response
                        .json::<Value>()
                        .await
                        .map_err(|e| SafeFlowError::NetworkUnavailable(e.to_string()))
                }
            })
            .await?;

        decode_u64(
            body.get("burn_block_height")
                .ok_or_else(|| missing_field("burn_block_height"))?,
        )
    }

    /// Fetch a stream record by id. `Ok(None)` when no such stream exists.
    pub async fn get_stream(&self, id: u64) -> Result<Option<Stream>> {
        let result = self
            .call_read_only("get-safeflow", vec![json!(id)])
            .await?;
        if result.is_null() {
            return Ok(None);
        }
        decode_stream(id, &result).map(Some)
    }

    /// Number of streams where `address` is the recipient.
    pub async fn get_stream_count(&self, address: &str) -> Result<u64> {
        let result = self
            .call_read_only("get-stream-count", vec![json!(address)])
            .await?;
        decode_u64(&result)
    }

    /// Ledger-computed claimable amount, for cross-checking the local
    /// vesting calculator.
    pub async fn get_claimable(&self, id: u64) -> Result<u128> {
        let result = self
            .call_read_only("get-claimable-amount", vec![json!(id)])
            .await?;
        decode_u128(&result)
    }

    /// Ledger-computed unclaimed remainder.
    pub async fn get_remaining(&self, id: u64) -> Result<u128> {
        let result = self
            .call_read_only("get-remaining-amount", vec![json!(id)])
            .await?;
        decode_u128(&result)
    }

    /// Ledger-computed claim progress percentage.
    pub async fn get_progress(&self, id: u64) -> Result<u32> {
        let result = self
            .call_read_only("get-payment-progress", vec![json!(id)])
            .await?;
        Ok(decode_u64(&result)? as u32)
    }

    /// Fungible token balance of `owner` on the destination chain. This is
    /// the reading the bridge reconciliation poller consumes.
    pub async fn get_token_balance(&self, owner: &str) -> Result<u128> {
        let http = self.http.clone();
        let contract = self.token_contract.clone();
        let owner = owner.to_string();
        let body = self
            .endpoints
            .try_each(|url| {
                let http = http.clone();
                let contract = contract.clone();
                let owner = owner.clone();
                async move {
                    let call_url = format!(
                        "{}/v2/contracts/call-read/{}/{}/get-balance",
                        url, contract.address, contract.name
                    );
                    let response = http
                        .post(&call_url)
                        .json(&json!({ "sender": owner.clone(), "arguments": [owner] }))
                        .send()
                        .await
                        .map_err(|e| SafeFlowError::NetworkUnavailable(e.to_string()))?;
                    response
                        .json::<Value>()
                        .await
                        .map_err(|e| SafeFlowError::NetworkUnavailable(e.to_string()))
                }
            })
            .await?;
        decode_u128(unwrap_call_result(&body)?)
    }

    // ------------------------------------------------------------------
    // Lifecycle operations: pre-validate locally, then submit.
    // ------------------------------------------------------------------

    /// Create a new stream. Checks recipient validity and the creator's
    /// token balance before submitting.
    pub async fn create_stream(
        &self,
        session: &Session,
        params: &CreateStreamParams,
    ) -> Result<String> {
        if !address::validate(&params.recipient) {
            return Err(SafeFlowError::InvalidAddress(format!(
                "recipient '{}' failed validation",
                params.recipient
            )));
        }
        if params.total_amount == 0 || params.drip_rate == 0 {
            return Err(SafeFlowError::InvalidAmount(
                "total amount and drip rate must be positive".to_string(),
            ));
        }
        let balance = self.get_token_balance(&session.address).await?;
        if balance < params.total_amount {
            return Err(SafeFlowError::InsufficientBalance(format!(
                "balance {} is below requested total {}",
                balance, params.total_amount
            )));
        }

        self.submit(
            session,
            "create-safeflow",
            vec![
                json!(self.token_contract.to_string()),
                json!(params.recipient),
                json!(params.title),
                json!(params.description),
                json!(params.total_amount.to_string()),
                json!(params.drip_rate.to_string()),
                json!(params.drip_interval.as_str()),
            ],
        )
        .await
    }

    /// Claim vested funds from a stream.
    pub async fn claim(&self, session: &Session, id: u64) -> Result<String> {
        let stream = self.require_stream(id).await?;
        let current_block = self.get_block_height().await?;
        stream.check_claim(&session.address, current_block)?;
        self.submit(
            session,
            "claim",
            vec![json!(self.token_contract.to_string()), json!(id)],
        )
        .await
    }

    pub async fn freeze(&self, session: &Session, id: u64) -> Result<String> {
        let stream = self.require_stream(id).await?;
        stream.check_freeze(&session.address)?;
        self.submit(session, "freeze-safeflow", vec![json!(id)]).await
    }

    pub async fn unfreeze(&self, session: &Session, id: u64) -> Result<String> {
        let stream = self.require_stream(id).await?;
        stream.check_unfreeze(&session.address)?;
        self.submit(session, "unfreeze-safeflow", vec![json!(id)])
            .await
    }

    pub async fn cancel(&self, session: &Session, id: u64) -> Result<String> {
        let stream = self.require_stream(id).await?;
        stream.check_cancel(&session.address)?;
        self.submit(
            session,
            "cancel-safeflow",
            vec![json!(self.token_contract.to_string()), json!(id)],
        )
        .await
    }

    pub async fn update_drip_rate(
        &self,
        session: &Session,
        id: u64,
        drip_rate: u128,
        drip_interval: DripInterval,
    ) -> Result<String> {
        let stream = self.require_stream(id).await?;
        stream.check_update_drip_rate(&session.address)?;
        self.submit(
            session,
            "update-drip-rate",
            vec![
                json!(id),
                json!(drip_rate.to_string()),
                json!(drip_interval.as_str()),
            ],
        )
        .await
    }

    async fn require_stream(&self, id: u64) -> Result<Stream> {
        self.get_stream(id).await?.ok_or_else(|| {
            SafeFlowError::InvalidState(format!("stream {} does not exist", id))
        })
    }

    /// Read-only contract call with endpoint fallback.
    async fn call_read_only(&self, function: &str, arguments: Vec<Value>) -> Result<Value> {
        let http = self.http.clone();
        let contract = self.safeflow_contract.clone();
        let function = function.to_string();
        let body = self
            .endpoints
            .try_each(|url| {
                let http = http.clone();
                let contract = contract.clone();
                let function = function.clone();
                let arguments = arguments.clone();
                async move {
                    let call_url = format!(
                        "{}/v2/contracts/call-read/{}/{}/{}",
                        url, contract.address, contract.name, function
                    );
                    debug!(url = %call_url, "Read-only contract call");
                    let response = http
                        .post(&call_url)
                        .json(&json!({ "sender": contract.address, "arguments": arguments }))
                        .send()
                        .await
                        .map_err(|e| SafeFlowError::NetworkUnavailable(e.to_string()))?;
                    response
                        .json::<Value>()
                        .await
                        .map_err(|e| SafeFlowError::NetworkUnavailable(e.to_string()))
                }
            })
            .await?;
        unwrap_call_result(&body).cloned()
    }

    /// Submit a mutating contract call. Primary endpoint only, no retry:
    /// a failure is surfaced to the user, who may retry manually.
    async fn submit(
        &self,
        session: &Session,
        function: &str,
        arguments: Vec<Value>,
    ) -> Result<String> {
        let url = format!("{}/v2/transactions", self.endpoints.primary());
        let response = self
            .http
            .post(&url)
            .json(&json!({
                "contract": self.safeflow_contract.to_string(),
                "function": function,
                "arguments": arguments,
                "sender": session.address,
            }))
            .send()
            .await
            .map_err(|e| SafeFlowError::NetworkUnavailable(e.to_string()))?;

        let status = response.status();
        let body: Value = response
            .json()
            .await
            .map_err(|e| SafeFlowError::NetworkUnavailable(e.to_string()))?;

        if !status.is_success() {
            let reason = body
                .get("reason")
                .or_else(|| body.get("error"))
                .and_then(Value::as_str)
                .unwrap_or("transaction rejected");
            metrics::record_submission(false);
            return Err(classify_write_error(reason));
        }

        let txid = body
            .get("txid")
            .and_then(Value::as_str)
            .ok_or_else(|| missing_field("txid"))?
            .to_string();
        metrics::record_submission(true);
        info!(txid = %txid, function = function, "Ledger transaction submitted");
        Ok(txid)
    }
}

// ----------------------------------------------------------------------
// Typed decoding of loosely-typed read results
// ----------------------------------------------------------------------

/// Unwrap the standard read-only call envelope: `{"okay": true, "result": ...}`.
fn unwrap_call_result(body: &Value) -> Result<&Value> {
    if let Some(okay) = body.get("okay") {
        if okay == &Value::Bool(false) {
            let cause = body
                .get("cause")
                .and_then(Value::as_str)
                .unwrap_or("read-only call failed");
            return Err(SafeFlowError::NetworkUnavailable(cause.to_string()));
        }
    }
    Ok(body.get("result").unwrap_or(body))
}

/// Decode a ledger stream tuple into the typed record. This is the single
/// place raw query shapes are interpreted.
pub fn decode_stream(id: u64, value: &Value) -> Result<Stream> {
    let status_code = decode_u64(field(value, "status")?)? as u8;
    Ok(Stream {
        id,
        admin: decode_string(field(value, "admin")?)?,
        recipient: decode_string(field(value, "recipient")?)?,
        title: decode_string(field(value, "title")?)?,
        description: decode_string(field(value, "description")?)?,
        total_amount: decode_u128(field(value, "total-amount")?)?,
        claimed_amount: decode_u128(field(value, "claimed-amount")?)?,
        drip_rate: decode_u128(field(value, "drip-rate")?)?,
        drip_interval: decode_string(field(value, "drip-interval")?)?.parse()?,
        start_block: decode_u64(field(value, "start-block")?)?,
        last_claim_block: decode_u64(field(value, "last-claim-block")?)?,
        status: StreamStatus::from_u8(status_code)?,
    })
}

fn field<'a>(value: &'a Value, key: &str) -> Result<&'a Value> {
    // Tuples sometimes arrive wrapped in an optional's {"value": {...}}
    let inner = match value.get("value") {
        Some(v) if v.is_object() => v,
        _ => value,
    };
    inner.get(key).ok_or_else(|| missing_field(key))
}

/// Decode an unsigned integer that may arrive as a JSON number, a decimal
/// string, a `u`-prefixed Clarity literal, or nested under `{"value": ...}`.
pub fn decode_u128(value: &Value) -> Result<u128> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .map(u128::from)
            .ok_or_else(|| decode_error(value, "u128")),
        Value::String(s) => s
            .trim_start_matches('u')
            .parse()
            .map_err(|_| decode_error(value, "u128")),
        Value::Object(_) => {
            let inner = value.get("value").ok_or_else(|| decode_error(value, "u128"))?;
            decode_u128(inner)
        }
        _ => Err(decode_error(value, "u128")),
    }
}

pub fn decode_u64(value: &Value) -> Result<u64> {
    decode_u128(value).and_then(|v| {
        u64::try_from(v).map_err(|_| decode_error(&json!(v.to_string()), "u64"))
    })
}

fn decode_string(value: &Value) -> Result<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Object(_) => {
            let inner = value
                .get("value")
                .ok_or_else(|| decode_error(value, "string"))?;
            decode_string(inner)
        }
        _ => Err(decode_error(value, "string")),
    }
}

fn missing_field(key: &str) -> SafeFlowError {
    SafeFlowError::NetworkUnavailable(format!("ledger response missing field '{}'", key))
}

fn decode_error(value: &Value, expected: &str) -> SafeFlowError {
    SafeFlowError::NetworkUnavailable(format!("cannot decode {} from {}", expected, value))
}
