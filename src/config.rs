use eyre::{eyre, Result, WrapErr};
use std::env;
use std::path::Path;

use crate::ledger::ContractId;
use crate::rpc::parse_rpc_urls;

/// Main configuration for the SafeFlow client
#[derive(Debug, Clone)]
pub struct Config {
    pub stacks: StacksConfig,
    pub evm: EvmConfig,
    pub bridge: BridgeConfig,
    pub poller: PollerConfig,
    pub status_api_port: u16,
}

/// Stacks ledger configuration
#[derive(Debug, Clone)]
pub struct StacksConfig {
    /// API base URLs, tried in order
    pub api_urls: Vec<String>,
    /// SafeFlow contract, "ADDRESS.name" form
    pub safeflow_contract: ContractId,
    /// SIP-010 token contract backing streams
    pub token_contract: ContractId,
}

/// Source-chain EVM configuration
#[derive(Debug, Clone)]
pub struct EvmConfig {
    /// RPC URLs, tried in order
    pub rpc_urls: Vec<String>,
    /// Address of the connected source-chain account
    pub account: String,
}

/// Bridge contract configuration
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub xreserve_address: String,
    pub usdc_address: String,
    pub destination_domain: u32,
    /// Path of the persisted transfer store
    pub store_path: String,
    /// Retention window for tracked transfers, seconds
    pub transfer_retention_secs: u64,
}

/// Polling configuration
#[derive(Debug, Clone)]
pub struct PollerConfig {
    pub pending_poll_secs: u64,
    pub idle_poll_secs: u64,
    pub rpc_timeout_secs: u64,
}

/// Default functions
fn default_pending_poll_secs() -> u64 {
    30
}

fn default_idle_poll_secs() -> u64 {
    60
}

fn default_rpc_timeout_secs() -> u64 {
    15
}

fn default_destination_domain() -> u32 {
    10003
}

fn default_store_path() -> String {
    "safeflow-transfers.json".to_string()
}

fn default_transfer_retention_secs() -> u64 {
    7200
}

fn default_status_api_port() -> u16 {
    9090
}

impl Config {
    /// Load configuration from environment variables
    /// Loads .env file if present, then reads from environment
    pub fn load() -> Result<Self> {
        Self::load_from_file(".env").or_else(|_| Self::load_from_env())
    }

    /// Load from a specific .env file path
    pub fn load_from_file(path: &str) -> Result<Self> {
        if Path::new(path).exists() {
            dotenvy::from_filename(path)
                .wrap_err_with(|| format!("Failed to load .env file from {}", path))?;
        }
        Self::load_from_env()
    }

    /// Load configuration from environment variables
    fn load_from_env() -> Result<Self> {
        let stacks_raw = env::var("STACKS_API_URLS")
            .map_err(|_| eyre!("STACKS_API_URLS environment variable is required"))?;
        let safeflow_raw = env::var("SAFEFLOW_CONTRACT")
            .map_err(|_| eyre!("SAFEFLOW_CONTRACT environment variable is required"))?;
        let token_raw = env::var("TOKEN_CONTRACT")
            .map_err(|_| eyre!("TOKEN_CONTRACT environment variable is required"))?;

        let stacks = StacksConfig {
            api_urls: parse_rpc_urls(&stacks_raw),
            safeflow_contract: ContractId::parse(&safeflow_raw)
                .map_err(|e| eyre!("SAFEFLOW_CONTRACT: {}", e))?,
            token_contract: ContractId::parse(&token_raw)
                .map_err(|e| eyre!("TOKEN_CONTRACT: {}", e))?,
        };

        let evm_raw = env::var("EVM_RPC_URLS")
            .map_err(|_| eyre!("EVM_RPC_URLS environment variable is required"))?;
        let evm = EvmConfig {
            rpc_urls: parse_rpc_urls(&evm_raw),
            account: env::var("EVM_ACCOUNT")
                .map_err(|_| eyre!("EVM_ACCOUNT environment variable is required"))?,
        };

        let bridge = BridgeConfig {
            xreserve_address: env::var("XRESERVE_ADDRESS")
                .map_err(|_| eyre!("XRESERVE_ADDRESS environment variable is required"))?,
            usdc_address: env::var("USDC_ADDRESS")
                .map_err(|_| eyre!("USDC_ADDRESS environment variable is required"))?,
            destination_domain: env::var("BRIDGE_DOMAIN_ID")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default_destination_domain()),
            store_path: env::var("TRANSFER_STORE_PATH").unwrap_or_else(|_| default_store_path()),
            transfer_retention_secs: env::var("TRANSFER_RETENTION_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default_transfer_retention_secs()),
        };

        let poller = PollerConfig {
            pending_poll_secs: env::var("PENDING_POLL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default_pending_poll_secs()),
            idle_poll_secs: env::var("IDLE_POLL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default_idle_poll_secs()),
            rpc_timeout_secs: env::var("RPC_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default_rpc_timeout_secs()),
        };

        let status_api_port = env::var("STATUS_API_PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(default_status_api_port());

        let config = Config {
            stacks,
            evm,
            bridge,
            poller,
            status_api_port,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        if self.stacks.api_urls.is_empty() {
            return Err(eyre!("STACKS_API_URLS cannot be empty"));
        }

        if self.evm.rpc_urls.is_empty() {
            return Err(eyre!("EVM_RPC_URLS cannot be empty"));
        }

        if self.evm.account.len() != 42 || !self.evm.account.starts_with("0x") {
            return Err(eyre!(
                "EVM_ACCOUNT must be a valid hex address (42 chars with 0x prefix)"
            ));
        }

        if self.bridge.xreserve_address.len() != 42 || !self.bridge.xreserve_address.starts_with("0x")
        {
            return Err(eyre!(
                "XRESERVE_ADDRESS must be a valid hex address (42 chars with 0x prefix)"
            ));
        }

        if self.bridge.usdc_address.len() != 42 || !self.bridge.usdc_address.starts_with("0x") {
            return Err(eyre!(
                "USDC_ADDRESS must be a valid hex address (42 chars with 0x prefix)"
            ));
        }

        if self.poller.pending_poll_secs == 0 || self.poller.idle_poll_secs == 0 {
            return Err(eyre!("poll intervals must be positive"));
        }

        if self.bridge.transfer_retention_secs == 0 {
            return Err(eyre!("TRANSFER_RETENTION_SECS must be positive"));
        }

        if self.poller.rpc_timeout_secs == 0 || self.poller.rpc_timeout_secs > 30 {
            return Err(eyre!("RPC_TIMEOUT_SECS must be in 1..=30"));
        }

        Ok(())
    }
}
