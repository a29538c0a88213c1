//! Explicit session context
//!
//! Identity is passed around as an explicit `Session` value rather than
//! read from ambient global state. The shared `SessionHandle` carries the
//! connect/disconnect lifecycle; the bridge poller goes idle whenever no
//! session is active.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::info;

use crate::address;
use crate::error::{Result, SafeFlowError};

/// Target network, determined by the address prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Network {
    Testnet,
    Mainnet,
}

/// A connected identity on the stream ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub address: String,
    pub network: Network,
}

impl Session {
    /// Validate the address and derive the network from its prefix.
    pub fn connect(address: &str) -> Result<Self> {
        if !address::validate(address) {
            return Err(SafeFlowError::InvalidAddress(format!(
                "cannot connect with invalid address '{}'",
                address
            )));
        }
        let network = if address[..2].eq_ignore_ascii_case("ST") {
            Network::Testnet
        } else {
            Network::Mainnet
        };
        Ok(Self {
            address: address.to_string(),
            network,
        })
    }
}

/// Shared session slot observed by long-running tasks.
#[derive(Clone, Default)]
pub struct SessionHandle {
    inner: Arc<RwLock<Option<Session>>>,
}

impl SessionHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn connect(&self, address: &str) -> Result<Session> {
        let session = Session::connect(address)?;
        info!(address = %session.address, network = ?session.network, "Session connected");
        *self.inner.write().await = Some(session.clone());
        Ok(session)
    }

    pub async fn disconnect(&self) {
        if self.inner.write().await.take().is_some() {
            info!("Session disconnected");
        }
    }

    pub async fn current(&self) -> Option<Session> {
        self.inner.read().await.clone()
    }

    pub async fn is_connected(&self) -> bool {
        self.inner.read().await.is_some()
    }
}
