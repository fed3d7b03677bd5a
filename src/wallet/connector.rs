//! Connector seams
//!
//! The adapter talks to two kinds of backends: a provider injected into the
//! host environment by the Core browser extension, and a remote pairing
//! protocol that hands the user a `wc:` URI to scan. Both are supplied by
//! the embedding application through the factory traits below.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use super::config::{InjectedConnectorConfig, PairingConnectorConfig};
use crate::error::ConnectResult;

/// Account and chain reported by a connector after a successful connect
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionInfo {
    pub address: String,
    pub chain_id: u64,
}

/// Events published by a pairing connector
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PairingEvent {
    /// A pairing URI is ready to be rendered as a QR code
    DisplayUri(String),
    /// A session request went out to the paired wallet
    SessionRequestSent,
}

/// Provider injected by the Core extension
#[async_trait]
pub trait InjectedConnector: Send + Sync {
    async fn connect(&self, chain_id: Option<u64>) -> ConnectResult<ConnectionInfo>;
    async fn disconnect(&self) -> ConnectResult<()>;
    async fn get_address(&self) -> ConnectResult<String>;
    async fn get_chain_id(&self) -> ConnectResult<u64>;
    async fn switch_chain(&self, chain_id: u64) -> ConnectResult<()>;
    /// Ask the extension to let the user pick another account
    async fn switch_account(&self) -> ConnectResult<()>;
}

/// Remote pairing protocol client
#[async_trait]
pub trait PairingConnector: Send + Sync {
    async fn connect(&self, chain_id: Option<u64>) -> ConnectResult<ConnectionInfo>;
    async fn disconnect(&self) -> ConnectResult<()>;
    async fn get_address(&self) -> ConnectResult<String>;
    async fn get_chain_id(&self) -> ConnectResult<u64>;
    async fn switch_chain(&self, chain_id: u64) -> ConnectResult<()>;
    /// New receiver for this connector's events
    fn subscribe(&self) -> broadcast::Receiver<PairingEvent>;
}

/// Detects and constructs the injected connector
#[async_trait]
pub trait InjectedConnectorFactory: Send + Sync {
    /// Whether the Core provider is present in the host environment
    fn detect_provider(&self) -> bool;

    async fn create(&self, config: InjectedConnectorConfig)
        -> ConnectResult<Arc<dyn InjectedConnector>>;
}

/// Constructs the remote pairing connector
#[async_trait]
pub trait PairingConnectorFactory: Send + Sync {
    async fn create(&self, config: PairingConnectorConfig)
        -> ConnectResult<Arc<dyn PairingConnector>>;
}

/// Which backend an adapter ended up with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectorKind {
    Injected,
    RemotePairing,
}

impl fmt::Display for ConnectorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectorKind::Injected => write!(f, "injected"),
            ConnectorKind::RemotePairing => write!(f, "remote_pairing"),
        }
    }
}

/// The connector chosen for an adapter. Fixed once resolved.
#[derive(Clone)]
pub enum ActiveConnector {
    Injected(Arc<dyn InjectedConnector>),
    RemotePairing(Arc<dyn PairingConnector>),
}

impl fmt::Debug for ActiveConnector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ActiveConnector").field(&self.kind()).finish()
    }
}

impl ActiveConnector {
    pub fn kind(&self) -> ConnectorKind {
        match self {
            ActiveConnector::Injected(_) => ConnectorKind::Injected,
            ActiveConnector::RemotePairing(_) => ConnectorKind::RemotePairing,
        }
    }

    pub fn as_injected(&self) -> Option<&Arc<dyn InjectedConnector>> {
        match self {
            ActiveConnector::Injected(c) => Some(c),
            ActiveConnector::RemotePairing(_) => None,
        }
    }

    pub fn as_pairing(&self) -> Option<&Arc<dyn PairingConnector>> {
        match self {
            ActiveConnector::RemotePairing(c) => Some(c),
            ActiveConnector::Injected(_) => None,
        }
    }

    pub async fn connect(&self, chain_id: Option<u64>) -> ConnectResult<ConnectionInfo> {
        match self {
            ActiveConnector::Injected(c) => c.connect(chain_id).await,
            ActiveConnector::RemotePairing(c) => c.connect(chain_id).await,
        }
    }

    pub async fn disconnect(&self) -> ConnectResult<()> {
        match self {
            ActiveConnector::Injected(c) => c.disconnect().await,
            ActiveConnector::RemotePairing(c) => c.disconnect().await,
        }
    }

    pub async fn get_address(&self) -> ConnectResult<String> {
        match self {
            ActiveConnector::Injected(c) => c.get_address().await,
            ActiveConnector::RemotePairing(c) => c.get_address().await,
        }
    }

    pub async fn get_chain_id(&self) -> ConnectResult<u64> {
        match self {
            ActiveConnector::Injected(c) => c.get_chain_id().await,
            ActiveConnector::RemotePairing(c) => c.get_chain_id().await,
        }
    }

    pub async fn switch_chain(&self, chain_id: u64) -> ConnectResult<()> {
        match self {
            ActiveConnector::Injected(c) => c.switch_chain(chain_id).await,
            ActiveConnector::RemotePairing(c) => c.switch_chain(chain_id).await,
        }
    }
}
