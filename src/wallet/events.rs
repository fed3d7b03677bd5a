//! Adapter events and lifecycle state

use serde::{Deserialize, Serialize};

/// Events delivered to adapter subscribers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum WalletEvent {
    #[serde(rename = "connect", rename_all = "camelCase")]
    Connect { address: String, chain_id: u64 },
    #[serde(rename = "disconnect")]
    Disconnect,
    #[serde(rename = "chainChanged", rename_all = "camelCase")]
    ChainChanged { chain_id: u64 },
    #[serde(rename = "accountsChanged")]
    AccountChanged { address: String },
    /// Forwarded from the pairing connector's own session request event
    #[serde(rename = "wc_session_request_sent")]
    SessionRequestSent,
}

impl WalletEvent {
    /// Wire name of the event
    pub fn name(&self) -> &'static str {
        match self {
            WalletEvent::Connect { .. } => "connect",
            WalletEvent::Disconnect => "disconnect",
            WalletEvent::ChainChanged { .. } => "chainChanged",
            WalletEvent::AccountChanged { .. } => "accountsChanged",
            WalletEvent::SessionRequestSent => super::SESSION_REQUEST_SENT_EVENT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdapterState {
    Uninitialized,
    ConnectorResolved,
    Connected,
    Disconnected,
}
