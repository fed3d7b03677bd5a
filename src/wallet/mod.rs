//! Core Wallet Adapter
//!
//! Connects an application to the Core wallet, either through the provider
//! the Core extension injects or through a remote pairing session started
//! from a QR code.

pub mod config;
pub mod connector;
pub mod core_wallet;
pub mod events;
pub mod storage;

#[cfg(test)]
mod tests;

pub use config::*;
pub use connector::*;
pub use core_wallet::*;
pub use events::*;
pub use storage::*;

/// Stable wallet identifiers
pub mod wallet_ids {
    pub const CORE_WALLET: &str = "core";
}

/// Display name of the Core wallet
pub const CORE_WALLET_NAME: &str = "Core wallet";

/// Pairing network project id used when the caller does not supply one
pub const DEFAULT_WC_PROJECT_ID: &str = "145769e410f16970a79ff77b2d89a1e0";

/// Name under which pairing session requests are re-published
pub const SESSION_REQUEST_SENT_EVENT: &str = "wc_session_request_sent";
