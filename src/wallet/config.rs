//! Wallet adapter configuration
//!
//! Caller-facing options plus the configuration records handed to the
//! connector factories.

use std::collections::BTreeMap;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use url::Url;

use super::storage::WalletStorage;
use super::DEFAULT_WC_PROJECT_ID;
use crate::error::{ConnectError, ConnectResult};

/// An EVM chain the application can connect to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainConfig {
    pub chain_id: u64,
    pub name: String,
    pub rpc_urls: Vec<String>,
    #[serde(default)]
    pub testnet: bool,
}

impl ChainConfig {
    pub fn new(chain_id: u64, name: impl Into<String>, rpc_url: impl Into<String>) -> Self {
        Self {
            chain_id,
            name: name.into(),
            rpc_urls: vec![rpc_url.into()],
            testnet: false,
        }
    }

    pub fn avalanche() -> Self {
        Self::new(43114, "Avalanche C-Chain", "https://api.avax.network/ext/bc/C/rpc")
    }

    pub fn avalanche_fuji() -> Self {
        Self {
            testnet: true,
            ..Self::new(43113, "Avalanche Fuji", "https://api.avax-test.network/ext/bc/C/rpc")
        }
    }

    pub fn ethereum() -> Self {
        Self::new(1, "Ethereum", "https://cloudflare-eth.com")
    }
}

/// Application metadata shown by the wallet during pairing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DappMetadata {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo_url: Option<String>,
    #[serde(default)]
    pub is_dark_mode: bool,
}

impl Default for DappMetadata {
    fn default() -> Self {
        Self {
            name: "evm-connect dApp".to_string(),
            description: None,
            url: String::new(),
            logo_url: None,
            is_dark_mode: true,
        }
    }
}

/// QR modal theme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
    Dark,
    Light,
}

/// Display options for the pairing protocol's QR modal
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QrModalOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme_mode: Option<ThemeMode>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub theme_variables: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_explorer: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub explorer_recommended_wallet_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub explorer_excluded_wallet_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub privacy_policy_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terms_of_service_url: Option<String>,
}

/// Options for [`CoreWallet`](super::CoreWallet)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoreWalletOptions {
    #[serde(default = "default_chains")]
    pub chains: Vec<ChainConfig>,
    #[serde(default)]
    pub dapp_metadata: DappMetadata,
    /// Pairing network project id; [`DEFAULT_WC_PROJECT_ID`] when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    /// Open the pairing protocol's own QR modal on `connect()`
    #[serde(default = "default_qrcode")]
    pub qrcode: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qr_modal_options: Option<QrModalOptions>,
}

fn default_chains() -> Vec<ChainConfig> {
    vec![ChainConfig::avalanche(), ChainConfig::avalanche_fuji()]
}

fn default_qrcode() -> bool {
    true
}

impl Default for CoreWalletOptions {
    fn default() -> Self {
        Self {
            chains: default_chains(),
            dapp_metadata: DappMetadata::default(),
            project_id: None,
            qrcode: default_qrcode(),
            qr_modal_options: None,
        }
    }
}

impl CoreWalletOptions {
    pub fn from_json(json: &str) -> ConnectResult<Self> {
        let options: Self = serde_json::from_str(json)?;
        options.validate()?;
        Ok(options)
    }

    pub fn with_chains(mut self, chains: Vec<ChainConfig>) -> Self {
        self.chains = chains;
        self
    }

    pub fn with_project_id(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = Some(project_id.into());
        self
    }

    pub fn with_dapp_metadata(mut self, metadata: DappMetadata) -> Self {
        self.dapp_metadata = metadata;
        self
    }

    pub fn with_qrcode(mut self, qrcode: bool) -> Self {
        self.qrcode = qrcode;
        self
    }

    pub fn with_qr_modal_options(mut self, options: QrModalOptions) -> Self {
        self.qr_modal_options = Some(options);
        self
    }

    /// Project id sent to the pairing network
    pub fn effective_project_id(&self) -> String {
        self.project_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .unwrap_or(DEFAULT_WC_PROJECT_ID)
            .to_string()
    }

    pub fn validate(&self) -> ConnectResult<()> {
        if self.chains.is_empty() {
            return Err(ConnectError::invalid_config("At least one chain is required"));
        }

        let mut seen = HashSet::new();
        for chain in &self.chains {
            if !seen.insert(chain.chain_id) {
                return Err(ConnectError::invalid_config(format!(
                    "Duplicate chain id {}",
                    chain.chain_id
                )));
            }
            for rpc in &chain.rpc_urls {
                Url::parse(rpc).map_err(|e| {
                    ConnectError::from(e).with_details(format!("chain {} rpc url", chain.chain_id))
                })?;
            }
        }

        if !self.dapp_metadata.url.is_empty() {
            Url::parse(&self.dapp_metadata.url)
                .map_err(|e| ConnectError::from(e).with_details("dapp metadata url"))?;
        }

        if let Some(modal) = &self.qr_modal_options {
            for link in [&modal.privacy_policy_url, &modal.terms_of_service_url]
                .into_iter()
                .flatten()
            {
                Url::parse(link).map_err(|e| ConnectError::from(e).with_details("qr modal link"))?;
            }
        }

        Ok(())
    }

    pub fn chain_ids(&self) -> Vec<u64> {
        self.chains.iter().map(|c| c.chain_id).collect()
    }
}

/// Configuration for the injected-provider connector
#[derive(Clone)]
pub struct InjectedConnectorConfig {
    pub chains: Vec<ChainConfig>,
    pub storage: Arc<dyn WalletStorage>,
    /// Remember an explicit disconnect so the provider is not silently reconnected
    pub shim_disconnect: bool,
}

impl fmt::Debug for InjectedConnectorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InjectedConnectorConfig")
            .field("chains", &self.chains)
            .field("shim_disconnect", &self.shim_disconnect)
            .finish_non_exhaustive()
    }
}

/// Configuration for the remote pairing connector
#[derive(Clone)]
pub struct PairingConnectorConfig {
    pub chains: Vec<ChainConfig>,
    pub project_id: String,
    pub storage: Arc<dyn WalletStorage>,
    pub qrcode: bool,
    pub dapp_metadata: DappMetadata,
    pub qr_modal_options: Option<QrModalOptions>,
}

impl fmt::Debug for PairingConnectorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PairingConnectorConfig")
            .field("chains", &self.chains)
            .field("project_id", &self.project_id)
            .field("qrcode", &self.qrcode)
            .field("dapp_metadata", &self.dapp_metadata)
            .field("qr_modal_options", &self.qr_modal_options)
            .finish_non_exhaustive()
    }
}
