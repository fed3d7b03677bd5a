//! Core wallet adapter
//!
//! Picks the injected Core provider when the extension is present and
//! falls back to the remote pairing protocol otherwise. The choice is made
//! once, on first use, and every later call reuses the same connector.

use std::future::Future;
use std::sync::{Arc, Mutex, RwLock};

use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::OnceCell;
use tokio::task::JoinHandle;

use super::config::{CoreWalletOptions, InjectedConnectorConfig, PairingConnectorConfig};
use super::connector::{
    ActiveConnector, InjectedConnectorFactory, PairingConnector, PairingConnectorFactory,
    PairingEvent,
};
use super::events::{AdapterState, WalletEvent};
use super::storage::WalletStorage;
use super::{wallet_ids, CORE_WALLET_NAME};
use crate::error::{ConnectError, ConnectResult};
use crate::{log_debug, log_info, log_warn};

const EVENT_CAPACITY: usize = 64;

/// The connector constructors an adapter chooses between
#[derive(Clone)]
pub struct ConnectorFactories {
    pub injected: Arc<dyn InjectedConnectorFactory>,
    pub pairing: Arc<dyn PairingConnectorFactory>,
}

/// Options for [`CoreWallet::connect`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConnectOptions {
    pub chain_id: Option<u64>,
}

/// Arguments for [`CoreWallet::connect_with_qr_code`]
pub struct ConnectWithQrCodeArgs<U, C> {
    pub chain_id: Option<u64>,
    /// Called with every pairing URI published while connecting
    pub on_qr_code_uri: U,
    /// Called once with the connected address
    pub on_connected: C,
}

pub struct CoreWallet {
    options: CoreWalletOptions,
    storage: Arc<dyn WalletStorage>,
    factories: ConnectorFactories,
    is_injected: bool,
    connector: OnceCell<ActiveConnector>,
    state: RwLock<AdapterState>,
    events: broadcast::Sender<WalletEvent>,
    /// Relays pairing session requests; aborted when the adapter drops
    forwarder: Mutex<Option<JoinHandle<()>>>,
}

impl CoreWallet {
    pub const ID: &'static str = wallet_ids::CORE_WALLET;
    pub const NAME: &'static str = CORE_WALLET_NAME;

    /// Create an adapter. Provider detection happens here, exactly once.
    pub fn new(
        options: CoreWalletOptions,
        storage: Arc<dyn WalletStorage>,
        factories: ConnectorFactories,
    ) -> ConnectResult<Self> {
        options.validate()?;
        let is_injected = factories.injected.detect_provider();
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        log_debug!(
            "core_wallet",
            "Adapter created",
            is_injected = is_injected,
            chains = options.chains.len(),
        );

        Ok(Self {
            options,
            storage,
            factories,
            is_injected,
            connector: OnceCell::new(),
            state: RwLock::new(AdapterState::Uninitialized),
            events,
            forwarder: Mutex::new(None),
        })
    }

    pub fn wallet_id(&self) -> &'static str {
        Self::ID
    }

    pub fn wallet_name(&self) -> &'static str {
        Self::NAME
    }

    pub fn is_injected(&self) -> bool {
        self.is_injected
    }

    pub fn options(&self) -> &CoreWalletOptions {
        &self.options
    }

    pub fn state(&self) -> AdapterState {
        *self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    /// The connector, if one has been resolved already
    pub fn active_connector(&self) -> Option<&ActiveConnector> {
        self.connector.get()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WalletEvent> {
        self.events.subscribe()
    }

    /// Return the adapter's connector, constructing it on first call.
    ///
    /// Concurrent first calls share one construction.
    pub async fn resolve_connector(&self) -> ConnectResult<&ActiveConnector> {
        let connector = self
            .connector
            .get_or_try_init(|| self.create_connector())
            .await?;

        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        if *state == AdapterState::Uninitialized {
            *state = AdapterState::ConnectorResolved;
        }
        Ok(connector)
    }

    async fn create_connector(&self) -> ConnectResult<ActiveConnector> {
        if self.is_injected {
            let config = InjectedConnectorConfig {
                chains: self.options.chains.clone(),
                storage: Arc::clone(&self.storage),
                shim_disconnect: true,
            };
            let connector = self.factories.injected.create(config).await?;
            log_info!("core_wallet", "Using injected connector");
            return Ok(ActiveConnector::Injected(connector));
        }

        let config = PairingConnectorConfig {
            chains: self.options.chains.clone(),
            project_id: self.options.effective_project_id(),
            storage: Arc::clone(&self.storage),
            qrcode: self.options.qrcode,
            dapp_metadata: self.options.dapp_metadata.clone(),
            qr_modal_options: self.options.qr_modal_options.clone(),
        };
        let connector = self.factories.pairing.create(config).await?;
        self.forward_session_requests(connector.subscribe());
        log_info!(
            "core_wallet",
            "Using remote pairing connector",
            qrcode = self.options.qrcode,
        );
        Ok(ActiveConnector::RemotePairing(connector))
    }

    /// Re-publish the pairing connector's session request events
    fn forward_session_requests(&self, mut rx: broadcast::Receiver<PairingEvent>) {
        let events = self.events.clone();
        let handle = tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(PairingEvent::SessionRequestSent) => {
                        // No subscribers is fine
                        let _ = events.send(WalletEvent::SessionRequestSent);
                    }
                    Ok(PairingEvent::DisplayUri(_)) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        log_warn!("core_wallet", "Pairing events dropped", skipped = skipped);
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });

        let previous = self
            .forwarder
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .replace(handle);
        if let Some(previous) = previous {
            previous.abort();
        }
    }

    fn set_state(&self, next: AdapterState) {
        *self.state.write().unwrap_or_else(|e| e.into_inner()) = next;
    }

    fn emit(&self, event: WalletEvent) {
        let _ = self.events.send(event);
    }

    /// Connect through whichever connector the adapter resolved.
    ///
    /// Returns the connected address.
    pub async fn connect(&self, options: ConnectOptions) -> ConnectResult<String> {
        let connector = self.resolve_connector().await?;
        log_debug!(
            "core_wallet",
            "Connecting",
            connector = connector.kind(),
            chain_id = options.chain_id.map_or_else(|| "default".to_string(), |id| id.to_string()),
        );

        let info = connector.connect(options.chain_id).await.map_err(|e| {
            log_warn!("core_wallet", "Connect failed", error = e);
            e
        })?;

        self.set_state(AdapterState::Connected);
        log_info!(
            "core_wallet",
            "Connected",
            address = info.address,
            chain_id = info.chain_id,
        );
        self.emit(WalletEvent::Connect {
            address: info.address.clone(),
            chain_id: info.chain_id,
        });
        Ok(info.address)
    }

    /// Connect over the pairing protocol, handing each pairing URI to the caller.
    ///
    /// Fails with `UnsupportedOperation` when the adapter resolved to the
    /// injected connector. Errors from the connector propagate unchanged and
    /// `on_connected` is not called.
    pub async fn connect_with_qr_code<U, C>(
        &self,
        args: ConnectWithQrCodeArgs<U, C>,
    ) -> ConnectResult<()>
    where
        U: FnMut(String) + Send,
        C: FnOnce(String) + Send,
    {
        let ConnectWithQrCodeArgs {
            chain_id,
            mut on_qr_code_uri,
            on_connected,
        } = args;

        let pairing = match self.resolve_connector().await? {
            ActiveConnector::RemotePairing(connector) => Arc::clone(connector),
            ActiveConnector::Injected(_) => {
                return Err(ConnectError::unsupported_operation(
                    "Remote pairing connector not found",
                ))
            }
        };

        // Subscribe before connecting so no URI is missed
        let mut uris = pairing.subscribe();
        let address = drive_with_uris(
            &mut uris,
            &mut on_qr_code_uri,
            self.connect(ConnectOptions { chain_id }),
        )
        .await?;

        on_connected(address);
        Ok(())
    }

    pub async fn disconnect(&self) -> ConnectResult<()> {
        if let Some(connector) = self.connector.get() {
            connector.disconnect().await?;
        }
        self.set_state(AdapterState::Disconnected);
        log_info!("core_wallet", "Disconnected");
        self.emit(WalletEvent::Disconnect);
        Ok(())
    }

    pub async fn get_address(&self) -> ConnectResult<String> {
        self.require_connector()?.get_address().await
    }

    pub async fn get_chain_id(&self) -> ConnectResult<u64> {
        self.require_connector()?.get_chain_id().await
    }

    pub async fn switch_chain(&self, chain_id: u64) -> ConnectResult<()> {
        self.require_connector()?.switch_chain(chain_id).await?;
        log_info!("core_wallet", "Chain switched", chain_id = chain_id);
        self.emit(WalletEvent::ChainChanged { chain_id });
        Ok(())
    }

    /// Ask the Core extension to switch the active account.
    ///
    /// Only supported once the injected connector has been resolved; this
    /// never resolves a connector on its own.
    pub async fn switch_account(&self) -> ConnectResult<()> {
        let injected = self
            .connector
            .get()
            .and_then(ActiveConnector::as_injected)
            .ok_or_else(|| ConnectError::unsupported_operation("Can not switch Account"))?;

        injected.switch_account().await?;
        let address = injected.get_address().await?;
        log_info!("core_wallet", "Account switched", address = address);
        self.emit(WalletEvent::AccountChanged { address });
        Ok(())
    }

    fn require_connector(&self) -> ConnectResult<&ActiveConnector> {
        self.connector
            .get()
            .ok_or_else(|| ConnectError::not_connected("Wallet is not connected"))
    }

    /// Pairing connector, if that is what the adapter resolved to
    pub fn pairing_connector(&self) -> Option<Arc<dyn PairingConnector>> {
        self.connector.get().and_then(ActiveConnector::as_pairing).cloned()
    }
}

impl Drop for CoreWallet {
    fn drop(&mut self) {
        let forwarder = self.forwarder.get_mut().unwrap_or_else(|e| e.into_inner());
        if let Some(handle) = forwarder.take() {
            handle.abort();
        }
    }
}

/// Run `connect` to completion while relaying pairing URIs to `on_uri`.
///
/// URIs published in the same poll that completed the connection are
/// delivered before returning.
async fn drive_with_uris<F, U>(
    uris: &mut broadcast::Receiver<PairingEvent>,
    on_uri: &mut U,
    connect: F,
) -> ConnectResult<String>
where
    F: Future<Output = ConnectResult<String>>,
    U: FnMut(String),
{
    tokio::pin!(connect);
    let mut listening = true;

    let address = loop {
        tokio::select! {
            biased;
            event = uris.recv(), if listening => match event {
                Ok(PairingEvent::DisplayUri(uri)) => {
                    log_debug!("core_wallet", "Pairing URI ready", uri = uri);
                    on_uri(uri);
                }
                Ok(PairingEvent::SessionRequestSent) => {}
                Err(RecvError::Lagged(skipped)) => {
                    log_warn!("core_wallet", "Pairing URIs dropped", skipped = skipped);
                }
                Err(RecvError::Closed) => listening = false,
            },
            result = &mut connect => break result?,
        }
    };

    while let Ok(event) = uris.try_recv() {
        if let PairingEvent::DisplayUri(uri) = event {
            on_uri(uri);
        }
    }

    Ok(address)
}
