//! Adapter tests against stub connectors

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::broadcast;

use super::*;
use crate::error::{ConnectError, ConnectResult, ErrorCode};

const QR_URI: &str = "wc:abcd...@2";
const PAIRED_ADDRESS: &str = "0xAAA...111";
const INJECTED_ADDRESS: &str = "0x1111111111111111111111111111111111111111";
const SWITCHED_ADDRESS: &str = "0x2222222222222222222222222222222222222222";

struct StubInjected {
    address: Mutex<String>,
    chain_id: AtomicU64,
    switch_calls: AtomicUsize,
    disconnect_calls: AtomicUsize,
}

impl StubInjected {
    fn new() -> Self {
        Self {
            address: Mutex::new(INJECTED_ADDRESS.to_string()),
            chain_id: AtomicU64::new(43114),
            switch_calls: AtomicUsize::new(0),
            disconnect_calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl InjectedConnector for StubInjected {
    async fn connect(&self, chain_id: Option<u64>) -> ConnectResult<ConnectionInfo> {
        if let Some(id) = chain_id {
            self.chain_id.store(id, Ordering::SeqCst);
        }
        Ok(ConnectionInfo {
            address: self.address.lock().unwrap().clone(),
            chain_id: self.chain_id.load(Ordering::SeqCst),
        })
    }

    async fn disconnect(&self) -> ConnectResult<()> {
        self.disconnect_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn get_address(&self) -> ConnectResult<String> {
        Ok(self.address.lock().unwrap().clone())
    }

    async fn get_chain_id(&self) -> ConnectResult<u64> {
        Ok(self.chain_id.load(Ordering::SeqCst))
    }

    async fn switch_chain(&self, chain_id: u64) -> ConnectResult<()> {
        self.chain_id.store(chain_id, Ordering::SeqCst);
        Ok(())
    }

    async fn switch_account(&self) -> ConnectResult<()> {
        self.switch_calls.fetch_add(1, Ordering::SeqCst);
        *self.address.lock().unwrap() = SWITCHED_ADDRESS.to_string();
        Ok(())
    }
}

struct StubInjectedFactory {
    present: bool,
    connector: Arc<StubInjected>,
    created: AtomicUsize,
    last_config: Mutex<Option<InjectedConnectorConfig>>,
}

#[async_trait]
impl InjectedConnectorFactory for StubInjectedFactory {
    fn detect_provider(&self) -> bool {
        self.present
    }

    async fn create(
        &self,
        config: InjectedConnectorConfig,
    ) -> ConnectResult<Arc<dyn InjectedConnector>> {
        self.created.fetch_add(1, Ordering::SeqCst);
        *self.last_config.lock().unwrap() = Some(config);
        tokio::task::yield_now().await;
        Ok(self.connector.clone() as Arc<dyn InjectedConnector>)
    }
}

struct StubPairing {
    events: broadcast::Sender<PairingEvent>,
    uri: String,
    address: String,
    failure: Option<ConnectError>,
    chain_id: AtomicU64,
}

impl StubPairing {
    fn new(uri: &str, address: &str) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            events,
            uri: uri.to_string(),
            address: address.to_string(),
            failure: None,
            chain_id: AtomicU64::new(1),
        }
    }

    fn failing(error: ConnectError) -> Self {
        Self {
            failure: Some(error),
            ..Self::new(QR_URI, PAIRED_ADDRESS)
        }
    }
}

#[async_trait]
impl PairingConnector for StubPairing {
    async fn connect(&self, chain_id: Option<u64>) -> ConnectResult<ConnectionInfo> {
        let _ = self.events.send(PairingEvent::DisplayUri(self.uri.clone()));
        tokio::task::yield_now().await;
        let _ = self.events.send(PairingEvent::SessionRequestSent);
        tokio::task::yield_now().await;

        if let Some(error) = &self.failure {
            return Err(error.clone());
        }
        if let Some(id) = chain_id {
            self.chain_id.store(id, Ordering::SeqCst);
        }
        Ok(ConnectionInfo {
            address: self.address.clone(),
            chain_id: self.chain_id.load(Ordering::SeqCst),
        })
    }

    async fn disconnect(&self) -> ConnectResult<()> {
        Ok(())
    }

    async fn get_address(&self) -> ConnectResult<String> {
        Ok(self.address.clone())
    }

    async fn get_chain_id(&self) -> ConnectResult<u64> {
        Ok(self.chain_id.load(Ordering::SeqCst))
    }

    async fn switch_chain(&self, chain_id: u64) -> ConnectResult<()> {
        self.chain_id.store(chain_id, Ordering::SeqCst);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<PairingEvent> {
        self.events.subscribe()
    }
}

struct StubPairingFactory {
    connector: Arc<StubPairing>,
    created: AtomicUsize,
    last_config: Mutex<Option<PairingConnectorConfig>>,
}

#[async_trait]
impl PairingConnectorFactory for StubPairingFactory {
    async fn create(
        &self,
        config: PairingConnectorConfig,
    ) -> ConnectResult<Arc<dyn PairingConnector>> {
        self.created.fetch_add(1, Ordering::SeqCst);
        *self.last_config.lock().unwrap() = Some(config);
        tokio::task::yield_now().await;
        Ok(self.connector.clone() as Arc<dyn PairingConnector>)
    }
}

struct Harness {
    wallet: CoreWallet,
    injected: Arc<StubInjectedFactory>,
    pairing: Arc<StubPairingFactory>,
}

fn harness_with(options: CoreWalletOptions, present: bool, pairing: StubPairing) -> Harness {
    let injected = Arc::new(StubInjectedFactory {
        present,
        connector: Arc::new(StubInjected::new()),
        created: AtomicUsize::new(0),
        last_config: Mutex::new(None),
    });
    let pairing = Arc::new(StubPairingFactory {
        connector: Arc::new(pairing),
        created: AtomicUsize::new(0),
        last_config: Mutex::new(None),
    });
    let factories = ConnectorFactories {
        injected: injected.clone(),
        pairing: pairing.clone(),
    };
    let wallet = CoreWallet::new(options, Arc::new(MemoryStorage::new()), factories).unwrap();
    Harness {
        wallet,
        injected,
        pairing,
    }
}

fn injected_harness() -> Harness {
    harness_with(CoreWalletOptions::default(), true, StubPairing::new(QR_URI, PAIRED_ADDRESS))
}

fn pairing_harness() -> Harness {
    harness_with(CoreWalletOptions::default(), false, StubPairing::new(QR_URI, PAIRED_ADDRESS))
}

async fn next_event(rx: &mut broadcast::Receiver<WalletEvent>) -> WalletEvent {
    tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("timed out waiting for event")
        .unwrap()
}

#[test]
fn test_identity() {
    let h = injected_harness();
    assert_eq!(h.wallet.wallet_id(), "core");
    assert_eq!(h.wallet.wallet_name(), "Core wallet");
    assert_eq!(CoreWallet::ID, wallet_ids::CORE_WALLET);
    assert_eq!(h.wallet.state(), AdapterState::Uninitialized);
    assert!(h.wallet.active_connector().is_none());
}

#[test]
fn test_invalid_options_rejected() {
    let options = CoreWalletOptions::default().with_chains(vec![]);
    let injected = Arc::new(StubInjectedFactory {
        present: true,
        connector: Arc::new(StubInjected::new()),
        created: AtomicUsize::new(0),
        last_config: Mutex::new(None),
    });
    let pairing = Arc::new(StubPairingFactory {
        connector: Arc::new(StubPairing::new(QR_URI, PAIRED_ADDRESS)),
        created: AtomicUsize::new(0),
        last_config: Mutex::new(None),
    });
    let result = CoreWallet::new(
        options,
        Arc::new(MemoryStorage::new()),
        ConnectorFactories { injected, pairing },
    );
    assert_eq!(result.err().map(|e| e.code), Some(ErrorCode::InvalidConfig));
}

#[tokio::test]
async fn test_resolve_connector_is_memoized() {
    let h = pairing_harness();
    let first = h.wallet.resolve_connector().await.unwrap();
    let second = h.wallet.resolve_connector().await.unwrap();

    assert!(std::ptr::eq(first, second));
    assert_eq!(first.kind(), ConnectorKind::RemotePairing);
    assert_eq!(h.pairing.created.load(Ordering::SeqCst), 1);
    assert_eq!(h.injected.created.load(Ordering::SeqCst), 0);
    assert_eq!(h.wallet.state(), AdapterState::ConnectorResolved);
}

#[tokio::test]
async fn test_concurrent_resolution_constructs_once() {
    let h = injected_harness();
    let (a, b) = tokio::join!(h.wallet.resolve_connector(), h.wallet.resolve_connector());

    assert!(std::ptr::eq(a.unwrap(), b.unwrap()));
    assert_eq!(h.injected.created.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_injected_branch_configuration() {
    let h = injected_harness();
    let connector = h.wallet.resolve_connector().await.unwrap();
    assert_eq!(connector.kind(), ConnectorKind::Injected);
    assert!(h.wallet.is_injected());

    let config = h.injected.last_config.lock().unwrap().clone().unwrap();
    assert!(config.shim_disconnect);
    assert_eq!(config.chains, h.wallet.options().chains);
    assert_eq!(h.pairing.created.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_pairing_branch_configuration() {
    let options = CoreWalletOptions::default().with_qrcode(false).with_dapp_metadata(DappMetadata {
        name: "Demo".to_string(),
        url: "https://demo.example".to_string(),
        ..Default::default()
    });
    let h = harness_with(options, false, StubPairing::new(QR_URI, PAIRED_ADDRESS));
    h.wallet.resolve_connector().await.unwrap();

    let config = h.pairing.last_config.lock().unwrap().clone().unwrap();
    assert_eq!(config.project_id, DEFAULT_WC_PROJECT_ID);
    assert!(!config.qrcode);
    assert_eq!(config.dapp_metadata.name, "Demo");
    assert!(config.qr_modal_options.is_none());
    assert!(h.wallet.pairing_connector().is_some());
}

#[tokio::test]
async fn test_switch_account_on_fresh_adapter() {
    let h = injected_harness();
    let err = h.wallet.switch_account().await.unwrap_err();

    assert_eq!(err.code, ErrorCode::UnsupportedOperation);
    // Never resolves a connector on its own
    assert_eq!(h.injected.created.load(Ordering::SeqCst), 0);
    assert!(h.wallet.active_connector().is_none());
}

#[tokio::test]
async fn test_switch_account_on_pairing_adapter() {
    let h = pairing_harness();
    h.wallet.resolve_connector().await.unwrap();
    let err = h.wallet.switch_account().await.unwrap_err();
    assert!(err.is_unsupported_operation());
}

#[tokio::test]
async fn test_switch_account_delegates_to_injected() {
    let h = injected_harness();
    h.wallet.connect(ConnectOptions::default()).await.unwrap();
    let mut events = h.wallet.subscribe();

    h.wallet.switch_account().await.unwrap();

    assert_eq!(h.injected.connector.switch_calls.load(Ordering::SeqCst), 1);
    assert_eq!(
        next_event(&mut events).await,
        WalletEvent::AccountChanged {
            address: SWITCHED_ADDRESS.to_string()
        }
    );
    assert_eq!(h.wallet.get_address().await.unwrap(), SWITCHED_ADDRESS);
}

#[tokio::test]
async fn test_connect_with_qr_code_on_injected_adapter() {
    let h = injected_harness();
    let mut uris = Vec::new();
    let mut connected = None;

    let err = h
        .wallet
        .connect_with_qr_code(ConnectWithQrCodeArgs {
            chain_id: None,
            on_qr_code_uri: |uri: String| uris.push(uri),
            on_connected: |address: String| connected = Some(address),
        })
        .await
        .unwrap_err();

    assert_eq!(err.code, ErrorCode::UnsupportedOperation);
    assert!(uris.is_empty());
    assert!(connected.is_none());
    assert_ne!(h.wallet.state(), AdapterState::Connected);
}

#[tokio::test]
async fn test_connect_with_qr_code_scenario() {
    let h = pairing_harness();
    assert!(!h.wallet.is_injected());

    let mut uris = Vec::new();
    let mut connected = Vec::new();

    h.wallet
        .connect_with_qr_code(ConnectWithQrCodeArgs {
            chain_id: Some(43114),
            on_qr_code_uri: |uri: String| uris.push(uri),
            on_connected: |address: String| connected.push(address),
        })
        .await
        .unwrap();

    assert_eq!(uris, vec![QR_URI.to_string()]);
    assert_eq!(connected, vec![PAIRED_ADDRESS.to_string()]);
    assert_eq!(h.wallet.state(), AdapterState::Connected);
    assert_eq!(h.wallet.get_chain_id().await.unwrap(), 43114);
}

#[tokio::test]
async fn test_connect_with_qr_code_propagates_rejection() {
    let rejection = ConnectError::connector("User rejected the request");
    let h = harness_with(
        CoreWalletOptions::default(),
        false,
        StubPairing::failing(rejection.clone()),
    );

    let mut uris = Vec::new();
    let mut connected = None;
    let err = h
        .wallet
        .connect_with_qr_code(ConnectWithQrCodeArgs {
            chain_id: None,
            on_qr_code_uri: |uri: String| uris.push(uri),
            on_connected: |address: String| connected = Some(address),
        })
        .await
        .unwrap_err();

    assert_eq!(err, rejection);
    assert_eq!(uris, vec![QR_URI.to_string()]);
    assert!(connected.is_none());
    assert_eq!(h.wallet.state(), AdapterState::ConnectorResolved);
}

#[tokio::test]
async fn test_session_request_is_forwarded() {
    let h = pairing_harness();
    let mut events = h.wallet.subscribe();
    h.wallet.connect(ConnectOptions::default()).await.unwrap();

    let mut seen = Vec::new();
    while seen.len() < 2 {
        seen.push(next_event(&mut events).await);
    }

    assert!(seen.contains(&WalletEvent::SessionRequestSent));
    assert!(seen.contains(&WalletEvent::Connect {
        address: PAIRED_ADDRESS.to_string(),
        chain_id: 1,
    }));
    assert!(seen.iter().any(|e| e.name() == "wc_session_request_sent"));
}

#[tokio::test]
async fn test_connect_switch_chain_disconnect() {
    let h = injected_harness();
    let mut events = h.wallet.subscribe();

    let address = h.wallet.connect(ConnectOptions { chain_id: Some(43113) }).await.unwrap();
    assert_eq!(address, INJECTED_ADDRESS);
    assert_eq!(h.wallet.state(), AdapterState::Connected);
    assert_eq!(
        next_event(&mut events).await,
        WalletEvent::Connect {
            address: INJECTED_ADDRESS.to_string(),
            chain_id: 43113,
        }
    );

    h.wallet.switch_chain(1).await.unwrap();
    assert_eq!(h.wallet.get_chain_id().await.unwrap(), 1);
    assert_eq!(next_event(&mut events).await, WalletEvent::ChainChanged { chain_id: 1 });

    h.wallet.disconnect().await.unwrap();
    assert_eq!(h.wallet.state(), AdapterState::Disconnected);
    assert_eq!(h.injected.connector.disconnect_calls.load(Ordering::SeqCst), 1);
    assert_eq!(next_event(&mut events).await, WalletEvent::Disconnect);
}

#[tokio::test]
async fn test_reconnect_after_disconnect_reuses_connector() {
    let h = injected_harness();
    h.wallet.connect(ConnectOptions::default()).await.unwrap();
    h.wallet.disconnect().await.unwrap();
    h.wallet.connect(ConnectOptions::default()).await.unwrap();

    assert_eq!(h.wallet.state(), AdapterState::Connected);
    assert_eq!(h.injected.created.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_queries_before_resolution() {
    let h = injected_harness();
    assert_eq!(h.wallet.get_address().await.unwrap_err().code, ErrorCode::NotConnected);
    assert_eq!(h.wallet.get_chain_id().await.unwrap_err().code, ErrorCode::NotConnected);
    assert_eq!(h.wallet.switch_chain(1).await.unwrap_err().code, ErrorCode::NotConnected);

    // Disconnecting an unresolved adapter is a no-op on the connector side
    h.wallet.disconnect().await.unwrap();
    assert_eq!(h.wallet.state(), AdapterState::Disconnected);
    assert_eq!(h.injected.created.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_multibyte_address_connects() {
    for address in ["0xaééééééé", "0xéééééééééééééééééééééééééééééééééééééééé"] {
        let h = harness_with(CoreWalletOptions::default(), false, StubPairing::new(QR_URI, address));
        let connected = h.wallet.connect(ConnectOptions::default()).await.unwrap();
        assert_eq!(connected, address);
        assert_eq!(h.wallet.state(), AdapterState::Connected);
    }
}

#[tokio::test]
async fn test_forwarding_stops_when_wallet_dropped() {
    let Harness { wallet, pairing, .. } = pairing_harness();
    wallet.resolve_connector().await.unwrap();
    assert_eq!(pairing.connector.events.receiver_count(), 1);

    drop(wallet);

    tokio::time::timeout(Duration::from_secs(2), async {
        while pairing.connector.events.receiver_count() > 0 {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("forwarding task still subscribed after drop");
}
