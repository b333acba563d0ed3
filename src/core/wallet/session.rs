// src/core/wallet/session.rs
use parking_lot::Mutex;
use solana_sdk::pubkey::Pubkey;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::extension::WalletExtension;
use crate::blockchain::NetworkRpc;
use crate::core::notify::{Notice, Notifier};
use crate::core::presentation::short_address;
use crate::storage::local::{LocalStorage, WALLET_CONNECTED_KEY};
use crate::utils::error::{Result, VerifyError};

/// Connection state as seen by the rest of the application.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WalletSession {
    pub connected: bool,
    pub connecting: bool,
    pub address: Option<Pubkey>,
    /// Lamports; `None` until a balance fetch succeeds.
    pub balance: Option<u64>,
}

struct SessionInner {
    extension: Arc<dyn WalletExtension>,
    rpc: Arc<dyn NetworkRpc>,
    local: Arc<dyn LocalStorage>,
    notifier: Arc<dyn Notifier>,
    state: watch::Sender<WalletSession>,
    refresher: Mutex<Option<JoinHandle<()>>>,
    refresh_interval: Duration,
}

impl Drop for SessionInner {
    fn drop(&mut self) {
        if let Some(handle) = self.refresher.get_mut().take() {
            handle.abort();
        }
    }
}

enum ConnectStart {
    Started,
    AlreadyConnected(Pubkey),
    Busy,
}

enum Wake {
    Tick,
    Account(Option<Pubkey>),
    AccountsClosed,
}

/// Shared handle to the wallet session. Clones observe the same session;
/// only the methods here mutate it.
#[derive(Clone)]
pub struct WalletSessionHandle {
    inner: Arc<SessionInner>,
}

impl WalletSessionHandle {
    pub fn new(
        extension: Arc<dyn WalletExtension>,
        rpc: Arc<dyn NetworkRpc>,
        local: Arc<dyn LocalStorage>,
        notifier: Arc<dyn Notifier>,
        refresh_interval: Duration,
    ) -> Self {
        let (state, _) = watch::channel(WalletSession::default());
        Self {
            inner: Arc::new(SessionInner {
                extension,
                rpc,
                local,
                notifier,
                state,
                refresher: Mutex::new(None),
                refresh_interval,
            }),
        }
    }

    pub fn snapshot(&self) -> WalletSession {
        self.inner.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<WalletSession> {
        self.inner.state.subscribe()
    }

    pub fn is_connected(&self) -> bool {
        self.inner.state.borrow().connected
    }

    pub fn extension(&self) -> Arc<dyn WalletExtension> {
        self.inner.extension.clone()
    }

    pub async fn connect(&self) -> Result<Pubkey> {
        self.connect_with(false).await
    }

    /// Silent reconnect when the previous run left the session connected.
    pub async fn restore(&self) -> Option<Pubkey> {
        if self.inner.local.get(WALLET_CONNECTED_KEY).as_deref() != Some("true") {
            return None;
        }

        info!("Attempting silent wallet reconnect");
        match self.connect_with(true).await {
            Ok(address) => Some(address),
            Err(e) => {
                warn!("Silent wallet reconnect failed: {}", e);
                None
            }
        }
    }

    async fn connect_with(&self, only_if_trusted: bool) -> Result<Pubkey> {
        if !self.inner.extension.is_available() {
            warn!("Wallet connect requested but no wallet extension was detected");
            return Err(VerifyError::WalletUnavailable);
        }

        let mut start = ConnectStart::Started;
        self.inner.state.send_if_modified(|session| {
            if let (true, Some(address)) = (session.connected, session.address) {
                start = ConnectStart::AlreadyConnected(address);
                false
            } else if session.connecting {
                start = ConnectStart::Busy;
                false
            } else {
                session.connecting = true;
                true
            }
        });

        match start {
            ConnectStart::AlreadyConnected(address) => return Ok(address),
            ConnectStart::Busy => {
                return Err(VerifyError::Connection(
                    "a connection request is already in progress".to_string(),
                ))
            }
            ConnectStart::Started => {}
        }

        let address = match self.inner.extension.connect(only_if_trusted).await {
            Ok(address) => address,
            Err(e) => {
                self.inner.state.send_modify(|session| session.connecting = false);
                warn!("Wallet connection failed: {}", e);
                return Err(e.into());
            }
        };

        self.inner.state.send_modify(|session| {
            session.connected = true;
            session.connecting = false;
            session.address = Some(address);
            session.balance = None;
        });
        if let Err(e) = self.inner.local.set(WALLET_CONNECTED_KEY, "true") {
            warn!("Failed to persist wallet connection hint: {}", e);
        }

        info!("Wallet connected: {}", address);
        self.inner.notifier.notify(
            Notice::success("Wallet connected successfully!").with_description(format!(
                "Connected to {}",
                short_address(&address.to_string())
            )),
        );

        self.refresh_balance().await;
        self.start_refresher();
        Ok(address)
    }

    /// Clears the session. Wallet-side failures are logged and ignored so the
    /// local state can never stay connected after the user asked to leave.
    pub async fn disconnect(&self) {
        self.stop_refresher();

        if let Err(e) = self.inner.extension.disconnect().await {
            warn!("Wallet-side disconnect failed: {}", e);
        }
        self.clear("Wallet disconnected");
        // A connect still finishing may have scheduled one meanwhile.
        self.stop_refresher();
    }

    /// Fetches the balance for the connected address. Returns `None` when
    /// disconnected, on network failure, or when the session changed while
    /// the request was in flight.
    pub async fn refresh_balance(&self) -> Option<u64> {
        let address = {
            let session = self.inner.state.borrow();
            if !session.connected {
                return None;
            }
            session.address?
        };

        match self.inner.rpc.get_balance(&address).await {
            Ok(lamports) => {
                let applied = self.inner.state.send_if_modified(|session| {
                    if session.connected && session.address == Some(address) {
                        session.balance = Some(lamports);
                        true
                    } else {
                        false
                    }
                });
                if applied {
                    Some(lamports)
                } else {
                    debug!("Discarding balance for a session that changed meanwhile");
                    None
                }
            }
            Err(e) => {
                warn!("Balance refresh failed: {}", e);
                None
            }
        }
    }

    /// Applies an account-change notification from the wallet.
    pub async fn handle_account_change(&self, account: Option<Pubkey>) {
        match account {
            None => {
                info!("Wallet dropped the connection");
                self.clear("Wallet disconnected");
                self.stop_refresher();
            }
            Some(address) => {
                let switched = self.inner.state.send_if_modified(|session| {
                    if session.connected && session.address != Some(address) {
                        session.address = Some(address);
                        session.balance = None;
                        true
                    } else {
                        false
                    }
                });
                if switched {
                    info!("Wallet account switched to {}", address);
                    self.refresh_balance().await;
                }
            }
        }
    }

    /// Stops background work; called on application teardown.
    pub fn shutdown(&self) {
        self.stop_refresher();
        debug!("Wallet session shut down");
    }

    fn clear(&self, notice: &str) {
        self.inner.state.send_replace(WalletSession::default());
        if let Err(e) = self.inner.local.remove(WALLET_CONNECTED_KEY) {
            warn!("Failed to clear wallet connection hint: {}", e);
        }
        self.inner.notifier.notify(Notice::info(notice));
    }

    fn stop_refresher(&self) {
        if let Some(handle) = self.inner.refresher.lock().take() {
            handle.abort();
        }
    }

    fn start_refresher(&self) {
        let mut slot = self.inner.refresher.lock();
        if slot.as_ref().map_or(false, |handle| !handle.is_finished()) {
            return;
        }
        if !self.inner.state.borrow().connected {
            debug!("Session disconnected before the refresher started");
            return;
        }

        let weak: Weak<SessionInner> = Arc::downgrade(&self.inner);
        let period = self.inner.refresh_interval;
        let mut accounts = self.inner.extension.account_changes();

        *slot = Some(tokio::spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                let wake = match accounts.as_mut() {
                    Some(rx) => {
                        let changed = tokio::select! {
                            _ = ticker.tick() => None,
                            res = rx.changed() => Some(res.is_ok()),
                        };
                        match changed {
                            None => Wake::Tick,
                            Some(true) => Wake::Account(*rx.borrow_and_update()),
                            Some(false) => Wake::AccountsClosed,
                        }
                    }
                    None => {
                        ticker.tick().await;
                        Wake::Tick
                    }
                };

                let Some(inner) = weak.upgrade() else { break };
                let session = WalletSessionHandle { inner };
                match wake {
                    Wake::Tick => {
                        session.refresh_balance().await;
                    }
                    Wake::Account(account) => session.handle_account_change(account).await,
                    Wake::AccountsClosed => accounts = None,
                }
            }
        }));
        debug!("Balance refresh scheduled every {:?}", period);
    }
}
