// src/core/wallet/extension.rs
use async_trait::async_trait;
use solana_sdk::{
    pubkey::Pubkey,
    signature::{read_keypair_file, Keypair, Signer},
    transaction::Transaction,
};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WalletError {
    #[error("no compatible wallet detected")]
    Unavailable,

    #[error("wallet is not connected")]
    NotConnected,

    #[error("request rejected by the user")]
    UserRejected,

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("signing failed: {0}")]
    Signing(String),
}

/// A user-controlled signing agent.
///
/// `is_available` is a capability check: a missing wallet is an unavailable
/// feature, not an error. `account_changes` yields the newly selected account,
/// or `None` when the wallet dropped the connection on its side.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WalletExtension: Send + Sync {
    fn is_available(&self) -> bool;

    /// With `only_if_trusted` the wallet must not prompt; it either connects
    /// silently or rejects.
    async fn connect(&self, only_if_trusted: bool) -> Result<Pubkey, WalletError>;

    async fn disconnect(&self) -> Result<(), WalletError>;

    async fn sign_transaction(&self, transaction: Transaction) -> Result<Transaction, WalletError>;

    fn account_changes(&self) -> Option<watch::Receiver<Option<Pubkey>>>;
}

/// Wallet backed by a local keypair file, for headless operation.
pub struct KeypairWallet {
    keypair: Option<Keypair>,
    connected: AtomicBool,
}

impl KeypairWallet {
    pub fn new(keypair: Keypair) -> Self {
        Self {
            keypair: Some(keypair),
            connected: AtomicBool::new(false),
        }
    }

    /// A wallet with no key behind it; reports itself as not installed.
    pub fn absent() -> Self {
        Self {
            keypair: None,
            connected: AtomicBool::new(false),
        }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Self {
        match read_keypair_file(path.as_ref()) {
            Ok(keypair) => {
                info!("Loaded wallet keypair {}", keypair.pubkey());
                Self::new(keypair)
            }
            Err(e) => {
                warn!("No usable keypair at {}: {}", path.as_ref().display(), e);
                Self::absent()
            }
        }
    }
}

#[async_trait]
impl WalletExtension for KeypairWallet {
    fn is_available(&self) -> bool {
        self.keypair.is_some()
    }

    async fn connect(&self, _only_if_trusted: bool) -> Result<Pubkey, WalletError> {
        let keypair = self.keypair.as_ref().ok_or(WalletError::Unavailable)?;
        self.connected.store(true, Ordering::SeqCst);
        Ok(keypair.pubkey())
    }

    async fn disconnect(&self) -> Result<(), WalletError> {
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn sign_transaction(
        &self,
        mut transaction: Transaction,
    ) -> Result<Transaction, WalletError> {
        let keypair = self.keypair.as_ref().ok_or(WalletError::Unavailable)?;
        if !self.connected.load(Ordering::SeqCst) {
            return Err(WalletError::NotConnected);
        }

        let blockhash = transaction.message.recent_blockhash;
        transaction
            .try_sign(&[keypair], blockhash)
            .map_err(|e| WalletError::Signing(e.to_string()))?;
        Ok(transaction)
    }

    fn account_changes(&self) -> Option<watch::Receiver<Option<Pubkey>>> {
        None
    }
}
