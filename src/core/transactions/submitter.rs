// src/core/transactions/submitter.rs
use solana_sdk::{
    pubkey::Pubkey, signature::Signature, system_instruction, transaction::Transaction,
};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tokio::time;
use tracing::{debug, error, info, warn};

use crate::blockchain::{ConfirmationStatus, NetworkRpc};
use crate::core::notify::{Notice, Notifier};
use crate::core::wallet::extension::{WalletError, WalletExtension};
use crate::core::wallet::session::WalletSession;
use crate::utils::config::Config;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransferError {
    #[error("wallet not connected")]
    WalletNotConnected,

    #[error("signature request rejected: {0}")]
    Rejected(String),

    #[error("signing failed: {0}")]
    Signing(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("transaction failed on chain: {0}")]
    FailedOnChain(String),

    #[error("confirmation timed out after {0:?}")]
    ConfirmationTimeout(Duration),
}

/// Lifecycle of a single submission attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptState {
    Idle,
    Pending,
    Success(Signature),
    Failed(String),
}

#[derive(Debug, Clone, Copy)]
pub struct ConfirmationSettings {
    pub timeout: Duration,
    pub poll_interval: Duration,
}

impl From<&Config> for ConfirmationSettings {
    fn from(config: &Config) -> Self {
        Self {
            timeout: config.get_confirmation_timeout(),
            poll_interval: config.get_confirmation_poll_interval(),
        }
    }
}

impl Default for ConfirmationSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            poll_interval: Duration::from_millis(500),
        }
    }
}

/// Builds, signs, broadcasts and confirms one transfer per call. Nothing is
/// retried and nothing is deduplicated: every call is a new transaction.
pub struct TransactionSubmitter {
    rpc: Arc<dyn NetworkRpc>,
    wallet: Arc<dyn WalletExtension>,
    notifier: Arc<dyn Notifier>,
    settings: ConfirmationSettings,
    state: watch::Sender<AttemptState>,
}

impl TransactionSubmitter {
    pub fn new(
        rpc: Arc<dyn NetworkRpc>,
        wallet: Arc<dyn WalletExtension>,
        notifier: Arc<dyn Notifier>,
        settings: ConfirmationSettings,
    ) -> Self {
        let (state, _) = watch::channel(AttemptState::Idle);
        Self {
            rpc,
            wallet,
            notifier,
            settings,
            state,
        }
    }

    pub fn state(&self) -> AttemptState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<AttemptState> {
        self.state.subscribe()
    }

    /// Returns a finished attempt to `Idle`. A pending attempt is left alone.
    pub fn reset(&self) {
        self.state.send_if_modified(|state| {
            if matches!(state, AttemptState::Pending) {
                false
            } else {
                *state = AttemptState::Idle;
                true
            }
        });
    }

    pub async fn submit(
        &self,
        session: &WalletSession,
        to: &Pubkey,
        lamports: u64,
    ) -> Result<Signature, TransferError> {
        let from = match (session.connected, session.address) {
            (true, Some(address)) => address,
            _ => {
                let err = TransferError::WalletNotConnected;
                self.state.send_replace(AttemptState::Failed(err.to_string()));
                return Err(err);
            }
        };

        self.state.send_replace(AttemptState::Pending);
        let result = self.execute(from, to, lamports).await;

        match &result {
            Ok(signature) => {
                info!("Transaction confirmed with signature: {}", signature);
                self.state.send_replace(AttemptState::Success(*signature));
                self.notifier
                    .notify(Notice::success("Transaction completed successfully!"));
            }
            Err(e) => {
                error!("Transfer failed: {}", e);
                self.state.send_replace(AttemptState::Failed(e.to_string()));
            }
        }
        result
    }

    async fn execute(
        &self,
        from: Pubkey,
        to: &Pubkey,
        lamports: u64,
    ) -> Result<Signature, TransferError> {
        debug!("Getting recent blockhash...");
        let blockhash = self
            .rpc
            .get_latest_blockhash()
            .await
            .map_err(|e| TransferError::Network(e.to_string()))?;

        let instruction = system_instruction::transfer(&from, to, lamports);
        let mut transaction = Transaction::new_with_payer(&[instruction], Some(&from));
        transaction.message.recent_blockhash = blockhash;

        debug!("Requesting transaction signature...");
        let signed = self
            .wallet
            .sign_transaction(transaction)
            .await
            .map_err(|e| match e {
                WalletError::UserRejected => {
                    TransferError::Rejected("the wallet declined to sign".to_string())
                }
                WalletError::NotConnected | WalletError::Unavailable => {
                    TransferError::WalletNotConnected
                }
                other => TransferError::Signing(other.to_string()),
            })?;

        debug!("Sending transaction to network...");
        let signature = self
            .rpc
            .send_transaction(&signed)
            .await
            .map_err(|e| TransferError::Network(e.to_string()))?;

        info!("Transaction {} sent, waiting for confirmation...", signature);
        self.await_confirmation(&signature).await?;
        Ok(signature)
    }

    async fn await_confirmation(&self, signature: &Signature) -> Result<(), TransferError> {
        let poll = async {
            let mut ticker = time::interval(self.settings.poll_interval);
            loop {
                ticker.tick().await;
                match self.rpc.confirm_transaction(signature).await {
                    Ok(ConfirmationStatus::Confirmed) => return Ok(()),
                    Ok(ConfirmationStatus::Failed(reason)) => {
                        return Err(TransferError::FailedOnChain(reason))
                    }
                    Ok(ConfirmationStatus::Unconfirmed) => {}
                    Err(e) => warn!("Confirmation poll for {} failed: {}", signature, e),
                }
            }
        };

        match time::timeout(self.settings.timeout, poll).await {
            Ok(result) => result,
            Err(_) => Err(TransferError::ConfirmationTimeout(self.settings.timeout)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::solana::MockNetworkRpc;
    use crate::blockchain::RpcError;
    use crate::core::notify::NotificationCenter;
    use crate::core::wallet::extension::MockWalletExtension;
    use solana_sdk::{hash::Hash, system_program};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn session(address: Pubkey) -> WalletSession {
        WalletSession {
            connected: true,
            connecting: false,
            address: Some(address),
            balance: Some(10_000_000),
        }
    }

    fn submitter(rpc: MockNetworkRpc, wallet: MockWalletExtension) -> TransactionSubmitter {
        TransactionSubmitter::new(
            Arc::new(rpc),
            Arc::new(wallet),
            Arc::new(NotificationCenter::new()),
            ConfirmationSettings {
                timeout: Duration::from_secs(5),
                poll_interval: Duration::from_millis(100),
            },
        )
    }

    #[tokio::test]
    async fn test_disconnected_wallet_fails_without_network() {
        let submitter = submitter(MockNetworkRpc::new(), MockWalletExtension::new());

        let err = submitter
            .submit(&WalletSession::default(), &Pubkey::new_unique(), 1)
            .await
            .unwrap_err();

        assert_eq!(err, TransferError::WalletNotConnected);
        assert!(matches!(submitter.state(), AttemptState::Failed(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_successful_transfer_is_confirmed() {
        let from = Pubkey::new_unique();
        let to = Pubkey::new_unique();
        let blockhash = Hash::new_unique();
        let signature = Signature::new_unique();
        let polls = Arc::new(AtomicUsize::new(0));

        let mut rpc = MockNetworkRpc::new();
        rpc.expect_get_latest_blockhash()
            .times(1)
            .returning(move || Ok(blockhash));
        rpc.expect_send_transaction()
            .times(1)
            .returning(move |_| Ok(signature));
        {
            let polls = polls.clone();
            rpc.expect_confirm_transaction().returning(move |_| {
                if polls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Ok(ConfirmationStatus::Unconfirmed)
                } else {
                    Ok(ConfirmationStatus::Confirmed)
                }
            });
        }

        let mut wallet = MockWalletExtension::new();
        wallet
            .expect_sign_transaction()
            .withf(move |tx| {
                let message = &tx.message;
                message.recent_blockhash == blockhash
                    && message.instructions.len() == 1
                    && message.account_keys[0] == from
                    && message.account_keys.contains(&to)
                    && message.account_keys.contains(&system_program::id())
            })
            .times(1)
            .returning(|tx| Ok(tx));

        let submitter = submitter(rpc, wallet);
        let result = submitter.submit(&session(from), &to, 1_000_000).await;

        assert_eq!(result.unwrap(), signature);
        assert_eq!(submitter.state(), AttemptState::Success(signature));
        assert_eq!(polls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_rejected_signature_is_not_broadcast() {
        let mut rpc = MockNetworkRpc::new();
        rpc.expect_get_latest_blockhash()
            .returning(|| Ok(Hash::new_unique()));
        rpc.expect_send_transaction().times(0);

        let mut wallet = MockWalletExtension::new();
        wallet
            .expect_sign_transaction()
            .returning(|_| Err(WalletError::UserRejected));

        let submitter = submitter(rpc, wallet);
        let err = submitter
            .submit(&session(Pubkey::new_unique()), &Pubkey::new_unique(), 1)
            .await
            .unwrap_err();

        assert!(matches!(err, TransferError::Rejected(_)));
        assert!(matches!(submitter.state(), AttemptState::Failed(_)));

        submitter.reset();
        assert_eq!(submitter.state(), AttemptState::Idle);
    }

    #[tokio::test]
    async fn test_blockhash_failure_is_network_error() {
        let mut rpc = MockNetworkRpc::new();
        rpc.expect_get_latest_blockhash()
            .returning(|| Err(RpcError::Client("503".into())));

        let submitter = submitter(rpc, MockWalletExtension::new());
        let err = submitter
            .submit(&session(Pubkey::new_unique()), &Pubkey::new_unique(), 1)
            .await
            .unwrap_err();

        assert!(matches!(err, TransferError::Network(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unconfirmed_transfer_times_out() {
        let mut rpc = MockNetworkRpc::new();
        rpc.expect_get_latest_blockhash()
            .returning(|| Ok(Hash::new_unique()));
        rpc.expect_send_transaction()
            .returning(|_| Ok(Signature::new_unique()));
        rpc.expect_confirm_transaction()
            .returning(|_| Ok(ConfirmationStatus::Unconfirmed));

        let mut wallet = MockWalletExtension::new();
        wallet.expect_sign_transaction().returning(|tx| Ok(tx));

        let submitter = submitter(rpc, wallet);
        let err = submitter
            .submit(&session(Pubkey::new_unique()), &Pubkey::new_unique(), 1)
            .await
            .unwrap_err();

        assert_eq!(err, TransferError::ConfirmationTimeout(Duration::from_secs(5)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_on_chain_failure_is_reported() {
        let mut rpc = MockNetworkRpc::new();
        rpc.expect_get_latest_blockhash()
            .returning(|| Ok(Hash::new_unique()));
        rpc.expect_send_transaction()
            .returning(|_| Ok(Signature::new_unique()));
        rpc.expect_confirm_transaction()
            .returning(|_| Ok(ConfirmationStatus::Failed("insufficient funds".into())));

        let mut wallet = MockWalletExtension::new();
        wallet.expect_sign_transaction().returning(|tx| Ok(tx));

        let submitter = submitter(rpc, wallet);
        let err = submitter
            .submit(&session(Pubkey::new_unique()), &Pubkey::new_unique(), 1)
            .await
            .unwrap_err();

        assert_eq!(err, TransferError::FailedOnChain("insufficient funds".into()));
    }
}
