// tests/common/mod.rs
#![allow(dead_code)]

use async_trait::async_trait;
use auraverify::{
    blockchain::{ConfirmationStatus, NetworkRpc, RpcError, SignatureInfo, TransactionDetails},
    core::{
        identity::{BiometricSimulator, GeneratedIdentity, ScanKind, VerificationForm},
        identity::biometric::ScanTiming,
        notify::{Notice, NoticeLevel, NotificationCenter},
        transactions::{ConfirmationSettings, TransactionSubmitter},
        wallet::{WalletError, WalletExtension, WalletSessionHandle},
        wizard::{VerificationWizard, WizardSettings},
    },
    storage::{MemoryLocalStorage, MemoryRecordStore},
};
use parking_lot::Mutex;
use solana_sdk::{
    hash::Hash,
    pubkey::Pubkey,
    signature::{Keypair, Signature, Signer},
    system_program,
    transaction::Transaction,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch};

/// Wallet that signs with an in-memory keypair. Rejection and availability
/// are switchable from the test.
pub struct FakeWallet {
    keypair: Keypair,
    pub available: AtomicBool,
    pub reject_signing: AtomicBool,
    pub sign_requests: AtomicUsize,
    accounts: watch::Sender<Option<Pubkey>>,
}

impl FakeWallet {
    pub fn new() -> Self {
        let keypair = Keypair::new();
        let (accounts, _) = watch::channel(Some(keypair.pubkey()));
        Self {
            keypair,
            available: AtomicBool::new(true),
            reject_signing: AtomicBool::new(false),
            sign_requests: AtomicUsize::new(0),
            accounts,
        }
    }

    pub fn address(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    /// Simulates the user picking another account, or `None` for a lock.
    pub fn switch_account(&self, account: Option<Pubkey>) {
        self.accounts.send_replace(account);
    }
}

#[async_trait]
impl WalletExtension for FakeWallet {
    fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    async fn connect(&self, _only_if_trusted: bool) -> Result<Pubkey, WalletError> {
        Ok(self.address())
    }

    async fn disconnect(&self) -> Result<(), WalletError> {
        Ok(())
    }

    async fn sign_transaction(&self, mut transaction: Transaction) -> Result<Transaction, WalletError> {
        self.sign_requests.fetch_add(1, Ordering::SeqCst);
        if self.reject_signing.load(Ordering::SeqCst) {
            return Err(WalletError::UserRejected);
        }
        let blockhash = transaction.message.recent_blockhash;
        transaction
            .try_sign(&[&self.keypair], blockhash)
            .map_err(|e| WalletError::Signing(e.to_string()))?;
        Ok(transaction)
    }

    fn account_changes(&self) -> Option<watch::Receiver<Option<Pubkey>>> {
        Some(self.accounts.subscribe())
    }
}

/// In-memory ledger: every sent transaction confirms on the first poll.
pub struct FakeRpc {
    pub balance: Mutex<u64>,
    pub balance_requests: AtomicUsize,
    pub sent: Mutex<Vec<Transaction>>,
    pub fail_balance: AtomicBool,
}

impl FakeRpc {
    pub fn new(balance: u64) -> Self {
        Self {
            balance: Mutex::new(balance),
            balance_requests: AtomicUsize::new(0),
            sent: Mutex::new(Vec::new()),
            fail_balance: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl NetworkRpc for FakeRpc {
    async fn get_balance(&self, _address: &Pubkey) -> Result<u64, RpcError> {
        self.balance_requests.fetch_add(1, Ordering::SeqCst);
        if self.fail_balance.load(Ordering::SeqCst) {
            return Err(RpcError::Client("node unreachable".into()));
        }
        Ok(*self.balance.lock())
    }

    async fn get_latest_blockhash(&self) -> Result<Hash, RpcError> {
        Ok(Hash::new_unique())
    }

    async fn send_transaction(&self, transaction: &Transaction) -> Result<Signature, RpcError> {
        let signature = transaction.signatures.first().copied().unwrap_or_default();
        if signature == Signature::default() {
            return Err(RpcError::InvalidResponse("transaction is not signed".into()));
        }
        self.sent.lock().push(transaction.clone());
        Ok(signature)
    }

    async fn confirm_transaction(&self, signature: &Signature) -> Result<ConfirmationStatus, RpcError> {
        let known = self
            .sent
            .lock()
            .iter()
            .any(|tx| tx.signatures.first() == Some(signature));
        Ok(if known {
            ConfirmationStatus::Confirmed
        } else {
            ConfirmationStatus::Unconfirmed
        })
    }

    async fn get_signatures_for_address(
        &self,
        _address: &Pubkey,
        limit: usize,
    ) -> Result<Vec<SignatureInfo>, RpcError> {
        Ok(self
            .sent
            .lock()
            .iter()
            .rev()
            .take(limit)
            .filter_map(|tx| tx.signatures.first().copied())
            .map(|signature| SignatureInfo {
                signature,
                block_time: Some(1_700_000_000),
                err: None,
            })
            .collect())
    }

    async fn get_transaction(&self, signature: &Signature) -> Result<TransactionDetails, RpcError> {
        Ok(TransactionDetails {
            signature: *signature,
            block_time: Some(1_700_000_000),
            successful: true,
            fee_payer_delta: Some(-1_005_000),
            first_program: Some(system_program::id()),
        })
    }
}

pub const RECIPIENT: &str = "AuR8HMaNKXxUz8qFDWPyZMk8DhQcFYKAT6SLjohzNrUZ";
pub const ATTESTATION_LAMPORTS: u64 = 1_000_000;

pub struct TestContext {
    pub center: Arc<NotificationCenter>,
    pub notices: broadcast::Receiver<Notice>,
    pub wallet: Arc<FakeWallet>,
    pub rpc: Arc<FakeRpc>,
    pub store: Arc<MemoryRecordStore>,
    pub local: Arc<MemoryLocalStorage>,
    pub session: WalletSessionHandle,
}

impl TestContext {
    pub fn new() -> Self {
        let center = Arc::new(NotificationCenter::new());
        let notices = center.subscribe();
        let wallet = Arc::new(FakeWallet::new());
        let rpc = Arc::new(FakeRpc::new(2_000_000_000));
        let store = Arc::new(MemoryRecordStore::new());
        let local = Arc::new(MemoryLocalStorage::new());
        let session = WalletSessionHandle::new(
            wallet.clone(),
            rpc.clone(),
            local.clone(),
            center.clone(),
            Duration::from_secs(30),
        );

        Self {
            center,
            notices,
            wallet,
            rpc,
            store,
            local,
            session,
        }
    }

    pub fn wizard(&self) -> VerificationWizard {
        let form = VerificationForm::new(
            self.store.clone(),
            self.local.clone(),
            Arc::new(GeneratedIdentity),
            self.center.clone(),
        );
        let biometric = BiometricSimulator::new(
            ScanKind::Fingerprint,
            ScanTiming::default(),
            self.center.clone(),
        );
        let submitter = TransactionSubmitter::new(
            self.rpc.clone(),
            self.wallet.clone(),
            self.center.clone(),
            ConfirmationSettings::default(),
        );

        VerificationWizard::new(
            self.session.clone(),
            Arc::new(form),
            Arc::new(biometric),
            Arc::new(submitter),
            self.center.clone(),
            WizardSettings {
                recipient: RECIPIENT.parse().unwrap(),
                lamports: ATTESTATION_LAMPORTS,
                completion_delay: Duration::from_secs(3),
            },
        )
    }

    /// Notices published since the last drain.
    pub fn drain_notices(&mut self) -> Vec<Notice> {
        std::iter::from_fn(|| self.notices.try_recv().ok()).collect()
    }

    pub fn error_count(notices: &[Notice]) -> usize {
        notices
            .iter()
            .filter(|n| n.level == NoticeLevel::Error)
            .count()
    }
}

impl Drop for TestContext {
    fn drop(&mut self) {
        self.session.shutdown();
    }
}
