// src/blockchain/solana.rs
use async_trait::async_trait;
use solana_client::{
    nonblocking::rpc_client::RpcClient,
    rpc_client::GetConfirmedSignaturesForAddress2Config,
    rpc_config::RpcTransactionConfig,
};
use solana_sdk::{
    commitment_config::CommitmentConfig, hash::Hash, pubkey::Pubkey, signature::Signature,
    transaction::Transaction,
};
use solana_transaction_status::UiTransactionEncoding;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info};

#[derive(Debug, Error)]
pub enum RpcError {
    #[error("RPC request failed: {0}")]
    Client(String),

    #[error("Unexpected RPC response: {0}")]
    InvalidResponse(String),
}

impl From<solana_client::client_error::ClientError> for RpcError {
    fn from(error: solana_client::client_error::ClientError) -> Self {
        RpcError::Client(error.to_string())
    }
}

pub type Result<T> = std::result::Result<T, RpcError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmationStatus {
    Unconfirmed,
    Confirmed,
    Failed(String),
}

/// One entry of an address's signature history.
#[derive(Debug, Clone, PartialEq)]
pub struct SignatureInfo {
    pub signature: Signature,
    pub block_time: Option<i64>,
    pub err: Option<String>,
}

/// The parts of a fetched transaction the dashboard renders.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionDetails {
    pub signature: Signature,
    pub block_time: Option<i64>,
    pub successful: bool,
    /// Change of the fee payer's balance, in lamports.
    pub fee_payer_delta: Option<i64>,
    /// Program invoked by the first instruction.
    pub first_program: Option<Pubkey>,
}

/// Blockchain node calls. Every call is a fallible, unbounded-latency network request.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NetworkRpc: Send + Sync {
    async fn get_balance(&self, address: &Pubkey) -> Result<u64>;
    async fn get_latest_blockhash(&self) -> Result<Hash>;
    async fn send_transaction(&self, transaction: &Transaction) -> Result<Signature>;
    async fn confirm_transaction(&self, signature: &Signature) -> Result<ConfirmationStatus>;
    async fn get_signatures_for_address(
        &self,
        address: &Pubkey,
        limit: usize,
    ) -> Result<Vec<SignatureInfo>>;
    async fn get_transaction(&self, signature: &Signature) -> Result<TransactionDetails>;
}

pub struct SolanaRpc {
    rpc_client: Arc<RpcClient>,
}

impl SolanaRpc {
    pub fn new(rpc_url: &str) -> Self {
        let rpc_client = Arc::new(RpcClient::new_with_commitment(
            rpc_url.to_string(),
            CommitmentConfig::confirmed(),
        ));

        Self { rpc_client }
    }
}

#[async_trait]
impl NetworkRpc for SolanaRpc {
    async fn get_balance(&self, address: &Pubkey) -> Result<u64> {
        let balance = self.rpc_client.get_balance(address).await.map_err(|e| {
            error!("Failed to get balance: {:?}", e);
            e
        })?;
        debug!("Balance of {}: {} lamports", address, balance);
        Ok(balance)
    }

    async fn get_latest_blockhash(&self) -> Result<Hash> {
        let blockhash = self.rpc_client.get_latest_blockhash().await?;
        debug!("Blockhash received: {}", blockhash);
        Ok(blockhash)
    }

    async fn send_transaction(&self, transaction: &Transaction) -> Result<Signature> {
        let signature = self
            .rpc_client
            .send_transaction(transaction)
            .await
            .map_err(|e| {
                error!("Failed to send transaction: {:?}", e);
                e
            })?;
        info!("Transaction sent with signature: {}", signature);
        Ok(signature)
    }

    async fn confirm_transaction(&self, signature: &Signature) -> Result<ConfirmationStatus> {
        let status = match self.rpc_client.get_signature_status(signature).await? {
            None => ConfirmationStatus::Unconfirmed,
            Some(Ok(())) => ConfirmationStatus::Confirmed,
            Some(Err(e)) => ConfirmationStatus::Failed(e.to_string()),
        };
        Ok(status)
    }

    async fn get_signatures_for_address(
        &self,
        address: &Pubkey,
        limit: usize,
    ) -> Result<Vec<SignatureInfo>> {
        let config = GetConfirmedSignaturesForAddress2Config {
            before: None,
            until: None,
            limit: Some(limit),
            commitment: Some(CommitmentConfig::confirmed()),
        };

        self.rpc_client
            .get_signatures_for_address_with_config(address, config)
            .await?
            .into_iter()
            .map(|entry| {
                let signature = Signature::from_str(&entry.signature)
                    .map_err(|e| RpcError::InvalidResponse(e.to_string()))?;
                Ok(SignatureInfo {
                    signature,
                    block_time: entry.block_time,
                    err: entry.err.map(|e| e.to_string()),
                })
            })
            .collect()
    }

    async fn get_transaction(&self, signature: &Signature) -> Result<TransactionDetails> {
        let config = RpcTransactionConfig {
            encoding: Some(UiTransactionEncoding::Base64),
            commitment: Some(CommitmentConfig::confirmed()),
            max_supported_transaction_version: Some(0),
        };
        let fetched = self
            .rpc_client
            .get_transaction_with_config(signature, config)
            .await?;

        let meta = fetched.transaction.meta.as_ref();
        let successful = meta.map(|m| m.err.is_none()).unwrap_or(false);
        let fee_payer_delta = meta.and_then(|m| {
            let pre = *m.pre_balances.first()?;
            let post = *m.post_balances.first()?;
            Some(post as i64 - pre as i64)
        });

        let first_program = fetched.transaction.transaction.decode().and_then(|tx| {
            let instruction = tx.message.instructions().first()?;
            tx.message
                .static_account_keys()
                .get(instruction.program_id_index as usize)
                .copied()
        });

        Ok(TransactionDetails {
            signature: *signature,
            block_time: fetched.block_time,
            successful,
            fee_payer_delta,
            first_program,
        })
    }
}
