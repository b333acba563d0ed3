// src/core/transactions/history.rs
use chrono::{DateTime, TimeZone, Utc};
use futures::future::join_all;
use serde::Serialize;
use solana_sdk::{pubkey::Pubkey, signature::Signature, system_program};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::blockchain::{NetworkRpc, RpcError, SignatureInfo, TransactionDetails};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TransactionKind {
    Transfer,
    Other,
}

impl TransactionKind {
    pub fn label(self) -> &'static str {
        match self {
            TransactionKind::Transfer => "Transfer",
            TransactionKind::Other => "Other",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransactionSummary {
    pub signature: Signature,
    pub timestamp: Option<DateTime<Utc>>,
    pub successful: bool,
    /// Absolute change of the fee payer's balance.
    pub amount_lamports: Option<u64>,
    pub kind: TransactionKind,
}

impl TransactionSummary {
    fn new(info: &SignatureInfo, details: TransactionDetails) -> Self {
        let kind = if details.first_program == Some(system_program::id()) {
            TransactionKind::Transfer
        } else {
            TransactionKind::Other
        };

        Self {
            signature: info.signature,
            timestamp: info
                .block_time
                .or(details.block_time)
                .and_then(|secs| Utc.timestamp_opt(secs, 0).single()),
            successful: details.successful,
            amount_lamports: details.fee_payer_delta.map(i64::unsigned_abs),
            kind,
        }
    }
}

/// Recent activity of an address, as listed on the dashboard.
pub struct TransactionHistory {
    rpc: Arc<dyn NetworkRpc>,
}

impl TransactionHistory {
    pub fn new(rpc: Arc<dyn NetworkRpc>) -> Self {
        Self { rpc }
    }

    /// Newest first. Transactions whose details cannot be fetched are skipped.
    pub async fn recent(
        &self,
        address: &Pubkey,
        limit: usize,
    ) -> Result<Vec<TransactionSummary>, RpcError> {
        let signatures = self.rpc.get_signatures_for_address(address, limit).await?;
        debug!("Fetched {} signatures for {}", signatures.len(), address);

        let lookups = signatures.iter().map(|info| async move {
            match self.rpc.get_transaction(&info.signature).await {
                Ok(details) => Some(TransactionSummary::new(info, details)),
                Err(e) => {
                    warn!("Error fetching transaction {}: {}", info.signature, e);
                    None
                }
            }
        });

        Ok(join_all(lookups).await.into_iter().flatten().collect())
    }
}
