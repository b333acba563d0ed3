// src/core/dashboard.rs
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::core::identity::types::{SubmissionId, VerificationSubmission};
use crate::core::notify::{Notice, Notifier};
use crate::core::presentation::{Explorer, SessionView, SubmissionView, TransactionRow};
use crate::core::transactions::history::TransactionHistory;
use crate::core::wallet::session::WalletSessionHandle;
use crate::storage::local::{LocalStorage, SUBMISSION_ID_KEY};
use crate::storage::records::RecordStore;
use crate::utils::error::{Result, VerifyError};

/// Read side of the application: who is connected, what was submitted from
/// this device, and what the wallet did recently.
pub struct Dashboard {
    session: WalletSessionHandle,
    store: Arc<dyn RecordStore>,
    local: Arc<dyn LocalStorage>,
    history: TransactionHistory,
    notifier: Arc<dyn Notifier>,
    explorer: Explorer,
    history_limit: usize,
}

impl Dashboard {
    pub fn new(
        session: WalletSessionHandle,
        store: Arc<dyn RecordStore>,
        local: Arc<dyn LocalStorage>,
        history: TransactionHistory,
        notifier: Arc<dyn Notifier>,
        explorer: Explorer,
        history_limit: usize,
    ) -> Self {
        Self {
            session,
            store,
            local,
            history,
            notifier,
            explorer,
            history_limit,
        }
    }

    pub fn explorer(&self) -> &Explorer {
        &self.explorer
    }

    pub fn session_view(&self) -> SessionView {
        SessionView::from(&self.session.snapshot())
    }

    /// The submission filed from this device, if the remembered identifier
    /// still resolves to a record.
    pub async fn current_submission(&self) -> Result<Option<VerificationSubmission>> {
        let Some(raw) = self.local.get(SUBMISSION_ID_KEY) else {
            debug!("No submission recorded on this device");
            return Ok(None);
        };

        let user_id: SubmissionId = match raw.parse() {
            Ok(id) => id,
            Err(e) => {
                warn!("Ignoring unreadable submission id {:?}: {}", raw, e);
                return Ok(None);
            }
        };

        self.store.latest_for(&user_id).await.map_err(|e| {
            error!("Error fetching verification status: {}", e);
            VerifyError::from(e)
        })
    }

    pub async fn submission_view(&self) -> Result<Option<SubmissionView>> {
        Ok(self
            .current_submission()
            .await?
            .as_ref()
            .map(SubmissionView::from))
    }

    /// Recent transactions of the connected wallet; empty when disconnected.
    pub async fn recent_transactions(&self) -> Result<Vec<TransactionRow>> {
        let session = self.session.snapshot();
        let address = match (session.connected, session.address) {
            (true, Some(address)) => address,
            _ => return Ok(Vec::new()),
        };

        let summaries = self
            .history
            .recent(&address, self.history_limit)
            .await
            .map_err(|e| {
                error!("Error fetching transactions: {}", e);
                self.notifier
                    .notify(Notice::error("Failed to fetch transaction history"));
                VerifyError::Network(e.to_string())
            })?;

        Ok(summaries
            .iter()
            .map(|summary| TransactionRow::new(summary, &self.explorer))
            .collect())
    }

    /// Re-reads the balance and the transaction list together.
    pub async fn refresh(&self) -> Result<(SessionView, Vec<TransactionRow>)> {
        if !self.session.is_connected() {
            return Err(VerifyError::WalletNotConnected);
        }

        self.session.refresh_balance().await;
        let transactions = self.recent_transactions().await?;

        info!("Wallet data refreshed");
        self.notifier.notify(Notice::success("Wallet data refreshed"));
        Ok((self.session_view(), transactions))
    }
}
