// src/core/presentation.rs
//! Stateless view models for the status displays: wallet badge, wizard step
//! indicator, transaction status card and verification status pill.

use serde::Serialize;

use crate::core::identity::types::{VerificationStatus, VerificationSubmission};
use crate::core::transactions::history::TransactionSummary;
use crate::core::transactions::submitter::AttemptState;
use crate::core::wallet::session::WalletSession;
use crate::core::wizard::{Stage, WizardPhase, WizardState};

const LAMPORTS_PER_SOL: f64 = 1_000_000_000.0;

/// `AuR8HMaN...` style abbreviation: first and last four characters.
pub fn short_address(address: &str) -> String {
    truncate_middle(address, 4, 4)
}

pub fn truncate_middle(value: &str, head: usize, tail: usize) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= head + tail {
        return value.to_string();
    }
    let start: String = chars[..head].iter().collect();
    let end: String = chars[chars.len() - tail..].iter().collect();
    format!("{}...{}", start, end)
}

pub fn format_sol(lamports: u64) -> String {
    format!("{:.4} SOL", lamports as f64 / LAMPORTS_PER_SOL)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StatusKind {
    Pending,
    Success,
    Error,
    Verified,
    NotVerified,
}

impl StatusKind {
    pub fn label(self) -> &'static str {
        match self {
            StatusKind::Pending => "Pending",
            StatusKind::Success => "Success",
            StatusKind::Error => "Failed",
            StatusKind::Verified => "Verified",
            StatusKind::NotVerified => "Not Verified",
        }
    }

    /// Only in-flight states animate.
    pub fn pulses(self) -> bool {
        matches!(self, StatusKind::Pending)
    }
}

impl From<VerificationStatus> for StatusKind {
    fn from(status: VerificationStatus) -> Self {
        match status {
            VerificationStatus::Pending => StatusKind::Pending,
            VerificationStatus::Verified => StatusKind::Verified,
            VerificationStatus::NotVerified => StatusKind::NotVerified,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionView {
    pub connected: bool,
    pub connecting: bool,
    pub address: Option<String>,
    pub short_address: Option<String>,
    pub balance_lamports: Option<u64>,
    pub balance: Option<String>,
    pub headline: &'static str,
}

impl From<&WalletSession> for SessionView {
    fn from(session: &WalletSession) -> Self {
        let address = session.address.map(|a| a.to_string());
        Self {
            connected: session.connected,
            connecting: session.connecting,
            short_address: address.as_deref().map(short_address),
            address,
            balance_lamports: session.balance,
            balance: session.balance.map(format_sol),
            headline: if session.connected {
                "Wallet Connected"
            } else {
                "Connect Your Wallet"
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NextAction {
    ProceedToDashboard,
    TryAgain,
}

/// Card describing a transaction attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionStatusView {
    pub status: StatusKind,
    pub title: &'static str,
    pub description: String,
    pub signature: Option<String>,
    pub short_signature: Option<String>,
    pub explorer_url: Option<String>,
    pub next_action: Option<NextAction>,
}

impl TransactionStatusView {
    pub fn new(status: StatusKind, signature: Option<String>, explorer: &Explorer) -> Self {
        let (title, description, next_action) = match status {
            StatusKind::Success => (
                "Transaction Successful",
                "Identity attestation successfully created!",
                Some(NextAction::ProceedToDashboard),
            ),
            StatusKind::Error => (
                "Transaction Failed",
                "Failed to create identity attestation",
                Some(NextAction::TryAgain),
            ),
            _ => (
                "Transaction in Progress",
                "Creating your identity attestation on the blockchain...",
                None,
            ),
        };

        Self {
            status,
            title,
            description: description.to_string(),
            short_signature: signature.as_deref().map(|s| truncate_middle(s, 20, 8)),
            explorer_url: signature.as_deref().map(|s| explorer.transaction_url(s)),
            signature,
            next_action,
        }
    }

    pub fn from_attempt(attempt: &AttemptState, explorer: &Explorer) -> Option<Self> {
        match attempt {
            AttemptState::Idle => None,
            AttemptState::Pending => Some(Self::new(StatusKind::Pending, None, explorer)),
            AttemptState::Success(signature) => Some(Self::new(
                StatusKind::Success,
                Some(signature.to_string()),
                explorer,
            )),
            AttemptState::Failed(reason) => {
                let mut view = Self::new(StatusKind::Error, None, explorer);
                view.description = format!("{}: {}", view.description, reason);
                Some(view)
            }
        }
    }
}

/// Block-explorer link builder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Explorer {
    base_url: String,
    cluster: String,
}

impl Explorer {
    pub fn new(base_url: impl Into<String>, cluster: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            cluster: cluster.into(),
        }
    }

    pub fn transaction_url(&self, signature: &str) -> String {
        if self.cluster.is_empty() || self.cluster == "mainnet-beta" {
            format!("{}/tx/{}", self.base_url, signature)
        } else {
            format!("{}/tx/{}?cluster={}", self.base_url, signature, self.cluster)
        }
    }
}

impl Default for Explorer {
    fn default() -> Self {
        Self::new("https://explorer.solana.com", "devnet")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepView {
    pub label: &'static str,
    pub active: bool,
}

const STEP_LABELS: [&str; 4] = ["Connect", "Details", "Biometrics", "Confirm"];

/// Four-step indicator; a step lights up once the wizard has reached it.
pub fn step_indicator(stage: Stage) -> Vec<StepView> {
    let reached = match stage {
        Stage::ConnectWallet => 0,
        Stage::PersonalInfo => 1,
        Stage::Biometric => 2,
        Stage::MakeTransaction | Stage::ConfirmTransaction | Stage::Completed => 3,
    };
    STEP_LABELS
        .iter()
        .enumerate()
        .map(|(index, label)| StepView {
            label: *label,
            active: index <= reached,
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WizardView {
    pub stage: Stage,
    pub failed: bool,
    pub failure: Option<String>,
    pub steps: Vec<StepView>,
    pub message: &'static str,
    pub submission_id: Option<String>,
    pub transaction: Option<TransactionStatusView>,
}

impl WizardView {
    pub fn new(state: &WizardState, attempt: &AttemptState, explorer: &Explorer) -> Self {
        let stage = state.stage();
        let failure = match &state.phase {
            WizardPhase::Failed { reason, .. } => Some(reason.clone()),
            WizardPhase::Active(_) => None,
        };

        let transaction = match (stage, &state.transaction_signature) {
            (Stage::ConfirmTransaction | Stage::Completed, Some(signature)) => Some(
                TransactionStatusView::new(StatusKind::Success, Some(signature.to_string()), explorer),
            ),
            (Stage::MakeTransaction, _) => TransactionStatusView::from_attempt(attempt, explorer),
            _ => None,
        };

        Self {
            stage,
            failed: failure.is_some(),
            failure,
            steps: step_indicator(stage),
            message: stage_message(stage),
            submission_id: state.submission_id.map(|id| id.to_string()),
            transaction,
        }
    }
}

fn stage_message(stage: Stage) -> &'static str {
    match stage {
        Stage::ConnectWallet => "Connect your Solana wallet to continue with identity verification",
        Stage::PersonalInfo => "Complete the form below to verify your identity",
        Stage::Biometric => "Tap to start the biometric scan",
        Stage::MakeTransaction => {
            "Your identity verification is ready to be published to the blockchain"
        }
        Stage::ConfirmTransaction => "Please wait while we confirm your transaction",
        Stage::Completed => {
            "Your identity has been successfully verified and secured on the blockchain"
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmissionView {
    pub user_id: String,
    pub full_name: String,
    pub email: String,
    pub wallet_address: String,
    pub status: StatusKind,
    pub status_label: &'static str,
    pub biometric_verified: bool,
    pub submitted_at: String,
}

impl From<&VerificationSubmission> for SubmissionView {
    fn from(submission: &VerificationSubmission) -> Self {
        let status = StatusKind::from(submission.verification_status);
        Self {
            user_id: submission.user_id.to_string(),
            full_name: submission.full_name.clone(),
            email: submission.email.clone(),
            wallet_address: submission.wallet_address.clone(),
            status,
            status_label: status.label(),
            biometric_verified: submission.biometric_verified,
            submitted_at: submission.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionRow {
    pub signature: String,
    pub short_signature: String,
    pub explorer_url: String,
    pub timestamp: String,
    pub successful: bool,
    pub amount: String,
    pub kind: &'static str,
}

impl TransactionRow {
    pub fn new(summary: &TransactionSummary, explorer: &Explorer) -> Self {
        let signature = summary.signature.to_string();
        Self {
            short_signature: truncate_middle(&signature, 8, 8),
            explorer_url: explorer.transaction_url(&signature),
            timestamp: summary
                .timestamp
                .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
                .unwrap_or_else(|| "Unknown time".to_string()),
            successful: summary.successful,
            amount: summary
                .amount_lamports
                .map(|l| format!("{:.4}", l as f64 / LAMPORTS_PER_SOL))
                .unwrap_or_else(|| "Unknown".to_string()),
            kind: summary.kind.label(),
            signature,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::identity::types::SubmissionId;
    use solana_sdk::{pubkey::Pubkey, signature::Signature};

    #[test]
    fn test_short_address() {
        assert_eq!(
            short_address("AuR8HMaNKXxUz8qFDWPyZMk8DhQcFYKAT6SLjohzNrUZ"),
            "AuR8...NrUZ"
        );
        assert_eq!(short_address("abc"), "abc");
    }

    #[test]
    fn test_format_sol_uses_four_decimals() {
        assert_eq!(format_sol(1_000_000), "0.0010 SOL");
        assert_eq!(format_sol(2_500_000_000), "2.5000 SOL");
    }

    #[test]
    fn test_status_labels() {
        assert_eq!(StatusKind::Error.label(), "Failed");
        assert_eq!(StatusKind::NotVerified.label(), "Not Verified");
        assert!(StatusKind::Pending.pulses());
        assert!(!StatusKind::Verified.pulses());
    }

    #[test]
    fn test_session_view_without_balance() {
        let session = WalletSession {
            connected: true,
            connecting: false,
            address: Some(Pubkey::new_unique()),
            balance: None,
        };
        let view = SessionView::from(&session);
        assert_eq!(view.headline, "Wallet Connected");
        assert!(view.balance.is_none());
        assert!(view.short_address.unwrap().contains("..."));
    }

    #[test]
    fn test_explorer_links_carry_cluster() {
        let explorer = Explorer::default();
        assert_eq!(
            explorer.transaction_url("abc"),
            "https://explorer.solana.com/tx/abc?cluster=devnet"
        );
        let mainnet = Explorer::new("https://explorer.solana.com/", "mainnet-beta");
        assert_eq!(mainnet.transaction_url("abc"), "https://explorer.solana.com/tx/abc");
    }

    #[test]
    fn test_transaction_card_for_attempts() {
        let explorer = Explorer::default();
        assert!(TransactionStatusView::from_attempt(&AttemptState::Idle, &explorer).is_none());

        let signature = Signature::new_unique();
        let view =
            TransactionStatusView::from_attempt(&AttemptState::Success(signature), &explorer)
                .unwrap();
        assert_eq!(view.title, "Transaction Successful");
        assert_eq!(view.next_action, Some(NextAction::ProceedToDashboard));
        assert!(view.short_signature.unwrap().contains("..."));

        let failed = TransactionStatusView::from_attempt(
            &AttemptState::Failed("rejected".into()),
            &explorer,
        )
        .unwrap();
        assert_eq!(failed.next_action, Some(NextAction::TryAgain));
        assert!(failed.description.ends_with("rejected"));
    }

    #[test]
    fn test_step_indicator_tracks_stage() {
        let active = |stage| {
            step_indicator(stage)
                .iter()
                .filter(|step| step.active)
                .count()
        };
        assert_eq!(active(Stage::ConnectWallet), 1);
        assert_eq!(active(Stage::Biometric), 3);
        assert_eq!(active(Stage::Completed), 4);
    }

    #[test]
    fn test_wizard_view_reports_failure() {
        let mut state = WizardState::new(Stage::MakeTransaction);
        state.submission_id = Some(SubmissionId::new());
        state.phase = WizardPhase::Failed {
            stage: Stage::MakeTransaction,
            reason: "rejected".into(),
        };

        let attempt = AttemptState::Failed("rejected".into());
        let view = WizardView::new(&state, &attempt, &Explorer::default());
        assert!(view.failed);
        assert_eq!(view.stage, Stage::MakeTransaction);
        assert_eq!(view.transaction.unwrap().status, StatusKind::Error);

        state.phase = WizardPhase::Active(Stage::MakeTransaction);
        let idle = WizardView::new(&state, &AttemptState::Idle, &Explorer::default());
        assert!(idle.transaction.is_none());
    }
}
