// src/core/wizard.rs
//! The verification wizard: an ordered sequence of stages, each gated by a
//! collaborator reporting success.
//!
//! Stages only ever move forward. A failed stage action parks the wizard in
//! `WizardPhase::Failed` for that same stage, from which the user retries.

use serde::Serialize;
use solana_sdk::{pubkey::Pubkey, signature::Signature};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::core::identity::biometric::{BiometricCapability, ScanProgress};
use crate::core::identity::form::VerificationForm;
use crate::core::identity::types::{PersonalDetails, SubmissionId};
use crate::core::notify::{Notice, Notifier};
use crate::core::transactions::submitter::{AttemptState, TransactionSubmitter};
use crate::core::wallet::session::{WalletSession, WalletSessionHandle};
use crate::utils::config::Config;
use crate::utils::error::{Result, VerifyError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    ConnectWallet,
    PersonalInfo,
    Biometric,
    MakeTransaction,
    ConfirmTransaction,
    Completed,
}

impl Stage {
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn next(self) -> Option<Stage> {
        match self {
            Stage::ConnectWallet => Some(Stage::PersonalInfo),
            Stage::PersonalInfo => Some(Stage::Biometric),
            Stage::Biometric => Some(Stage::MakeTransaction),
            Stage::MakeTransaction => Some(Stage::ConfirmTransaction),
            Stage::ConfirmTransaction => Some(Stage::Completed),
            Stage::Completed => None,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::ConnectWallet => "connect_wallet",
            Stage::PersonalInfo => "personal_info",
            Stage::Biometric => "biometric",
            Stage::MakeTransaction => "make_transaction",
            Stage::ConfirmTransaction => "confirm_transaction",
            Stage::Completed => "completed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WizardPhase {
    Active(Stage),
    Failed { stage: Stage, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WizardState {
    pub phase: WizardPhase,
    pub submission_id: Option<SubmissionId>,
    pub transaction_signature: Option<Signature>,
}

impl WizardState {
    pub fn new(stage: Stage) -> Self {
        Self {
            phase: WizardPhase::Active(stage),
            submission_id: None,
            transaction_signature: None,
        }
    }

    pub fn stage(&self) -> Stage {
        match self.phase {
            WizardPhase::Active(stage) | WizardPhase::Failed { stage, .. } => stage,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.phase, WizardPhase::Failed { .. })
    }
}

/// Where the attestation transfer goes and how much it moves.
#[derive(Debug, Clone, Copy)]
pub struct WizardSettings {
    pub recipient: Pubkey,
    pub lamports: u64,
    /// Pause on the confirmed transaction before the flow completes.
    pub completion_delay: Duration,
}

impl WizardSettings {
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            recipient: config.recipient()?,
            lamports: config.solana.attestation_lamports,
            completion_delay: config.get_completion_delay(),
        })
    }
}

/// Read side of a wizard that never waits on a running stage action.
#[derive(Clone)]
pub struct WizardMonitor {
    state: watch::Receiver<WizardState>,
    progress: watch::Receiver<ScanProgress>,
    attempt: watch::Receiver<AttemptState>,
}

impl WizardMonitor {
    pub fn state(&self) -> WizardState {
        self.state.borrow().clone()
    }

    pub fn scan_progress(&self) -> ScanProgress {
        *self.progress.borrow()
    }

    pub fn transaction_attempt(&self) -> AttemptState {
        self.attempt.borrow().clone()
    }
}

pub struct VerificationWizard {
    state: WizardState,
    published: watch::Sender<WizardState>,
    session: WalletSessionHandle,
    session_rx: watch::Receiver<WalletSession>,
    form: Arc<VerificationForm>,
    biometric: Arc<dyn BiometricCapability>,
    submitter: Arc<TransactionSubmitter>,
    notifier: Arc<dyn Notifier>,
    settings: WizardSettings,
}

impl VerificationWizard {
    pub fn new(
        session: WalletSessionHandle,
        form: Arc<VerificationForm>,
        biometric: Arc<dyn BiometricCapability>,
        submitter: Arc<TransactionSubmitter>,
        notifier: Arc<dyn Notifier>,
        settings: WizardSettings,
    ) -> Self {
        let session_rx = session.subscribe();
        let state = WizardState::new(Self::initial_stage(&session));
        debug!("Wizard starts at {}", state.stage());
        let (published, _) = watch::channel(state.clone());

        Self {
            state,
            published,
            session,
            session_rx,
            form,
            biometric,
            submitter,
            notifier,
            settings,
        }
    }

    fn initial_stage(session: &WalletSessionHandle) -> Stage {
        if session.is_connected() {
            Stage::PersonalInfo
        } else {
            Stage::ConnectWallet
        }
    }

    pub fn state(&self) -> &WizardState {
        &self.state
    }

    pub fn stage(&self) -> Stage {
        self.state.stage()
    }

    pub fn biometric_progress(&self) -> watch::Receiver<ScanProgress> {
        self.biometric.progress()
    }

    pub fn transaction_attempt(&self) -> AttemptState {
        self.submitter.state()
    }

    pub fn monitor(&self) -> WizardMonitor {
        WizardMonitor {
            state: self.published.subscribe(),
            progress: self.biometric.progress(),
            attempt: self.submitter.subscribe(),
        }
    }

    /// Moves past `ConnectWallet` once the session reports connected.
    /// Returns whether the wizard advanced.
    pub fn observe_session(&mut self) -> bool {
        if self.stage() != Stage::ConnectWallet {
            return false;
        }
        if !self.session_rx.borrow_and_update().connected {
            return false;
        }
        info!("Wallet connected, continuing to personal details");
        self.advance(Stage::ConnectWallet);
        true
    }

    /// Waits for the wallet to become connected while on `ConnectWallet`.
    pub async fn wait_for_wallet(&mut self) -> Result<Stage> {
        loop {
            if self.stage() != Stage::ConnectWallet || self.observe_session() {
                return Ok(self.stage());
            }
            self.session_rx
                .changed()
                .await
                .map_err(|_| VerifyError::Connection("wallet session closed".to_string()))?;
        }
    }

    pub async fn connect_wallet(&mut self) -> Result<Pubkey> {
        self.expect_stage(Stage::ConnectWallet)?;

        match self.session.connect().await {
            Ok(address) => {
                self.observe_session();
                Ok(address)
            }
            Err(e) => Err(self.fail(Stage::ConnectWallet, e)),
        }
    }

    pub async fn submit_details(&mut self, details: &PersonalDetails) -> Result<SubmissionId> {
        self.expect_stage(Stage::PersonalInfo)?;

        let session = self.session.snapshot();
        match self.form.submit(details, &session).await {
            Ok(id) => {
                self.state.submission_id = Some(id);
                self.advance(Stage::PersonalInfo);
                Ok(id)
            }
            Err(e) => Err(self.fail(Stage::PersonalInfo, e)),
        }
    }

    /// Runs the biometric capability to completion.
    pub async fn run_biometric(&mut self) -> Result<()> {
        self.expect_stage(Stage::Biometric)?;

        let mut completions = self.biometric.completions();
        if !self.biometric.start() {
            debug!("Biometric scan already running; waiting for it");
        }

        match completions.recv().await {
            Ok(outcome) if outcome.success => {
                self.advance(Stage::Biometric);
                Ok(())
            }
            Ok(_) => Err(self.fail(
                Stage::Biometric,
                VerifyError::Biometric("scan did not match".to_string()),
            )),
            Err(e) => Err(self.fail(Stage::Biometric, VerifyError::Biometric(e.to_string()))),
        }
    }

    /// Signs and submits the attestation transfer.
    pub async fn make_transaction(&mut self) -> Result<Signature> {
        self.expect_stage(Stage::MakeTransaction)?;

        let session = self.session.snapshot();
        let result = self
            .submitter
            .submit(&session, &self.settings.recipient, self.settings.lamports)
            .await;

        match result {
            Ok(signature) => {
                self.state.transaction_signature = Some(signature);
                self.advance(Stage::MakeTransaction);
                Ok(signature)
            }
            Err(e) => Err(self.fail(Stage::MakeTransaction, e.into())),
        }
    }

    /// Shows the confirmed attestation for the settle delay, then completes.
    pub async fn confirm_transaction(&mut self) -> Result<Signature> {
        self.expect_stage(Stage::ConfirmTransaction)?;

        let signature = self.state.transaction_signature.ok_or_else(|| {
            VerifyError::InvalidStage("no confirmed transaction to acknowledge".to_string())
        })?;

        tokio::time::sleep(self.settings.completion_delay).await;
        self.advance(Stage::ConfirmTransaction);
        Ok(signature)
    }

    /// Leaves `Failed` for another attempt at the same stage.
    pub fn retry(&mut self) -> Result<Stage> {
        match &self.state.phase {
            WizardPhase::Failed { stage, .. } => {
                let stage = *stage;
                if stage == Stage::MakeTransaction {
                    self.submitter.reset();
                }
                info!("Retrying stage {}", stage);
                self.state.phase = WizardPhase::Active(stage);
                self.publish();
                Ok(stage)
            }
            WizardPhase::Active(stage) => Err(VerifyError::InvalidStage(format!(
                "nothing to retry in {}",
                stage
            ))),
        }
    }

    /// Discards the flow and starts over, as if a fresh wizard were opened.
    pub fn restart(&mut self) {
        self.submitter.reset();
        self.state = WizardState::new(Self::initial_stage(&self.session));
        self.publish();
        info!("Wizard restarted at {}", self.state.stage());
    }

    fn expect_stage(&self, stage: Stage) -> Result<()> {
        if self.stage() == stage {
            Ok(())
        } else {
            Err(VerifyError::InvalidStage(self.stage().to_string()))
        }
    }

    fn advance(&mut self, from: Stage) {
        debug_assert_eq!(self.stage(), from);
        if let Some(next) = from.next() {
            info!("Wizard stage {} -> {}", from, next);
            self.state.phase = WizardPhase::Active(next);
            self.publish();
        }
    }

    fn publish(&self) {
        self.published.send_replace(self.state.clone());
    }

    /// Validation errors stay with the form; anything else parks the stage in
    /// `Failed` and is announced once.
    fn fail(&mut self, stage: Stage, error: VerifyError) -> VerifyError {
        if error.is_validation() {
            debug!("Form rejected: {}", error);
            return error;
        }

        warn!("Stage {} failed: {}", stage, error);
        self.state.phase = WizardPhase::Failed {
            stage,
            reason: error.to_string(),
        };
        self.publish();
        self.notifier
            .notify(Notice::error(error.notice_title()).with_description(error.to_string()));
        error
    }
}
