// src/utils/error.rs
use thiserror::Error;

use crate::core::identity::form::ValidationError;
use crate::core::transactions::submitter::TransferError;
use crate::core::wallet::extension::WalletError;
use crate::storage::encrypted::StorageError;

#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Wallet not found: install a compatible wallet extension first")]
    WalletUnavailable,

    #[error("Wallet not connected")]
    WalletNotConnected,

    #[error("Request rejected in wallet")]
    UserRejected,

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Transfer error: {0}")]
    Transfer(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Biometric error: {0}")]
    Biometric(String),

    #[error("Submission error: {0}")]
    Submission(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Action not available in stage {0}")]
    InvalidStage(String),
}

impl VerifyError {
    /// Short plain-language headline used for user-facing notices.
    pub fn notice_title(&self) -> &'static str {
        match self {
            VerifyError::Validation(_) => "Please check the highlighted fields",
            VerifyError::WalletUnavailable => "Wallet not found",
            VerifyError::WalletNotConnected => "Wallet not connected",
            VerifyError::UserRejected => "Request rejected in wallet",
            VerifyError::Connection(_) => "Failed to connect wallet",
            VerifyError::Transfer(_) => "Transaction failed",
            VerifyError::Network(_) => "Network request failed",
            VerifyError::Biometric(_) => "Biometric scan failed",
            VerifyError::Submission(_) => "Failed to submit verification",
            VerifyError::Storage(_) => "Storage failure",
            VerifyError::Config(_) => "Configuration error",
            VerifyError::InvalidStage(_) => "Action not available right now",
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, VerifyError::Validation(_))
    }
}

impl From<WalletError> for VerifyError {
    fn from(error: WalletError) -> Self {
        match error {
            WalletError::Unavailable => VerifyError::WalletUnavailable,
            WalletError::NotConnected => VerifyError::WalletNotConnected,
            WalletError::UserRejected => VerifyError::UserRejected,
            WalletError::Connection(msg) => VerifyError::Connection(msg),
            WalletError::Signing(msg) => VerifyError::Transfer(msg),
        }
    }
}

impl From<TransferError> for VerifyError {
    fn from(error: TransferError) -> Self {
        match error {
            TransferError::WalletNotConnected => VerifyError::WalletNotConnected,
            other => VerifyError::Transfer(other.to_string()),
        }
    }
}

impl From<StorageError> for VerifyError {
    fn from(error: StorageError) -> Self {
        VerifyError::Storage(error.to_string())
    }
}

pub type Result<T> = std::result::Result<T, VerifyError>;
