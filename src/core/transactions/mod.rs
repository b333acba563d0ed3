// src/core/transactions/mod.rs
pub mod history;
pub mod submitter;

pub use history::{TransactionHistory, TransactionKind, TransactionSummary};
pub use submitter::{AttemptState, ConfirmationSettings, TransactionSubmitter, TransferError};
