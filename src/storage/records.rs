// src/storage/records.rs
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use super::encrypted::{EncryptedStore, StorageError};
use crate::core::identity::types::{SubmissionId, VerificationSubmission};

type Result<T> = std::result::Result<T, StorageError>;

/// Hosted record store holding verification submissions.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn insert(&self, submission: &VerificationSubmission) -> Result<()>;

    /// Most recent submission filed under `user_id`.
    async fn latest_for(&self, user_id: &SubmissionId) -> Result<Option<VerificationSubmission>>;
}

#[derive(Default)]
pub struct MemoryRecordStore {
    records: RwLock<HashMap<SubmissionId, Vec<VerificationSubmission>>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.read().values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn insert(&self, submission: &VerificationSubmission) -> Result<()> {
        self.records
            .write()
            .entry(submission.user_id)
            .or_default()
            .push(submission.clone());
        Ok(())
    }

    async fn latest_for(&self, user_id: &SubmissionId) -> Result<Option<VerificationSubmission>> {
        Ok(self
            .records
            .read()
            .get(user_id)
            .and_then(|records| records.iter().max_by_key(|r| r.created_at).cloned()))
    }
}

/// Record store persisted in an encrypted RocksDB database.
///
/// Keys are `verification/<user_id>/<created_at millis, zero padded>` so a
/// prefix scan returns a user's submissions oldest first.
pub struct RocksRecordStore {
    store: Arc<EncryptedStore>,
}

impl RocksRecordStore {
    pub fn open<P: AsRef<Path>>(path: P, passphrase: &str) -> Result<Self> {
        let store = EncryptedStore::open(path, passphrase.as_bytes())?;
        info!("Record store ready");
        Ok(Self {
            store: Arc::new(store),
        })
    }

    fn prefix(user_id: &SubmissionId) -> String {
        format!("verification/{}/", user_id)
    }

    fn key(submission: &VerificationSubmission) -> String {
        format!(
            "{}{:020}",
            Self::prefix(&submission.user_id),
            submission.created_at.timestamp_millis().max(0)
        )
    }
}

#[async_trait]
impl RecordStore for RocksRecordStore {
    async fn insert(&self, submission: &VerificationSubmission) -> Result<()> {
        let store = self.store.clone();
        let key = Self::key(submission);
        let submission = submission.clone();

        tokio::task::spawn_blocking(move || store.store(key.as_bytes(), &submission))
            .await
            .map_err(|e| StorageError::Unavailable(e.to_string()))??;

        debug!("Stored verification record");
        Ok(())
    }

    async fn latest_for(&self, user_id: &SubmissionId) -> Result<Option<VerificationSubmission>> {
        let store = self.store.clone();
        let prefix = Self::prefix(user_id);

        let records: Vec<VerificationSubmission> =
            tokio::task::spawn_blocking(move || store.scan_prefix(prefix.as_bytes()))
                .await
                .map_err(|e| StorageError::Unavailable(e.to_string()))??;

        Ok(records.into_iter().last())
    }
}
