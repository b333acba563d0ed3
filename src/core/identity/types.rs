// src/core/identity/types.rs
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identifier a submission is filed under in the record store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubmissionId(pub Uuid);

impl SubmissionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SubmissionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SubmissionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl std::str::FromStr for SubmissionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VerificationStatus {
    Pending,
    Verified,
    NotVerified,
}

/// Personal data entered in the verification form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersonalDetails {
    pub full_name: String,
    pub email: String,
    pub date_of_birth: Option<NaiveDate>,
    pub id_number: String,
}

/// A verification request as persisted by the hosted record store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationSubmission {
    pub user_id: SubmissionId,
    pub full_name: String,
    pub email: String,
    pub date_of_birth: NaiveDate,
    pub id_number: String,
    pub wallet_address: String,
    pub verification_status: VerificationStatus,
    pub biometric_verified: bool,
    pub transaction_signature: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl VerificationSubmission {
    pub fn pending(
        user_id: SubmissionId,
        details: &PersonalDetails,
        date_of_birth: NaiveDate,
        wallet_address: String,
    ) -> Self {
        Self {
            user_id,
            full_name: details.full_name.trim().to_string(),
            email: details.email.trim().to_string(),
            date_of_birth,
            id_number: details.id_number.trim().to_string(),
            wallet_address,
            verification_status: VerificationStatus::Pending,
            biometric_verified: false,
            transaction_signature: None,
            created_at: Utc::now(),
        }
    }
}
