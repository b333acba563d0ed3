// src/core/identity/form.rs
use chrono::{NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::{error, info, warn};

use super::types::{PersonalDetails, SubmissionId, VerificationSubmission};
use crate::core::notify::{Notice, Notifier};
use crate::core::wallet::session::WalletSession;
use crate::storage::local::{LocalStorage, SUBMISSION_ID_KEY};
use crate::storage::records::RecordStore;
use crate::utils::error::{Result, VerifyError};

const MIN_NAME_LEN: usize = 2;
const MIN_ID_LEN: usize = 4;

// Dot-separated local part, then hostname labels ending in an alphabetic TLD.
static EMAIL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^[A-Za-z0-9_'+\-]+(\.[A-Za-z0-9_'+\-]+)*@([A-Za-z0-9]([A-Za-z0-9\-]*[A-Za-z0-9])?\.)+[A-Za-z]{2,}$",
    )
    .expect("email pattern compiles")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FormField {
    FullName,
    Email,
    DateOfBirth,
    IdNumber,
}

impl fmt::Display for FormField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FormField::FullName => "fullName",
            FormField::Email => "email",
            FormField::DateOfBirth => "dateOfBirth",
            FormField::IdNumber => "idNumber",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: FormField,
    pub message: &'static str,
}

/// Every rule the form input broke, in form order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    pub errors: Vec<FieldError>,
}

impl ValidationError {
    pub fn names(&self, field: FormField) -> bool {
        self.errors.iter().any(|e| e.field == field)
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for error in &self.errors {
            if !first {
                f.write_str("; ")?;
            }
            write!(f, "{}: {}", error.field, error.message)?;
            first = false;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

/// Checks the form against `today` and returns the parsed date of birth.
pub fn validate(
    details: &PersonalDetails,
    today: NaiveDate,
) -> std::result::Result<NaiveDate, ValidationError> {
    let mut errors = Vec::new();

    if details.full_name.trim().chars().count() < MIN_NAME_LEN {
        errors.push(FieldError {
            field: FormField::FullName,
            message: "Full name is required",
        });
    }

    if !is_valid_email(&details.email) {
        errors.push(FieldError {
            field: FormField::Email,
            message: "Invalid email address",
        });
    }

    let earliest = NaiveDate::from_ymd_opt(1900, 1, 1).unwrap_or(NaiveDate::MIN);
    let date_of_birth = match details.date_of_birth {
        None => {
            errors.push(FieldError {
                field: FormField::DateOfBirth,
                message: "Date of birth is required",
            });
            None
        }
        Some(date) if date > today => {
            errors.push(FieldError {
                field: FormField::DateOfBirth,
                message: "Date of birth cannot be in the future",
            });
            None
        }
        Some(date) if date < earliest => {
            errors.push(FieldError {
                field: FormField::DateOfBirth,
                message: "Date of birth cannot be before 1900",
            });
            None
        }
        Some(date) => Some(date),
    };

    if details.id_number.trim().chars().count() < MIN_ID_LEN {
        errors.push(FieldError {
            field: FormField::IdNumber,
            message: "ID number is required",
        });
    }

    match date_of_birth {
        Some(date) if errors.is_empty() => Ok(date),
        _ => Err(ValidationError { errors }),
    }
}

fn is_valid_email(email: &str) -> bool {
    EMAIL_REGEX.is_match(email.trim())
}

/// Supplies the identifier a submission is filed under.
pub trait IdentityProvider: Send + Sync {
    fn submission_id(&self) -> SubmissionId;
}

/// Random identifier per submission. It is not bound to any authenticated
/// principal; deployments with real authentication must provide their own
/// `IdentityProvider`.
#[derive(Debug, Default, Clone, Copy)]
pub struct GeneratedIdentity;

impl IdentityProvider for GeneratedIdentity {
    fn submission_id(&self) -> SubmissionId {
        SubmissionId::new()
    }
}

pub struct VerificationForm {
    store: Arc<dyn RecordStore>,
    local: Arc<dyn LocalStorage>,
    identity: Arc<dyn IdentityProvider>,
    notifier: Arc<dyn Notifier>,
}

impl VerificationForm {
    pub fn new(
        store: Arc<dyn RecordStore>,
        local: Arc<dyn LocalStorage>,
        identity: Arc<dyn IdentityProvider>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            store,
            local,
            identity,
            notifier,
        }
    }

    /// Validates and files a `pending` submission for the connected wallet.
    pub async fn submit(
        &self,
        details: &PersonalDetails,
        session: &WalletSession,
    ) -> Result<SubmissionId> {
        let date_of_birth = validate(details, Utc::now().date_naive())?;

        let wallet_address = match (session.connected, session.address) {
            (true, Some(address)) => address,
            _ => return Err(VerifyError::WalletNotConnected),
        };

        let user_id = self.identity.submission_id();
        let submission = VerificationSubmission::pending(
            user_id,
            details,
            date_of_birth,
            wallet_address.to_string(),
        );

        self.store.insert(&submission).await.map_err(|e| {
            error!("Error saving verification data: {}", e);
            VerifyError::Submission(e.to_string())
        })?;

        if let Err(e) = self.local.set(SUBMISSION_ID_KEY, &user_id.to_string()) {
            warn!("Failed to remember submission id: {}", e);
        }

        info!("Verification submitted: {} for wallet {}", user_id, wallet_address);
        self.notifier.notify(
            Notice::success("Verification submitted successfully")
                .with_description("Your identity verification request has been submitted"),
        );
        Ok(user_id)
    }
}
