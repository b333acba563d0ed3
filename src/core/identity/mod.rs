// src/core/identity/mod.rs
pub mod biometric;
pub mod form;
pub mod types;

pub use biometric::{BiometricCapability, BiometricSimulator, ScanKind, ScanOutcome, ScanProgress};
pub use form::{GeneratedIdentity, IdentityProvider, ValidationError, VerificationForm};
pub use types::{PersonalDetails, SubmissionId, VerificationStatus, VerificationSubmission};
