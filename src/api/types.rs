// src/api/types.rs
use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde::Serialize;
use std::fmt;

use crate::core::identity::form::FieldError;
use crate::core::notify::PostedNotice;
use crate::core::presentation::{SessionView, SubmissionView, TransactionRow};
use crate::utils::error::VerifyError;

#[derive(Debug, Serialize)]
pub struct VerificationResponse {
    pub submission: Option<SubmissionView>,
}

#[derive(Debug, Serialize)]
pub struct TransactionsResponse {
    pub transactions: Vec<TransactionRow>,
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub session: SessionView,
    pub transactions: Vec<TransactionRow>,
}

#[derive(Debug, Serialize)]
pub struct NoticesResponse {
    pub notices: Vec<PostedNotice>,
    pub latest_id: Option<u64>,
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    fields: Option<&'a [FieldError]>,
}

/// HTTP face of `VerifyError`.
#[derive(Debug)]
pub struct ApiError(pub VerifyError);

impl From<VerifyError> for ApiError {
    fn from(error: VerifyError) -> Self {
        Self(error)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match &self.0 {
            VerifyError::Validation(_) => StatusCode::BAD_REQUEST,
            VerifyError::WalletUnavailable
            | VerifyError::WalletNotConnected
            | VerifyError::InvalidStage(_) => StatusCode::CONFLICT,
            VerifyError::UserRejected
            | VerifyError::Connection(_)
            | VerifyError::Transfer(_)
            | VerifyError::Network(_)
            | VerifyError::Biometric(_)
            | VerifyError::Submission(_) => StatusCode::BAD_GATEWAY,
            VerifyError::Storage(_) | VerifyError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let fields = match &self.0 {
            VerifyError::Validation(e) => Some(e.errors.as_slice()),
            _ => None,
        };
        HttpResponse::build(self.status_code()).json(ErrorBody {
            error: self.0.notice_title(),
            message: self.0.to_string(),
            fields,
        })
    }
}

pub type ApiResult = Result<HttpResponse, ApiError>;
