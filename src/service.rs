//! The request/response operation the HTTP layer exposes, with its error
//! mapping.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::evaluate::Evaluator;
use crate::{DiscountRequest, DiscountResponse, EvalError, RequestField};

/// A failed discount lookup, as the HTTP layer reports it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    /// The cause is logged; callers only ever see a generic message.
    #[error("Unexpected error")]
    Internal,
}

impl ApiError {
    #[must_use]
    pub fn status(&self) -> u16 {
        match self {
            ApiError::BadRequest(_) => 400,
            ApiError::NotFound(_) => 404,
            ApiError::Conflict(_) => 409,
            ApiError::Internal => 500,
        }
    }

    /// Reason phrase of [`status()`](Self::status).
    #[must_use]
    pub fn reason(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "Bad Request",
            ApiError::NotFound(_) => "Not Found",
            ApiError::Conflict(_) => "Conflict",
            ApiError::Internal => "Internal Server Error",
        }
    }

    /// Error body stamped with the current time.
    #[must_use]
    pub fn to_response(&self) -> ErrorResponse {
        self.to_response_at(Utc::now())
    }

    #[must_use]
    pub fn to_response_at(&self, at: DateTime<Utc>) -> ErrorResponse {
        ErrorResponse {
            timestamp: at.to_rfc3339_opts(SecondsFormat::Millis, true),
            status: self.status(),
            error: self.reason().to_owned(),
            message: self.to_string(),
        }
    }
}

impl From<EvalError> for ApiError {
    fn from(err: EvalError) -> Self {
        match err {
            EvalError::NoMatch => ApiError::NotFound(err.to_string()),
            EvalError::RulesUnavailable => {
                tracing::error!(error = %err, "discount lookup failed");
                ApiError::Internal
            }
        }
    }
}

/// JSON error body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub timestamp: String,
    pub status: u16,
    pub error: String,
    pub message: String,
}

/// Discount lookups against the currently published rules.
#[derive(Debug, Clone)]
pub struct DiscountService {
    evaluator: Evaluator,
}

impl DiscountService {
    #[must_use]
    pub fn new(evaluator: Evaluator) -> Self {
        Self { evaluator }
    }

    /// Look up the discount for `request`.
    ///
    /// # Errors
    ///
    /// [`ApiError::BadRequest`] naming every blank field,
    /// [`ApiError::NotFound`] when no rule matches, and
    /// [`ApiError::Internal`] for anything else.
    pub fn fetch_discount(&self, request: &DiscountRequest) -> Result<DiscountResponse, ApiError> {
        check_request(request)?;
        Ok(self.evaluator.evaluate(request)?)
    }
}

fn check_request(request: &DiscountRequest) -> Result<(), ApiError> {
    let blank: Vec<String> = RequestField::ALL
        .iter()
        .filter(|f| request.get(**f).trim().is_empty())
        .map(|f| format!("{f} must not be blank"))
        .collect();
    if blank.is_empty() {
        Ok(())
    } else {
        Err(ApiError::BadRequest(blank.join("; ")))
    }
}
