use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::domain::order::TransitionError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("cart resolved to no purchasable items")]
    InvalidCart,

    #[error("authentication required")]
    Unauthorized,

    #[error("forbidden")]
    Forbidden,

    #[error("not found")]
    NotFound,

    #[error("{0}")]
    Conflict(String),

    /// Gateway-stated rejection, relayed verbatim; the one upstream failure
    /// whose reason is user-meaningful.
    #[error("payment could not be initiated: {0}")]
    PaymentRejected(String),

    #[error("payment gateway is not configured")]
    PaymentMisconfigured,

    #[error("database error")]
    Database(#[from] sqlx::Error),

    #[error("upstream service error")]
    Upstream(#[from] reqwest::Error),

    #[error("internal error")]
    Internal(String),
}

impl AppError {
    /// Maps a unique-constraint violation to a conflict; everything else
    /// stays a generic database failure.
    pub fn on_unique_violation(err: sqlx::Error, message: &str) -> Self {
        let is_unique = matches!(
            &err,
            sqlx::Error::Database(db) if db.code().as_deref() == Some("23505")
        );
        if is_unique {
            AppError::Conflict(message.to_string())
        } else {
            AppError::Database(err)
        }
    }
}

impl From<crate::paytr::PaytrError> for AppError {
    fn from(err: crate::paytr::PaytrError) -> Self {
        match err {
            crate::paytr::PaytrError::Http(e) => AppError::Upstream(e),
            crate::paytr::PaytrError::Rejected(reason) => AppError::PaymentRejected(reason),
            crate::paytr::PaytrError::InvalidResponse(detail) => AppError::Internal(detail),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Validation(errors.to_string())
    }
}

impl From<TransitionError> for AppError {
    fn from(err: TransitionError) -> Self {
        match err {
            TransitionError::MissingShipmentFields => AppError::Validation(err.to_string()),
            _ => AppError::Conflict(err.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            AppError::Validation(_) | AppError::InvalidCart | AppError::PaymentRejected(_) => (
                StatusCode::BAD_REQUEST,
                json!({"status": "error", "message": self.to_string()}),
            ),
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                json!({"status": "error", "message": self.to_string()}),
            ),
            AppError::Forbidden => (
                StatusCode::FORBIDDEN,
                json!({"status": "error", "message": self.to_string()}),
            ),
            AppError::NotFound => (
                StatusCode::NOT_FOUND,
                json!({"status": "error", "message": self.to_string()}),
            ),
            AppError::Conflict(_) => (
                StatusCode::CONFLICT,
                json!({"status": "error", "message": self.to_string()}),
            ),
            AppError::PaymentMisconfigured => {
                tracing::error!("payment gateway credentials missing");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({"error": "internal server error"}),
                )
            }
            AppError::Database(e) => {
                tracing::error!(error = %e, "database failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({"error": "internal server error"}),
                )
            }
            AppError::Upstream(e) => {
                tracing::error!(error = %e, "upstream dependency failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({"error": "internal server error"}),
                )
            }
            AppError::Internal(detail) => {
                tracing::error!(detail = %detail, "internal failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({"error": "internal server error"}),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
