use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Storage error: {0}")]
    StorageError(#[from] sea_orm::DbErr),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// The idempotency guard rejected a repeat earn for the same
    /// (user, order) pair.
    #[error("Duplicate transaction: {0}")]
    DuplicateTransaction(String),

    /// Spend or clawback exceeds the current balance.
    #[error("Insufficient balance: required {required}, available {available}")]
    InsufficientBalance { required: i64, available: i64 },

    /// Refund calculation attempted against a zero or negative order amount.
    #[error("Invalid refund ratio: {0}")]
    InvalidRatio(String),

    /// Coupon redemption attempted on a claim that is no longer available.
    #[error("Already redeemed: {0}")]
    AlreadyRedeemed(String),

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("Internal server error: {0}")]
    InternalError(String),

    #[error("JSON serialization/deserialization error: {0}")]
    SerdeJsonError(#[from] serde_json::Error),
}

impl AppError {
    /// Shortfall carried by an insufficient-balance rejection; surfaced
    /// as a structured field in the error body.
    pub fn shortfall(&self) -> Option<i64> {
        match self {
            AppError::InsufficientBalance {
                required,
                available,
            } => Some(required - available),
            _ => None,
        }
    }
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let (status_code, error_code, message) = match self {
            AppError::ValidationError(msg) => {
                log::warn!("Validation error: {msg}");
                (
                    actix_web::http::StatusCode::BAD_REQUEST,
                    "VALIDATION_ERROR",
                    msg.clone(),
                )
            }
            AppError::NotFound(msg) => (
                actix_web::http::StatusCode::NOT_FOUND,
                "NOT_FOUND",
                msg.clone(),
            ),
            AppError::DuplicateTransaction(msg) => {
                // Internal safety net, not a user error; logged low.
                log::info!("Duplicate transaction rejected: {msg}");
                (
                    actix_web::http::StatusCode::CONFLICT,
                    "DUPLICATE_TRANSACTION",
                    msg.clone(),
                )
            }
            AppError::InsufficientBalance { .. } => (
                actix_web::http::StatusCode::BAD_REQUEST,
                "INSUFFICIENT_BALANCE",
                self.to_string(),
            ),
            AppError::InvalidRatio(msg) => {
                log::warn!("Invalid refund ratio: {msg}");
                (
                    actix_web::http::StatusCode::BAD_REQUEST,
                    "INVALID_RATIO",
                    msg.clone(),
                )
            }
            AppError::AlreadyRedeemed(msg) => (
                actix_web::http::StatusCode::CONFLICT,
                "ALREADY_REDEEMED",
                msg.clone(),
            ),
            AppError::StorageError(err) => {
                log::error!("Storage error: {err}");
                (
                    actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                    "STORAGE_ERROR",
                    "Storage error".to_string(),
                )
            }
            _ => {
                log::error!("Internal error: {self}");
                (
                    actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "Internal server error".to_string(),
                )
            }
        };

        let mut error_body = json!({
            "code": error_code,
            "message": message
        });
        if let Some(shortfall) = self.shortfall() {
            error_body["shortfall"] = json!(shortfall);
        }

        HttpResponse::build(status_code).json(json!({
            "success": false,
            "error": error_body
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_balance_shortfall() {
        let err = AppError::InsufficientBalance {
            required: 150,
            available: 100,
        };
        assert_eq!(err.shortfall(), Some(50));
    }

    #[test]
    fn test_shortfall_only_for_balance_errors() {
        let err = AppError::ValidationError("bad input".to_string());
        assert_eq!(err.shortfall(), None);
    }

    #[actix_web::test]
    async fn test_insufficient_balance_body_carries_shortfall() {
        let err = AppError::InsufficientBalance {
            required: 150,
            available: 100,
        };
        let resp = err.error_response();
        assert_eq!(resp.status(), actix_web::http::StatusCode::BAD_REQUEST);

        let bytes = actix_web::body::to_bytes(resp.into_body()).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"]["code"], "INSUFFICIENT_BALANCE");
        assert_eq!(body["error"]["shortfall"], 50);
    }

    #[actix_web::test]
    async fn test_other_errors_omit_shortfall() {
        let err = AppError::NotFound("missing".to_string());
        let bytes = actix_web::body::to_bytes(err.error_response().into_body())
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert!(body["error"].get("shortfall").is_none());
    }
}
