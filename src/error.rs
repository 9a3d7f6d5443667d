use actix_web::{http::StatusCode, ResponseError};
use log::error;
use sea_orm::DbErr;
use thiserror::Error;

use crate::response::response_from_error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),
    #[error("No token provided")]
    MissingToken,
    #[error("Token expired or invalid")]
    InvalidToken,
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{msg}")]
    Database { msg: String, details: Option<String> },
}

impl AppError {
    pub fn param_error(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn system_exception() -> Self {
        Self::Database {
            msg: "Internal server error".to_string(),
            details: None,
        }
    }

    pub fn details(&self) -> Option<&str> {
        match self {
            Self::Database { details, .. } => details.as_deref(),
            _ => None,
        }
    }
}

/// Logs the driver error and wraps it as a 500 carrying `msg`.
pub fn db_error(msg: &'static str) -> impl Fn(DbErr) -> AppError {
    move |err| {
        error!("{}: {}", msg, err);
        AppError::Database {
            msg: msg.to_string(),
            details: Some(err.to_string()),
        }
    }
}

pub fn is_duplicate_key(err: &DbErr) -> bool {
    let msg = err.to_string();
    msg.contains("Duplicate entry") || msg.contains("1062")
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::MissingToken | Self::InvalidToken | Self::InvalidCredentials => {
                StatusCode::UNAUTHORIZED
            }
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Database { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> actix_web::HttpResponse {
        response_from_error(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categories_map_to_status_codes() {
        assert_eq!(AppError::param_error("x").status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::MissingToken.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::InvalidToken.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::not_found("x").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::conflict("x").status_code(), StatusCode::CONFLICT);
        assert_eq!(
            AppError::system_exception().status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn db_errors_keep_driver_message() {
        let err = db_error("Failed to fetch tips")(DbErr::Custom("connection reset".to_string()));
        assert_eq!(err.to_string(), "Failed to fetch tips");
        assert!(err.details().unwrap_or_default().contains("connection reset"));
    }

    #[test]
    fn duplicate_entry_is_detected() {
        let err = DbErr::Custom(
            "Duplicate entry 'a@b.c' for key 'uq_utilisateur_email'".to_string(),
        );
        assert!(is_duplicate_key(&err));
        assert!(!is_duplicate_key(&DbErr::Custom("timeout".to_string())));
    }
}
