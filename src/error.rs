use axum::{
    response::{IntoResponse, Response},
    Json,
    http::{header, HeaderValue, StatusCode},
};
use serde::Serialize;
use std::time::Duration;

#[derive(Serialize)]
pub struct ErrorResponse {
    detail: String,
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("Failed to process URL: {0}")]
    SourceFetch(String),

    #[error("Rate limit exceeded. Try again later.")]
    RateLimitExceeded { retry_after: Duration },

    #[error("{0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Persistence(#[from] sqlx::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidInput(_) | AppError::SourceFetch(_) => StatusCode::BAD_REQUEST,
            AppError::RateLimitExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Persistence(_) | AppError::Config(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// Whole seconds a client should wait, rounded up and never zero.
fn retry_after_secs(wait: Duration) -> u64 {
    let secs = wait.as_secs() + u64::from(wait.subsec_nanos() > 0);
    secs.max(1)
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let detail = match &self {
            AppError::Persistence(e) => {
                tracing::error!("Database error: {:?}", e);
                "Internal server error".to_string()
            }
            AppError::Config(msg) | AppError::Internal(msg) => {
                tracing::error!("{}", msg);
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        let mut response = (status, Json(ErrorResponse { detail })).into_response();

        if let AppError::RateLimitExceeded { retry_after } = self {
            let value = HeaderValue::from(retry_after_secs(retry_after));
            response.headers_mut().insert(header::RETRY_AFTER, value);
        }

        response
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AppError::SourceFetch("request timed out".to_string())
        } else {
            AppError::SourceFetch(err.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
