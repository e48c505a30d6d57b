use axum::{http::StatusCode, response::IntoResponse};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Signal queue full: {0}")]
    QueueFull(String),

    #[error("Pipeline stopped, signal rejected")]
    PipelineStopped,

    #[error("Malformed signal: {0}")]
    MalformedSignal(String),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::QueueFull(_) | AppError::PipelineStopped => StatusCode::SERVICE_UNAVAILABLE,
            AppError::MalformedSignal(_) | AppError::Json(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, self.to_string()).into_response()
    }
}
