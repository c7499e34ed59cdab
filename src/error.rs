//! Error type shared by the loaders, the scanner and the HTTP service.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

pub type Result<T> = std::result::Result<T, CheckupError>;

#[derive(Debug, thiserror::Error)]
pub enum CheckupError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Missing column '{column}' (accepted names: {accepted})")]
    MissingColumn { column: String, accepted: String },

    #[error("Row {row}: invalid {column} value '{value}'")]
    InvalidValue {
        row: usize,
        column: &'static str,
        value: String,
    },

    #[error("Unsupported file type '{0}'. Please upload a CSV file.")]
    UnsupportedFile(String),

    #[error("No holdings found in input")]
    EmptyPortfolio,

    #[error("Not enough price history for {symbol}: {bars} bars, need {required}")]
    InsufficientData {
        symbol: String,
        bars: usize,
        required: usize,
    },

    #[error("Market data unavailable for {symbol}: {reason}")]
    MarketData { symbol: String, reason: String },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    error: String,
    code: &'static str,
}

impl IntoResponse for CheckupError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            CheckupError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "INVALID_REQUEST"),
            CheckupError::UnsupportedFile(_) => (StatusCode::BAD_REQUEST, "UNSUPPORTED_FILE"),
            CheckupError::MissingColumn { .. } => (StatusCode::BAD_REQUEST, "MISSING_COLUMN"),
            CheckupError::InvalidValue { .. } => (StatusCode::BAD_REQUEST, "INVALID_VALUE"),
            CheckupError::EmptyPortfolio => (StatusCode::BAD_REQUEST, "EMPTY_PORTFOLIO"),
            CheckupError::Csv(_) => (StatusCode::BAD_REQUEST, "INVALID_CSV"),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };

        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        } else {
            tracing::warn!(error = %self, "Request rejected");
        }

        let body = ErrorBody {
            success: false,
            error: self.to_string(),
            code,
        };

        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_map_to_bad_request() {
        let resp = CheckupError::EmptyPortfolio.into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = CheckupError::UnsupportedFile("xlsx".into()).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn io_errors_map_to_server_error() {
        let err = std::io::Error::new(std::io::ErrorKind::Other, "disk gone");
        let resp = CheckupError::from(err).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
