use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::jobs::JobError;

/// Errors returned by the HTTP handlers.
///
/// `Display` is the internal description that gets traced; `http_message` is
/// what the client sees.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("failed to queue email sending task for {to}: {source}")]
    Enqueue {
        to: String,
        #[source]
        source: JobError,
    },

    #[error("failed to read log file: {0}")]
    ReadLog(#[from] std::io::Error),
}

impl ApiError {
    pub fn http_code(&self) -> StatusCode {
        match self {
            Self::Enqueue { .. } | Self::ReadLog(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn http_message(&self) -> String {
        match self {
            Self::Enqueue { .. } => "Failed to queue email sending task.".to_string(),
            // Clients see the raw I/O text in the 500 body.
            Self::ReadLog(e) => format!("Failed to read log file. Error: {e}"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.http_code().is_server_error() {
            tracing::error!("Error Status {}: {}", self.http_code(), self);
        }
        (self.http_code(), self.http_message()).into_response()
    }
}
