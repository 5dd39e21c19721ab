//! API error handling for the file endpoints.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;

use crate::UpdownError;

/// Error kinds reported to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad upload input (400).
    Upload,
    /// Bad download input (400).
    Download,
    /// File not stored (404).
    NotFound,
    /// Request body over the configured limit (413).
    PayloadTooLarge,
    /// Storage failure (500).
    Internal,
}

impl ErrorKind {
    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorKind::Upload => StatusCode::BAD_REQUEST,
            ErrorKind::Download => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Kind name used in the `error` field of the body.
    pub fn name(&self) -> &'static str {
        match self {
            ErrorKind::Upload => "UploadError",
            ErrorKind::Download => "DownloadError",
            ErrorKind::NotFound => "NotFoundError",
            ErrorKind::PayloadTooLarge => "PayloadTooLargeError",
            ErrorKind::Internal => "InternalError",
        }
    }
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct StandardError {
    /// RFC 3339 UTC instant.
    pub timestamp: String,
    /// HTTP status code.
    pub status: u16,
    /// Kind name.
    pub error: &'static str,
    /// Human-readable message.
    pub message: String,
    /// Request path.
    pub path: String,
}

/// API error type.
#[derive(Debug)]
pub struct ApiError {
    kind: ErrorKind,
    message: String,
    path: String,
}

impl ApiError {
    /// Create a new API error.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            path: String::new(),
        }
    }

    /// Attach the request path reported in the body.
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Create an upload error.
    pub fn upload(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Upload, message)
    }

    /// Create an internal server error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    /// Error kind.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Error message.
    pub fn message(&self) -> &str {
        &self.message
    }

    fn body(&self) -> StandardError {
        StandardError {
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Nanos, true),
            status: self.kind.status_code().as_u16(),
            error: self.kind.name(),
            message: self.message.clone(),
            path: self.path.clone(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.kind.status_code(), Json(self.body())).into_response()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind.name(), self.message)
    }
}

impl std::error::Error for ApiError {}

impl From<UpdownError> for ApiError {
    fn from(err: UpdownError) -> Self {
        match err {
            UpdownError::Upload(msg) => ApiError::new(ErrorKind::Upload, msg),
            UpdownError::Download(msg) => ApiError::new(ErrorKind::Download, msg),
            UpdownError::NotFound(msg) => ApiError::new(ErrorKind::NotFound, msg),
            UpdownError::Internal(msg) => {
                tracing::error!("Storage failure: {}", msg);
                ApiError::internal(msg)
            }
            other => {
                tracing::error!("Internal error: {}", other);
                ApiError::internal("An internal error occurred")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_status() {
        assert_eq!(ErrorKind::Upload.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorKind::Download.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorKind::NotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            ErrorKind::PayloadTooLarge.status_code(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            ErrorKind::Internal.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_from_updown_error() {
        let err = ApiError::from(UpdownError::Upload("Invalid file name: a".to_string()));
        assert_eq!(err.kind(), ErrorKind::Upload);
        assert_eq!(err.message(), "Invalid file name: a");

        let err = ApiError::from(UpdownError::Download("Invalid file name: b".to_string()));
        assert_eq!(err.kind(), ErrorKind::Download);

        let err = ApiError::from(UpdownError::NotFound("File not found: c.txt".to_string()));
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let err = ApiError::from(UpdownError::Internal(
            "Fatal error. Could not list all files".to_string(),
        ));
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert_eq!(err.message(), "Fatal error. Could not list all files");
    }

    #[test]
    fn test_driver_errors_are_hidden() {
        let err = ApiError::from(UpdownError::Database("no such table: stored_files".to_string()));
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert_eq!(err.message(), "An internal error occurred");
    }

    #[test]
    fn test_standard_error_body() {
        let err = ApiError::upload("File already exists: a.txt")
            .with_path("/api/v1/in-system/files/upload");

        let json = serde_json::to_value(err.body()).unwrap();
        assert_eq!(json["status"], 400);
        assert_eq!(json["error"], "UploadError");
        assert_eq!(json["message"], "File already exists: a.txt");
        assert_eq!(json["path"], "/api/v1/in-system/files/upload");

        let timestamp = json["timestamp"].as_str().unwrap();
        assert!(timestamp.ends_with('Z'));
        assert!(chrono::DateTime::parse_from_rfc3339(timestamp).is_ok());
    }

    #[test]
    fn test_into_response_status() {
        let response = ApiError::new(ErrorKind::NotFound, "File not found: x.txt").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
