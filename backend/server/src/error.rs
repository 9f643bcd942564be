use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    MethodNotAllowed(String),

    #[error("Duplicate field value entered")]
    DuplicateKey,

    #[error("Only image files ({0}) are allowed!")]
    UnsupportedMedia(String),

    #[error("File too large, maximum is {max_bytes} bytes")]
    FileTooLarge { max_bytes: usize },

    #[error("{context}")]
    Storage {
        context: &'static str,
        #[source]
        source: StoreError,
    },

    #[error("{context}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Builds a `map_err` adapter that keeps the operation name as the client-facing message.
    pub fn storage(context: &'static str) -> impl FnOnce(StoreError) -> Self {
        move |source| match source {
            StoreError::DuplicateKey(_) => Self::DuplicateKey,
            source => Self::Storage { context, source },
        }
    }

    pub fn io(context: &'static str) -> impl FnOnce(std::io::Error) -> Self {
        move |source| Self::Io { context, source }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::MalformedPayload(_)
            | AppError::Validation(_)
            | AppError::DuplicateKey
            | AppError::UnsupportedMedia(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            AppError::FileTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::Storage { .. } | AppError::Io { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn cause(&self) -> Option<String> {
        match self {
            AppError::Storage { source, .. } => Some(source.to_string()),
            AppError::Io { source, .. } => Some(source.to_string()),
            _ => None,
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let cause = self.cause();

        if status.is_server_error() {
            error!(%status, cause = ?cause, "{}", self);
        } else {
            warn!(%status, "{}", self);
        }

        let body = ErrorBody {
            success: false,
            message: self.to_string(),
            error: cause,
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_store_keys_become_client_errors() {
        let err = AppError::storage("Failed to create header item")(StoreError::DuplicateKey(
            uuid::Uuid::nil(),
        ));

        assert!(matches!(err, AppError::DuplicateKey));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "Duplicate field value entered");
    }

    #[test]
    fn storage_failures_keep_operation_message_and_cause() {
        let codec = serde_json::from_str::<u32>("nope").unwrap_err();
        let err = AppError::storage("Failed to fetch header items")(StoreError::Codec(codec));

        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.to_string(), "Failed to fetch header items");
        assert!(err.cause().is_some_and(|cause| cause.starts_with("document codec")));
    }

    #[test]
    fn upload_dir_failures_are_server_errors_with_cause() {
        let source = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only");
        let err = AppError::io("Failed to store uploaded file")(source);

        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.to_string(), "Failed to store uploaded file");
        assert_eq!(err.cause().as_deref(), Some("read-only"));
    }

    #[test]
    fn oversized_uploads_map_to_payload_too_large() {
        let err = AppError::FileTooLarge { max_bytes: 10 };

        assert_eq!(err.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }
}
