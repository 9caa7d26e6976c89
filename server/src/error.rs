use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::io;
use thiserror::Error;

/// Everything a listing or file request can fail with.
#[derive(Debug, Error)]
pub enum ExploreError {
    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("not a directory: {0}")]
    NotADirectory(String),

    #[error("unsupported media: {0}")]
    UnsupportedMedia(String),

    #[error("i/o error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("external command failed: {0}")]
    ExecutionFailed(String),
}

impl ExploreError {
    /// Classifies an I/O error raised while touching `path`.
    pub fn from_io(path: impl Into<String>, err: io::Error) -> Self {
        let path = path.into();
        match err.kind() {
            io::ErrorKind::NotFound => ExploreError::NotFound(path),
            _ => ExploreError::Io { path, source: err },
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ExploreError::InvalidPath(_) | ExploreError::NotADirectory(_) => {
                StatusCode::BAD_REQUEST
            }
            ExploreError::NotFound(_) => StatusCode::NOT_FOUND,
            ExploreError::UnsupportedMedia(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ExploreError::Io { .. } | ExploreError::ExecutionFailed(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Plain-text rendering used by the file endpoint.
    pub fn into_text_response(self) -> Response {
        let body = match &self {
            ExploreError::NotFound(_) | ExploreError::UnsupportedMedia(_) => "File not found",
            ExploreError::InvalidPath(_) => "Invalid path",
            ExploreError::ExecutionFailed(_) => "Unable to render file",
            _ => "Unable to read file",
        };
        (self.status(), body).into_response()
    }
}

impl IntoResponse for ExploreError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ExploreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_not_found_maps_to_not_found() {
        let err = ExploreError::from_io("/a", io::Error::from(io::ErrorKind::NotFound));
        assert!(matches!(err, ExploreError::NotFound(ref p) if p == "/a"));
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn other_io_errors_are_server_errors() {
        let err = ExploreError::from_io("/a", io::Error::from(io::ErrorKind::PermissionDenied));
        assert!(matches!(err, ExploreError::Io { .. }));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn kind_mismatches_are_client_errors() {
        assert_eq!(
            ExploreError::NotADirectory("x".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ExploreError::UnsupportedMedia("x".into()).status(),
            StatusCode::UNSUPPORTED_MEDIA_TYPE
        );
        assert_eq!(
            ExploreError::InvalidPath("..".into()).status(),
            StatusCode::BAD_REQUEST
        );
    }
}
