//! Error types for the LoRA gallery.
//!
//! Library operations return [`GalleryError`]; the HTTP layer maps each
//! variant to a status code through [`GalleryError::http_status`].

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the gallery library.
#[derive(Debug, Error)]
pub enum GalleryError {
    // Caller contract violations
    #[error("Invalid argument {field}: {message}")]
    InvalidArgument { field: String, message: String },

    #[error("Access denied: {0}")]
    Forbidden(String),

    // Catalog errors
    #[error("LoRA not found: {name}")]
    AssetNotFound { name: String },

    // File system errors
    #[error("IO error at {path:?}: {message}")]
    Io {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<std::io::Error>,
    },

    // Serialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    // Remote metadata errors
    #[error("Network error: {message}")]
    Network {
        message: String,
        /// Optional cause description
        cause: Option<String>,
    },

    #[error("{service} returned HTTP {status}")]
    RemoteApi { service: String, status: u16 },

    #[error("Feature disabled: {0}")]
    FeatureDisabled(String),

    // Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("{0}")]
    Other(String),
}

/// Result type alias for gallery operations.
pub type Result<T> = std::result::Result<T, GalleryError>;

impl From<std::io::Error> for GalleryError {
    fn from(err: std::io::Error) -> Self {
        GalleryError::Io {
            message: err.to_string(),
            path: None,
            source: Some(err),
        }
    }
}

impl From<serde_json::Error> for GalleryError {
    fn from(err: serde_json::Error) -> Self {
        GalleryError::Json {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<reqwest::Error> for GalleryError {
    fn from(err: reqwest::Error) -> Self {
        let message = if err.is_timeout() {
            "Request timed out".to_string()
        } else {
            err.to_string()
        };
        GalleryError::Network {
            message,
            cause: Some(err.to_string()),
        }
    }
}

impl GalleryError {
    /// Create an IO error with path context.
    pub fn io_with_path(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        GalleryError::Io {
            message: err.to_string(),
            path: Some(path.into()),
            source: Some(err),
        }
    }

    /// Shorthand for an [`GalleryError::InvalidArgument`].
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        GalleryError::InvalidArgument {
            field: field.into(),
            message: message.into(),
        }
    }

    /// HTTP status code for this error.
    ///
    /// - 400: invalid arguments
    /// - 403: path traversal attempts
    /// - 404: unknown LoRA or preview file
    /// - 502: remote API failures
    /// - 503: disabled features
    /// - 500: everything else
    pub fn http_status(&self) -> u16 {
        match self {
            GalleryError::InvalidArgument { .. } => 400,
            GalleryError::Forbidden(_) => 403,
            GalleryError::AssetNotFound { .. } => 404,
            GalleryError::Network { .. } | GalleryError::RemoteApi { .. } => 502,
            GalleryError::FeatureDisabled(_) => 503,
            _ => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = GalleryError::AssetNotFound {
            name: "style/anime.safetensors".into(),
        };
        assert_eq!(err.to_string(), "LoRA not found: style/anime.safetensors");

        let err = GalleryError::invalid("page_size", "must be greater than zero");
        assert_eq!(
            err.to_string(),
            "Invalid argument page_size: must be greater than zero"
        );
    }

    #[test]
    fn test_http_status() {
        assert_eq!(GalleryError::invalid("mode", "bad").http_status(), 400);
        assert_eq!(GalleryError::Forbidden("..".into()).http_status(), 403);
        assert_eq!(
            GalleryError::RemoteApi {
                service: "Civitai".into(),
                status: 500
            }
            .http_status(),
            502
        );
        assert_eq!(GalleryError::Other("boom".into()).http_status(), 500);
    }

    #[test]
    fn test_io_conversion_keeps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = GalleryError::io_with_path(io, "/tmp/x.json");
        match err {
            GalleryError::Io { path, source, .. } => {
                assert_eq!(path, Some(PathBuf::from("/tmp/x.json")));
                assert!(source.is_some());
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
