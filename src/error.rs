//! Error handling

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::{error, info, warn};

/// Errors raised while fetching, normalizing and storing images.
#[derive(Debug)]
pub enum FetchError {
    /// Category name is not part of the configured catalog
    UnknownCategory(String),
    /// Image type is not part of the configured catalog
    UnknownImageType(String),
    /// Name can't be used as a category or type
    InvalidName(String),
    /// Bad user input, eg a count that isn't a number
    InvalidInput(String),
    /// Remote call failed: transport error, timeout or non-success status
    Http(String),
    /// Image bytes could not be decoded or re-encoded
    Decode(String),
    /// The request can't be honoured in the current state
    Conflict(String),
    /// Nothing there
    NotFound(String),
    /// Filesystem errors
    Io(std::io::Error),
    /// JSON (de)serialization errors
    Json(serde_json::Error),
}

impl FetchError {
    /// Transient remote or decode failures, which only cost the current candidate.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Http(_) | Self::Decode(_))
    }
}

impl std::fmt::Display for FetchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownCategory(name) => write!(f, "Unknown category: {name}"),
            Self::UnknownImageType(name) => write!(f, "Unknown image type: {name}"),
            Self::InvalidName(name) => write!(f, "Invalid name: {name:?}"),
            Self::InvalidInput(message) => write!(f, "Invalid input: {message}"),
            Self::Http(message) => write!(f, "HTTP error: {message}"),
            Self::Decode(message) => write!(f, "Image decode error: {message}"),
            Self::Conflict(message) => write!(f, "Conflict: {message}"),
            Self::NotFound(what) => write!(f, "Not found: {what}"),
            Self::Io(err) => write!(f, "I/O error: {err}"),
            Self::Json(err) => write!(f, "JSON error: {err}"),
        }
    }
}

impl std::error::Error for FetchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Json(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for FetchError {
    fn from(err: std::io::Error) -> Self {
        FetchError::Io(err)
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        FetchError::Json(err)
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        FetchError::Http(err.to_string())
    }
}

impl From<image::ImageError> for FetchError {
    fn from(err: image::ImageError) -> Self {
        FetchError::Decode(err.to_string())
    }
}

impl IntoResponse for FetchError {
    fn into_response(self) -> Response {
        let status = match &self {
            FetchError::UnknownCategory(_)
            | FetchError::UnknownImageType(_)
            | FetchError::InvalidName(_)
            | FetchError::InvalidInput(_) => {
                info!("Bad request: {}", self);
                StatusCode::BAD_REQUEST
            }
            FetchError::Http(_) | FetchError::Decode(_) => {
                warn!("Upstream failure: {}", self);
                StatusCode::BAD_GATEWAY
            }
            FetchError::Conflict(_) => {
                info!("{}", self);
                StatusCode::CONFLICT
            }
            FetchError::NotFound(_) => StatusCode::NOT_FOUND,
            FetchError::Io(_) | FetchError::Json(_) => {
                error!("Internal server error: {}", self);
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    axum::Json(serde_json::json!({ "error": "Internal server error" })),
                )
                    .into_response();
            }
        };
        (status, axum::Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}
