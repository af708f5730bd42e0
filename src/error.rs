use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("storage API returned {status}: {message}")]
    Api { status: StatusCode, message: String },
    #[error("invalid value for header `{name}`")]
    InvalidHeader { name: &'static str },
    #[error("invalid data URL: {0}")]
    InvalidDataUrl(String),
    #[error("refusing to upload an empty file")]
    EmptyFile,
    #[error(transparent)]
    Url(#[from] url::ParseError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl StorageError {
    /// HTTP status of the failed call, when the server answered at all.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            StorageError::Api { status, .. } => Some(*status),
            StorageError::Http(err) => err.status(),
            _ => None,
        }
    }
}

/// The error branch of a result union as it appears on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl From<&StorageError> for ErrorBody {
    fn from(err: &StorageError) -> Self {
        Self {
            message: err.to_string(),
            status: err.status().map(|s| s.as_u16()),
        }
    }
}

/// Error payload returned by the storage API on non-2xx responses.
#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorResponse {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorDetail {
    pub message: String,
}
