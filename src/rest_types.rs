use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::StorageError;
use crate::headers::UploadHeaders;
use crate::metadata::{HeadObjectOutput, StorageMetadata};
use crate::serde_utils;
use crate::upload::UploadFile;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadParams {
    pub file: UploadFile,
    pub id: Option<String>,
    pub name: Option<String>,
    pub bucket_id: Option<String>,
}

impl UploadParams {
    pub fn new(file: UploadFile) -> Self {
        Self {
            file,
            id: None,
            name: None,
            bucket_id: None,
        }
    }

    pub fn headers(&self) -> UploadHeaders {
        UploadHeaders {
            bucket_id: self.bucket_id.clone(),
            file_id: self.id.clone(),
            file_name: self.name.clone(),
        }
    }
}

pub type UploadResponse = Result<HeadObjectOutput, StorageError>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetUrlParams {
    pub file_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresignedUrlParams {
    pub file_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresignedUrl {
    pub url: Url,
    /// Lifetime of the link, sent as whole seconds.
    #[serde(
        deserialize_with = "serde_utils::deserialize_duration_secs",
        serialize_with = "serde_utils::serialize_duration_secs"
    )]
    pub expiration: Duration,
}

pub type PresignedUrlResponse = Result<PresignedUrl, StorageError>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteParams {
    pub file_id: String,
}

pub type DeleteResponse = Result<(), StorageError>;

pub type MetadataResponse = Result<StorageMetadata, StorageError>;
