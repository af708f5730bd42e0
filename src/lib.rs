//! Client for the Nhost storage API.
//!
//! Files are uploaded, described, shared through presigned URLs and deleted
//! through [`StorageClient`], one HTTP request per call. Results are plain
//! [`Result`]s; [`Envelope`] renders them as `{payload, error}` JSON.

pub mod client;
pub mod envelope;
pub mod error;
pub mod headers;
pub mod metadata;
pub mod rest_types;
pub mod serde_utils;
pub mod upload;

pub use client::{Auth, StorageClient};
pub use envelope::Envelope;
pub use error::{ErrorBody, StorageError};
pub use headers::UploadHeaders;
pub use metadata::{HeadObjectOutput, Metadata, MetadataValue, StorageMetadata};
pub use rest_types::{
    DeleteParams, DeleteResponse, GetUrlParams, MetadataResponse, PresignedUrl,
    PresignedUrlParams, PresignedUrlResponse, UploadParams, UploadResponse,
};
pub use upload::{StringFormat, UploadFile, UploadString};
