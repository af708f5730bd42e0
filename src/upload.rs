//! Upload payloads: file blobs read from disk or memory, and string uploads
//! given either as raw text or as a `data:` URL.

use std::path::Path;

use base64::{Engine as _, engine::general_purpose};
use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};

use crate::error::StorageError;
use crate::rest_types::UploadParams;

const DEFAULT_FILE_NAME: &str = "file";
const TEXT_CONTENT_TYPE: &str = "text/plain";

/// A file blob sent as the `file` part of the upload form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub bytes: Vec<u8>,
    pub file_name: String,
    pub content_type: Option<String>,
}

impl UploadFile {
    pub fn new(bytes: impl Into<Vec<u8>>, file_name: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            file_name: file_name.into(),
            content_type: None,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Reads a file from disk; the part's file name is the path's last component.
    pub async fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| DEFAULT_FILE_NAME.to_string());

        Ok(Self::new(bytes, file_name))
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StringFormat {
    #[default]
    Raw,
    DataUrl,
}

/// A string to be stored as a file under `path`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadString {
    pub path: String,
    pub data: String,
    pub format: StringFormat,
    pub content_type: Option<String>,
}

impl UploadString {
    pub fn into_upload_params(self) -> Result<UploadParams, StorageError> {
        let (bytes, embedded_type) = match self.format {
            StringFormat::Raw => (self.data.into_bytes(), None),
            StringFormat::DataUrl => {
                let decoded = decode_data_url(&self.data)?;
                (decoded.bytes, decoded.mime_type)
            }
        };

        let content_type = self
            .content_type
            .or(embedded_type)
            .unwrap_or_else(|| TEXT_CONTENT_TYPE.to_string());

        Ok(UploadParams {
            file: UploadFile::new(bytes, self.path.clone()).with_content_type(content_type),
            id: None,
            name: Some(self.path),
            bucket_id: None,
        })
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct DataUrl {
    pub mime_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Decodes `data:[<mime>][;<param>]*[;base64],<data>`.
///
/// The payload is percent-decoded first; with the `;base64` marker the result
/// is then base64-decoded, ignoring ASCII whitespace such as line wraps.
pub fn decode_data_url(input: &str) -> Result<DataUrl, StorageError> {
    let rest = input
        .strip_prefix("data:")
        .ok_or_else(|| StorageError::InvalidDataUrl("missing `data:` prefix".to_string()))?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| StorageError::InvalidDataUrl("missing `,` separator".to_string()))?;

    let mut params = header.split(';');
    let mime_type = params
        .next()
        .map(str::trim)
        .filter(|mime| !mime.is_empty())
        .map(str::to_string);
    let is_base64 = params.any(|param| param.trim().eq_ignore_ascii_case("base64"));

    let unescaped: Vec<u8> = percent_decode_str(payload).collect();
    let bytes = if is_base64 {
        let compact: Vec<u8> = unescaped
            .into_iter()
            .filter(|byte| !byte.is_ascii_whitespace())
            .collect();
        general_purpose::STANDARD
            .decode(compact)
            .map_err(|err| StorageError::InvalidDataUrl(err.to_string()))?
    } else {
        unescaped
    };

    Ok(DataUrl { mime_type, bytes })
}
