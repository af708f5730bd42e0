use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};

use crate::error::StorageError;

pub const BUCKET_ID_HEADER: &str = "x-nhost-bucket-id";
pub const FILE_ID_HEADER: &str = "x-nhost-file-id";
pub const FILE_NAME_HEADER: &str = "x-nhost-file-name";

/// Identifiers attached to an outbound upload request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadHeaders {
    #[serde(rename = "x-nhost-bucket-id", default, skip_serializing_if = "Option::is_none")]
    pub bucket_id: Option<String>,
    #[serde(rename = "x-nhost-file-id", default, skip_serializing_if = "Option::is_none")]
    pub file_id: Option<String>,
    #[serde(rename = "x-nhost-file-name", default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
}

impl UploadHeaders {
    /// Present values paired with their header key; absent values are skipped.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        [
            (BUCKET_ID_HEADER, self.bucket_id.as_deref()),
            (FILE_ID_HEADER, self.file_id.as_deref()),
            (FILE_NAME_HEADER, self.file_name.as_deref()),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.map(|value| (key, value)))
    }

    pub fn to_header_map(&self) -> Result<HeaderMap, StorageError> {
        let mut map = HeaderMap::new();
        for (name, value) in self.iter() {
            let value =
                HeaderValue::from_str(value).map_err(|_| StorageError::InvalidHeader { name })?;
            map.insert(HeaderName::from_static(name), value);
        }
        Ok(map)
    }
}
