//! Object metadata as reported by the S3-compatible backend.
//!
//! [`HeadObjectOutput`] mirrors the `HeadObject` response field for field and
//! serializes with the backend's PascalCase keys. [`StorageMetadata`] is the
//! compact view the storage API hands out for a single file.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use reqwest::header::{self, HeaderMap};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::serde_utils::{parse_http_date, parse_rfc3339};

pub type MetadataValue = String;
pub type Metadata = BTreeMap<String, MetadataValue>;

const META_PREFIX: &str = "x-amz-meta-";
const HTTP_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct HeadObjectOutput {
    /// Whether the object retrieved was a delete marker.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delete_marker: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accept_ranges: Option<String>,
    /// Expiry date and rule id when a lifecycle expiration applies.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiration: Option<String>,
    /// Archive restoration state, e.g. `ongoing-request="false", expiry-date="..."`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub restore: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<DateTime<Utc>>,
    /// Size of the body in bytes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_length: Option<i64>,
    #[serde(rename = "ETag", skip_serializing_if = "Option::is_none")]
    pub e_tag: Option<String>,
    /// Number of metadata entries not returned as `x-amz-meta-*` headers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub missing_meta: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_control: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_disposition: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_encoding: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    /// When the object stops being cacheable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website_redirect_location: Option<String>,
    /// Server-side encryption algorithm, e.g. `AES256` or `aws:kms`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_side_encryption: Option<String>,
    /// User metadata, collected from `x-amz-meta-*` headers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
    #[serde(rename = "SSECustomerAlgorithm", skip_serializing_if = "Option::is_none")]
    pub sse_customer_algorithm: Option<String>,
    #[serde(rename = "SSECustomerKeyMD5", skip_serializing_if = "Option::is_none")]
    pub sse_customer_key_md5: Option<String>,
    #[serde(rename = "SSEKMSKeyId", skip_serializing_if = "Option::is_none")]
    pub ssekms_key_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_class: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_charged: Option<String>,
    /// `PENDING`, `COMPLETED`, `FAILED` or `REPLICA`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replication_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parts_count: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_lock_mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_lock_retain_until_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_lock_legal_hold_status: Option<String>,
}

impl HeadObjectOutput {
    /// Builds the mirror from `HeadObject` response headers.
    ///
    /// Headers that are missing, not valid UTF-8, or that fail to parse for
    /// their type leave the corresponding field unset.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let text = |name: &str| header_str(headers, name).map(str::to_string);

        let mut metadata = Metadata::new();
        for (name, value) in headers {
            let Some(key) = name.as_str().strip_prefix(META_PREFIX) else {
                continue;
            };
            match value.to_str() {
                Ok(value) => {
                    metadata.insert(key.to_string(), value.to_string());
                }
                Err(_) => debug!(header = %name, "skipping non-UTF-8 metadata header"),
            }
        }

        Self {
            delete_marker: parsed(headers, "x-amz-delete-marker", |v| v.parse().ok()),
            accept_ranges: text(header::ACCEPT_RANGES.as_str()),
            expiration: text("x-amz-expiration"),
            restore: text("x-amz-restore"),
            last_modified: parsed(headers, header::LAST_MODIFIED.as_str(), parse_http_date),
            content_length: parsed(headers, header::CONTENT_LENGTH.as_str(), |v| v.parse().ok()),
            e_tag: text(header::ETAG.as_str()),
            missing_meta: parsed(headers, "x-amz-missing-meta", |v| v.parse().ok()),
            version_id: text("x-amz-version-id"),
            cache_control: text(header::CACHE_CONTROL.as_str()),
            content_disposition: text(header::CONTENT_DISPOSITION.as_str()),
            content_encoding: text(header::CONTENT_ENCODING.as_str()),
            content_language: text(header::CONTENT_LANGUAGE.as_str()),
            content_type: text(header::CONTENT_TYPE.as_str()),
            expires: parsed(headers, header::EXPIRES.as_str(), parse_http_date),
            website_redirect_location: text("x-amz-website-redirect-location"),
            server_side_encryption: text("x-amz-server-side-encryption"),
            metadata: (!metadata.is_empty()).then_some(metadata),
            sse_customer_algorithm: text("x-amz-server-side-encryption-customer-algorithm"),
            sse_customer_key_md5: text("x-amz-server-side-encryption-customer-key-md5"),
            ssekms_key_id: text("x-amz-server-side-encryption-aws-kms-key-id"),
            storage_class: text("x-amz-storage-class"),
            request_charged: text("x-amz-request-charged"),
            replication_status: text("x-amz-replication-status"),
            parts_count: parsed(headers, "x-amz-mp-parts-count", |v| v.parse().ok()),
            object_lock_mode: text("x-amz-object-lock-mode"),
            object_lock_retain_until_date: parsed(
                headers,
                "x-amz-object-lock-retain-until-date",
                parse_rfc3339,
            ),
            object_lock_legal_hold_status: text("x-amz-object-lock-legal-hold"),
        }
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    let value = headers.get(name)?;
    match value.to_str() {
        Ok(value) => Some(value),
        Err(_) => {
            debug!(header = name, "skipping non-UTF-8 header");
            None
        }
    }
}

fn parsed<T>(headers: &HeaderMap, name: &str, parse: impl FnOnce(&str) -> Option<T>) -> Option<T> {
    let raw = header_str(headers, name)?;
    let value = parse(raw);
    if value.is_none() {
        debug!(header = name, value = raw, "skipping malformed header");
    }
    value
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaObject {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

/// Compact per-file metadata: the object key plus the handful of head
/// fields clients usually need.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StorageMetadata {
    #[serde(rename = "key")]
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accept_ranges: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_length: Option<i64>,
    #[serde(rename = "ETag", default, skip_serializing_if = "Option::is_none")]
    pub e_tag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<MetaObject>,
}

impl StorageMetadata {
    pub fn from_head(key: impl Into<String>, head: &HeadObjectOutput) -> Self {
        let token = head
            .metadata
            .as_ref()
            .and_then(|meta| meta.get("token"))
            .cloned();

        Self {
            key: key.into(),
            accept_ranges: head.accept_ranges.clone(),
            last_modified: head
                .last_modified
                .map(|date| date.format(HTTP_DATE_FORMAT).to_string()),
            content_length: head.content_length,
            e_tag: head.e_tag.clone(),
            content_type: head.content_type.clone(),
            metadata: token.map(|token| MetaObject { token: Some(token) }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use reqwest::header::HeaderValue;
    use serde_json::json;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_static(*value));
        }
        map
    }

    #[test]
    fn empty_object_is_valid() {
        let head: HeadObjectOutput = serde_json::from_str("{}").unwrap();
        assert_eq!(head, HeadObjectOutput::default());
        assert_eq!(serde_json::to_string(&head).unwrap(), "{}");
    }

    #[test]
    fn accepts_every_documented_field() {
        let value = json!({
            "DeleteMarker": false,
            "AcceptRanges": "bytes",
            "Expiration": "expiry-date=\"Fri, 23 Dec 2012 00:00:00 GMT\", rule-id=\"rule1\"",
            "Restore": "ongoing-request=\"true\"",
            "LastModified": "2024-03-01T12:00:00Z",
            "ContentLength": 1024,
            "ETag": "\"9b2cf535f27731c974343645a3985328\"",
            "MissingMeta": 0,
            "VersionId": "v1",
            "CacheControl": "max-age=3600",
            "ContentDisposition": "inline",
            "ContentEncoding": "gzip",
            "ContentLanguage": "en",
            "ContentType": "image/png",
            "Expires": "2024-04-01T00:00:00Z",
            "WebsiteRedirectLocation": "/other",
            "ServerSideEncryption": "AES256",
            "Metadata": { "token": "abc" },
            "SSECustomerAlgorithm": "AES256",
            "SSECustomerKeyMD5": "md5",
            "SSEKMSKeyId": "kms-key",
            "StorageClass": "STANDARD_IA",
            "RequestCharged": "requester",
            "ReplicationStatus": "COMPLETED",
            "PartsCount": 3,
            "ObjectLockMode": "GOVERNANCE",
            "ObjectLockRetainUntilDate": "2030-01-01T00:00:00Z",
            "ObjectLockLegalHoldStatus": "ON"
        });

        let head: HeadObjectOutput = serde_json::from_value(value.clone()).unwrap();

        assert_eq!(head.content_length, Some(1024));
        assert_eq!(head.sse_customer_key_md5.as_deref(), Some("md5"));
        assert_eq!(head.ssekms_key_id.as_deref(), Some("kms-key"));
        assert_eq!(head.parts_count, Some(3));
        assert_eq!(
            head.last_modified,
            Some(Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap())
        );
        assert_eq!(head.metadata.as_ref().unwrap()["token"], "abc");
        assert_eq!(serde_json::to_value(&head).unwrap(), value);
    }

    #[test]
    fn ignores_unknown_keys() {
        let head: HeadObjectOutput =
            serde_json::from_str(r#"{"ContentType": "text/plain", "BucketKeyEnabled": true}"#)
                .unwrap();
        assert_eq!(head.content_type.as_deref(), Some("text/plain"));
    }

    #[test]
    fn parses_head_object_headers() {
        let map = headers(&[
            ("content-type", "image/jpeg"),
            ("content-length", "2048"),
            ("etag", "\"abc123\""),
            ("accept-ranges", "bytes"),
            ("last-modified", "Wed, 21 Oct 2015 07:28:00 GMT"),
            ("x-amz-version-id", "3HL4kqtJlcpXroDTDmJ"),
            ("x-amz-server-side-encryption", "aws:kms"),
            ("x-amz-server-side-encryption-aws-kms-key-id", "key-1"),
            ("x-amz-delete-marker", "false"),
            ("x-amz-mp-parts-count", "4"),
            ("x-amz-object-lock-retain-until-date", "2030-01-01T00:00:00.000Z"),
            ("x-amz-object-lock-legal-hold", "OFF"),
            ("x-amz-meta-token", "secret-token"),
            ("x-amz-meta-author", "jane"),
        ]);

        let head = HeadObjectOutput::from_headers(&map);

        assert_eq!(head.content_type.as_deref(), Some("image/jpeg"));
        assert_eq!(head.content_length, Some(2048));
        assert_eq!(head.e_tag.as_deref(), Some("\"abc123\""));
        assert_eq!(
            head.last_modified,
            Some(Utc.with_ymd_and_hms(2015, 10, 21, 7, 28, 0).unwrap())
        );
        assert_eq!(head.ssekms_key_id.as_deref(), Some("key-1"));
        assert_eq!(head.delete_marker, Some(false));
        assert_eq!(head.parts_count, Some(4));
        assert_eq!(
            head.object_lock_retain_until_date,
            Some(Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap())
        );
        assert_eq!(head.object_lock_legal_hold_status.as_deref(), Some("OFF"));

        let metadata = head.metadata.unwrap();
        assert_eq!(metadata.len(), 2);
        assert_eq!(metadata["token"], "secret-token");
        assert_eq!(metadata["author"], "jane");
    }

    #[test]
    fn maps_every_head_object_header() {
        let map = headers(&[
            ("x-amz-delete-marker", "true"),
            ("accept-ranges", "bytes"),
            ("x-amz-expiration", "expiry-date=\"Fri, 23 Dec 2012 00:00:00 GMT\", rule-id=\"r1\""),
            ("x-amz-restore", "ongoing-request=\"false\""),
            ("last-modified", "Wed, 21 Oct 2015 07:28:00 GMT"),
            ("content-length", "512"),
            ("etag", "\"e-tag\""),
            ("x-amz-missing-meta", "2"),
            ("x-amz-version-id", "v-7"),
            ("cache-control", "max-age=60"),
            ("content-disposition", "attachment; filename=\"a.txt\""),
            ("content-encoding", "gzip"),
            ("content-language", "de"),
            ("content-type", "text/csv"),
            ("expires", "Thu, 01 Dec 2033 16:00:00 GMT"),
            ("x-amz-website-redirect-location", "/elsewhere"),
            ("x-amz-server-side-encryption", "AES256"),
            ("x-amz-meta-token", "tok"),
            ("x-amz-server-side-encryption-customer-algorithm", "AES256"),
            ("x-amz-server-side-encryption-customer-key-md5", "bWQ1"),
            ("x-amz-server-side-encryption-aws-kms-key-id", "kms-9"),
            ("x-amz-storage-class", "GLACIER"),
            ("x-amz-request-charged", "requester"),
            ("x-amz-replication-status", "REPLICA"),
            ("x-amz-mp-parts-count", "6"),
            ("x-amz-object-lock-mode", "COMPLIANCE"),
            ("x-amz-object-lock-retain-until-date", "2031-05-06T07:08:09Z"),
            ("x-amz-object-lock-legal-hold", "ON"),
        ]);

        let expected = HeadObjectOutput {
            delete_marker: Some(true),
            accept_ranges: Some("bytes".to_string()),
            expiration: Some("expiry-date=\"Fri, 23 Dec 2012 00:00:00 GMT\", rule-id=\"r1\"".to_string()),
            restore: Some("ongoing-request=\"false\"".to_string()),
            last_modified: Some(Utc.with_ymd_and_hms(2015, 10, 21, 7, 28, 0).unwrap()),
            content_length: Some(512),
            e_tag: Some("\"e-tag\"".to_string()),
            missing_meta: Some(2),
            version_id: Some("v-7".to_string()),
            cache_control: Some("max-age=60".to_string()),
            content_disposition: Some("attachment; filename=\"a.txt\"".to_string()),
            content_encoding: Some("gzip".to_string()),
            content_language: Some("de".to_string()),
            content_type: Some("text/csv".to_string()),
            expires: Some(Utc.with_ymd_and_hms(2033, 12, 1, 16, 0, 0).unwrap()),
            website_redirect_location: Some("/elsewhere".to_string()),
            server_side_encryption: Some("AES256".to_string()),
            metadata: Some(Metadata::from([("token".to_string(), "tok".to_string())])),
            sse_customer_algorithm: Some("AES256".to_string()),
            sse_customer_key_md5: Some("bWQ1".to_string()),
            ssekms_key_id: Some("kms-9".to_string()),
            storage_class: Some("GLACIER".to_string()),
            request_charged: Some("requester".to_string()),
            replication_status: Some("REPLICA".to_string()),
            parts_count: Some(6),
            object_lock_mode: Some("COMPLIANCE".to_string()),
            object_lock_retain_until_date: Some(Utc.with_ymd_and_hms(2031, 5, 6, 7, 8, 9).unwrap()),
            object_lock_legal_hold_status: Some("ON".to_string()),
        };

        assert_eq!(HeadObjectOutput::from_headers(&map), expected);
    }

    #[test]
    fn skips_malformed_header_values() {
        let map = headers(&[
            ("content-length", "lots"),
            ("expires", "0"),
            ("x-amz-missing-meta", "-"),
            ("cache-control", "no-cache"),
        ]);

        let head = HeadObjectOutput::from_headers(&map);

        assert_eq!(head.content_length, None);
        assert_eq!(head.expires, None);
        assert_eq!(head.missing_meta, None);
        assert_eq!(head.cache_control.as_deref(), Some("no-cache"));
        assert_eq!(head.metadata, None);
    }

    #[test]
    fn compacts_head_into_storage_metadata() {
        let head = HeadObjectOutput {
            content_length: Some(10),
            content_type: Some("text/plain".to_string()),
            e_tag: Some("\"e\"".to_string()),
            last_modified: Some(Utc.with_ymd_and_hms(2015, 10, 21, 7, 28, 0).unwrap()),
            metadata: Some(Metadata::from([("token".to_string(), "t0k".to_string())])),
            version_id: Some("ignored".to_string()),
            ..Default::default()
        };

        let compact = StorageMetadata::from_head("file-1", &head);

        assert_eq!(compact.key, "file-1");
        assert_eq!(compact.content_length, Some(10));
        assert_eq!(compact.last_modified.as_deref(), Some("Wed, 21 Oct 2015 07:28:00 GMT"));
        assert_eq!(compact.metadata.unwrap().token.as_deref(), Some("t0k"));

        let json = serde_json::to_value(StorageMetadata::from_head("k", &HeadObjectOutput::default()))
            .unwrap();
        assert_eq!(json, json!({ "key": "k" }));
    }
}
