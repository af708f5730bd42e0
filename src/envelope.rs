//! JSON rendering of operation results.
//!
//! Every operation result is a union of a success payload and an error. On
//! the wire that union is an object carrying both keys with exactly one of
//! them non-null, e.g. `{"fileMetadata": {...}, "error": null}`. Delete has
//! no payload and renders as `{"error": null}`.

use serde::de::{DeserializeOwned, Deserializer, Error as _};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use url::Url;

use crate::error::{ErrorBody, StorageError};
use crate::metadata::{HeadObjectOutput, StorageMetadata};
use crate::rest_types::PresignedUrl;

const ERROR_FIELD: &str = "error";

pub trait EnvelopePayload: Sized {
    /// Key of the success branch, `None` when success carries no payload.
    const FIELD: Option<&'static str>;

    /// The payload implied by a bare success, for payload-less results.
    fn implied() -> Option<Self> {
        None
    }
}

impl EnvelopePayload for HeadObjectOutput {
    const FIELD: Option<&'static str> = Some("fileMetadata");
}

impl EnvelopePayload for PresignedUrl {
    const FIELD: Option<&'static str> = Some("presignedUrl");
}

impl EnvelopePayload for Url {
    const FIELD: Option<&'static str> = Some("publicUrl");
}

impl EnvelopePayload for StorageMetadata {
    const FIELD: Option<&'static str> = Some("metadata");
}

impl EnvelopePayload for () {
    const FIELD: Option<&'static str> = None;

    fn implied() -> Option<Self> {
        Some(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Envelope<T> {
    Success(T),
    Failure(ErrorBody),
}

impl<T> Envelope<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, Envelope::Success(_))
    }

    pub fn into_result(self) -> Result<T, ErrorBody> {
        match self {
            Envelope::Success(payload) => Ok(payload),
            Envelope::Failure(error) => Err(error),
        }
    }
}

impl<T> From<Result<T, StorageError>> for Envelope<T> {
    fn from(result: Result<T, StorageError>) -> Self {
        match result {
            Ok(payload) => Envelope::Success(payload),
            Err(err) => Envelope::Failure(ErrorBody::from(&err)),
        }
    }
}

impl<T: EnvelopePayload + Serialize> Serialize for Envelope<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let null = Option::<()>::None;
        let mut map = serializer.serialize_map(None)?;
        if let Some(field) = T::FIELD {
            match self {
                Envelope::Success(payload) => map.serialize_entry(field, payload)?,
                Envelope::Failure(_) => map.serialize_entry(field, &null)?,
            }
        }
        match self {
            Envelope::Success(_) => map.serialize_entry(ERROR_FIELD, &null)?,
            Envelope::Failure(error) => map.serialize_entry(ERROR_FIELD, error)?,
        }
        map.end()
    }
}

impl<'de, T: EnvelopePayload + DeserializeOwned> Deserialize<'de> for Envelope<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let mut raw = Map::<String, Value>::deserialize(deserializer)?;

        let error = match raw.remove(ERROR_FIELD) {
            None | Some(Value::Null) => None,
            Some(value) => Some(ErrorBody::deserialize(value).map_err(D::Error::custom)?),
        };

        let payload = match T::FIELD {
            Some(field) => match raw.remove(field) {
                None | Some(Value::Null) => None,
                Some(value) => Some(T::deserialize(value).map_err(D::Error::custom)?),
            },
            None if error.is_none() => T::implied(),
            None => None,
        };

        match (payload, error) {
            (Some(payload), None) => Ok(Envelope::Success(payload)),
            (None, Some(error)) => Ok(Envelope::Failure(error)),
            (Some(_), Some(_)) => Err(D::Error::custom(
                "result carries both a payload and an error",
            )),
            (None, None) => Err(D::Error::custom(
                "result carries neither a payload nor an error",
            )),
        }
    }
}
