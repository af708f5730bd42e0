use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serializer};
use std::time::Duration;

pub fn deserialize_duration_secs<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let secs = u64::deserialize(deserializer)?;
    Ok(Duration::from_secs(secs))
}

pub fn serialize_duration_secs<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_u64(duration.as_secs())
}

/// Parses an RFC 7231 HTTP date (`Wed, 21 Oct 2015 07:28:00 GMT`).
pub fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(value.trim())
        .ok()
        .map(|date| date.with_timezone(&Utc))
}

pub fn parse_rfc3339(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value.trim())
        .ok()
        .map(|date| date.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde::{Deserialize, Serialize};

    #[derive(Deserialize, Serialize)]
    struct TestStruct {
        #[serde(
            deserialize_with = "deserialize_duration_secs",
            serialize_with = "serialize_duration_secs"
        )]
        expiration: Duration,
    }

    #[test]
    fn test_deserialize_duration_secs() {
        let json = r#"{"expiration": 3600}"#;
        let result: TestStruct = serde_json::from_str(json).unwrap();

        assert_eq!(result.expiration, Duration::from_secs(3600));
        assert_eq!(
            serde_json::to_string(&result).unwrap(),
            r#"{"expiration":3600}"#
        );
    }

    #[test]
    fn test_negative_duration_is_rejected() {
        let json = r#"{"expiration": -5}"#;
        assert!(serde_json::from_str::<TestStruct>(json).is_err());
    }

    #[test]
    fn test_parse_http_date() {
        let parsed = parse_http_date("Wed, 21 Oct 2015 07:28:00 GMT").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2015, 10, 21, 7, 28, 0).unwrap());

        assert_eq!(parse_http_date("0"), None);
        assert_eq!(parse_http_date("yesterday"), None);
    }

    #[test]
    fn test_parse_rfc3339() {
        let parsed = parse_rfc3339("2030-01-01T00:00:00.000Z").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap());
    }
}
