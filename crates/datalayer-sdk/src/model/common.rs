// Response envelope handling and shared field codecs

use datalayer_client::{ClientError, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Fail with [`ClientError::Api`] when the envelope says `success: false`.
///
/// A missing `success` field counts as success and an empty body (`null`)
/// is accepted as an empty object.
pub(crate) fn check_success(body: Value) -> Result<Value> {
    let body = match body {
        Value::Null => Value::Object(Default::default()),
        other => other,
    };

    let success = body
        .get("success")
        .and_then(Value::as_bool)
        .unwrap_or(true);
    if success {
        return Ok(body);
    }

    let message = body
        .get("message")
        .and_then(Value::as_str)
        .filter(|m| !m.is_empty())
        .unwrap_or("request was not successful");
    Err(ClientError::Api(message.to_string()))
}

/// Deserialize the whole envelope into `T`
pub(crate) fn into_body<T: DeserializeOwned>(body: Value) -> Result<T> {
    Ok(serde_json::from_value(check_success(body)?)?)
}

/// Deserialize the payload stored under `field`
pub(crate) fn into_field<T: DeserializeOwned>(body: Value, field: &str) -> Result<T> {
    let mut body = check_success(body)?;
    match body.get_mut(field).map(Value::take) {
        Some(value) if !value.is_null() => Ok(serde_json::from_value(value)?),
        _ => Err(ClientError::Api(format!("response is missing '{}'", field))),
    }
}

/// Deserialize the list stored under `field`; a missing list is empty
pub(crate) fn into_list<T: DeserializeOwned>(body: Value, field: &str) -> Result<Vec<T>> {
    let mut body = check_success(body)?;
    match body.get_mut(field).map(Value::take) {
        Some(value) if !value.is_null() => Ok(serde_json::from_value(value)?),
        _ => Ok(Vec::new()),
    }
}

/// Serde codec for timestamps sent as epoch seconds.
///
/// Accepts numbers, numeric strings, and RFC 3339 strings. Values above
/// `1e12` are read as epoch milliseconds. Serializes as epoch seconds.
pub mod epoch_seconds {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer, de::Error};
    use serde_json::Value;

    const MILLIS_THRESHOLD: f64 = 1e12;

    pub fn from_secs(value: f64) -> Option<DateTime<Utc>> {
        if !value.is_finite() {
            return None;
        }
        let secs = if value.abs() > MILLIS_THRESHOLD {
            value / 1000.0
        } else {
            value
        };
        let whole = secs.floor();
        let nanos = ((secs - whole) * 1e9).round().min(999_999_999.0) as u32;
        DateTime::from_timestamp(whole as i64, nanos)
    }

    pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
        let raw = raw.trim();
        if let Ok(secs) = raw.parse::<f64>() {
            return from_secs(secs);
        }
        DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }

    pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(dt) if dt.timestamp_subsec_nanos() == 0 => serializer.serialize_i64(dt.timestamp()),
            Some(dt) => serializer.serialize_f64(dt.timestamp_millis() as f64 / 1000.0),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<Value>::deserialize(deserializer)? {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Number(n)) => n
                .as_f64()
                .and_then(from_secs)
                .map(Some)
                .ok_or_else(|| D::Error::custom(format!("timestamp out of range: {}", n))),
            Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
            Some(Value::String(s)) => parse(&s)
                .map(Some)
                .ok_or_else(|| D::Error::custom(format!("invalid timestamp: {}", s))),
            Some(other) => Err(D::Error::custom(format!(
                "expected a timestamp, got {}",
                other
            ))),
        }
    }
}
