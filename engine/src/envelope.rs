//! The sync wire record.
//!
//! ```text
//! { "id": "<string>", "collection": "<string>", "payload": "<JSON string>",
//!   "sortindex": <int>, "modified": <int seconds | float seconds> }
//! ```
//!
//! Parsing never fails: a malformed record becomes an invalid [`Envelope`]
//! and callers filter on [`Envelope::is_valid`] before reading fields. The
//! required fields (`id`, `payload`) read as `None` on an invalid record.

use crate::Timestamp;
use serde_json::{Map, Number, Value as Json};

/// An immutable sync envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    json: Result<Json, String>,
}

impl Envelope {
    /// Parse a raw wire record.
    pub fn parse(raw: &str) -> Self {
        Self {
            json: serde_json::from_str(raw).map_err(|e| e.to_string()),
        }
    }

    /// Wrap an already-parsed JSON value.
    pub fn from_value(json: Json) -> Self {
        Self { json: Ok(json) }
    }

    /// Build a wire record from its fields. `modified` is in milliseconds.
    pub fn new(
        id: impl Into<String>,
        collection: impl Into<String>,
        payload: impl Into<String>,
        sortindex: i64,
        modified: Timestamp,
    ) -> Self {
        let mut map = Map::new();
        map.insert("id".into(), Json::String(id.into()));
        map.insert("collection".into(), Json::String(collection.into()));
        map.insert("payload".into(), Json::String(payload.into()));
        map.insert("sortindex".into(), Json::from(sortindex));
        map.insert("modified".into(), millis_to_seconds(modified));
        Self::from_value(Json::Object(map))
    }

    /// `id` and `payload` must be strings; everything else has a default.
    pub fn is_valid(&self) -> bool {
        self.json.is_ok()
            && self.field("id").is_some_and(Json::is_string)
            && self.field("payload").is_some_and(Json::is_string)
    }

    /// Why the raw record could not be used at all, if it could not.
    pub fn parse_error(&self) -> Option<&str> {
        self.json.as_ref().err().map(String::as_str)
    }

    pub fn id(&self) -> Option<&str> {
        self.field("id").and_then(Json::as_str)
    }

    pub fn collection(&self) -> &str {
        self.field("collection").and_then(Json::as_str).unwrap_or("")
    }

    /// The opaque payload string, itself JSON.
    pub fn payload(&self) -> Option<&str> {
        self.field("payload").and_then(Json::as_str)
    }

    pub fn sortindex(&self) -> i64 {
        match self.field("sortindex") {
            Some(Json::Number(n)) => n
                .as_i64()
                .or_else(|| n.as_f64().map(|f| f as i64))
                .unwrap_or(0),
            _ => 0,
        }
    }

    /// Last modification time in milliseconds.
    ///
    /// An integer on the wire is whole seconds, a float is fractional
    /// seconds. Anything else, including negative values, reads as 0.
    pub fn modified(&self) -> Timestamp {
        match self.field("modified") {
            Some(Json::Number(n)) => {
                if let Some(secs) = n.as_u64() {
                    secs.saturating_mul(1000)
                } else if n.is_i64() {
                    0
                } else {
                    n.as_f64().map_or(0, seconds_to_millis)
                }
            }
            _ => 0,
        }
    }

    /// A copy of this envelope with `modified` replaced.
    ///
    /// If the raw record is not a JSON object the result is an invalid
    /// envelope, never a copy carrying the old timestamp.
    pub fn with_modified(&self, modified: Timestamp) -> Self {
        match &self.json {
            Ok(Json::Object(map)) => {
                let mut map = map.clone();
                map.insert("modified".into(), millis_to_seconds(modified));
                Self::from_value(Json::Object(map))
            }
            _ => Self {
                json: Err("cannot set modified on a record that is not a JSON object".into()),
            },
        }
    }

    /// Serialize the underlying JSON. Key order is unspecified.
    pub fn to_json_string(&self) -> Option<String> {
        self.json.as_ref().ok().map(Json::to_string)
    }

    pub fn as_json(&self) -> Option<&Json> {
        self.json.as_ref().ok()
    }

    fn field(&self, key: &str) -> Option<&Json> {
        self.json.as_ref().ok()?.get(key)
    }
}

/// Fractional seconds to milliseconds, truncating below the millisecond.
///
/// The product is first rounded to the microsecond so that float noise from
/// `ms / 1000` does not truncate a whole millisecond away. Digits below the
/// microsecond therefore round: `1000.0009996` reads as 1000001 ms, while
/// `1000.0009994` reads as 1000000 ms.
fn seconds_to_millis(secs: f64) -> Timestamp {
    if !secs.is_finite() || secs <= 0.0 {
        return 0;
    }
    let micros = (secs * 1_000_000.0).round() as u64;
    micros / 1000
}

fn millis_to_seconds(millis: Timestamp) -> Json {
    Number::from_f64(millis as f64 / 1000.0).map_or(Json::Null, Json::Number)
}
