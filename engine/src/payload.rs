//! Decrypted sync payloads.
//!
//! The `payload` string of an [`Envelope`](crate::Envelope) decodes, once
//! decrypted by the caller, into a JSON object with at least `id` and
//! `deleted`. Collections add their own fields on top; they are modelled as
//! [`RecordPayload`] types wrapping a [`CleartextPayload`].

use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

/// A decrypted payload.
#[derive(Debug, Clone, PartialEq)]
pub struct CleartextPayload {
    json: Result<Json, String>,
}

impl CleartextPayload {
    pub fn parse(raw: &str) -> Self {
        Self {
            json: serde_json::from_str(raw).map_err(|e| e.to_string()),
        }
    }

    pub fn from_value(json: Json) -> Self {
        Self { json: Ok(json) }
    }

    /// Parsed cleanly and `id` is present as a string or an explicit null.
    pub fn is_valid(&self) -> bool {
        self.json.is_ok() && matches!(self.get("id"), Some(Json::String(_) | Json::Null))
    }

    pub fn parse_error(&self) -> Option<&str> {
        self.json.as_ref().err().map(String::as_str)
    }

    /// The record id. `None` when absent, null or not a string.
    pub fn id(&self) -> Option<&str> {
        self.get("id").and_then(Json::as_str)
    }

    pub fn deleted(&self) -> bool {
        self.get("deleted").and_then(Json::as_bool).unwrap_or(false)
    }

    /// A record-specific field.
    pub fn get(&self, field: &str) -> Option<&Json> {
        self.json.as_ref().ok()?.get(field)
    }

    /// Payload equality compares the deletion state only; ids and content
    /// are not considered.
    pub fn equal_payloads(&self, other: &CleartextPayload) -> bool {
        self.deleted() == other.deleted()
    }

    pub fn to_json_string(&self) -> Option<String> {
        self.json.as_ref().ok().map(Json::to_string)
    }

    pub fn as_json(&self) -> Option<&Json> {
        self.json.as_ref().ok()
    }
}

/// A collection-specific payload.
///
/// Implementors only add checks: [`RecordPayload::is_valid`] always requires
/// the base cleartext check as well. Equality defaults to the base relation.
pub trait RecordPayload: Sized {
    fn from_cleartext(payload: CleartextPayload) -> Self;

    fn cleartext(&self) -> &CleartextPayload;

    /// Checks specific to this record type.
    fn is_record_valid(&self) -> bool {
        true
    }

    fn parse(raw: &str) -> Self {
        Self::from_cleartext(CleartextPayload::parse(raw))
    }

    fn is_valid(&self) -> bool {
        self.cleartext().is_valid() && self.is_record_valid()
    }

    fn equal_payloads(&self, other: &Self) -> bool {
        self.cleartext().equal_payloads(other.cleartext())
    }
}

impl RecordPayload for CleartextPayload {
    fn from_cleartext(payload: CleartextPayload) -> Self {
        payload
    }

    fn cleartext(&self) -> &CleartextPayload {
        self
    }
}

/// One visit in a history record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryVisit {
    /// Visit time in microseconds since the epoch
    pub date: u64,
    /// Transition type (link, typed, bookmark, ...)
    #[serde(rename = "type")]
    pub transition: u32,
}

/// A payload from the `history` collection.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryPayload {
    inner: CleartextPayload,
}

impl HistoryPayload {
    pub fn hist_uri(&self) -> Option<&str> {
        self.inner.get("histUri").and_then(Json::as_str)
    }

    pub fn title(&self) -> &str {
        self.inner.get("title").and_then(Json::as_str).unwrap_or("")
    }

    /// Visits that decode; malformed entries are skipped.
    pub fn visits(&self) -> Vec<HistoryVisit> {
        match self.inner.get("visits") {
            Some(Json::Array(items)) => items
                .iter()
                .filter_map(|v| HistoryVisit::deserialize(v).ok())
                .collect(),
            _ => Vec::new(),
        }
    }
}

impl RecordPayload for HistoryPayload {
    fn from_cleartext(payload: CleartextPayload) -> Self {
        Self { inner: payload }
    }

    fn cleartext(&self) -> &CleartextPayload {
        &self.inner
    }

    /// Tombstones carry no history fields.
    fn is_record_valid(&self) -> bool {
        if self.inner.deleted() {
            return true;
        }
        self.hist_uri().is_some()
            && matches!(self.inner.get("visits"), Some(Json::Array(_)))
            && matches!(self.inner.get("title"), None | Some(Json::String(_)))
    }

    fn equal_payloads(&self, other: &Self) -> bool {
        if !self.inner.equal_payloads(&other.inner) {
            return false;
        }
        self.inner.deleted() || (self.hist_uri() == other.hist_uri() && self.title() == other.title())
    }
}
