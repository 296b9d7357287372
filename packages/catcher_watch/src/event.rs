//! Decoding of request notifications pushed by the catcher feed.

use std::borrow::Cow;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Timelike};
use serde_json::{Map, Value};

use crate::error::DecodeError;

/// Offset-aware layouts tried after RFC 3339.
const AWARE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M%:z", "%Y-%m-%dT%H:%M:%S%.f%z"];

/// Naive layouts, tried once nothing offset-aware matched.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
];

/// Value of one request header: the service sends lists, older payloads a
/// bare string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderValue {
    Single(String),
    List(Vec<String>),
}

impl HeaderValue {
    /// Display form; list items are joined with `", "` in order.
    pub fn joined(&self) -> Cow<'_, str> {
        match self {
            HeaderValue::Single(v) => Cow::Borrowed(v),
            HeaderValue::List(items) => Cow::Owned(items.join(", ")),
        }
    }
}

/// One observed HTTP request, as announced by the feed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestEvent {
    /// Raw timestamp string; `None` when absent, null or empty.
    pub time: Option<String>,
    pub host: String,
    pub method: String,
    pub path: String,
    pub remote_addr: String,
    pub content_length: i64,
    /// Headers in the order they appeared in the message.
    pub headers: Vec<(String, HeaderValue)>,
    pub body: String,
}

impl RequestEvent {
    /// Decode a feed message. Anything that is not a JSON object is an error;
    /// fields of unexpected types are coerced rather than rejected.
    pub fn from_json(text: &str) -> Result<Self, DecodeError> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self, DecodeError> {
        let mut map = match value {
            Value::Object(map) => map,
            other => return Err(DecodeError::NotAnObject(json_kind(&other))),
        };

        let time = map
            .remove("time")
            .map(|v| value_text(&v))
            .filter(|t| !t.is_empty());

        Ok(Self {
            time,
            host: take_text(&mut map, "host"),
            method: take_text(&mut map, "method"),
            path: take_text(&mut map, "path"),
            remote_addr: take_text(&mut map, "remote_addr"),
            content_length: map
                .get("content_length")
                .and_then(content_length)
                .unwrap_or(0),
            headers: match map.remove("headers") {
                Some(Value::Object(headers)) => headers
                    .into_iter()
                    .map(|(name, value)| (name, header_value(value)))
                    .collect(),
                _ => Vec::new(),
            },
            body: take_text(&mut map, "body"),
        })
    }

    /// Timestamp in normalized form, or empty when the event carries none.
    pub fn display_time(&self) -> String {
        self.time
            .as_deref()
            .map(normalize_timestamp)
            .unwrap_or_default()
    }
}

fn take_text(map: &mut Map<String, Value>, key: &str) -> String {
    map.remove(key).map(|v| value_text(&v)).unwrap_or_default()
}

/// Strings verbatim, `null` as empty, everything else as its JSON text.
fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn content_length(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn header_value(value: Value) -> HeaderValue {
    match value {
        Value::Array(items) => HeaderValue::List(items.iter().map(value_text).collect()),
        other => HeaderValue::Single(value_text(&other)),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Re-serialize an ISO-8601 timestamp in canonical form
/// (`YYYY-MM-DDTHH:MM:SS[.ffffff][+HH:MM]`). A trailing `Z` reads as UTC.
/// Input that does not parse, including a leap second (`:60`), is returned
/// unchanged.
pub fn normalize_timestamp(raw: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }

    let candidate = match raw.strip_suffix('Z') {
        Some(head) => Cow::Owned(format!("{head}+00:00")),
        None => Cow::Borrowed(raw),
    };

    if let Some(dt) = parse_aware(&candidate).filter(|dt| !is_leap_second(dt.nanosecond())) {
        return format!("{}{}", iso_naive(&dt.naive_local()), dt.format("%:z"));
    }
    if let Some(dt) = parse_naive(&candidate).filter(|dt| !is_leap_second(dt.nanosecond())) {
        return iso_naive(&dt);
    }
    raw.to_string()
}

fn parse_aware(s: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(s).ok().or_else(|| {
        AWARE_FORMATS
            .iter()
            .find_map(|fmt| DateTime::parse_from_str(s, fmt).ok())
    })
}

fn parse_naive(s: &str) -> Option<NaiveDateTime> {
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

// chrono encodes `:60` as a nanosecond value past one second.
fn is_leap_second(nanos: u32) -> bool {
    nanos >= 1_000_000_000
}

fn iso_naive(dt: &NaiveDateTime) -> String {
    // Microsecond precision; sub-microsecond digits are dropped.
    let micros = dt.nanosecond() / 1_000;
    let base = dt.format("%Y-%m-%dT%H:%M:%S");
    if micros == 0 {
        base.to_string()
    } else {
        format!("{base}.{micros:06}")
    }
}
