//! Entity hydration helpers.
//!
//! Every domain entity is constructed from a server payload that is either
//! a JSON record or a string containing a serialized record. [`coerce`]
//! normalizes both shapes into a field map; the typed accessor helpers pull
//! canonical values out of it, tolerating the loose typing of forum wire
//! payloads (numeric strings for ids, 0/1 flags for booleans, epoch
//! milliseconds for timestamps).

use chrono::{DateTime, TimeZone, Utc};
use serde_json::{Map, Value};

use crate::error::{ParseError, ParseResult};

/// Normalizes a raw payload into a field map.
///
/// String payloads are deserialized first; record payloads are used as-is.
/// Empty payloads (null, `false`, `0`, `""`) fail with
/// [`ParseError::EmptyPayload`]; present payloads of any other
/// non-record shape fail with [`ParseError::BadPayload`].
pub fn coerce(payload: Value) -> ParseResult<Map<String, Value>> {
    match payload {
        Value::Object(map) => Ok(map),
        Value::String(text) => {
            if text.is_empty() {
                return Err(ParseError::EmptyPayload);
            }
            let inner: Value = serde_json::from_str(&text)
                .map_err(|e| ParseError::BadPayload(e.to_string()))?;
            coerce(inner)
        }
        Value::Null => Err(ParseError::EmptyPayload),
        Value::Bool(false) => Err(ParseError::EmptyPayload),
        Value::Number(n) if n.as_f64() == Some(0.0) => Err(ParseError::EmptyPayload),
        other => Err(ParseError::BadPayload(format!(
            "expected a record, got {other}"
        ))),
    }
}

/// Like [`coerce`], but upgrades "empty payload" to the kind-specific
/// not-found error. Used by the static `parse` factories.
pub fn coerce_for(kind: &'static str, payload: Value) -> ParseResult<Map<String, Value>> {
    coerce(payload).map_err(|e| e.for_kind(kind))
}

/// Reads an integer field, accepting numbers and numeric strings.
///
/// Absent or unusable values default to 0 (forum payloads routinely omit
/// ids that do not apply).
pub fn int(map: &Map<String, Value>, key: &str) -> i64 {
    match map.get(key) {
        Some(Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)).unwrap_or(0),
        Some(Value::String(s)) => s.parse().unwrap_or(0),
        _ => 0,
    }
}

/// Reads a string field, rendering numbers as text. Absent values are "".
pub fn string(map: &Map<String, Value>, key: &str) -> String {
    match map.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

/// Reads a flag field with strict coercion: boolean `true` or numeric 1
/// count as set; everything else (including junk values) is unset.
pub fn flag(map: &Map<String, Value>, key: &str) -> bool {
    match map.get(key) {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64() == Some(1.0),
        _ => false,
    }
}

/// Reads an epoch-milliseconds field as a UTC timestamp.
pub fn timestamp(map: &Map<String, Value>, key: &str) -> Option<DateTime<Utc>> {
    let millis = match map.get(key) {
        Some(Value::Number(n)) => n.as_i64()?,
        Some(Value::String(s)) => s.parse().ok()?,
        _ => return None,
    };
    Utc.timestamp_millis_opt(millis).single()
}

/// Strips markup tags from content, leaving the text between them.
pub fn strip_markup(content: &str) -> String {
    let mut out = String::with_capacity(content.len());
    let mut in_tag = false;
    for c in content.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            c if !in_tag => out.push(c),
            _ => {}
        }
    }
    out
}

/// Unescapes the HTML entities the forum uses in notification bodies.
pub fn unescape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(idx) = rest.find('&') {
        out.push_str(&rest[..idx]);
        rest = &rest[idx..];
        let replaced = [
            ("&amp;", "&"),
            ("&lt;", "<"),
            ("&gt;", ">"),
            ("&quot;", "\""),
            ("&#x27;", "'"),
            ("&#39;", "'"),
            ("&#x2F;", "/"),
        ]
        .iter()
        .find(|(entity, _)| rest.starts_with(entity));
        match replaced {
            Some((entity, ch)) => {
                out.push_str(ch);
                rest = &rest[entity.len()..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}
