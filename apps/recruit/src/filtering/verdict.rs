//! Response Parser — turns raw model output into a typed `Verdict`.
//!
//! The model is asked for bare JSON but regularly wraps it in a markdown fence,
//! emits numbers as strings, or returns `null` / `""` for fields it could not
//! extract. Everything is coerced with fixed defaults; invalid output becomes a
//! non-match verdict instead of an error.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Reason recorded when the model output is not a JSON object.
pub const PARSE_FAILURE_REASON: &str = "parse failure";

/// Classification result for a single candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    #[serde(rename = "match")]
    pub is_match: bool,
    pub confidence: f64,
    pub reason: String,
    pub current_company: Option<String>,
    pub current_role: Option<String>,
    pub graduation_year: Option<String>,
}

impl Verdict {
    /// Non-match, zero-confidence verdict carrying a failure reason.
    pub fn failure(reason: impl Into<String>) -> Self {
        Self {
            is_match: false,
            confidence: 0.0,
            reason: reason.into(),
            current_company: None,
            current_role: None,
            graduation_year: None,
        }
    }

    /// True when this verdict clears `threshold` (inclusive).
    pub fn passes(&self, threshold: f64) -> bool {
        self.is_match && self.confidence >= threshold
    }
}

#[derive(Debug, Error)]
pub enum VerdictParseError {
    #[error("invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("expected a JSON object, got {0}")]
    NotAnObject(&'static str),
}

/// Parses model output, collapsing any failure into a non-match verdict.
pub fn parse_verdict(text: &str) -> Verdict {
    try_parse_verdict(text).unwrap_or_else(|_| Verdict::failure(PARSE_FAILURE_REASON))
}

/// Parses model output, reporting why it could not be read as a verdict.
pub fn try_parse_verdict(text: &str) -> Result<Verdict, VerdictParseError> {
    let body = strip_code_fence(text);
    let value: Value = serde_json::from_str(body)?;

    let Value::Object(fields) = value else {
        return Err(VerdictParseError::NotAnObject(json_kind(&value)));
    };

    Ok(Verdict {
        is_match: fields.get("match").and_then(Value::as_bool).unwrap_or(false),
        confidence: coerce_confidence(fields.get("confidence")),
        reason: coerce_reason(fields.get("reason")),
        current_company: extracted_field(&fields, "current_company"),
        current_role: extracted_field(&fields, "current_role"),
        graduation_year: extracted_field(&fields, "graduation_year"),
    })
}

/// Strips a leading ```` ``` ```` fence line (with any language tag) and a
/// trailing fence.
fn strip_code_fence(text: &str) -> &str {
    let text = text.trim();
    let Some(after_fence) = text.strip_prefix("```") else {
        return text;
    };

    let body = match after_fence.split_once('\n') {
        Some((_lang, rest)) => rest,
        None => after_fence,
    };

    body.strip_suffix("```").unwrap_or(body).trim()
}

fn coerce_confidence(value: Option<&Value>) -> f64 {
    let raw = match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse::<f64>().unwrap_or(0.0),
        Some(Value::Bool(true)) => 1.0,
        _ => 0.0,
    };
    if raw.is_nan() {
        0.0
    } else {
        raw.clamp(0.0, 1.0)
    }
}

fn coerce_reason(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        None | Some(Value::Null) => String::new(),
        Some(other) => other.to_string(),
    }
}

/// Best-effort extracted field: absent when missing or falsy.
fn extracted_field(fields: &Map<String, Value>, key: &str) -> Option<String> {
    match fields.get(key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) if n.as_f64() != Some(0.0) => Some(n.to_string()),
        Value::Bool(true) => Some("true".to_string()),
        _ => None,
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
