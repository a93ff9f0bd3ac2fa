//! Decoding of decision-producer replies into [`Action`]s.
//!
//! Vision models are asked to reply with a single JSON object:
//!
//! ```json
//! {"type": "tap", "x": 0.25, "y": 0.75, "explanation": "open Notes"}
//! ```
//!
//! In practice replies arrive wrapped in Markdown code fences or surrounded by
//! prose.  [`decode_reply`] therefore works in two stages:
//!
//! 1. strip a surrounding code fence and try a strict parse of the whole reply;
//! 2. otherwise extract the first balanced `{…}` object and parse that.
//!
//! # Reply schema
//!
//! | `type`      | required fields |
//! |-------------|-----------------|
//! | `tap`       | `x`, `y`        |
//! | `doubleTap` | `x`, `y`        |
//! | `swipe`     | `dx`, `dy`      |
//! | `type`      | `text`          |
//! | `none`      | –               |
//! | `done`      | –               |
//!
//! `explanation` is optional everywhere.

use std::sync::OnceLock;

use regex::Regex;
use serde::Deserialize;
use thiserror::Error;

use crate::domain::action::{Action, NormalizedPoint};

/// Errors produced while decoding a reply.
#[derive(Debug, Error, PartialEq)]
pub enum DecodeError {
    /// The reply contains no JSON object at all.
    #[error("no JSON object in reply")]
    NoJson,

    /// A JSON object was found but could not be parsed.
    #[error("invalid JSON: {0}")]
    InvalidJson(String),

    /// The action type requires a field the reply did not provide.
    #[error("'{kind}' action is missing field '{field}'")]
    MissingField { kind: String, field: &'static str },

    /// The `type` value is not one of the known action types.
    #[error("unknown action type '{0}'")]
    UnknownType(String),
}

/// A decoded reply: the action plus the model's optional explanation.
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub action: Action,
    pub explanation: Option<String>,
}

impl Decision {
    pub fn new(action: Action) -> Self {
        Self {
            action,
            explanation: None,
        }
    }

    pub fn with_explanation(mut self, explanation: impl Into<String>) -> Self {
        self.explanation = Some(explanation.into());
        self
    }
}

#[derive(Debug, Deserialize)]
struct RawReply {
    #[serde(rename = "type")]
    kind: Option<String>,
    x: Option<f64>,
    y: Option<f64>,
    dx: Option<f64>,
    dy: Option<f64>,
    text: Option<String>,
    explanation: Option<String>,
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Decodes a raw model reply into a [`Decision`].
///
/// # Errors
///
/// Returns [`DecodeError`] if no usable JSON object is present or the object
/// does not describe a known action.
pub fn decode_reply(reply: &str) -> Result<Decision, DecodeError> {
    let body = strip_code_fence(reply.trim());

    let raw = match serde_json::from_str::<RawReply>(body) {
        Ok(raw) => raw,
        Err(strict_err) => {
            let candidate = first_balanced_object(body).ok_or_else(|| {
                if body.contains('{') {
                    DecodeError::InvalidJson(strict_err.to_string())
                } else {
                    DecodeError::NoJson
                }
            })?;
            serde_json::from_str::<RawReply>(candidate)
                .map_err(|e| DecodeError::InvalidJson(e.to_string()))?
        }
    };

    into_decision(raw)
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn fence_pattern() -> &'static Regex {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    FENCE.get_or_init(|| {
        Regex::new(r"(?s)^```[A-Za-z0-9_-]*\s*(.*?)\s*```$").expect("fence pattern is valid")
    })
}

fn strip_code_fence(reply: &str) -> &str {
    fence_pattern()
        .captures(reply)
        .and_then(|c| c.get(1))
        .map_or(reply, |m| m.as_str())
}

/// Returns the first `{…}` slice whose braces balance, ignoring braces inside
/// JSON string literals.
fn first_balanced_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in text[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + i + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

fn into_decision(raw: RawReply) -> Result<Decision, DecodeError> {
    let kind = raw.kind.ok_or(DecodeError::MissingField {
        kind: String::from("?"),
        field: "type",
    })?;
    let require = |value: Option<f64>, field: &'static str| {
        value.ok_or_else(|| DecodeError::MissingField {
            kind: kind.clone(),
            field,
        })
    };

    let action = match kind.to_ascii_lowercase().as_str() {
        "tap" => Action::Tap(NormalizedPoint::new(require(raw.x, "x")?, require(raw.y, "y")?)),
        "doubletap" | "double_tap" => {
            Action::DoubleTap(NormalizedPoint::new(require(raw.x, "x")?, require(raw.y, "y")?))
        }
        "swipe" => Action::Swipe {
            dx: require(raw.dx, "dx")?,
            dy: require(raw.dy, "dy")?,
        },
        "type" => Action::TypeText(raw.text.ok_or_else(|| DecodeError::MissingField {
            kind: kind.clone(),
            field: "text",
        })?),
        "none" => Action::None,
        "done" => Action::Done,
        _ => return Err(DecodeError::UnknownType(kind.clone())),
    };

    Ok(Decision {
        action,
        explanation: raw.explanation.filter(|e| !e.trim().is_empty()),
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
