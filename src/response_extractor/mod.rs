//! ResponseExtractor - Structured payload extraction from model replies
//!
//! ## Responsibilities
//!
//! - Locate the first balanced `{ ... }` span in free-form text
//! - Parse it as JSON without judging its shape
//! - Report "nothing found" distinctly so callers can fall back
//!
//! The vision service is told to answer with JSON only, but replies often
//! arrive wrapped in prose or markdown fences.

use crate::error::{Error, Result};
use serde_json::Value;

/// Outcome of scanning a reply for a payload
#[derive(Debug, Clone, PartialEq)]
pub enum Extraction {
    /// A balanced span was found and parsed
    Payload(Value),
    /// A balanced span was found but is not valid JSON
    Malformed(String),
    /// No balanced span in the text
    NotFound,
}

impl Extraction {
    /// Parsed payload if any
    pub fn payload(&self) -> Option<&Value> {
        match self {
            Extraction::Payload(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Extraction::NotFound)
    }

    /// Payload, or `NoExtractablePayload` for malformed and missing spans
    pub fn into_payload(self) -> Result<Value> {
        match self {
            Extraction::Payload(value) => Ok(value),
            Extraction::Malformed(_) | Extraction::NotFound => Err(Error::NoExtractablePayload),
        }
    }
}

/// Scan `text` for the first balanced object span and try to parse it
pub fn extract(text: &str) -> Extraction {
    let Some(span) = find_balanced_span(text) else {
        tracing::debug!(text_len = text.len(), "No structured payload in reply");
        return Extraction::NotFound;
    };

    match serde_json::from_str::<Value>(span) {
        Ok(value) => Extraction::Payload(value),
        Err(e) => {
            tracing::warn!(
                error = %e,
                span_len = span.len(),
                "Structured payload span is not valid JSON"
            );
            Extraction::Malformed(e.to_string())
        }
    }
}

/// First outermost `{ ... }` span with matching braces.
///
/// Braces inside JSON string literals are ignored, escapes included.
/// If the first `{` never closes, the earliest `{` that does close wins.
/// Single pass over the text.
pub fn find_balanced_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut open: Vec<usize> = Vec::new();
    let mut earliest: Option<(usize, usize)> = None;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in text.as_bytes().iter().enumerate().skip(start) {
        if in_string {
            match b {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match b {
            b'"' => in_string = true,
            b'{' => open.push(i),
            b'}' => {
                let Some(from) = open.pop() else {
                    continue;
                };
                if open.is_empty() {
                    return Some(&text[from..=i]);
                }
                // Pairs nest or are disjoint, so the smallest start is outermost
                if earliest.map_or(true, |(first, _)| from < first) {
                    earliest = Some((from, i));
                }
            }
            _ => {}
        }
    }

    earliest.map(|(from, to)| &text[from..=to])
}
