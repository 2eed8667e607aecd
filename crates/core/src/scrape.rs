//! Tolerant extraction of structured JSON from model completions.
//!
//! Completions routinely arrive wrapped in markdown fences, prefixed with an
//! "Output:" label, or embedded in prose. This module recovers the payload
//! without knowing anything about the model that produced it.

use serde::de::DeserializeOwned;
use serde_json::Value;

/// Extracts the first JSON object from a completion, trying progressively
/// looser readings: fence/label stripping and a direct parse, then the first
/// balanced-brace substring.
pub fn scrape_object(text: &str) -> Option<Value> {
    let cleaned = strip_label(strip_fences(text)).trim();
    if cleaned.is_empty() {
        return None;
    }

    if let Ok(value) = serde_json::from_str::<Value>(cleaned) {
        if value.is_object() {
            return Some(value);
        }
    }

    let candidate = balanced_braces(cleaned)?;
    serde_json::from_str::<Value>(candidate).ok().filter(Value::is_object)
}

/// Typed variant of [`scrape_object`].
pub fn scrape_into<T: DeserializeOwned>(text: &str) -> Option<T> {
    let value = scrape_object(text)?;
    serde_json::from_value(value).ok()
}

fn strip_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop an optional language tag on the opening fence.
    let rest = match rest.split_once('\n') {
        Some((first_line, body)) if first_line.trim().chars().all(char::is_alphanumeric) => body,
        _ => rest,
    };
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

fn strip_label(text: &str) -> &str {
    let trimmed = text.trim();
    for label in ["output:", "Output:", "OUTPUT:", "json:", "JSON:"] {
        if let Some(rest) = trimmed.strip_prefix(label) {
            return rest.trim();
        }
    }
    trimmed
}

/// Returns the first top-level `{...}` span with balanced braces, honoring
/// string literals and escapes so braces inside values do not miscount.
fn balanced_braces(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, character) in text[start..].char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match character {
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}
