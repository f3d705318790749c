//! Nested path parsing and navigation
//!
//! The mapping of records is located by a sequence of object keys. Callers may
//! give that sequence directly or as an RFC 6901 JSON Pointer.

use crate::error::{ExportError, Result};
use serde_json::{Map, Value};

/// Parse and validate a JSON Pointer according to RFC 6901
///
/// Returns a vector of unescaped tokens. Empty string returns empty vec (root).
pub fn parse_pointer(pointer: &str, max_length: usize, max_depth: usize) -> Result<Vec<String>> {
    if pointer.len() > max_length {
        return Err(ExportError::PointerTooLong {
            pointer: pointer.to_string(),
            length: pointer.len(),
            max_length,
        });
    }

    if pointer.is_empty() {
        return Ok(Vec::new());
    }

    if !pointer.starts_with('/') {
        return Err(ExportError::InvalidPointer {
            pointer: pointer.to_string(),
            reason: "Pointer must start with '/' (or be empty for root)".to_string(),
        });
    }

    let raw_tokens: Vec<&str> = pointer.split('/').skip(1).collect();

    if raw_tokens.len() > max_depth {
        return Err(ExportError::DepthLimitExceeded {
            pointer: pointer.to_string(),
            depth: raw_tokens.len(),
            max_depth,
        });
    }

    raw_tokens
        .into_iter()
        .map(|raw| -> Result<String> {
            validate_escape_sequences(raw).map_err(|reason| ExportError::InvalidPointer {
                pointer: pointer.to_string(),
                reason,
            })?;
            Ok(unescape_pointer_token(raw))
        })
        .collect()
}

/// Build a pointer string from raw (unescaped) segments
pub fn pointer_from_segments<S: AsRef<str>>(segments: &[S]) -> String {
    segments
        .iter()
        .map(|s| format!("/{}", escape_pointer_token(s.as_ref())))
        .collect()
}

/// Check a segment list against the depth limit
pub fn check_depth<S: AsRef<str>>(segments: &[S], max_depth: usize) -> Result<()> {
    if segments.len() > max_depth {
        return Err(ExportError::DepthLimitExceeded {
            pointer: pointer_from_segments(segments),
            depth: segments.len(),
            max_depth,
        });
    }
    Ok(())
}

/// Unescape a JSON Pointer token
///
/// - '~1' → '/'
/// - '~0' → '~'
pub fn unescape_pointer_token(token: &str) -> String {
    // ~1 first, otherwise "~01" would become "/"
    token.replace("~1", "/").replace("~0", "~")
}

/// Escape a string for use in a JSON Pointer
pub fn escape_pointer_token(token: &str) -> String {
    token.replace('~', "~0").replace('/', "~1")
}

fn validate_escape_sequences(token: &str) -> std::result::Result<(), String> {
    let mut chars = token.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == '~' {
            match chars.peek() {
                Some('0') | Some('1') => {
                    chars.next();
                }
                Some(other) => {
                    return Err(format!(
                        "Invalid escape sequence '~{}'. Use '~0' for '~' and '~1' for '/'.",
                        other
                    ));
                }
                None => {
                    return Err(
                        "Incomplete escape sequence at end of token. Use '~0' for '~' and '~1' for '/'.".to_string()
                    );
                }
            }
        }
    }
    Ok(())
}

/// Descend `segments` through nested objects and return the object at the end
///
/// Only object keys are followed. A missing key, or any value along the way
/// (including the final one) that is not an object, yields `PathNotFound`.
pub fn navigate<'a, S: AsRef<str>>(
    document: &'a Value,
    segments: &[S],
    original_pointer: &str,
) -> Result<&'a Map<String, Value>> {
    let mut current = document
        .as_object()
        .ok_or_else(|| ExportError::PathNotFound {
            pointer: original_pointer.to_string(),
            reached_path: String::new(),
            found_type: type_name(document).to_string(),
            available_keys: format!("<{}, cannot traverse further>", type_name(document)),
        })?;
    let mut path_so_far = String::new();

    for segment in segments {
        let segment = segment.as_ref();
        path_so_far.push('/');
        path_so_far.push_str(&escape_pointer_token(segment));

        let next = current
            .get(segment)
            .ok_or_else(|| ExportError::PathNotFound {
                pointer: original_pointer.to_string(),
                reached_path: path_so_far.clone(),
                found_type: "missing".to_string(),
                available_keys: describe_keys(current),
            })?;

        current = next.as_object().ok_or_else(|| ExportError::PathNotFound {
            pointer: original_pointer.to_string(),
            reached_path: path_so_far.clone(),
            found_type: type_name(next).to_string(),
            available_keys: format!("<{}, cannot traverse further>", type_name(next)),
        })?;
    }

    Ok(current)
}

fn describe_keys(map: &Map<String, Value>) -> String {
    let available: Vec<&str> = map.keys().take(10).map(|s| s.as_str()).collect();
    if map.len() > 10 {
        format!("{}, ... ({} total)", available.join(", "), map.len())
    } else if available.is_empty() {
        "<empty object>".to_string()
    } else {
        available.join(", ")
    }
}

/// Get a human-readable type name for a JSON value
pub(crate) fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
