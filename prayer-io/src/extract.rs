//! Keyed map extraction
//!
//! Turns an object-of-objects into a list of records, injecting each map key
//! into its record under the identifier field.

use crate::config::{ExportLimits, KeyCollisionMode};
use crate::error::{ExportError, Result};
use crate::pointer::{navigate, type_name};
use serde_json::{Map, Value};
use std::collections::HashMap;
use tracing::{debug, warn};

/// One exportable entry of the nested mapping
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// Mapping key; also the output file stem
    pub identifier: String,
    /// Record fields, identifier field included
    pub body: Map<String, Value>,
}

/// Options controlling identifier injection
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// Field that receives the identifier
    pub identifier_field: String,
    /// Behaviour when the field is already present
    pub collision_mode: KeyCollisionMode,
    /// Limits (only `max_identifier_length` is consulted here)
    pub limits: ExportLimits,
}

/// Navigate to the mapping at `segments` and build one record per entry
///
/// All entries are validated before this returns, so callers can write files
/// knowing the whole mapping is exportable.
pub fn extract_records<S: AsRef<str>>(
    document: &Value,
    segments: &[S],
    pointer: &str,
    options: &ExtractOptions,
) -> Result<Vec<Record>> {
    let mapping = navigate(document, segments, pointer)?;
    debug!(pointer, entries = mapping.len(), "located record mapping");

    let mut records = Vec::with_capacity(mapping.len());
    // lowercase form -> identifier already using it
    let mut folded: HashMap<String, &str> = HashMap::with_capacity(mapping.len());
    for (identifier, value) in mapping {
        let mut body = value
            .as_object()
            .ok_or_else(|| ExportError::RecordNotObject {
                identifier: identifier.clone(),
                found_type: type_name(value).to_string(),
            })?
            .clone();

        validate_identifier(identifier, options.limits.max_identifier_length)?;
        if let Some(other) = folded.insert(identifier.to_lowercase(), identifier.as_str()) {
            return Err(ExportError::UnsafeIdentifier {
                identifier: identifier.clone(),
                reason: format!(
                    "identifier differs only by letter case from '{}'",
                    other
                ),
            });
        }

        let field = &options.identifier_field;
        if let Some(existing) = body.get(field) {
            match options.collision_mode {
                KeyCollisionMode::Error => {
                    return Err(ExportError::IdentifierFieldCollision {
                        field: field.clone(),
                        identifier: identifier.clone(),
                    });
                }
                KeyCollisionMode::Overwrite => {
                    if existing.as_str() != Some(identifier.as_str()) {
                        warn!(
                            identifier = %identifier,
                            field = %field,
                            previous = %existing,
                            "overwriting existing identifier field"
                        );
                    }
                }
            }
        }
        body.insert(field.clone(), Value::String(identifier.clone()));

        records.push(Record {
            identifier: identifier.clone(),
            body,
        });
    }

    Ok(records)
}

/// Characters some filesystems refuse in file names
const RESERVED_CHARS: [char; 7] = [':', '*', '?', '"', '<', '>', '|'];

/// Reject identifiers that cannot serve as a plain file stem
pub fn validate_identifier(identifier: &str, max_length: usize) -> Result<()> {
    let reason = if identifier.is_empty() {
        Some("identifier is empty".to_string())
    } else if identifier == "." || identifier == ".." {
        Some("identifier is a relative directory name".to_string())
    } else if identifier.contains(['/', '\\']) {
        Some("identifier contains a path separator".to_string())
    } else if identifier.contains('\0') {
        Some("identifier contains a NUL byte".to_string())
    } else if let Some(ch) = identifier.chars().find(|c| RESERVED_CHARS.contains(c)) {
        Some(format!("identifier contains reserved character '{}'", ch))
    } else if identifier.len() > max_length {
        Some(format!(
            "identifier is {} bytes long (max: {})",
            identifier.len(),
            max_length
        ))
    } else {
        None
    };

    match reason {
        Some(reason) => Err(ExportError::UnsafeIdentifier {
            identifier: identifier.to_string(),
            reason,
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn options() -> ExtractOptions {
        ExtractOptions {
            identifier_field: "prayer-id".to_string(),
            collision_mode: KeyCollisionMode::Overwrite,
            limits: ExportLimits::default(),
        }
    }

    const PATH: [&str; 2] = ["2-0rwa", "sub-prayers"];

    #[test]
    fn injects_identifier_after_original_fields() {
        let doc = json!({
            "2-0rwa": {
                "sub-prayers": {
                    "a1": {"title": "X"},
                    "a2": {"title": "Y"}
                }
            }
        });

        let records = extract_records(&doc, &PATH, "/2-0rwa/sub-prayers", &options()).unwrap();
        assert_eq!(records.len(), 2);

        let a1 = records.iter().find(|r| r.identifier == "a1").unwrap();
        assert_eq!(Value::Object(a1.body.clone()), json!({"title": "X", "prayer-id": "a1"}));
        let keys: Vec<&str> = a1.body.keys().map(|k| k.as_str()).collect();
        assert_eq!(keys, vec!["title", "prayer-id"]);
    }

    #[test]
    fn rejects_non_object_entries() {
        let doc = json!({
            "2-0rwa": {
                "sub-prayers": {
                    "a1": {"title": "X"},
                    "a2": "not a record"
                }
            }
        });

        let result = extract_records(&doc, &PATH, "/2-0rwa/sub-prayers", &options());
        assert!(matches!(
            result,
            Err(ExportError::RecordNotObject { ref identifier, ref found_type })
                if identifier == "a2" && found_type == "string"
        ));
    }

    #[test]
    fn overwrite_mode_replaces_existing_field() {
        let doc = json!({"m": {"a1": {"prayer-id": "stale", "title": "X"}}});
        let records = extract_records(&doc, &["m"], "/m", &options()).unwrap();
        assert_eq!(records[0].body["prayer-id"], json!("a1"));
        let keys: Vec<&str> = records[0].body.keys().map(|k| k.as_str()).collect();
        assert_eq!(keys, vec!["prayer-id", "title"]);
    }

    #[test]
    fn error_mode_rejects_existing_field() {
        let doc = json!({"m": {"a1": {"prayer-id": "stale"}}});
        let mut opts = options();
        opts.collision_mode = KeyCollisionMode::Error;
        let result = extract_records(&doc, &["m"], "/m", &opts);
        assert!(matches!(
            result,
            Err(ExportError::IdentifierFieldCollision { .. })
        ));
    }

    #[test]
    fn empty_mapping_yields_no_records() {
        let doc = json!({"m": {}});
        let records = extract_records(&doc, &["m"], "/m", &options()).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn rejects_path_separators_in_identifiers() {
        let doc = json!({"m": {"../escape": {"title": "X"}}});
        let result = extract_records(&doc, &["m"], "/m", &options());
        assert!(matches!(result, Err(ExportError::UnsafeIdentifier { .. })));
    }

    #[test]
    fn validate_identifier_cases() {
        assert!(validate_identifier("a1", 200).is_ok());
        assert!(validate_identifier("ברכות", 200).is_ok());
        assert!(validate_identifier("2-0rwa-()-birchot", 200).is_ok());
        assert!(validate_identifier("", 200).is_err());
        assert!(validate_identifier(".", 200).is_err());
        assert!(validate_identifier("..", 200).is_err());
        assert!(validate_identifier("a\\b", 200).is_err());
        assert!(validate_identifier("a\0b", 200).is_err());
        assert!(validate_identifier(&"x".repeat(201), 200).is_err());
        for reserved in ["a:b", "a*", "what?", "say\"hi\"", "<a>", "a|b"] {
            assert!(
                matches!(
                    validate_identifier(reserved, 200),
                    Err(ExportError::UnsafeIdentifier { .. })
                ),
                "{reserved} should be rejected"
            );
        }
    }

    #[test]
    fn rejects_identifiers_differing_only_by_case() {
        let doc = json!({"m": {"a1": {"title": "X"}, "A1": {"title": "Y"}}});
        let result = extract_records(&doc, &["m"], "/m", &options());
        assert!(matches!(
            result,
            Err(ExportError::UnsafeIdentifier { ref identifier, ref reason })
                if identifier == "A1" && reason.contains("'a1'")
        ));
    }

    #[test]
    fn keeps_big_numbers_verbatim() {
        let doc: Value = serde_json::from_str(
            r#"{"m": {"a1": {"n": 123456789012345678901234567890, "f": 1.10}}}"#,
        )
        .unwrap();
        let records = extract_records(&doc, &["m"], "/m", &options()).unwrap();
        assert_eq!(records[0].body["n"].to_string(), "123456789012345678901234567890");
        assert_eq!(records[0].body["f"].to_string(), "1.10");
    }
}
