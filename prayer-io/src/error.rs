//! Error types for prayer export

use std::path::PathBuf;
use thiserror::Error;

/// Coarse classification of [`ExportError`] variants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Source content is not valid JSON
    Parse,
    /// The nested path does not resolve to an object
    NotFound,
    /// A mapping entry cannot be exported as a record
    Schema,
    /// Source unreadable or target directory unwritable
    Io,
    /// Invalid configuration or limits
    Config,
}

/// Errors that can occur while exporting records
#[derive(Debug, Error)]
pub enum ExportError {
    /// Source document larger than the configured buffer
    #[error(
        "Buffer limit exceeded: '{path}' is larger than {limit_bytes} bytes (read {buffered_bytes}).\n\
         \n\
         Suggested fixes:\n\
         1. Increase buffer: --max-buffer-bytes {suggested_size}\n\
         2. Split the source document before exporting"
    )]
    BufferLimitExceeded {
        /// Source document path
        path: PathBuf,
        /// Maximum buffer size allowed (bytes)
        limit_bytes: usize,
        /// Bytes read when the limit was hit
        buffered_bytes: usize,
        /// Suggested buffer size for this input
        suggested_size: usize,
    },

    /// Pointer depth limit exceeded
    #[error(
        "Pointer depth limit exceeded: '{pointer}' has depth {depth} (max: {max_depth}).\n\
         \n\
         Raise limits.max_depth in the configuration file if the nesting is legitimate."
    )]
    DepthLimitExceeded {
        /// Pointer being processed
        pointer: String,
        /// Actual depth of the pointer
        depth: usize,
        /// Maximum depth allowed
        max_depth: usize,
    },

    /// Pointer string too long
    #[error("Pointer too long: {length} characters (max: {max_length}).")]
    PointerTooLong {
        /// The pointer string that exceeded the limit
        pointer: String,
        /// Actual length (bytes)
        length: usize,
        /// Maximum length allowed
        max_length: usize,
    },

    /// Invalid pointer syntax
    #[error(
        "Invalid JSON Pointer syntax: '{pointer}' - {reason}\n\
         \n\
         JSON Pointers must:\n\
         - Start with '/' (or be empty string for root)\n\
         - Use '~0' to escape '~' and '~1' to escape '/'\n\
         \n\
         See RFC 6901 for details."
    )]
    InvalidPointer {
        /// The invalid pointer string
        pointer: String,
        /// Why the pointer is invalid
        reason: String,
    },

    /// Nested path missing or not an object
    #[error(
        "Path not found: '{pointer}' does not resolve to an object.\n\
         \n\
         Reached: '{reached_path}' ({found_type})\n\
         Available keys at this level: {available_keys}"
    )]
    PathNotFound {
        /// Full pointer that was requested
        pointer: String,
        /// Path navigated up to and including the failing segment
        reached_path: String,
        /// Type found at the failure point ("missing" if the key is absent)
        found_type: String,
        /// Keys available at the failure point
        available_keys: String,
    },

    /// Mapping entry is not an object
    #[error(
        "Record not an object: identifier '{identifier}' points to {found_type}, expected object.\n\
         \n\
         Every entry of the exported mapping must be an object so the identifier\n\
         field can be injected."
    )]
    RecordNotObject {
        /// Mapping key of the offending entry
        identifier: String,
        /// Actual type found
        found_type: String,
    },

    /// Identifier cannot be used as a file name
    #[error(
        "Unsafe identifier: '{identifier}' cannot be used as a file name - {reason}.\n\
         \n\
         Rename the entry in the source document; nothing was written."
    )]
    UnsafeIdentifier {
        /// The rejected identifier
        identifier: String,
        /// Why it was rejected
        reason: String,
    },

    /// Identifier field already present while collisions are errors
    #[error(
        "Identifier field collision: field '{field}' already exists in record '{identifier}'.\n\
         \n\
         Suggested fixes:\n\
         1. Choose a different field: --identifier-field <field>\n\
         2. Allow overwriting: --on-collision overwrite"
    )]
    IdentifierFieldCollision {
        /// Field name that collided
        field: String,
        /// Identifier of the record
        identifier: String,
    },

    /// Target directory does not exist
    #[error(
        "Target directory '{path}' does not exist or is not a directory.\n\
         \n\
         The exporter never creates directories; create it first."
    )]
    TargetDirMissing {
        /// Target directory path
        path: PathBuf,
    },

    /// JSON parsing error
    #[error("JSON parse error: {context} - {source}")]
    JsonParse {
        /// Where parsing failed
        context: String,
        /// Underlying serde_json error
        source: serde_json::Error,
    },

    /// Record serialization error
    #[error("Failed to serialize record '{identifier}': {source}")]
    Serialize {
        /// Identifier of the record
        identifier: String,
        /// Underlying serde_json error
        source: serde_json::Error,
    },

    /// I/O error on a specific path
    #[error("I/O error on '{path}': {source}")]
    Io {
        /// Path being read or written
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// Configuration file could not be parsed or is inconsistent
    #[error("Invalid configuration: {reason}")]
    Config {
        /// Explanation
        reason: String,
    },

    /// Configuration exceeds hard limits
    #[error(
        "Configuration exceeds hard limits: {reason}\n\
         \n\
         Hard limits:\n\
         - max_depth: {max_depth}\n\
         - max_pointer_length: {max_pointer_length} characters\n\
         - max_buffer_bytes: {max_buffer} bytes\n\
         - max_identifier_length: {max_identifier_length} bytes"
    )]
    ConfigurationExceedsHardLimits {
        /// Which limit was exceeded
        reason: String,
        /// Hard maximum depth
        max_depth: usize,
        /// Hard maximum pointer length
        max_pointer_length: usize,
        /// Hard maximum buffer size (bytes)
        max_buffer: usize,
        /// Hard maximum identifier length (bytes)
        max_identifier_length: usize,
    },
}

impl ExportError {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            ExportError::JsonParse { .. } => ErrorKind::Parse,
            ExportError::PathNotFound { .. } => ErrorKind::NotFound,
            ExportError::RecordNotObject { .. }
            | ExportError::UnsafeIdentifier { .. }
            | ExportError::IdentifierFieldCollision { .. }
            | ExportError::Serialize { .. } => ErrorKind::Schema,
            ExportError::Io { .. }
            | ExportError::TargetDirMissing { .. }
            | ExportError::BufferLimitExceeded { .. } => ErrorKind::Io,
            ExportError::DepthLimitExceeded { .. }
            | ExportError::PointerTooLong { .. }
            | ExportError::InvalidPointer { .. }
            | ExportError::Config { .. }
            | ExportError::ConfigurationExceedsHardLimits { .. } => ErrorKind::Config,
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ExportError::Io {
            path: path.into(),
            source,
        }
    }

    /// Suggest a buffer size with a 50% margin
    pub fn suggest_buffer_size(current_bytes: usize) -> usize {
        (current_bytes as f64 * 1.5).ceil() as usize
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, ExportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suggest_buffer_size_adds_margin() {
        assert_eq!(ExportError::suggest_buffer_size(10_000_000), 15_000_000);
    }

    #[test]
    fn kinds_follow_taxonomy() {
        let err = ExportError::RecordNotObject {
            identifier: "a1".into(),
            found_type: "string".into(),
        };
        assert_eq!(err.kind(), ErrorKind::Schema);

        let err = ExportError::PathNotFound {
            pointer: "/2-0rwa/sub-prayers".into(),
            reached_path: "/2-0rwa/sub-prayers".into(),
            found_type: "missing".into(),
            available_keys: "title".into(),
        };
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(err.to_string().contains("Available keys at this level: title"));

        let err = ExportError::TargetDirMissing {
            path: PathBuf::from("/nope"),
        };
        assert_eq!(err.kind(), ErrorKind::Io);
    }
}
