//! Export configuration and limits

use crate::error::{ExportError, Result};
use crate::pointer::{check_depth, parse_pointer};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Source document used when nothing else is configured
pub const DEFAULT_SOURCE: &str =
    "prayer/prayer-database/2-beis-prayers/2-0rwa-()-birchot-hashachar.json";
/// Target directory used when nothing else is configured
pub const DEFAULT_TARGET_DIR: &str = "prayer/prayer-database/2-beis-prayers/birchot-hashachar";
/// Nested path used when nothing else is configured
pub const DEFAULT_SEGMENTS: [&str; 2] = ["2-0rwa", "sub-prayers"];
/// Field that receives each record's identifier
pub const DEFAULT_IDENTIFIER_FIELD: &str = "prayer-id";

/// What to do when a record already carries the identifier field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyCollisionMode {
    /// Replace the existing value with the identifier
    #[default]
    Overwrite,
    /// Abort the export
    Error,
}

/// Resource limits applied while exporting
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExportLimits {
    /// Maximum nested path depth
    pub max_depth: usize,
    /// Maximum pointer string length (bytes)
    pub max_pointer_length: usize,
    /// Maximum source document size (bytes)
    pub max_buffer_bytes: usize,
    /// Maximum identifier length (bytes); identifiers become file names
    pub max_identifier_length: usize,
}

impl Default for ExportLimits {
    fn default() -> Self {
        Self {
            max_depth: 8,
            max_pointer_length: 256,
            max_buffer_bytes: 64 * 1024 * 1024, // 64 MiB
            max_identifier_length: 200,
        }
    }
}

impl ExportLimits {
    /// Hard maximum limits that cannot be exceeded
    pub fn hard_maximums() -> Self {
        Self {
            max_depth: 32,
            max_pointer_length: 2048,
            max_buffer_bytes: 512 * 1024 * 1024, // 512 MiB
            max_identifier_length: 255,
        }
    }

    /// Validate limits against hard maximums
    pub fn validate(&self) -> Result<()> {
        let hard = Self::hard_maximums();
        let checks = [
            ("max_depth", self.max_depth, hard.max_depth),
            (
                "max_pointer_length",
                self.max_pointer_length,
                hard.max_pointer_length,
            ),
            (
                "max_buffer_bytes",
                self.max_buffer_bytes,
                hard.max_buffer_bytes,
            ),
            (
                "max_identifier_length",
                self.max_identifier_length,
                hard.max_identifier_length,
            ),
        ];

        for (name, value, max) in checks {
            if value > max {
                return Err(ExportError::ConfigurationExceedsHardLimits {
                    reason: format!("{} {} exceeds hard limit {}", name, value, max),
                    max_depth: hard.max_depth,
                    max_pointer_length: hard.max_pointer_length,
                    max_buffer: hard.max_buffer_bytes,
                    max_identifier_length: hard.max_identifier_length,
                });
            }
        }

        Ok(())
    }
}

/// Export configuration as read from a TOML file
///
/// Every field is optional; missing values fall back to the defaults above.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExportConfig {
    /// Source document path
    pub source: Option<PathBuf>,
    /// Directory receiving one file per record
    pub target_dir: Option<PathBuf>,
    /// Nested path as an RFC 6901 pointer
    pub pointer: Option<String>,
    /// Nested path as raw segments
    pub segments: Option<Vec<String>>,
    /// Field that receives the identifier
    pub identifier_field: Option<String>,
    /// Behaviour when the identifier field already exists
    pub on_collision: Option<KeyCollisionMode>,
    /// Resolve everything but skip the writes
    pub dry_run: Option<bool>,
    /// Resource limits
    pub limits: ExportLimits,
}

impl ExportConfig {
    /// Parse a configuration document
    pub fn from_toml_str(input: &str) -> Result<Self> {
        let config: ExportConfig = toml::from_str(input).map_err(|e| ExportError::Config {
            reason: e.to_string(),
        })?;
        config.check()?;
        Ok(config)
    }

    /// Read and parse a configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| ExportError::io(path, e))?;
        Self::from_toml_str(&contents).map_err(|e| match e {
            ExportError::Config { reason } => ExportError::Config {
                reason: format!("{}: {}", path.display(), reason),
            },
            other => other,
        })
    }

    fn check(&self) -> Result<()> {
        if self.pointer.is_some() && self.segments.is_some() {
            return Err(ExportError::Config {
                reason: "'pointer' and 'segments' are mutually exclusive".to_string(),
            });
        }
        if matches!(self.identifier_field.as_deref(), Some("")) {
            return Err(ExportError::Config {
                reason: "'identifier_field' must not be empty".to_string(),
            });
        }
        self.limits.validate()
    }

    /// Resolve the nested path to raw segments
    pub fn resolve_segments(&self) -> Result<Vec<String>> {
        let segments = match (&self.pointer, &self.segments) {
            (Some(pointer), _) => parse_pointer(
                pointer,
                self.limits.max_pointer_length,
                self.limits.max_depth,
            )?,
            (None, Some(segments)) => segments.clone(),
            (None, None) => DEFAULT_SEGMENTS.iter().map(|s| s.to_string()).collect(),
        };
        check_depth(&segments, self.limits.max_depth)?;
        Ok(segments)
    }

    /// Source path, or the default
    pub fn source_or_default(&self) -> PathBuf {
        self.source
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SOURCE))
    }

    /// Target directory, or the default
    pub fn target_dir_or_default(&self) -> PathBuf {
        self.target_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_TARGET_DIR))
    }

    /// Identifier field, or the default
    pub fn identifier_field_or_default(&self) -> String {
        self.identifier_field
            .clone()
            .unwrap_or_else(|| DEFAULT_IDENTIFIER_FIELD.to_string())
    }
}
