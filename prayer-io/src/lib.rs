//! Prayer I/O - split an aggregate prayer document into record files
//!
//! A source document holds a nested mapping of identifier → record, for
//! example `{"2-0rwa": {"sub-prayers": {"a1": {...}, "a2": {...}}}}`. The
//! exporter locates that mapping, writes the identifier into each record and
//! stores every record as `<target_dir>/<identifier>.json`.
//!
//! - [`export`]: the plain operation with default options
//! - [`execute_export`]: request/summary form used by the CLI
//!
//! Any failure aborts the run. Records are fully extracted and validated
//! before the first file is written, but files written before an I/O error
//! stay on disk.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod extract;
pub mod pointer;
pub mod writer;

pub use config::{ExportConfig, ExportLimits, KeyCollisionMode};
pub use error::{ErrorKind, ExportError, Result};
pub use extract::{extract_records, ExtractOptions, Record};
pub use writer::{render_record, RecordWriter, WrittenRecord};

use pointer::pointer_from_segments;
use serde::Serialize;
use serde_json::Value;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Export options beyond the four core inputs
#[derive(Debug, Clone, Default)]
pub struct ExportOptions {
    /// Behaviour when a record already has the identifier field
    pub collision_mode: KeyCollisionMode,
    /// Resolve and serialize everything but write nothing
    pub dry_run: bool,
    /// Resource limits
    pub limits: ExportLimits,
}

/// A complete export request
#[derive(Debug, Clone)]
pub struct ExportRequest {
    /// Source document
    pub source: PathBuf,
    /// Keys to descend to reach the record mapping
    pub segments: Vec<String>,
    /// Existing directory receiving the record files
    pub target_dir: PathBuf,
    /// Field that receives each record's identifier
    pub identifier_field: String,
    /// Additional options
    pub options: ExportOptions,
}

impl ExportRequest {
    /// Build a request from a resolved configuration
    pub fn from_config(config: &ExportConfig) -> Result<Self> {
        Ok(Self {
            source: config.source_or_default(),
            segments: config.resolve_segments()?,
            target_dir: config.target_dir_or_default(),
            identifier_field: config.identifier_field_or_default(),
            options: ExportOptions {
                collision_mode: config.on_collision.unwrap_or_default(),
                dry_run: config.dry_run.unwrap_or(false),
                limits: config.limits.clone(),
            },
        })
    }
}

/// Outcome of an export
#[derive(Debug, Clone, Serialize)]
pub struct ExportSummary {
    /// Files actually written (0 in a dry run)
    pub records_written: usize,
    /// Entries found in the mapping
    pub records_found: usize,
    /// Size of the source document
    pub source_bytes: usize,
    /// Directory the records went to
    pub target_dir: PathBuf,
    /// Whether this was a dry run
    pub dry_run: bool,
    /// Per-record detail, in mapping order
    pub written: Vec<WrittenRecord>,
    /// Wall-clock time spent
    #[serde(with = "duration_secs")]
    pub duration: Duration,
}

/// Export every record under `segments` in `source_path` into `target_dir`
///
/// Returns the number of files written.
pub fn export<S: AsRef<str>>(
    source_path: impl AsRef<Path>,
    segments: &[S],
    target_dir: impl AsRef<Path>,
    identifier_field: &str,
) -> Result<usize> {
    let request = ExportRequest {
        source: source_path.as_ref().to_path_buf(),
        segments: segments.iter().map(|s| s.as_ref().to_string()).collect(),
        target_dir: target_dir.as_ref().to_path_buf(),
        identifier_field: identifier_field.to_string(),
        options: ExportOptions::default(),
    };
    Ok(execute_export(request)?.records_written)
}

/// Run an export request
pub fn execute_export(request: ExportRequest) -> Result<ExportSummary> {
    execute_export_with_progress(request, |_| {})
}

/// Run an export request, calling `on_record` after each record is handled
pub fn execute_export_with_progress<F>(
    request: ExportRequest,
    mut on_record: F,
) -> Result<ExportSummary>
where
    F: FnMut(&WrittenRecord),
{
    let start = Instant::now();
    let ExportRequest {
        source,
        segments,
        target_dir,
        identifier_field,
        options,
    } = request;

    options.limits.validate()?;
    pointer::check_depth(&segments, options.limits.max_depth)?;
    if identifier_field.is_empty() {
        return Err(ExportError::Config {
            reason: "identifier field must not be empty".to_string(),
        });
    }

    let pointer = pointer_from_segments(&segments);
    let (document, source_bytes) = read_document(&source, options.limits.max_buffer_bytes)?;
    debug!(source = %source.display(), bytes = source_bytes, "parsed source document");

    let extract_options = ExtractOptions {
        identifier_field,
        collision_mode: options.collision_mode,
        limits: options.limits.clone(),
    };
    let records = extract_records(&document, &segments, &pointer, &extract_options)?;
    drop(document);

    let writer = RecordWriter::new(&target_dir)?;
    let mut written = Vec::with_capacity(records.len());
    for record in &records {
        let entry = if options.dry_run {
            let (planned, _) = writer.plan(record)?;
            info!("Would create {}", planned.path.display());
            planned
        } else {
            let entry = writer.write(record)?;
            info!(bytes = entry.bytes, "Created {}", entry.path.display());
            entry
        };
        on_record(&entry);
        written.push(entry);
    }

    Ok(ExportSummary {
        records_written: if options.dry_run { 0 } else { written.len() },
        records_found: records.len(),
        source_bytes,
        target_dir,
        dry_run: options.dry_run,
        written,
        duration: start.elapsed(),
    })
}

/// Read and parse the source document, bounded by `max_bytes`
fn read_document(path: &Path, max_bytes: usize) -> Result<(Value, usize)> {
    let file = File::open(path).map_err(|e| ExportError::io(path, e))?;

    let mut buffer = Vec::new();
    file.take(max_bytes as u64 + 1)
        .read_to_end(&mut buffer)
        .map_err(|e| ExportError::io(path, e))?;

    if buffer.len() > max_bytes {
        return Err(ExportError::BufferLimitExceeded {
            path: path.to_path_buf(),
            limit_bytes: max_bytes,
            buffered_bytes: buffer.len(),
            suggested_size: ExportError::suggest_buffer_size(
                path.metadata().map(|m| m.len() as usize).unwrap_or(buffer.len()),
            ),
        });
    }

    let document = serde_json::from_slice(&buffer).map_err(|e| ExportError::JsonParse {
        context: format!("parsing source document '{}'", path.display()),
        source: e,
    })?;
    Ok((document, buffer.len()))
}

mod duration_secs {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;

    fn write_source(dir: &Path, doc: &Value) -> PathBuf {
        let path = dir.join("source.json");
        fs::write(&path, serde_json::to_vec(doc).unwrap()).unwrap();
        path
    }

    #[test]
    fn export_reports_written_count() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        fs::create_dir(&out).unwrap();
        let source = write_source(
            dir.path(),
            &json!({"2-0rwa": {"sub-prayers": {"a1": {"title": "X"}, "a2": {"title": "Y"}}}}),
        );

        let count = export(&source, &["2-0rwa", "sub-prayers"], &out, "prayer-id").unwrap();
        assert_eq!(count, 2);
        assert!(out.join("a1.json").is_file());
        assert!(out.join("a2.json").is_file());
    }

    #[test]
    fn dry_run_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let source = write_source(dir.path(), &json!({"m": {"a1": {"title": "X"}}}));
        let out = dir.path().join("out");
        fs::create_dir(&out).unwrap();

        let summary = execute_export(ExportRequest {
            source,
            segments: vec!["m".to_string()],
            target_dir: out.clone(),
            identifier_field: "prayer-id".to_string(),
            options: ExportOptions {
                dry_run: true,
                ..ExportOptions::default()
            },
        })
        .unwrap();

        assert_eq!(summary.records_written, 0);
        assert_eq!(summary.records_found, 1);
        assert_eq!(summary.written[0].path, out.join("a1.json"));
        assert_eq!(fs::read_dir(&out).unwrap().count(), 0);
    }

    #[test]
    fn buffer_limit_is_enforced() {
        let dir = tempfile::tempdir().unwrap();
        let source = write_source(
            dir.path(),
            &json!({"m": {"a1": {"text": "x".repeat(200)}}}),
        );

        let result = execute_export(ExportRequest {
            source,
            segments: vec!["m".to_string()],
            target_dir: dir.path().to_path_buf(),
            identifier_field: "prayer-id".to_string(),
            options: ExportOptions {
                limits: ExportLimits {
                    max_buffer_bytes: 64,
                    ..ExportLimits::default()
                },
                ..ExportOptions::default()
            },
        });

        assert!(matches!(
            result,
            Err(ExportError::BufferLimitExceeded { limit_bytes: 64, .. })
        ));
    }

    #[test]
    fn progress_callback_sees_every_record() {
        let dir = tempfile::tempdir().unwrap();
        let source = write_source(
            dir.path(),
            &json!({"m": {"a": {}, "b": {}, "c": {}}}),
        );

        let mut seen = Vec::new();
        execute_export_with_progress(
            ExportRequest {
                source,
                segments: vec!["m".to_string()],
                target_dir: dir.path().to_path_buf(),
                identifier_field: "id".to_string(),
                options: ExportOptions::default(),
            },
            |record| seen.push(record.identifier.clone()),
        )
        .unwrap();

        seen.sort();
        assert_eq!(seen, vec!["a", "b", "c"]);
    }

    #[test]
    fn request_from_default_config() {
        let request = ExportRequest::from_config(&ExportConfig::default()).unwrap();
        assert_eq!(request.segments, vec!["2-0rwa", "sub-prayers"]);
        assert_eq!(request.identifier_field, "prayer-id");
        assert_eq!(request.options.collision_mode, KeyCollisionMode::Overwrite);
        assert!(!request.options.dry_run);
    }
}
