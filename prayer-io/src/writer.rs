//! Per-record JSON file writer

use crate::error::{ExportError, Result};
use crate::extract::Record;
use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};
use serde_json::{Map, Value};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Indentation used for every record file
pub const INDENT: &[u8] = b"  ";
/// Extension appended to each identifier
pub const RECORD_EXTENSION: &str = "json";

/// A record file that was (or, in a dry run, would be) written
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WrittenRecord {
    /// Record identifier
    pub identifier: String,
    /// Output path
    pub path: PathBuf,
    /// Serialized size in bytes
    pub bytes: usize,
}

/// Serialize a record body with 2-space indentation
///
/// Non-ASCII characters are emitted as-is. No trailing newline is added.
pub fn render_record(body: &Map<String, Value>) -> serde_json::Result<Vec<u8>> {
    let mut buf = Vec::new();
    let mut ser = Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(INDENT));
    body.serialize(&mut ser)?;
    Ok(buf)
}

/// Writes records into a pre-existing directory
#[derive(Debug, Clone)]
pub struct RecordWriter {
    target_dir: PathBuf,
}

impl RecordWriter {
    /// Create a writer for `target_dir`, which must already exist
    pub fn new(target_dir: impl Into<PathBuf>) -> Result<Self> {
        let target_dir = target_dir.into();
        if !target_dir.is_dir() {
            return Err(ExportError::TargetDirMissing { path: target_dir });
        }
        Ok(Self { target_dir })
    }

    /// Directory receiving the record files
    pub fn target_dir(&self) -> &Path {
        &self.target_dir
    }

    /// Output path for an identifier
    pub fn path_for(&self, identifier: &str) -> PathBuf {
        self.target_dir
            .join(format!("{}.{}", identifier, RECORD_EXTENSION))
    }

    /// Serialize `record` and report where it would go, without touching disk
    pub fn plan(&self, record: &Record) -> Result<(WrittenRecord, Vec<u8>)> {
        let bytes = render_record(&record.body).map_err(|e| ExportError::Serialize {
            identifier: record.identifier.clone(),
            source: e,
        })?;
        let written = WrittenRecord {
            identifier: record.identifier.clone(),
            path: self.path_for(&record.identifier),
            bytes: bytes.len(),
        };
        Ok((written, bytes))
    }

    /// Write `record` to `<target_dir>/<identifier>.json`, replacing any existing file
    pub fn write(&self, record: &Record) -> Result<WrittenRecord> {
        let (written, bytes) = self.plan(record)?;

        let file = File::create(&written.path).map_err(|e| ExportError::io(&written.path, e))?;
        let mut out = BufWriter::new(file);
        out.write_all(&bytes)
            .and_then(|_| out.flush())
            .map_err(|e| ExportError::io(&written.path, e))?;

        Ok(written)
    }
}
