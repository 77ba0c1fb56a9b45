//! File sinks for accepted records.
//!
//! Each final export writes `<prefix>-<YYYYmmdd-HHMMSS>.<ext>` into the
//! output directory and returns the paths written. Checkpoints go to a
//! fixed `<prefix>-checkpoint.<ext>` that every phase overwrites with the
//! larger snapshot.

use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Local;
use scout_search::{AcceptedRecord, ResultSink, SearchError};

use crate::config::{ExportConfig, ExportFormat};

/// Writes a pretty-printed JSON array.
#[derive(Debug, Clone)]
pub struct JsonSink {
    dir: PathBuf,
    prefix: String,
    stamped: bool,
}

impl JsonSink {
    /// Sink writing into `dir` with the given file name prefix.
    pub fn new(dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            prefix: prefix.into(),
            stamped: true,
        }
    }

    /// Write to `<prefix>.<ext>` without a timestamp, replacing any
    /// earlier file.
    pub fn fixed_name(mut self) -> Self {
        self.stamped = false;
        self
    }
}

impl ResultSink for JsonSink {
    fn export(&self, records: &[AcceptedRecord]) -> Result<Vec<String>, SearchError> {
        let path = output_path(&self.dir, &self.prefix, ExportFormat::Json, self.stamped)?;
        let mut writer = create(&path)?;
        serde_json::to_writer_pretty(&mut writer, records)
            .map_err(|e| export_error(&path, e))?;
        writer.flush().map_err(|e| export_error(&path, e))?;
        Ok(vec![path.display().to_string()])
    }
}

/// Writes one JSON object per line.
#[derive(Debug, Clone)]
pub struct JsonLinesSink {
    dir: PathBuf,
    prefix: String,
    stamped: bool,
}

impl JsonLinesSink {
    /// Sink writing into `dir` with the given file name prefix.
    pub fn new(dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            prefix: prefix.into(),
            stamped: true,
        }
    }

    /// Write to `<prefix>.<ext>` without a timestamp, replacing any
    /// earlier file.
    pub fn fixed_name(mut self) -> Self {
        self.stamped = false;
        self
    }
}

impl ResultSink for JsonLinesSink {
    fn export(&self, records: &[AcceptedRecord]) -> Result<Vec<String>, SearchError> {
        let path = output_path(&self.dir, &self.prefix, ExportFormat::JsonLines, self.stamped)?;
        let mut writer = create(&path)?;
        for record in records {
            serde_json::to_writer(&mut writer, record).map_err(|e| export_error(&path, e))?;
            writer.write_all(b"\n").map_err(|e| export_error(&path, e))?;
        }
        writer.flush().map_err(|e| export_error(&path, e))?;
        Ok(vec![path.display().to_string()])
    }
}

/// Every configured format behind one sink.
pub struct ExportSet {
    sinks: Vec<Box<dyn ResultSink>>,
}

impl ExportSet {
    /// Build sinks for each configured format, writing into `dir_override`
    /// if given, else the configured output directory.
    pub fn from_config(config: &ExportConfig, dir_override: Option<&Path>) -> Self {
        Self::build(config, dir_override, &config.file_prefix, true)
    }

    /// Like [`Self::from_config`], but writing fixed
    /// `<prefix>-checkpoint.<ext>` files for per-phase snapshots.
    pub fn checkpoint(config: &ExportConfig, dir_override: Option<&Path>) -> Self {
        let prefix = format!("{}-checkpoint", config.file_prefix);
        Self::build(config, dir_override, &prefix, false)
    }

    fn build(
        config: &ExportConfig,
        dir_override: Option<&Path>,
        prefix: &str,
        stamped: bool,
    ) -> Self {
        let dir = dir_override.unwrap_or(config.output_dir.as_path());
        let sinks = config
            .formats
            .iter()
            .map(|format| -> Box<dyn ResultSink> {
                match (format, stamped) {
                    (ExportFormat::Json, true) => Box::new(JsonSink::new(dir, prefix)),
                    (ExportFormat::Json, false) => {
                        Box::new(JsonSink::new(dir, prefix).fixed_name())
                    }
                    (ExportFormat::JsonLines, true) => Box::new(JsonLinesSink::new(dir, prefix)),
                    (ExportFormat::JsonLines, false) => {
                        Box::new(JsonLinesSink::new(dir, prefix).fixed_name())
                    }
                }
            })
            .collect();
        Self { sinks }
    }

    /// Number of sinks.
    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    /// Returns `true` if no format is configured.
    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl ResultSink for ExportSet {
    fn export(&self, records: &[AcceptedRecord]) -> Result<Vec<String>, SearchError> {
        let mut written = Vec::with_capacity(self.sinks.len());
        for sink in &self.sinks {
            written.extend(sink.export(records)?);
        }
        Ok(written)
    }
}

fn output_path(
    dir: &Path,
    prefix: &str,
    format: ExportFormat,
    stamped: bool,
) -> Result<PathBuf, SearchError> {
    fs::create_dir_all(dir).map_err(|e| export_error(dir, e))?;
    let ext = format.extension();
    if !stamped {
        return Ok(dir.join(format!("{prefix}.{ext}")));
    }
    let stamp = Local::now().format("%Y%m%d-%H%M%S");
    Ok(dir.join(format!("{prefix}-{stamp}.{ext}")))
}

fn create(path: &Path) -> Result<BufWriter<fs::File>, SearchError> {
    fs::File::create(path)
        .map(BufWriter::new)
        .map_err(|e| export_error(path, e))
}

fn export_error(path: &Path, err: impl std::fmt::Display) -> SearchError {
    SearchError::Export(format!("{}: {err}", path.display()))
}
