use std::path::{Path, PathBuf};

use serde::Serialize;
use vmaudit_core::{render_delimited, TableRow};

use crate::persist::{AtomicFileWriter, PersistError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportFormat {
    /// Header line plus delimiter-separated rows.
    #[default]
    Delimited,
    /// A JSON array with one object per row.
    Json,
}

impl ReportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ReportFormat::Delimited => "csv",
            ReportFormat::Json => "json",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExportOptions {
    pub format: ReportFormat,
    pub delimiter: char,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            format: ReportFormat::Delimited,
            delimiter: ',',
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("persist error: {0}")]
    Persist(#[from] PersistError),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("output path {0:?} has no file name")]
    NoFileName(PathBuf),
}

pub fn render_report<R: TableRow + Serialize>(
    rows: &[R],
    options: &ExportOptions,
) -> Result<String, ExportError> {
    match options.format {
        ReportFormat::Delimited => Ok(render_delimited(rows, options.delimiter)),
        ReportFormat::Json => {
            let mut text = serde_json::to_string_pretty(rows)?;
            text.push('\n');
            Ok(text)
        }
    }
}

/// Renders `rows` and atomically writes them to `path`, creating the parent
/// directory when needed.
pub fn write_report<R: TableRow + Serialize>(
    path: &Path,
    rows: &[R],
    options: &ExportOptions,
) -> Result<PathBuf, ExportError> {
    let content = render_report(rows, options)?;
    let filename = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| ExportError::NoFileName(path.to_path_buf()))?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let writer = AtomicFileWriter::new(dir);
    Ok(writer.write(filename, &content)?)
}
