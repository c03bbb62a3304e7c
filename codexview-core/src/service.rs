use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::decode::decode_log;
use crate::error::{Result, ViewerError};
use crate::model::{Entry, LogLine};
use crate::page;
use crate::render::render_entries;
use crate::revision::HistoryBuilder;
use crate::upload::extract_uploads;

/// A session log decoded once at startup and shared read-only by both views.
#[derive(Debug, Clone)]
pub struct LoadedLog {
    pub source_path: PathBuf,
    pub lines: Vec<LogLine>,
    pub entries: Vec<Entry>,
}

impl LoadedLog {
    pub fn from_raw(source_path: impl Into<PathBuf>, raw_jsonl: &str) -> Self {
        let lines = decode_log(raw_jsonl);
        let entries = render_entries(&lines);
        Self {
            source_path: source_path.into(),
            lines,
            entries,
        }
    }
}

pub fn read_log_raw(path: &Path) -> Result<String> {
    let bytes = fs::read(path).map_err(|source| ViewerError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    String::from_utf8(bytes).map_err(|_| ViewerError::NonUtf8Log {
        path: path.to_path_buf(),
    })
}

/// Read and render a log; a log that yields no entries is an error.
pub fn load_log(path: &Path) -> Result<LoadedLog> {
    let raw = read_log_raw(path)?;
    let log = LoadedLog::from_raw(path, &raw);

    if log.entries.is_empty() {
        return Err(ViewerError::EmptyLog {
            path: path.to_path_buf(),
        });
    }

    let malformed = log
        .lines
        .iter()
        .filter(|line| matches!(line, LogLine::Malformed { .. }))
        .count();
    info!(
        path = %path.display(),
        lines = log.lines.len(),
        entries = log.entries.len(),
        malformed,
        "loaded session log"
    );

    Ok(log)
}

pub fn render_timeline(log: &LoadedLog) -> String {
    page::render_timeline_page(&log.entries, &log.source_path)
}

/// Extract uploads and rebuild their history from scratch for this call.
pub fn render_upload_report(
    log: &LoadedLog,
    upload_function: &str,
    history: &dyn HistoryBuilder,
) -> String {
    let uploads = extract_uploads(&log.lines, upload_function);
    let diffs = if uploads.is_empty() {
        Ok(Vec::new())
    } else {
        history.build_history(&uploads)
    };

    if let Err(err) = &diffs {
        warn!(error = %err, uploads = uploads.len(), "failed to build upload history");
    }

    page::render_upload_page(&log.source_path, upload_function, &uploads, &diffs)
}
