//! Diagnostic Log Store
//!
//! Append-only, line-delimited JSON log of update diagnostics, plus the
//! retention sweeper that purges entries older than a fixed window (one day
//! by default). The sweep is best-effort: a bad line is skipped, never fatal.

use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Result, StorageError};

/// Default retention window for diagnostic entries.
pub const DEFAULT_RETENTION: StdDuration = StdDuration::from_secs(24 * 60 * 60);

/// Severity of a diagnostic entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

/// A single diagnostic entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
}

/// Append-only diagnostic log backed by one JSONL file.
#[derive(Debug, Clone)]
pub struct DiagnosticLog {
    path: PathBuf,
}

impl DiagnosticLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one entry, timestamped now.
    pub fn append(&self, level: LogLevel, message: impl Into<String>) -> Result<()> {
        let entry = LogEntry {
            timestamp: Utc::now(),
            level,
            message: message.into(),
        };
        let line = serde_json::to_string(&entry)
            .map_err(|e| StorageError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| StorageError::from_io(e, &self.path))?;
        writeln!(file, "{}", line).map_err(|e| StorageError::from_io(e, &self.path))?;
        Ok(())
    }

    /// All parseable entries, oldest first. Bad lines are skipped.
    pub fn entries(&self) -> Result<Vec<LogEntry>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let file = fs::File::open(&self.path).map_err(|e| StorageError::from_io(e, &self.path))?;
        let reader = BufReader::new(file);

        let mut entries = Vec::new();
        for line in reader.lines() {
            let line = match line {
                Ok(line) => line,
                Err(err) => {
                    warn!("diagnostic log: unreadable line skipped: {}", err);
                    continue;
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<LogEntry>(&line) {
                Ok(entry) => entries.push(entry),
                Err(err) => warn!("diagnostic log: corrupt entry skipped: {}", err),
            }
        }
        Ok(entries)
    }

    /// Remove entries with a timestamp older than `now - retention`.
    ///
    /// The surviving entries are rewritten through a temp file and renamed
    /// into place. Individual bad entries are dropped with a warning; only a
    /// failure to rewrite the file as a whole surfaces as an error.
    pub fn purge_entries_older_than(&self, retention: StdDuration) -> Result<usize> {
        if !self.path.exists() {
            return Ok(0);
        }
        let cutoff =
            Utc::now() - Duration::from_std(retention).unwrap_or_else(|_| Duration::days(1));

        let entries = self.entries()?;
        let kept: Vec<&LogEntry> = entries.iter().filter(|e| e.timestamp >= cutoff).collect();
        let purged = entries.len() - kept.len();

        let dir = self
            .path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let mut tmp = tempfile::NamedTempFile::new_in(&dir)
            .map_err(|e| StorageError::from_io(e, &dir))?;
        for entry in &kept {
            let line = serde_json::to_string(entry).map_err(|e| {
                StorageError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e))
            })?;
            writeln!(tmp, "{}", line).map_err(|e| StorageError::from_io(e, tmp.path()))?;
        }
        tmp.persist(&self.path)
            .map_err(|e| StorageError::from_io(e.error, &self.path))?;
        Ok(purged)
    }
}

/// Run the retention sweep on a fixed schedule until the task is aborted.
///
/// Sweep failures are logged and the schedule continues.
pub fn spawn_retention_sweeper(
    log: DiagnosticLog,
    period: StdDuration,
    retention: StdDuration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        // First tick fires immediately; sweep once at startup, then on period.
        loop {
            ticker.tick().await;
            let log = log.clone();
            let result =
                tokio::task::spawn_blocking(move || log.purge_entries_older_than(retention)).await;
            match result {
                Ok(Ok(purged)) if purged > 0 => {
                    tracing::debug!("diagnostic log sweep removed {} entries", purged);
                }
                Ok(Ok(_)) => {}
                Ok(Err(err)) => warn!("diagnostic log sweep failed: {}", err),
                Err(err) => warn!("diagnostic log sweep panicked: {}", err),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_append_and_read_back() {
        let dir = tempdir().unwrap();
        let log = DiagnosticLog::new(dir.path().join("updates.log"));

        log.append(LogLevel::Info, "check started").unwrap();
        log.append(LogLevel::Error, "commit failed").unwrap();

        let entries = log.entries().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].message, "check started");
        assert_eq!(entries[1].level, LogLevel::Error);
    }

    #[test]
    fn test_purge_keeps_recent_entries() {
        let dir = tempdir().unwrap();
        let log = DiagnosticLog::new(dir.path().join("updates.log"));

        // One stale entry, written directly with an old timestamp.
        let stale = LogEntry {
            timestamp: Utc::now() - Duration::days(2),
            level: LogLevel::Info,
            message: "stale".to_string(),
        };
        fs::write(
            log.path(),
            format!("{}\n", serde_json::to_string(&stale).unwrap()),
        )
        .unwrap();
        log.append(LogLevel::Info, "fresh").unwrap();

        let purged = log.purge_entries_older_than(DEFAULT_RETENTION).unwrap();
        assert_eq!(purged, 1);

        let entries = log.entries().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].message, "fresh");
    }

    #[test]
    fn test_purge_drops_corrupt_lines_without_failing() {
        let dir = tempdir().unwrap();
        let log = DiagnosticLog::new(dir.path().join("updates.log"));

        fs::write(log.path(), "{ not json\n").unwrap();
        log.append(LogLevel::Warn, "fine").unwrap();

        log.purge_entries_older_than(DEFAULT_RETENTION).unwrap();
        let entries = log.entries().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].message, "fine");
    }

    #[test]
    fn test_purge_missing_file_is_noop() {
        let dir = tempdir().unwrap();
        let log = DiagnosticLog::new(dir.path().join("never-written.log"));
        assert_eq!(log.purge_entries_older_than(DEFAULT_RETENTION).unwrap(), 0);
    }
}
