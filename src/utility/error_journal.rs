// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the ups-monitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use chrono::Local;
use env_logger::Builder;
use log::{error, warn, Level, LevelFilter};

/// Log target of the records emitted by [`ErrorJournal::record_error`]
pub const JOURNAL_TARGET: &str = "ups_monitor::journal";

/// Journal receiving error records logged outside an [`ErrorJournal`]
static LOG_JOURNAL: OnceLock<ErrorJournal> = OnceLock::new();

/// Install the process logger.
///
/// Records go to stderr. Error records that did not come through
/// [`ErrorJournal::record_error`] are also appended to the journal set with
/// [`route_error_logs`], so no error only reaches the console.
pub fn init_logger(level: LevelFilter) {
    let mut builder = Builder::new();
    builder
        .format(|buf, record| {
            if record.level() == Level::Error && record.target() != JOURNAL_TARGET {
                if let Some(journal) = LOG_JOURNAL.get() {
                    // No logging from inside the logger
                    if let Err(e) = journal.append(&record.args().to_string()) {
                        eprintln!("Could not write to error log: {e}");
                    }
                }
            }
            writeln!(
                buf,
                "{} [{}] {}: {}",
                Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.target(),
                record.args()
            )
        })
        .parse_default_env()
        .filter_level(level)
        .init();
}

/// Send stray error records to `journal`. Only the first call takes effect;
/// returns whether this one did.
pub fn route_error_logs(journal: ErrorJournal) -> bool {
    LOG_JOURNAL.set(journal).is_ok()
}

/// Durable log of non-fatal errors.
///
/// Every entry is also sent to the `log` facade. Entries are appended as
/// `YYYY-MM-DD HH:MM:SS,mmm ERROR: message`, one per line. A journal that
/// cannot be written only produces a warning: it must never stop polling.
#[derive(Debug, Clone)]
pub struct ErrorJournal {
    path: Option<PathBuf>,
}

impl ErrorJournal {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    /// Journal that only forwards to the logger
    pub fn console_only() -> Self {
        Self { path: None }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn record_error(&self, message: &str) {
        error!(target: JOURNAL_TARGET, "{}", message);
        if let Err(e) = self.append(message) {
            if let Some(path) = &self.path {
                warn!("Could not write to error log {}: {}", path.display(), e);
            }
        }
    }

    /// Append one entry to the file, without logging it
    fn append(&self, message: &str) -> io::Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let line = format!(
            "{} ERROR: {}\n",
            Local::now().format("%Y-%m-%d %H:%M:%S,%3f"),
            message.replace('\n', " ")
        );
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .and_then(|mut file| file.write_all(line.as_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appends_one_line_per_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("errors.log");
        let journal = ErrorJournal::new(&path);
        journal.record_error("Modbus connection failed to 10.0.0.2:502");
        journal.record_error("multi\nline");

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with(" ERROR: Modbus connection failed to 10.0.0.2:502"));
        assert!(lines[1].ends_with("ERROR: multi line"));
        // "YYYY-MM-DD HH:MM:SS,mmm"
        assert_eq!(lines[0].find(" ERROR"), Some(23));
        assert_eq!(&lines[0][19..20], ",");
    }

    #[test]
    fn console_only_journal_writes_nothing() {
        let journal = ErrorJournal::console_only();
        journal.record_error("ignored");
        assert!(journal.path().is_none());
    }
}
