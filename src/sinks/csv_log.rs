// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the ups-monitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Append-only CSV log of the key UPS values
//!
//! The file always starts with the fixed header below. When an existing file
//! carries a different first line, the header is rewritten in place and every
//! data row after it is kept byte for byte. A file whose first line is already
//! a data row gets the header inserted above it instead.

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use log::{debug, info, warn};

use super::payload::TIMESTAMP_FORMAT;
use crate::modbus::registers::{
    BATTERY_CURRENT, BATTERY_TEMPERATURE, DEVICE_TEMPERATURE, OUTPUT_CURRENT,
};
use crate::monitor::PollResult;

/// Column names of the values log
pub const CSV_HEADER: [&str; 11] = [
    "Timestamp",
    "Battery Voltage (V)",
    "Output Current (mA)",
    "Battery Temp (°C)",
    "Device Temp (°C)",
    "Battery Current (mA)",
    "SOC (%)",
    "Battery Mode",
    "Battery Present",
    "Temp Sensor Connected",
    "MQTT Published",
];

/// What [`CsvLogSink::ensure_header`] had to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderStatus {
    /// The file did not exist or was empty and has been created with the header
    Created,
    /// The header was already correct
    Present,
    /// The first line was replaced by the correct header
    Repaired,
    /// The file started with data rows; the header was inserted above them
    Inserted,
}

/// CSV values log with a minimum interval between rows.
#[derive(Debug)]
pub struct CsvLogSink {
    path: PathBuf,
    log_interval: Duration,
    last_write: Option<Instant>,
}

impl CsvLogSink {
    pub fn new(path: impl Into<PathBuf>, log_interval: Duration) -> Self {
        Self {
            path: path.into(),
            log_interval,
            last_write: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The header as written on the first line, without line terminator
    pub fn header_line() -> String {
        CSV_HEADER.join(",")
    }

    /// Make sure the file exists and starts with the expected header.
    pub fn ensure_header(&self) -> Result<HeaderStatus> {
        let header = Self::header_line();

        if !self.path.exists() {
            fs::write(&self.path, format!("{header}\n"))
                .with_context(|| format!("Failed to create {}", self.path.display()))?;
            info!("CSV header written to {}", self.path.display());
            return Ok(HeaderStatus::Created);
        }

        let content = fs::read(&self.path)
            .with_context(|| format!("Failed to read {}", self.path.display()))?;
        if content.is_empty() {
            fs::write(&self.path, format!("{header}\n"))
                .with_context(|| format!("Failed to write {}", self.path.display()))?;
            info!("CSV header written to empty file {}", self.path.display());
            return Ok(HeaderStatus::Created);
        }

        let (first_line, rest) = match content.iter().position(|&b| b == b'\n') {
            Some(end) => (&content[..end], &content[end + 1..]),
            None => (&content[..], &content[content.len()..]),
        };
        let first_line = first_line.strip_suffix(b"\r").unwrap_or(first_line);
        // Tolerate a UTF-8 byte order mark left by spreadsheet tools
        let first_line = first_line
            .strip_prefix(&[0xEF, 0xBB, 0xBF])
            .unwrap_or(first_line);
        if first_line == header.as_bytes() {
            return Ok(HeaderStatus::Present);
        }

        let (status, kept) = if is_data_row(first_line) {
            warn!(
                "CSV log {} has no header, inserting it above {} data bytes",
                self.path.display(),
                content.len()
            );
            let rows = content
                .strip_prefix(&[0xEF, 0xBB, 0xBF])
                .unwrap_or(&content[..]);
            (HeaderStatus::Inserted, rows)
        } else {
            warn!(
                "CSV header of {} is stale, rewriting it ({} data bytes kept)",
                self.path.display(),
                rest.len()
            );
            (HeaderStatus::Repaired, rest)
        };
        let mut repaired = Vec::with_capacity(header.len() + 1 + kept.len());
        repaired.extend_from_slice(header.as_bytes());
        repaired.push(b'\n');
        repaired.extend_from_slice(kept);

        let temp_path = self.temp_path();
        fs::write(&temp_path, &repaired)
            .with_context(|| format!("Failed to write {}", temp_path.display()))?;
        fs::rename(&temp_path, &self.path).with_context(|| {
            format!(
                "Failed to replace {} with {}",
                self.path.display(),
                temp_path.display()
            )
        })?;
        Ok(status)
    }

    /// Whether a row may be written at `now`
    pub fn is_due(&self, now: Instant) -> bool {
        match self.last_write {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= self.log_interval,
        }
    }

    /// Append one row for `result` when the log interval has elapsed.
    ///
    /// Returns whether a row was written.
    pub fn append(&mut self, result: &PollResult, published: bool, now: Instant) -> Result<bool> {
        if !self.is_due(now) {
            debug!("CSV log interval not elapsed, skipping row");
            return Ok(false);
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open {}", self.path.display()))?;
        let mut writer = csv::WriterBuilder::new()
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(file);
        writer
            .write_record(row_for(result, published))
            .with_context(|| format!("Failed to append to {}", self.path.display()))?;
        writer.flush()?;

        self.last_write = Some(now);
        Ok(true)
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

/// Fields of one data row, unavailable values as empty strings
pub fn row_for(result: &PollResult, published: bool) -> Vec<String> {
    let status = result.status();
    vec![
        result.timestamp().format(TIMESTAMP_FORMAT).to_string(),
        optional(result.battery_voltage(), 3),
        optional(result.numeric(OUTPUT_CURRENT), 0),
        optional(result.numeric(BATTERY_TEMPERATURE), 2),
        optional(result.numeric(DEVICE_TEMPERATURE), 2),
        optional(result.numeric(BATTERY_CURRENT), 0),
        optional(result.soc().map(|soc| soc.percent), 2),
        flag(status.battery_mode),
        flag(status.battery_present),
        flag(status.temp_sensor_connected),
        flag(published),
    ]
}

fn optional(value: Option<f64>, precision: usize) -> String {
    value
        .map(|v| format!("{v:.precision$}"))
        .unwrap_or_default()
}

/// Whether `line` is a data row, i.e. starts with a row timestamp
fn is_data_row(line: &[u8]) -> bool {
    let Ok(line) = std::str::from_utf8(line) else {
        return false;
    };
    let first_field = line.split(',').next().unwrap_or_default().trim();
    NaiveDateTime::parse_from_str(first_field, TIMESTAMP_FORMAT).is_ok()
}

// Same spelling as the rows already present in existing logs
fn flag(value: bool) -> String {
    let text = if value { "True" } else { "False" };
    text.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modbus::{decode, RegisterCatalog, StatusFlags};
    use crate::monitor::RegisterReading;
    use crate::soc::SocSample;
    use chrono::{Local, TimeZone};

    fn sample_result(available: bool) -> PollResult {
        let timestamp = Local.with_ymd_and_hms(2025, 6, 1, 12, 0, 5).unwrap();
        let readings = RegisterCatalog::standard()
            .lookup()
            .iter()
            .map(|spec| {
                let words = match (available, spec.address) {
                    (true, 0x2007) => vec![1500],
                    (true, 0x200B) => vec![200],
                    (true, 0x200D) => vec![298],
                    (true, 0x200E) => vec![303],
                    _ => vec![0xFFFF; spec.word_count as usize],
                };
                RegisterReading {
                    spec: spec.clone(),
                    value: decode(spec, &words),
                }
            })
            .collect();
        PollResult::new(
            timestamp,
            StatusFlags::from_words(&[0x0000, 0x1100]),
            readings,
            available.then_some(26.0),
            available.then_some(SocSample {
                timestamp,
                percent: 78.87323,
            }),
        )
    }

    #[test]
    fn row_formats_available_values() {
        let row = row_for(&sample_result(true), true);
        assert_eq!(
            row,
            vec![
                "2025-06-01 12:00:05",
                "26.000",
                "1500",
                "24.85",
                "29.85",
                "200",
                "78.87",
                "False",
                "True",
                "True",
                "True"
            ]
        );
    }

    #[test]
    fn row_leaves_unavailable_values_empty() {
        let row = row_for(&sample_result(false), false);
        assert_eq!(&row[1..7], &["", "", "", "", "", ""]);
        assert_eq!(row[10], "False");
    }

    #[test]
    fn data_rows_are_told_apart_from_headers() {
        assert!(is_data_row(b"2025-06-01 12:00:05,26.000,1500"));
        assert!(!is_data_row(b"Timestamp,Battery Voltage (V)"));
        assert!(!is_data_row(b"Time,Voltage"));
        assert!(!is_data_row(b""));
    }

    #[test]
    fn interval_gates_writes() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = CsvLogSink::new(dir.path().join("values.csv"), Duration::from_secs(5));
        sink.ensure_header().unwrap();

        let start = Instant::now();
        let result = sample_result(true);
        assert!(sink.append(&result, false, start).unwrap());
        assert!(!sink.append(&result, false, start + Duration::from_secs(4)).unwrap());
        assert!(sink.append(&result, false, start + Duration::from_secs(5)).unwrap());

        let content = std::fs::read_to_string(sink.path()).unwrap();
        assert_eq!(content.lines().count(), 3);
    }
}
