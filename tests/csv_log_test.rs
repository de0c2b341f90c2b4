// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the ups-monitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

use std::fs;
use std::time::Duration;

use anyhow::Result;
use tempfile::tempdir;

use ups_monitor::sinks::{CsvLogSink, HeaderStatus};

const OLD_ROWS: &str = "2025-05-31 08:00:00,26.010,1480,24.85,29.85,210,78.31,False,True,True,True\n\
2025-05-31 08:00:05,26.000,,,,,78.17,False,True,False,False\n";

#[test]
fn test_missing_file_gets_header() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("ups_values.csv");

    let sink = CsvLogSink::new(&path, Duration::from_secs(5));
    assert_eq!(sink.ensure_header()?, HeaderStatus::Created);
    assert_eq!(
        fs::read_to_string(&path)?,
        format!("{}\n", CsvLogSink::header_line())
    );

    // Second call finds it in place
    assert_eq!(sink.ensure_header()?, HeaderStatus::Present);
    Ok(())
}

#[test]
fn test_empty_file_gets_header() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("ups_values.csv");
    fs::write(&path, "")?;

    let sink = CsvLogSink::new(&path, Duration::from_secs(5));
    assert_eq!(sink.ensure_header()?, HeaderStatus::Created);
    assert!(fs::read_to_string(&path)?.starts_with("Timestamp,Battery Voltage (V)"));
    Ok(())
}

#[test]
fn test_stale_header_is_replaced_and_rows_kept_byte_for_byte() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("ups_values.csv");
    let stale = "Timestamp,Battery Voltage (V),Output Current (mA),SOC (%)\n";
    fs::write(&path, format!("{stale}{OLD_ROWS}"))?;

    let sink = CsvLogSink::new(&path, Duration::from_secs(5));
    assert_eq!(sink.ensure_header()?, HeaderStatus::Repaired);

    let repaired = fs::read(&path)?;
    let expected = format!("{}\n{}", CsvLogSink::header_line(), OLD_ROWS);
    assert_eq!(repaired, expected.as_bytes());

    // No temporary file left behind
    let leftovers: Vec<_> = fs::read_dir(dir.path())?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_name().to_string_lossy().ends_with(".tmp"))
        .collect();
    assert!(leftovers.is_empty());
    Ok(())
}

#[test]
fn test_header_with_crlf_or_bom_is_accepted() -> Result<()> {
    let dir = tempdir()?;

    let crlf = dir.path().join("crlf.csv");
    let content = format!("{}\r\n{}", CsvLogSink::header_line(), OLD_ROWS);
    fs::write(&crlf, &content)?;
    assert_eq!(
        CsvLogSink::new(&crlf, Duration::ZERO).ensure_header()?,
        HeaderStatus::Present
    );
    // Untouched
    assert_eq!(fs::read_to_string(&crlf)?, content);

    let bom = dir.path().join("bom.csv");
    fs::write(&bom, format!("\u{feff}{}\n", CsvLogSink::header_line()))?;
    assert_eq!(
        CsvLogSink::new(&bom, Duration::ZERO).ensure_header()?,
        HeaderStatus::Present
    );
    Ok(())
}

#[test]
fn test_header_only_file_without_newline_is_repaired() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("ups_values.csv");
    fs::write(&path, "Timestamp,Voltage")?;

    let sink = CsvLogSink::new(&path, Duration::ZERO);
    assert_eq!(sink.ensure_header()?, HeaderStatus::Repaired);
    assert_eq!(
        fs::read_to_string(&path)?,
        format!("{}\n", CsvLogSink::header_line())
    );
    Ok(())
}

#[test]
fn test_headerless_file_gets_header_inserted_above_every_row() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("ups_values.csv");
    fs::write(&path, OLD_ROWS)?;

    let sink = CsvLogSink::new(&path, Duration::from_secs(5));
    assert_eq!(sink.ensure_header()?, HeaderStatus::Inserted);

    // Both rows survive, the first one included
    let expected = format!("{}\n{}", CsvLogSink::header_line(), OLD_ROWS);
    assert_eq!(fs::read(&path)?, expected.as_bytes());

    assert_eq!(sink.ensure_header()?, HeaderStatus::Present);
    Ok(())
}
