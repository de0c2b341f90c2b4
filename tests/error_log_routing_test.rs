// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the ups-monitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

// Installs the global logger, so this file holds a single test.

use std::fs;

use anyhow::Result;
use log::LevelFilter;
use tempfile::tempdir;

use ups_monitor::utility::{init_logger, route_error_logs, ErrorJournal};

#[test]
fn test_error_records_reach_the_journal_exactly_once() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("modbus_errors.log");

    init_logger(LevelFilter::Debug);
    let journal = ErrorJournal::new(&path);
    assert!(route_error_logs(journal.clone()));
    assert!(!route_error_logs(ErrorJournal::console_only()));

    // An error logged directly, outside the journal
    log::error!("Task failed: poll loop stopped");
    // Below error level: console only
    log::warn!("Inserted missing CSV header");
    // Journaled entries are not written a second time
    journal.record_error("Modbus connection failed to 10.0.0.1:502: connection refused");

    let content = fs::read_to_string(&path)?;
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 2, "unexpected journal: {content:?}");
    assert!(lines[0].ends_with(" ERROR: Task failed: poll loop stopped"));
    assert!(lines[1].ends_with(" ERROR: Modbus connection failed to 10.0.0.1:502: connection refused"));
    Ok(())
}
