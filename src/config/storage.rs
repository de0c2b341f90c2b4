// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the ups-monitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Local files written by the monitor

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Paths of the local files and the CSV log interval.
///
/// Relative paths are resolved from the working directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// CSV values log
    #[serde(default = "default_values_csv")]
    pub values_csv: PathBuf,

    /// Minimum number of seconds between two CSV rows
    #[serde(default = "default_log_interval_secs")]
    pub log_interval_secs: u64,

    /// Durable log of non-fatal errors
    #[serde(default = "default_error_log")]
    pub error_log: PathBuf,

    /// File holding the installation id
    #[serde(default = "default_id_file")]
    pub id_file: PathBuf,
}

fn default_values_csv() -> PathBuf {
    PathBuf::from("ups_values.csv")
}

fn default_log_interval_secs() -> u64 {
    5
}

fn default_error_log() -> PathBuf {
    PathBuf::from("modbus_errors.log")
}

fn default_id_file() -> PathBuf {
    PathBuf::from("ups_id.txt")
}

impl StorageConfig {
    pub fn log_interval(&self) -> Duration {
        Duration::from_secs(self.log_interval_secs)
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            values_csv: default_values_csv(),
            log_interval_secs: default_log_interval_secs(),
            error_log: default_error_log(),
            id_file: default_id_file(),
        }
    }
}
