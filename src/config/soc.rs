// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the ups-monitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! State of charge estimation settings

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::soc::{SocCalibration, SocHistory, DEFAULT_HISTORY_CAPACITY, DEFAULT_HISTORY_WINDOW};

/// Calibration points and history bounds.
///
/// ```yaml
/// soc:
///   empty_voltage: 20.4
///   full_voltage: 27.5
///   history_window_secs: 600
///   history_capacity: 600
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SocConfig {
    #[serde(flatten)]
    pub calibration: SocCalibration,

    /// Trailing window of the SOC history, in seconds
    #[serde(default = "default_history_window_secs")]
    pub history_window_secs: u64,

    /// Maximum number of SOC samples kept
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,
}

fn default_history_window_secs() -> u64 {
    DEFAULT_HISTORY_WINDOW.as_secs()
}

fn default_history_capacity() -> usize {
    DEFAULT_HISTORY_CAPACITY
}

impl SocConfig {
    /// Empty history bounded as configured
    pub fn history(&self) -> SocHistory {
        SocHistory::new(
            Duration::from_secs(self.history_window_secs),
            self.history_capacity,
        )
    }
}

impl Default for SocConfig {
    fn default() -> Self {
        Self {
            calibration: SocCalibration::default(),
            history_window_secs: default_history_window_secs(),
            history_capacity: default_history_capacity(),
        }
    }
}
