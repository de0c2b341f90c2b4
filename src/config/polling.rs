// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the ups-monitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Poll rate and retry configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::monitor::BackoffStrategy;

/// Adaptive poll rate: the UPS is sampled faster while it runs on battery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollingConfig {
    /// Seconds between cycles while battery mode is active
    #[serde(default = "default_battery_mode_interval_secs")]
    pub battery_mode_interval_secs: u64,

    /// Seconds between cycles on mains power
    #[serde(default = "default_mains_interval_secs")]
    pub mains_interval_secs: u64,

    /// Wait after a failed field-bus connection
    #[serde(default)]
    pub backoff: BackoffStrategy,
}

fn default_battery_mode_interval_secs() -> u64 {
    5
}

fn default_mains_interval_secs() -> u64 {
    10
}

impl PollingConfig {
    pub fn battery_mode_interval(&self) -> Duration {
        Duration::from_secs(self.battery_mode_interval_secs)
    }

    pub fn mains_interval(&self) -> Duration {
        Duration::from_secs(self.mains_interval_secs)
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            battery_mode_interval_secs: default_battery_mode_interval_secs(),
            mains_interval_secs: default_mains_interval_secs(),
            backoff: BackoffStrategy::default(),
        }
    }
}
