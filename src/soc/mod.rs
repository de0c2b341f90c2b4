// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the ups-monitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! State of charge estimation
//!
//! The estimate is a linear interpolation of the battery voltage between two
//! calibration points. It is a rough indicator for a lead-acid pack, not a
//! coulomb counter. The calibration points come from configuration so other
//! chemistries can override them.
//!
//! [`SocHistory`] keeps the recent estimates for the trend display. It is
//! bounded both in time (trailing window) and in size (capacity); both limits
//! are enforced on every insert, oldest samples first.

use std::collections::VecDeque;
use std::time::Duration;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::modbus::decoder::UNAVAILABLE_WORD;

/// Default trailing window kept in the history
pub const DEFAULT_HISTORY_WINDOW: Duration = Duration::from_secs(600);
/// Default maximum number of samples kept in the history
pub const DEFAULT_HISTORY_CAPACITY: usize = 600;

/// Voltage calibration points of the linear SOC estimate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SocCalibration {
    /// Battery voltage read as 0 %
    #[serde(default = "default_empty_voltage")]
    pub empty_voltage: f64,
    /// Battery voltage read as 100 %
    #[serde(default = "default_full_voltage")]
    pub full_voltage: f64,
}

fn default_empty_voltage() -> f64 {
    20.4
}

fn default_full_voltage() -> f64 {
    27.5
}

impl Default for SocCalibration {
    fn default() -> Self {
        Self {
            empty_voltage: default_empty_voltage(),
            full_voltage: default_full_voltage(),
        }
    }
}

impl SocCalibration {
    /// Percentage for a voltage, clamped to `[0, 100]`.
    pub fn percent_for(&self, voltage: f64) -> f64 {
        let span = self.full_voltage - self.empty_voltage;
        (100.0 * (voltage - self.empty_voltage) / span).clamp(0.0, 100.0)
    }
}

/// Estimate the state of charge from the raw Battery Voltage register (mV).
///
/// Returns `None` for the `0xFFFF` sentinel.
pub fn estimate_soc(raw: u16, calibration: &SocCalibration) -> Option<f64> {
    if raw == UNAVAILABLE_WORD {
        return None;
    }
    let voltage = f64::from(raw) / 1000.0;
    Some(calibration.percent_for(voltage))
}

/// One state of charge estimate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SocSample {
    pub timestamp: DateTime<Local>,
    pub percent: f64,
}

/// Time and size bounded history of SOC estimates.
#[derive(Debug, Clone)]
pub struct SocHistory {
    samples: VecDeque<SocSample>,
    window: Duration,
    capacity: usize,
}

impl Default for SocHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_WINDOW, DEFAULT_HISTORY_CAPACITY)
    }
}

impl SocHistory {
    pub fn new(window: Duration, capacity: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity.min(DEFAULT_HISTORY_CAPACITY)),
            window,
            capacity: capacity.max(1),
        }
    }

    /// Append a sample and evict what falls outside the window or capacity.
    ///
    /// The window is measured back from `timestamp`.
    pub fn record(&mut self, timestamp: DateTime<Local>, percent: f64) {
        self.samples.push_back(SocSample { timestamp, percent });

        let window = chrono::Duration::from_std(self.window).unwrap_or(chrono::Duration::MAX);
        while let Some(oldest) = self.samples.front() {
            if timestamp - oldest.timestamp > window {
                self.samples.pop_front();
            } else {
                break;
            }
        }
        while self.samples.len() > self.capacity {
            self.samples.pop_front();
        }
    }

    /// Samples no older than `duration` before the newest sample, oldest first.
    pub fn windowed(&self, duration: Duration) -> Vec<SocSample> {
        let Some(newest) = self.samples.back() else {
            return Vec::new();
        };
        let span = chrono::Duration::from_std(duration).unwrap_or(chrono::Duration::MAX);
        self.samples
            .iter()
            .filter(|sample| newest.timestamp - sample.timestamp <= span)
            .copied()
            .collect()
    }

    pub fn latest(&self) -> Option<&SocSample> {
        self.samples.back()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}
