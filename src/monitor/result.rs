// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the ups-monitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

use chrono::{DateTime, Local};

use crate::modbus::{DecodedValue, RegisterSpec, StatusFlags};
use crate::soc::SocSample;

/// Decoded value of one catalog register.
#[derive(Debug, Clone, PartialEq)]
pub struct RegisterReading {
    pub spec: RegisterSpec,
    pub value: DecodedValue,
}

/// Everything read during one poll cycle.
///
/// Built once by the orchestrator and never modified afterwards; sinks receive
/// it behind an `Arc` and only read from it.
#[derive(Debug, Clone, PartialEq)]
pub struct PollResult {
    timestamp: DateTime<Local>,
    status: StatusFlags,
    readings: Vec<RegisterReading>,
    battery_voltage: Option<f64>,
    soc: Option<SocSample>,
}

impl PollResult {
    pub fn new(
        timestamp: DateTime<Local>,
        status: StatusFlags,
        readings: Vec<RegisterReading>,
        battery_voltage: Option<f64>,
        soc: Option<SocSample>,
    ) -> Self {
        Self {
            timestamp,
            status,
            readings,
            battery_voltage,
            soc,
        }
    }

    pub fn timestamp(&self) -> DateTime<Local> {
        self.timestamp
    }

    pub fn status(&self) -> &StatusFlags {
        &self.status
    }

    pub fn readings(&self) -> &[RegisterReading] {
        &self.readings
    }

    /// Battery voltage in volts, when it could be read
    pub fn battery_voltage(&self) -> Option<f64> {
        self.battery_voltage
    }

    pub fn soc(&self) -> Option<&SocSample> {
        self.soc.as_ref()
    }

    /// Decoded value of the register at `address`
    pub fn value(&self, address: u16) -> Option<&DecodedValue> {
        self.readings
            .iter()
            .find(|reading| reading.spec.address == address)
            .map(|reading| &reading.value)
    }

    /// Numeric value of the register at `address`; `None` when unavailable,
    /// failed, textual or absent from the catalog.
    pub fn numeric(&self, address: u16) -> Option<f64> {
        self.value(address).and_then(DecodedValue::as_f64)
    }

    /// Number of registers whose read failed
    pub fn error_count(&self) -> usize {
        self.readings
            .iter()
            .filter(|reading| reading.value.is_error())
            .count()
    }
}
