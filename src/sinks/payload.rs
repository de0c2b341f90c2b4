// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the ups-monitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::modbus::registers::{BATTERY_TEMPERATURE, OUTPUT_CURRENT};
use crate::monitor::PollResult;

/// Timestamp format shared by the payload and the CSV log
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// JSON message published for every poll.
///
/// Measurements are preformatted strings with their unit; a measurement that
/// could not be obtained is `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpsPayload {
    pub timestamp: String,
    pub battery_mode: bool,
    pub battery_present: bool,
    pub soc_percent: Option<String>,
    pub battery_voltage: Option<String>,
    pub output_current: Option<String>,
    pub battery_temperature: Option<String>,
}

impl UpsPayload {
    pub fn from_result(result: &PollResult) -> Self {
        let status = result.status();
        Self {
            timestamp: result.timestamp().format(TIMESTAMP_FORMAT).to_string(),
            battery_mode: status.battery_mode,
            battery_present: status.battery_present,
            soc_percent: result.soc().map(|soc| format!("{:.2}%", soc.percent)),
            battery_voltage: result.battery_voltage().map(|v| format!("{v:.2} V")),
            output_current: result
                .numeric(OUTPUT_CURRENT)
                .map(|current| format!("{current:.0} mA")),
            battery_temperature: result
                .numeric(BATTERY_TEMPERATURE)
                .map(|celsius| format!("{celsius:.2} °C")),
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }
}

/// Topic for an installation: `{base_topic}/{installation_id}`
pub fn topic_for(base_topic: &str, installation_id: &str) -> String {
    format!("{}/{}", base_topic.trim_end_matches('/'), installation_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modbus::{decode, RegisterCatalog, StatusFlags};
    use crate::monitor::RegisterReading;
    use crate::soc::SocSample;
    use chrono::{Local, TimeZone};

    fn result_with(words: &[(u16, Vec<u16>)], soc: Option<f64>) -> PollResult {
        let catalog = RegisterCatalog::standard();
        let timestamp = Local.with_ymd_and_hms(2025, 3, 14, 9, 26, 53).unwrap();
        let readings = catalog
            .lookup()
            .iter()
            .map(|spec| {
                let raw = words
                    .iter()
                    .find(|(address, _)| *address == spec.address)
                    .map(|(_, w)| w.clone())
                    .unwrap_or_else(|| vec![0xFFFF; spec.word_count as usize]);
                RegisterReading {
                    spec: spec.clone(),
                    value: decode(spec, &raw),
                }
            })
            .collect();
        PollResult::new(
            timestamp,
            StatusFlags::from_words(&[0x0004, 0x0100]),
            readings,
            soc.map(|_| 26.0),
            soc.map(|percent| SocSample { timestamp, percent }),
        )
    }

    #[test]
    fn formats_measurements_with_units() {
        let result = result_with(&[(0x2007, vec![1500]), (0x200D, vec![298])], Some(85.918));
        let payload = UpsPayload::from_result(&result);
        assert_eq!(payload.timestamp, "2025-03-14 09:26:53");
        assert!(payload.battery_mode);
        assert!(payload.battery_present);
        assert_eq!(payload.soc_percent.as_deref(), Some("85.92%"));
        assert_eq!(payload.battery_voltage.as_deref(), Some("26.00 V"));
        assert_eq!(payload.output_current.as_deref(), Some("1500 mA"));
        assert_eq!(payload.battery_temperature.as_deref(), Some("24.85 °C"));
    }

    #[test]
    fn unavailable_measurements_are_null() {
        let payload = UpsPayload::from_result(&result_with(&[], None));
        let json: serde_json::Value = serde_json::from_slice(&payload.to_bytes().unwrap()).unwrap();
        assert!(json["soc_percent"].is_null());
        assert!(json["battery_voltage"].is_null());
        assert!(json["output_current"].is_null());
        assert!(json["battery_temperature"].is_null());
    }

    #[test]
    fn topic_is_namespaced_by_installation() {
        assert_eq!(topic_for("ups/status/", "a1b2c3d4"), "ups/status/a1b2c3d4");
    }
}
