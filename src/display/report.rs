// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the ups-monitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

use std::fmt::Write;

use crate::modbus::DecodedValue;
use crate::monitor::{PollResult, RegisterReading};

/// Width of the label column
const LABEL_WIDTH: usize = 35;

/// Console report of one poll: status flags, every register, SOC estimate.
pub fn render_report(result: &PollResult) -> String {
    let mut out = String::new();
    let status = result.status();

    if status.degraded {
        out.push_str("Status registers      : Unavailable\n");
    }
    let _ = writeln!(
        out,
        "Battery Mode          : {}",
        if status.battery_mode {
            "Active (Battery Mode)"
        } else {
            "Inactive (Grid Power)"
        }
    );
    let _ = writeln!(
        out,
        "Battery Present       : {}",
        if status.battery_present { "Yes" } else { "No" }
    );
    let _ = writeln!(
        out,
        "Temperature Sensor    : {}",
        if status.temp_sensor_connected {
            "Connected"
        } else {
            "Not Connected"
        }
    );

    for reading in result.readings() {
        out.push_str(&format_reading(reading));
        out.push('\n');
    }

    match (result.soc(), result.battery_voltage()) {
        (Some(soc), Some(voltage)) => {
            let _ = writeln!(
                out,
                "\nEstimated Battery SOC  : {:.2}% (Voltage: {:.2} V)",
                soc.percent, voltage
            );
        }
        _ => out.push_str("\nEstimated Battery SOC  : N/A (Battery Voltage not available)\n"),
    }
    out
}

/// One register line, `label: value unit (Raw: 0x....)`
pub fn format_reading(reading: &RegisterReading) -> String {
    let label = &reading.spec.label;
    match &reading.value {
        DecodedValue::Numeric { value, raw, unit } => {
            let raw_text = if reading.spec.word_count == 1 {
                format!("0x{raw:04X}")
            } else {
                format!("0x{raw:08X}")
            };
            let symbol = unit.symbol();
            if symbol.is_empty() {
                format!("{label:<LABEL_WIDTH$}: {value:.2} (Raw: {raw_text})")
            } else {
                format!("{label:<LABEL_WIDTH$}: {value:.2} {symbol} (Raw: {raw_text})")
            }
        }
        DecodedValue::Text(text) => format!("{label:<LABEL_WIDTH$}: {text}"),
        DecodedValue::Unavailable => format!("{label:<LABEL_WIDTH$}: Unavailable"),
        DecodedValue::Error(_) => format!("{label:<LABEL_WIDTH$}: ERROR reading"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modbus::{decode, FieldBusError, RegisterSpec, StatusFlags, Unit};
    use chrono::Local;

    fn reading(spec: RegisterSpec, words: &[u16]) -> RegisterReading {
        let value = decode(&spec, words);
        RegisterReading { spec, value }
    }

    #[test]
    fn kelvin_register_is_shown_in_celsius() {
        let line = format_reading(&reading(
            RegisterSpec::new(0x200D, "Battery Temperature", 1, Unit::Kelvin, Some(1.0)),
            &[298],
        ));
        assert_eq!(
            line,
            format!("{:<35}: 24.85 °C (Raw: 0x012A)", "Battery Temperature")
        );
    }

    #[test]
    fn two_word_register_shows_wide_raw() {
        let line = format_reading(&reading(
            RegisterSpec::new(0x2024, "Battery Mode Time", 2, Unit::Minute, Some(60.0)),
            &[0, 600],
        ));
        assert!(line.ends_with(": 10.00 min (Raw: 0x00000258)"), "{line}");
    }

    #[test]
    fn failures_and_sentinels_are_distinct() {
        let spec = RegisterSpec::new(0x203C, "Remaining Time", 1, Unit::Minute, Some(60.0));
        let unavailable = format_reading(&reading(spec.clone(), &[0xFFFF]));
        let failed = format_reading(&RegisterReading {
            spec,
            value: DecodedValue::Error(FieldBusError::NotConnected),
        });
        assert!(unavailable.ends_with(": Unavailable"));
        assert!(failed.ends_with(": ERROR reading"));
    }

    #[test]
    fn report_without_voltage_has_no_soc() {
        let result = PollResult::new(Local::now(), StatusFlags::degraded(), Vec::new(), None, None);
        let report = render_report(&result);
        assert!(report.contains("Status registers      : Unavailable"));
        assert!(report.contains("Inactive (Grid Power)"));
        assert!(report.contains("N/A (Battery Voltage not available)"));
    }
}
