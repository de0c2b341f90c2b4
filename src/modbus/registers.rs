// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the ups-monitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Register catalog for the TRIO UPS
//!
//! The catalog is pure data: a list of holding registers with the metadata
//! needed to decode them. Adding a register to the list is enough to have it
//! read, decoded, displayed and published; no decoding or polling code needs
//! to change.
//!
//! ## Register Map
//!
//! | Address  | Label                            | Words | Unit   | Scale |
//! |----------|----------------------------------|-------|--------|-------|
//! | `0x2000` | Status Functions                 | 4     |        |       |
//! | `0x2002` | Status Interface                 | 2     |        |       |
//! | `0x2006` | Output Voltage                   | 1     | V      | 1000  |
//! | `0x2007` | Output Current                   | 1     | mA     | 1     |
//! | `0x200A` | Battery Voltage                  | 1     | V      | 1000  |
//! | `0x200B` | Battery Current                  | 1     | mA     | 1     |
//! | `0x200D` | Battery Temperature              | 1     | K      | 1     |
//! | `0x200E` | Device Temperature               | 1     | K      | 1     |
//! | `0x203C` | Remaining Time PC Shutdown (t31) | 1     | min    | 60    |
//! | `0x2024` | Battery Mode Time                | 2     | min    | 60    |
//! | `0x2026` | User Battery Mode Time           | 2     | min    | 60    |
//! | `0x1064` | Battery Capacity                 | 1     | 100mAh | 10    |
//! | `0x0010` | Device Name                      | 2     | ASCII  |       |

use std::collections::HashSet;
use std::fmt;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Status Functions register (battery mode, battery presence, sensor state)
pub const STATUS_FUNCTIONS: u16 = 0x2000;
/// Number of words in the Status Functions register
pub const STATUS_FUNCTIONS_WORDS: u16 = 4;
pub const OUTPUT_CURRENT: u16 = 0x2007;
pub const BATTERY_VOLTAGE: u16 = 0x200A;
pub const BATTERY_CURRENT: u16 = 0x200B;
pub const BATTERY_TEMPERATURE: u16 = 0x200D;
pub const DEVICE_TEMPERATURE: u16 = 0x200E;
pub const DEVICE_NAME: u16 = 0x0010;

/// Engineering unit attached to a register.
///
/// `Celsius` never appears in the catalog: it is the tag the decoder puts on
/// values read from `Kelvin` registers once they have been converted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Unit {
    #[default]
    #[serde(rename = "none")]
    None,
    #[serde(rename = "V")]
    Volt,
    #[serde(rename = "mA")]
    Milliamp,
    #[serde(rename = "K")]
    Kelvin,
    #[serde(rename = "°C")]
    Celsius,
    #[serde(rename = "min")]
    Minute,
    #[serde(rename = "100mAh")]
    Capacity100mAh,
    #[serde(rename = "ASCII")]
    Ascii,
}

impl Unit {
    /// Symbol used when rendering a value with this unit
    pub fn symbol(&self) -> &'static str {
        match self {
            Unit::None | Unit::Ascii => "",
            Unit::Volt => "V",
            Unit::Milliamp => "mA",
            Unit::Kelvin => "K",
            Unit::Celsius => "°C",
            Unit::Minute => "min",
            Unit::Capacity100mAh => "100mAh",
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Decode metadata for one holding register (or group of consecutive registers).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisterSpec {
    /// First holding register address
    pub address: u16,
    /// Human readable label, also used as the display key
    pub label: String,
    /// Number of 16-bit words to read (1, 2 or 4)
    pub word_count: u16,
    /// Engineering unit of the decoded value
    #[serde(default)]
    pub unit: Unit,
    /// Divisor applied to the raw value, when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<f64>,
}

impl RegisterSpec {
    pub fn new(
        address: u16,
        label: impl Into<String>,
        word_count: u16,
        unit: Unit,
        scale: Option<f64>,
    ) -> Self {
        Self {
            address,
            label: label.into(),
            word_count,
            unit,
            scale,
        }
    }
}

/// Ordered, immutable list of registers polled every cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct RegisterCatalog {
    registers: Vec<RegisterSpec>,
}

impl Default for RegisterCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

impl RegisterCatalog {
    /// The TRIO UPS register map.
    pub fn standard() -> Self {
        Self {
            registers: vec![
                RegisterSpec::new(STATUS_FUNCTIONS, "Status Functions", 4, Unit::None, None),
                RegisterSpec::new(0x2002, "Status Interface", 2, Unit::None, None),
                RegisterSpec::new(0x2006, "Output Voltage", 1, Unit::Volt, Some(1000.0)),
                RegisterSpec::new(OUTPUT_CURRENT, "Output Current", 1, Unit::Milliamp, Some(1.0)),
                RegisterSpec::new(BATTERY_VOLTAGE, "Battery Voltage", 1, Unit::Volt, Some(1000.0)),
                RegisterSpec::new(BATTERY_CURRENT, "Battery Current", 1, Unit::Milliamp, Some(1.0)),
                RegisterSpec::new(BATTERY_TEMPERATURE, "Battery Temperature", 1, Unit::Kelvin, Some(1.0)),
                RegisterSpec::new(DEVICE_TEMPERATURE, "Device Temperature", 1, Unit::Kelvin, Some(1.0)),
                RegisterSpec::new(0x203C, "Remaining Time PC Shutdown (t31)", 1, Unit::Minute, Some(60.0)),
                RegisterSpec::new(0x2024, "Battery Mode Time", 2, Unit::Minute, Some(60.0)),
                RegisterSpec::new(0x2026, "User Battery Mode Time", 2, Unit::Minute, Some(60.0)),
                RegisterSpec::new(0x1064, "Battery Capacity", 1, Unit::Capacity100mAh, Some(10.0)),
                RegisterSpec::new(DEVICE_NAME, "Device Name", 2, Unit::Ascii, None),
            ],
        }
    }

    /// Build a catalog from user supplied specs after validating them.
    pub fn from_specs(registers: Vec<RegisterSpec>) -> Result<Self> {
        validate_specs(&registers)?;
        Ok(Self { registers })
    }

    /// Registers in display order
    pub fn lookup(&self) -> &[RegisterSpec] {
        &self.registers
    }

    pub fn find(&self, address: u16) -> Option<&RegisterSpec> {
        self.registers.iter().find(|spec| spec.address == address)
    }

    pub fn len(&self) -> usize {
        self.registers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registers.is_empty()
    }
}

/// Check word counts, scales and address uniqueness of a register list.
pub fn validate_specs(registers: &[RegisterSpec]) -> Result<()> {
    let mut seen = HashSet::new();
    for spec in registers {
        if !matches!(spec.word_count, 1 | 2 | 4) {
            anyhow::bail!(
                "Register '{}' (0x{:04X}) has unsupported word count {} (expected 1, 2 or 4)",
                spec.label,
                spec.address,
                spec.word_count
            );
        }
        if let Some(scale) = spec.scale {
            if !(scale.is_finite() && scale > 0.0) {
                anyhow::bail!(
                    "Register '{}' (0x{:04X}) has invalid scale {}",
                    spec.label,
                    spec.address,
                    scale
                );
            }
        }
        if spec.unit == Unit::Celsius {
            anyhow::bail!(
                "Register '{}' (0x{:04X}) cannot declare °C, declare K and let the decoder convert",
                spec.label,
                spec.address
            );
        }
        if !seen.insert(spec.address) {
            anyhow::bail!("Duplicate register address 0x{:04X}", spec.address);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_catalog_is_valid() {
        let catalog = RegisterCatalog::standard();
        assert_eq!(catalog.len(), 13);
        assert!(validate_specs(catalog.lookup()).is_ok());
    }

    #[test]
    fn find_returns_battery_voltage() {
        let catalog = RegisterCatalog::standard();
        let spec = catalog.find(BATTERY_VOLTAGE).expect("battery voltage present");
        assert_eq!(spec.label, "Battery Voltage");
        assert_eq!(spec.unit, Unit::Volt);
        assert_eq!(spec.scale, Some(1000.0));
        assert!(catalog.find(0x9999).is_none());
    }

    #[test]
    fn from_specs_rejects_bad_word_count() {
        let specs = vec![RegisterSpec::new(0x1000, "Odd", 3, Unit::None, None)];
        assert!(RegisterCatalog::from_specs(specs).is_err());
    }

    #[test]
    fn from_specs_rejects_non_positive_scale() {
        let specs = vec![RegisterSpec::new(0x1000, "Zero", 1, Unit::Volt, Some(0.0))];
        assert!(RegisterCatalog::from_specs(specs).is_err());
    }

    #[test]
    fn from_specs_rejects_duplicate_addresses() {
        let specs = vec![
            RegisterSpec::new(0x1000, "A", 1, Unit::None, None),
            RegisterSpec::new(0x1000, "B", 1, Unit::None, None),
        ];
        let err = RegisterCatalog::from_specs(specs).unwrap_err();
        assert!(err.to_string().contains("Duplicate"));
    }

    #[test]
    fn unit_deserializes_from_symbols() {
        let spec: RegisterSpec = serde_yml::from_str(
            "address: 8205\nlabel: Battery Temperature\nword_count: 1\nunit: K\nscale: 1.0\n",
        )
        .unwrap();
        assert_eq!(spec.unit, Unit::Kelvin);
        assert_eq!(spec.address, 0x200D);
    }
}
