// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the ups-monitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

use serde::Serialize;

/// Word 0 bit set while the UPS runs from its battery
pub const BATTERY_MODE_MASK: u16 = 0x0004;
/// Word 1 bit set when a battery is connected
pub const BATTERY_PRESENT_MASK: u16 = 0x0100;
/// Word 1 bit set when the battery temperature sensor is connected
pub const TEMP_SENSOR_MASK: u16 = 0x1000;

/// Flags derived from the Status Functions register.
///
/// The flags only mean something when the register was read. A failed read
/// yields [`StatusFlags::degraded`]: every flag false, `degraded` set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct StatusFlags {
    pub battery_mode: bool,
    pub battery_present: bool,
    pub temp_sensor_connected: bool,
    pub degraded: bool,
}

impl StatusFlags {
    /// Derive the flags from the Status Functions words.
    ///
    /// Fewer than two words means the read was unusable.
    pub fn from_words(words: &[u16]) -> Self {
        match words {
            [word0, word1, ..] => Self {
                battery_mode: word0 & BATTERY_MODE_MASK != 0,
                battery_present: word1 & BATTERY_PRESENT_MASK != 0,
                temp_sensor_connected: word1 & TEMP_SENSOR_MASK != 0,
                degraded: false,
            },
            _ => Self::degraded(),
        }
    }

    pub fn degraded() -> Self {
        Self {
            degraded: true,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_mains_operation() {
        let flags = StatusFlags::from_words(&[0x0000, 0x1100, 0, 0]);
        assert!(!flags.battery_mode);
        assert!(flags.battery_present);
        assert!(flags.temp_sensor_connected);
        assert!(!flags.degraded);
    }

    #[test]
    fn decodes_battery_mode() {
        let flags = StatusFlags::from_words(&[0x0004, 0x0100, 0, 0]);
        assert!(flags.battery_mode);
        assert!(flags.battery_present);
        assert!(!flags.temp_sensor_connected);
    }

    #[test]
    fn short_read_is_degraded() {
        let flags = StatusFlags::from_words(&[0x0004]);
        assert_eq!(flags, StatusFlags::degraded());
        assert!(!flags.battery_mode);
    }
}
