// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the ups-monitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Modbus TCP gateway configuration
//!
//! This module defines where the UPS is reached: the Modbus TCP-to-RTU
//! gateway address and the unit id of the UPS behind it.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration of the field-bus connection.
///
/// # Fields
///
/// * `host` - Gateway host name or IP address
/// * `port` - Gateway TCP port (default: 502)
/// * `unit_id` - Modbus unit id of the UPS (default: 1)
/// * `timeout_secs` - Bound on every connect and read call (default: 5)
///
/// # Example
///
/// ```
/// use ups_monitor::config::ModbusConfig;
///
/// let modbus_config = ModbusConfig {
///     host: "192.168.1.50".to_string(),
///     port: 502,
///     unit_id: 192,
///     timeout_secs: 5,
/// };
/// assert_eq!(modbus_config.endpoint(), "192.168.1.50:502");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModbusConfig {
    /// The gateway host name or IP address.
    pub host: String,

    /// The TCP port of the gateway.
    ///
    /// Valid range is 1-65535. 502 is the standard Modbus TCP port.
    pub port: u16,

    /// The Modbus unit (slave) id of the UPS.
    pub unit_id: u8,

    /// Timeout applied to every connect and read call, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    5
}

impl ModbusConfig {
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ModbusConfig {
    fn default() -> Self {
        Self {
            host: "192.168.1.100".to_string(),
            port: 502,
            unit_id: 1,
            timeout_secs: default_timeout_secs(),
        }
    }
}
