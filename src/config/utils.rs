// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the ups-monitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Configuration utilities
//!
//! This module provides utility functions for working with configuration
//! settings, including validation and schema management.

use anyhow::{Context, Result};
use log::debug;

use super::{Config, CONFIG_SCHEMA};
use crate::modbus::registers::validate_specs;
use crate::sinks::SinkKind;

/// Output the embedded JSON schema to the console.
///
/// This function is called when the `--show-config-schema` flag is provided
/// on the command line.
///
/// # Example
///
/// ```bash
/// ./ups-monitor --show-config-schema > config_schema.json
/// ```
pub fn output_config_schema() -> Result<()> {
    let schema: serde_json::Value =
        serde_json::from_str(CONFIG_SCHEMA).context("Failed to parse JSON schema")?;

    let formatted_schema =
        serde_json::to_string_pretty(&schema).context("Failed to format JSON schema")?;

    println!("{}", formatted_schema);

    Ok(())
}

/// Check if a string is a valid IP address
///
/// Validates that a string represents a valid IPv4 or IPv6 address,
/// or is one of the special values like "localhost" or "0.0.0.0".
pub fn is_valid_ip_address(addr: &str) -> bool {
    if addr.parse::<std::net::IpAddr>().is_ok() {
        return true;
    }

    // Special cases
    matches!(addr, "localhost" | "::" | "::0" | "0.0.0.0")
}

/// Validates the configuration against additional rules that aren't covered by the JSON schema.
///
/// # Validation Rules
///
/// - **MQTT section**: required when the `mqtt` sink is active, with a non-empty host and base topic
/// - **Ports**: Modbus and MQTT ports must not be 0
/// - **SOC calibration**: finite voltages with `empty_voltage < full_voltage`
/// - **Polling**: intervals of at least one second, a non-zero SOC history capacity
/// - **Register catalog**: word counts, scales and unique addresses of a custom catalog
pub fn validate_specific_rules(config: &Config) -> Result<()> {
    debug!("Performing additional validation checks");

    if config.modbus.host.trim().is_empty() {
        anyhow::bail!("Modbus host must not be empty");
    }
    if config.modbus.port == 0 {
        anyhow::bail!("Invalid Modbus port number: {}", config.modbus.port);
    }
    if config.modbus.timeout_secs == 0 {
        anyhow::bail!("Modbus timeout must be at least one second");
    }
    if !is_valid_ip_address(&config.modbus.host) {
        // Host names are fine, only noted for troubleshooting
        debug!("Modbus host is not an IP address: {}", config.modbus.host);
    }

    if config.sinks.contains(&SinkKind::Mqtt) {
        let Some(mqtt) = &config.mqtt else {
            anyhow::bail!("The mqtt sink is enabled but the configuration has no mqtt section");
        };
        if mqtt.host.trim().is_empty() {
            anyhow::bail!("MQTT host must not be empty");
        }
        if mqtt.port == 0 {
            anyhow::bail!("Invalid MQTT port number: {}", mqtt.port);
        }
        if mqtt.base_topic.trim_end_matches('/').is_empty() {
            anyhow::bail!("MQTT base topic must not be empty");
        }
        if mqtt.base_topic.contains(['+', '#']) {
            anyhow::bail!("MQTT base topic must not contain wildcards: {}", mqtt.base_topic);
        }
    }

    let calibration = &config.soc.calibration;
    if !(calibration.empty_voltage.is_finite() && calibration.full_voltage.is_finite()) {
        anyhow::bail!("SOC calibration voltages must be finite numbers");
    }
    if calibration.empty_voltage >= calibration.full_voltage {
        anyhow::bail!(
            "SOC empty voltage ({} V) must be lower than full voltage ({} V)",
            calibration.empty_voltage,
            calibration.full_voltage
        );
    }
    if config.soc.history_capacity == 0 {
        anyhow::bail!("SOC history capacity must be at least 1");
    }

    if config.polling.battery_mode_interval_secs == 0 || config.polling.mains_interval_secs == 0 {
        anyhow::bail!("Polling intervals must be at least one second");
    }

    if let Some(registers) = &config.registers {
        if registers.is_empty() {
            anyhow::bail!("The register list must not be empty");
        }
        validate_specs(registers).context("Invalid register catalog")?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MqttConfig;

    #[test]
    fn default_config_passes() {
        assert!(validate_specific_rules(&Config::default()).is_ok());
    }

    #[test]
    fn mqtt_sink_requires_mqtt_section() {
        let mut config = Config::default();
        config.mqtt = None;
        assert!(validate_specific_rules(&config).is_err());

        config.sinks = vec![SinkKind::Csv];
        assert!(validate_specific_rules(&config).is_ok());
    }

    #[test]
    fn inverted_calibration_is_rejected() {
        let mut config = Config::default();
        config.soc.calibration.empty_voltage = 28.0;
        let err = validate_specific_rules(&config).unwrap_err();
        assert!(err.to_string().contains("lower than full voltage"));
    }

    #[test]
    fn wildcard_topic_is_rejected() {
        let mut config = Config::default();
        config.mqtt = Some(MqttConfig {
            base_topic: "ups/#".to_string(),
            ..MqttConfig::default()
        });
        assert!(validate_specific_rules(&config).is_err());
    }

    #[test]
    fn ip_address_helper() {
        assert!(is_valid_ip_address("192.168.1.50"));
        assert!(is_valid_ip_address("localhost"));
        assert!(!is_valid_ip_address("ups-gateway.lan"));
    }
}
