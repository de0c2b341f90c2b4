// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the ups-monitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

use anyhow::Result;
use std::fs;
use std::path::Path;
use std::sync::Once;
use tempfile::tempdir;
use ups_monitor::config::Config;

static INIT: Once = Once::new();

// Setup logger for tests
fn setup() {
    INIT.call_once(|| {
        env_logger::builder()
            .filter_level(log::LevelFilter::Debug)
            .is_test(true)
            .init();
    });
}

/// Write `yaml`, load it, expect a failure and a valid sample next to it
fn assert_rejected_with_sample(yaml: &str) -> Result<String> {
    let temp_dir = tempdir()?;
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(&config_path, yaml)?;

    let err = Config::from_file(&config_path).expect_err("configuration should be rejected");

    let sample_path = config_path.with_extension("sample.yaml");
    assert!(Path::new(&sample_path).exists(), "Sample config file was not created");
    let sample_config = Config::from_file(&sample_path)?;
    assert_eq!(sample_config, Config::default());

    Ok(format!("{err:#}"))
}

#[test]
fn test_missing_config_file_is_fatal() -> Result<()> {
    setup();
    let temp_dir = tempdir()?;
    let config_path = temp_dir.path().join("config.yaml");

    let err = Config::from_file(&config_path).unwrap_err();
    assert!(err.to_string().contains("not found"));

    // No silent defaults: the config itself is not created, only the sample
    assert!(!config_path.exists());
    assert!(config_path.with_extension("sample.yaml").exists());
    Ok(())
}

#[test]
fn test_invalid_yaml_creates_sample_file() -> Result<()> {
    setup();
    let message = assert_rejected_with_sample("modbus: [host: : 502\n")?;
    assert!(message.contains("YAML"), "{message}");
    Ok(())
}

#[test]
fn test_schema_violation_creates_sample_file() -> Result<()> {
    setup();
    let message = assert_rejected_with_sample(
        r#"
modbus:
  host: 192.168.1.50
  port: "not-an-integer"
  unit_id: 192
"#,
    )?;
    assert!(message.contains("validation failed"), "{message}");
    Ok(())
}

#[test]
fn test_missing_modbus_section_is_rejected() -> Result<()> {
    setup();
    assert_rejected_with_sample("sinks: [csv]\n")?;
    Ok(())
}

#[test]
fn test_unknown_key_is_rejected() -> Result<()> {
    setup();
    assert_rejected_with_sample(
        r#"
modbus:
  host: 192.168.1.50
  port: 502
  unit_id: 192
  baudrate: 9600
sinks: [csv]
"#,
    )?;
    Ok(())
}

#[test]
fn test_inverted_calibration_is_rejected() -> Result<()> {
    setup();
    let message = assert_rejected_with_sample(
        r#"
modbus:
  host: 192.168.1.50
  port: 502
  unit_id: 192
sinks: [csv]
soc:
  empty_voltage: 27.5
  full_voltage: 20.4
"#,
    )?;
    assert!(message.contains("lower than full voltage"), "{message}");
    Ok(())
}

#[test]
fn test_mqtt_sink_without_broker_is_rejected() -> Result<()> {
    setup();
    let message = assert_rejected_with_sample(
        r#"
modbus:
  host: 192.168.1.50
  port: 502
  unit_id: 192
sinks: [csv, mqtt]
"#,
    )?;
    assert!(message.contains("no mqtt section"), "{message}");
    Ok(())
}

#[test]
fn test_duplicate_register_addresses_are_rejected() -> Result<()> {
    setup();
    assert_rejected_with_sample(
        r#"
modbus:
  host: 192.168.1.50
  port: 502
  unit_id: 192
sinks: [csv]
registers:
  - address: 8202
    label: Battery Voltage
    word_count: 1
  - address: 8202
    label: Battery Voltage again
    word_count: 1
"#,
    )?;
    Ok(())
}
