// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the ups-monitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Configuration management for the UPS monitor
//!
//! This module provides functionality for loading, validating, and applying
//! configuration settings. The configuration is backed by a YAML file and
//! validated against a JSON schema for robustness. Any configuration problem is
//! fatal at startup: the monitor never falls back to defaults silently.
//!
//! ## Configuration Structure
//!
//! - `modbus`: Modbus TCP gateway and UPS unit id (required)
//! - `mqtt`: MQTT broker, credentials and base topic (required with the `mqtt` sink)
//! - `storage`: CSV log, error log and installation id files
//! - `polling`: adaptive poll intervals and connection backoff
//! - `soc`: state of charge calibration and history bounds
//! - `display`: console report
//! - `sinks`: active sinks, any of `csv` and `mqtt`
//! - `registers`: optional replacement of the register catalog
//!
//! ## Usage
//!
//! ```no_run
//! use ups_monitor::config::Config;
//! use std::path::Path;
//!
//! // Load config from file, fails when missing or invalid
//! let mut config = Config::from_file(Path::new("config.yaml")).unwrap();
//!
//! // Apply command line overrides if needed
//! config.apply_args(
//!     Some("10.0.0.20".to_string()), // Modbus host
//!     None,                          // Modbus port
//!     Some(192),                     // Unit id
//!     None,                          // MQTT host
//!     None,                          // MQTT port
//! );
//!
//! println!("Polling {}", config.modbus.endpoint());
//! ```

pub mod display;
pub mod modbus;
pub mod mqtt;
pub mod polling;
pub mod soc;
pub mod storage;
pub mod utils;

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use log::{debug, error, warn};
use serde::{Deserialize, Serialize};

use crate::modbus::{RegisterCatalog, RegisterSpec};
use crate::sinks::SinkKind;

// Re-export all types for public API
pub use display::DisplayConfig;
pub use modbus::ModbusConfig;
pub use mqtt::MqttConfig;
pub use polling::PollingConfig;
pub use soc::SocConfig;
pub use storage::StorageConfig;
pub use utils::{is_valid_ip_address, output_config_schema, validate_specific_rules};

/// JSON schema the YAML configuration is validated against
pub const CONFIG_SCHEMA: &str = include_str!("../../resources/config.schema.json");

/// Root configuration structure for the UPS monitor.
///
/// Deserialized from YAML with serde after the document has passed the JSON
/// schema. Every section except `modbus` has defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Modbus TCP gateway settings.
    pub modbus: ModbusConfig,

    /// MQTT broker settings.
    ///
    /// Only needed when the `mqtt` sink is active.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mqtt: Option<MqttConfig>,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub polling: PollingConfig,

    #[serde(default)]
    pub soc: SocConfig,

    #[serde(default)]
    pub display: DisplayConfig,

    /// Active sinks. Both the CSV log and MQTT by default.
    #[serde(default = "default_sinks")]
    pub sinks: Vec<SinkKind>,

    /// Replacement register catalog. The TRIO UPS table when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registers: Option<Vec<RegisterSpec>>,
}

fn default_sinks() -> Vec<SinkKind> {
    vec![SinkKind::Csv, SinkKind::Mqtt]
}

impl Default for Config {
    fn default() -> Self {
        Self {
            modbus: ModbusConfig::default(),
            mqtt: Some(MqttConfig::default()),
            storage: StorageConfig::default(),
            polling: PollingConfig::default(),
            soc: SocConfig::default(),
            display: DisplayConfig::default(),
            sinks: default_sinks(),
            registers: None,
        }
    }
}

impl Config {
    /// Helper method to create a sample config file when loading fails
    fn create_sample_config<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        let sample_path = path.with_extension("sample.yaml");
        debug!("Original path: {:?}, Sample path: {:?}", path, sample_path);

        // Create parent directories if they don't exist
        if let Some(parent) = sample_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                debug!("Creating parent directory: {:?}", parent);
                fs::create_dir_all(parent).with_context(|| {
                    format!(
                        "Failed to create parent directory for sample config at {:?}",
                        parent
                    )
                })?;
            }
        }

        let sample_config = Self::default();
        sample_config
            .save_to_file(&sample_path)
            .with_context(|| format!("Failed to save sample config to {:?}", sample_path))?;

        error!(
            "Sample configuration file created at {:?}\nPlease edit and rename it",
            sample_path
        );
        Ok(())
    }

    /// Write the sample file, logging instead of failing so the original error wins
    fn offer_sample_config(path: &Path) {
        if let Err(e) = Self::create_sample_config(path) {
            warn!("Failed to create sample config: {:#}", e);
        }
    }

    /// Load configuration from a file
    ///
    /// The file is parsed as YAML, validated against [`CONFIG_SCHEMA`],
    /// deserialized and finally checked by [`validate_specific_rules`]. A
    /// missing file is an error; in every failure case a `*.sample.yaml`
    /// with defaults is written next to the expected path.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            error!("Configuration file not found at {:?}", path);
            Self::offer_sample_config(path);
            anyhow::bail!("Configuration file {} not found", path.display());
        }

        debug!("Loading configuration from {:?}", path);
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file at {:?}", path))?;

        let config = match Self::from_yaml_str(&contents) {
            Ok(config) => config,
            Err(err) => {
                error!("Configuration error in {}: {:#}", path.display(), err);
                Self::offer_sample_config(path);
                return Err(err.context(format!("Invalid configuration file {}", path.display())));
            }
        };

        Ok(config)
    }

    /// Parse, validate and check a YAML document
    pub fn from_yaml_str(contents: &str) -> Result<Self> {
        // First step: convert YAML to a generic Value
        let yaml_value: serde_yml::Value =
            serde_yml::from_str(contents).context("Failed to parse YAML configuration")?;

        // Convert to JSON Value for validation
        let json_value =
            serde_json::to_value(&yaml_value).context("Failed to convert YAML to JSON for validation")?;

        let schema: serde_json::Value =
            serde_json::from_str(CONFIG_SCHEMA).context("Failed to parse JSON schema")?;

        let validator = jsonschema::draft202012::options()
            .should_validate_formats(true)
            .build(&schema)?;

        debug!("Validating configuration against schema");
        if let Err(error) = validator.validate(&json_value) {
            anyhow::bail!("Configuration validation failed: {}", error);
        }

        // Now that YAML has been validated, deserialize to Config
        debug!("Schema validation passed, deserializing into Config structure");
        let config: Config =
            serde_yml::from_str(contents).context("Failed to deserialize configuration")?;

        // Perform additional specific validations
        utils::validate_specific_rules(&config)?;

        Ok(config)
    }

    /// Save the configuration to a file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml =
            serde_yml::to_string(self).context("Failed to serialize configuration to YAML")?;

        let mut file = File::create(path.as_ref())
            .with_context(|| format!("Failed to create config file at {:?}", path.as_ref()))?;

        file.write_all(yaml.as_bytes())
            .with_context(|| format!("Failed to write configuration to {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Whether `kind` is among the active sinks
    pub fn sink_enabled(&self, kind: SinkKind) -> bool {
        self.sinks.contains(&kind)
    }

    /// Register catalog to poll, the configured one or the TRIO UPS table
    pub fn catalog(&self) -> Result<RegisterCatalog> {
        match &self.registers {
            Some(specs) => RegisterCatalog::from_specs(specs.clone()),
            None => Ok(RegisterCatalog::standard()),
        }
    }

    /// Apply command line arguments to override configuration values.
    ///
    /// Only explicitly provided values override the loaded configuration.
    /// MQTT overrides are ignored, with a warning, when there is no `mqtt`
    /// section to apply them to.
    pub fn apply_args(
        &mut self,
        modbus_host: Option<String>,
        modbus_port: Option<u16>,
        unit_id: Option<u8>,
        mqtt_host: Option<String>,
        mqtt_port: Option<u16>,
    ) {
        if let Some(host) = modbus_host {
            debug!("Overriding Modbus host from command line: {}", host);
            self.modbus.host = host;
        }
        if let Some(port) = modbus_port {
            debug!("Overriding Modbus port from command line: {}", port);
            self.modbus.port = port;
        }
        if let Some(unit_id) = unit_id {
            debug!("Overriding Modbus unit id from command line: {}", unit_id);
            self.modbus.unit_id = unit_id;
        }

        if mqtt_host.is_none() && mqtt_port.is_none() {
            return;
        }
        match self.mqtt.as_mut() {
            Some(mqtt) => {
                if let Some(host) = mqtt_host {
                    debug!("Overriding MQTT host from command line: {}", host);
                    mqtt.host = host;
                }
                if let Some(port) = mqtt_port {
                    debug!("Overriding MQTT port from command line: {}", port);
                    mqtt.port = port;
                }
            }
            None => warn!("MQTT overrides ignored: the configuration has no mqtt section"),
        }
    }
}
