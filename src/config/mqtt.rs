// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the ups-monitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! MQTT broker configuration

use serde::{Deserialize, Serialize};

/// Configuration of the MQTT publisher.
///
/// Required whenever the `mqtt` sink is active. Messages are published on
/// `{base_topic}/{installation_id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MqttConfig {
    /// Broker host name or IP address
    pub host: String,

    /// Broker TCP port, usually 1883
    pub port: u16,

    /// User name; an empty string disables authentication
    pub username: String,

    pub password: String,

    /// Topic prefix, a trailing `/` is ignored
    pub base_topic: String,

    /// MQTT client id, defaults to `ups-monitor-{installation_id}`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,

    /// Keep-alive interval in seconds
    #[serde(default = "default_keep_alive_secs")]
    pub keep_alive_secs: u64,

    /// Time allowed for the broker to acknowledge a connection, in seconds
    #[serde(default = "default_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Time allowed for one publish call, in seconds
    #[serde(default = "default_timeout_secs")]
    pub publish_timeout_secs: u64,
}

fn default_keep_alive_secs() -> u64 {
    60
}

fn default_timeout_secs() -> u64 {
    5
}

impl MqttConfig {
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 1883,
            username: String::new(),
            password: String::new(),
            base_topic: "ups/status".to_string(),
            client_id: None,
            keep_alive_secs: default_keep_alive_secs(),
            connect_timeout_secs: default_timeout_secs(),
            publish_timeout_secs: default_timeout_secs(),
        }
    }
}
