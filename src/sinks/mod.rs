// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the ups-monitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Sink adapters
//!
//! Destinations of the poll results. The orchestrator invokes every active
//! sink once per cycle; a failing sink is logged and never prevents the other
//! one from running.
//!
//! # Architecture
//!
//! ```text
//!      PollOrchestrator
//!        ↓          ↓
//!  CsvLogSink   MessagePublisher trait
//!                   ↓
//!             MqttPublisher
//! ```

pub mod csv_log;
pub mod mqtt;
pub mod payload;

pub use csv_log::{CsvLogSink, HeaderStatus};
pub use mqtt::MqttPublisher;
pub use payload::UpsPayload;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Sinks that can be enabled from configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    Csv,
    Mqtt,
}

/// Trait for publish/subscribe messaging endpoints
///
/// The connection is long-lived: it is opened once and reopened only after a
/// failure has been observed.
#[async_trait]
pub trait MessagePublisher: Send + Sync + std::fmt::Debug {
    /// Establish the connection to the broker
    ///
    /// Calling it on a connected publisher replaces the connection.
    async fn connect(&mut self) -> Result<()>;

    /// Publish `payload` on `topic` with at-least-once delivery
    async fn publish(&mut self, topic: &str, payload: Vec<u8>) -> Result<()>;

    /// Whether the connection is currently believed to be up
    fn is_connected(&self) -> bool;

    /// Publisher type identifier for logging
    fn publisher_type(&self) -> &str;

    /// Close the connection gracefully
    async fn shutdown(&mut self) -> Result<()> {
        Ok(())
    }
}
