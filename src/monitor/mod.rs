// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the ups-monitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Poll loop
//!
//! The [`PollOrchestrator`] owns the field-bus client, the SOC history and the
//! sinks, and runs one poll cycle after another. Cycles never overlap: the
//! next one is only scheduled once the previous one has released its
//! connection.
//!
//! ## Usage
//!
//! ```no_run
//! use std::sync::atomic::AtomicBool;
//! use std::sync::Arc;
//! use std::time::Duration;
//! use ups_monitor::modbus::TokioModbusClient;
//! use ups_monitor::monitor::{MonitorContext, PollOrchestrator};
//! use ups_monitor::utility::ErrorJournal;
//!
//! async fn example() -> anyhow::Result<()> {
//!     let client = TokioModbusClient::new("192.168.1.100", 502, 192, Duration::from_secs(5));
//!     let mut orchestrator = PollOrchestrator::new(
//!         MonitorContext::default(),
//!         Box::new(client),
//!         ErrorJournal::console_only(),
//!     );
//!     orchestrator.run(Arc::new(AtomicBool::new(true))).await
//! }
//! ```

pub mod backoff;
pub mod orchestrator;
pub mod result;
pub mod state;

pub use backoff::BackoffStrategy;
pub use orchestrator::{CycleOutcome, CycleReport, MonitorContext, PollOrchestrator};
pub use result::{PollResult, RegisterReading};
pub use state::ConnectionState;
