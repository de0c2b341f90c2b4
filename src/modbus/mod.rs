// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the ups-monitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Modbus communication module
//!
//! Everything needed to talk to the TRIO UPS through its Modbus TCP-to-RTU
//! gateway: the register catalog, the value decoder, the status flags and the
//! client the poll loop drives. A simulated UPS server is provided for bench
//! testing without hardware.
//!
//! ## Key Components
//!
//! - [`RegisterCatalog`]: the holding registers polled every cycle
//! - [`decode`]: raw words to [`DecodedValue`]
//! - [`StatusFlags`]: battery mode, battery presence and sensor state
//! - [`FieldBusClient`] / [`TokioModbusClient`]: connect, read, close
//! - [`UpsSimulator`]: Modbus TCP server answering like the UPS
//!
//! ## Usage
//!
//! ```no_run
//! use std::time::Duration;
//! use ups_monitor::modbus::{decode_reading, FieldBusClient, RegisterCatalog, TokioModbusClient};
//!
//! async fn example() {
//!     let catalog = RegisterCatalog::standard();
//!     let mut client = TokioModbusClient::new("192.168.1.50", 502, 1, Duration::from_secs(5));
//!     if client.connect().await.is_ok() {
//!         for spec in catalog.lookup() {
//!             let read = client.read_holding_registers(spec.address, spec.word_count, 1).await;
//!             println!("{}: {:?}", spec.label, decode_reading(spec, read));
//!         }
//!     }
//!     client.close().await;
//! }
//! ```

pub mod client;
pub mod decoder;
pub mod error;
pub mod registers;
pub mod simulator;
pub mod status;

pub use client::{FieldBusClient, TokioModbusClient};
pub use decoder::{decode, decode_reading, DecodedValue, RawReading};
pub use error::FieldBusError;
pub use registers::{RegisterCatalog, RegisterSpec, Unit};
pub use simulator::UpsSimulator;
pub use status::StatusFlags;
