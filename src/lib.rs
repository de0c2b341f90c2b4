// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the ups-monitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! UPS monitor library
//!
//! Polls a TRIO UPS through a Modbus TCP gateway, estimates the battery state
//! of charge and forwards every reading to a CSV log and an MQTT broker.

pub mod config;
pub mod daemon;
pub mod display;
pub mod modbus;
pub mod monitor;
pub mod sinks;
pub mod soc;
pub mod utility;
