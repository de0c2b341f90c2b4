// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the ups-monitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

use std::time::Duration;

use thiserror::Error;

/// Failures talking to the UPS through the Modbus gateway.
///
/// These are "we could not talk to the device" conditions. A device that
/// answers with the `0xFFFF` sentinel is not an error and never produces one
/// of these.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FieldBusError {
    #[error("connection to {endpoint} failed: {reason}")]
    Connect { endpoint: String, reason: String },

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("device exception: {0}")]
    Exception(String),

    #[error("short response: expected {expected} words, got {actual}")]
    ShortResponse { expected: usize, actual: usize },

    #[error("not connected")]
    NotConnected,
}
