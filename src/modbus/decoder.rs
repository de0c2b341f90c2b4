// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the ups-monitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Register value decoding
//!
//! Turns raw 16-bit word sequences into scaled values. The result is always
//! one of four cases so that consumers can tell "the device has nothing to
//! report" (`Unavailable`) apart from "we could not read it" (`Error`).

use chrono::{DateTime, Local};

use super::error::FieldBusError;
use super::registers::{RegisterSpec, Unit};

/// Sentinel the UPS returns for every word of a register without data
pub const UNAVAILABLE_WORD: u16 = 0xFFFF;

/// Offset between Kelvin and Celsius
pub const KELVIN_OFFSET: f64 = 273.15;

/// Words read for one register during one poll.
#[derive(Debug, Clone, PartialEq)]
pub struct RawReading {
    pub address: u16,
    pub words: Vec<u16>,
    pub fetched_at: DateTime<Local>,
}

/// Decoded content of a register.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedValue {
    /// Scaled value, the raw integer it came from and the unit of `value`
    Numeric { value: f64, raw: u32, unit: Unit },
    /// ASCII packed field
    Text(String),
    /// Device answered with the `0xFFFF` sentinel
    Unavailable,
    /// The read itself failed
    Error(FieldBusError),
}

impl DecodedValue {
    /// Numeric value, if any. `Unavailable` and `Error` both yield `None`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            DecodedValue::Numeric { value, .. } => Some(*value),
            _ => None,
        }
    }

    pub fn raw(&self) -> Option<u32> {
        match self {
            DecodedValue::Numeric { raw, .. } => Some(*raw),
            _ => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, DecodedValue::Error(_))
    }
}

/// Decode the words of a register according to its spec.
///
/// Decoding is a pure function of `spec` and `words`: decoding the same words
/// twice gives the same value, the Kelvin offset is never applied twice.
pub fn decode(spec: &RegisterSpec, words: &[u16]) -> DecodedValue {
    let expected = spec.word_count as usize;
    if words.len() < expected || words.is_empty() {
        return DecodedValue::Error(FieldBusError::ShortResponse {
            expected,
            actual: words.len(),
        });
    }
    let words = &words[..expected];

    if words.iter().all(|&word| word == UNAVAILABLE_WORD) {
        return DecodedValue::Unavailable;
    }

    if spec.unit == Unit::Ascii {
        return DecodedValue::Text(decode_ascii(words));
    }

    let raw = if words.len() == 1 {
        u32::from(words[0])
    } else {
        (u32::from(words[0]) << 16) | u32::from(words[1])
    };

    let value = match spec.scale {
        Some(scale) => f64::from(raw) / scale,
        None => f64::from(raw),
    };

    match spec.unit {
        Unit::Kelvin => DecodedValue::Numeric {
            value: value - KELVIN_OFFSET,
            raw,
            unit: Unit::Celsius,
        },
        unit => DecodedValue::Numeric { value, raw, unit },
    }
}

/// Fold the outcome of a register read into a decoded value.
pub fn decode_reading(spec: &RegisterSpec, read: Result<Vec<u16>, FieldBusError>) -> DecodedValue {
    match read {
        Ok(words) => decode(spec, &words),
        Err(cause) => DecodedValue::Error(cause),
    }
}

/// Unpack two characters per word, high byte first.
fn decode_ascii(words: &[u16]) -> String {
    let text: String = words
        .iter()
        .flat_map(|word| word.to_be_bytes())
        .map(char::from)
        .collect();
    text.trim_end_matches(|c: char| c == '\0' || c.is_whitespace())
        .to_string()
}
