// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the ups-monitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Console rendering of poll results
//!
//! Thin consumers of the structured results: they format, they never decide.

pub mod report;
pub mod trend;

pub use report::{format_reading, render_report};
pub use trend::render_trend;
