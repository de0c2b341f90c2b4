// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the ups-monitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Utility module for common utilities used throughout the project

pub mod error_journal;
pub mod installation_id;

// Re-exports for use in other modules
pub use error_journal::{init_logger, route_error_logs, ErrorJournal};
pub use installation_id::{load_or_create, topic_safe};
