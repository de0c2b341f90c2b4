// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the ups-monitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Stable per-installation identifier
//!
//! The identifier namespaces the MQTT topic. It is generated once (8 hex
//! characters of a random UUID), stored in a small text file and reused on
//! every later start.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use log::info;
use uuid::Uuid;

/// Length of a generated identifier
pub const ID_LENGTH: usize = 8;

/// Read the identifier from `path`, or generate and persist a new one.
///
/// An empty or whitespace-only file is treated as missing.
pub fn load_or_create(path: &Path) -> Result<String> {
    if path.exists() {
        let stored = fs::read_to_string(path)
            .with_context(|| format!("Failed to read installation id from {}", path.display()))?;
        let stored = stored.trim();
        if !stored.is_empty() {
            return Ok(stored.to_string());
        }
    }

    let id = generate();
    fs::write(path, &id)
        .with_context(|| format!("Failed to store installation id in {}", path.display()))?;
    info!("Generated installation id {} ({})", id, path.display());
    Ok(id)
}

pub fn generate() -> String {
    Uuid::new_v4().simple().to_string()[..ID_LENGTH].to_string()
}

/// Make an identifier usable as a single MQTT topic level.
pub fn topic_safe(id: &str) -> String {
    id.replace([' ', '/'], "_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_id_is_eight_hex_chars() {
        let id = generate();
        assert_eq!(id.len(), ID_LENGTH);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn id_is_persisted_and_reused() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ups_id.txt");
        let first = load_or_create(&path).unwrap();
        let second = load_or_create(&path).unwrap();
        assert_eq!(first, second);
        assert_eq!(fs::read_to_string(&path).unwrap(), first);
    }

    #[test]
    fn existing_id_is_trimmed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ups_id.txt");
        fs::write(&path, "site 7/rack\n").unwrap();
        let id = load_or_create(&path).unwrap();
        assert_eq!(id, "site 7/rack");
        assert_eq!(topic_safe(&id), "site_7_rack");
    }
}
