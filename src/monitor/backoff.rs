// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the ups-monitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Wait applied after a failed field-bus connection.
///
/// Retries never stop; the strategy only shapes the delay between them.
///
/// ```yaml
/// backoff:
///   kind: exponential
///   initial_secs: 5
///   multiplier: 2.0
///   max_secs: 300
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackoffStrategy {
    /// Same delay after every failure
    Fixed {
        #[serde(default = "default_delay_secs")]
        delay_secs: u64,
    },
    /// `initial * multiplier^(retry-1)`, capped at `max_secs`
    Exponential {
        #[serde(default = "default_delay_secs")]
        initial_secs: u64,
        #[serde(default = "default_multiplier")]
        multiplier: f64,
        #[serde(default = "default_max_secs")]
        max_secs: u64,
    },
}

fn default_delay_secs() -> u64 {
    5
}

fn default_multiplier() -> f64 {
    2.0
}

fn default_max_secs() -> u64 {
    300
}

impl Default for BackoffStrategy {
    fn default() -> Self {
        BackoffStrategy::Fixed {
            delay_secs: default_delay_secs(),
        }
    }
}

impl BackoffStrategy {
    /// Delay before the next attempt after `retry` consecutive failures (1-based).
    pub fn delay(&self, retry: u32) -> Duration {
        match self {
            BackoffStrategy::Fixed { delay_secs } => Duration::from_secs(*delay_secs),
            BackoffStrategy::Exponential {
                initial_secs,
                multiplier,
                max_secs,
            } => {
                let exponent = retry.saturating_sub(1).min(64) as i32;
                let secs = (*initial_secs as f64) * multiplier.powi(exponent);
                let capped = if secs.is_finite() {
                    secs.min(*max_secs as f64)
                } else {
                    *max_secs as f64
                };
                Duration::from_secs_f64(capped.max(0.0))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_default_is_five_seconds() {
        let backoff = BackoffStrategy::default();
        assert_eq!(backoff.delay(1), Duration::from_secs(5));
        assert_eq!(backoff.delay(1000), Duration::from_secs(5));
    }

    #[test]
    fn exponential_grows_then_caps() {
        let backoff = BackoffStrategy::Exponential {
            initial_secs: 2,
            multiplier: 3.0,
            max_secs: 60,
        };
        assert_eq!(backoff.delay(1), Duration::from_secs(2));
        assert_eq!(backoff.delay(2), Duration::from_secs(6));
        assert_eq!(backoff.delay(3), Duration::from_secs(18));
        assert_eq!(backoff.delay(4), Duration::from_secs(54));
        assert_eq!(backoff.delay(5), Duration::from_secs(60));
        assert_eq!(backoff.delay(u32::MAX), Duration::from_secs(60));
    }

    #[test]
    fn deserializes_tagged_yaml() {
        let backoff: BackoffStrategy =
            serde_yml::from_str("kind: exponential\ninitial_secs: 1\nmax_secs: 30\n").unwrap();
        assert_eq!(
            backoff,
            BackoffStrategy::Exponential {
                initial_secs: 1,
                multiplier: 2.0,
                max_secs: 30
            }
        );
    }
}
