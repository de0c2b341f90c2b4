// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the ups-monitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

use std::fmt;

/// Connection state of one external endpoint (field bus or broker).
///
/// Only the orchestrator mutates it. `retry_count` is the number of
/// consecutive failed connection attempts; it drives the backoff and resets on
/// the next successful connection. A failure on a live connection degrades
/// the endpoint without counting as a failed attempt.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting {
        retry_count: u32,
    },
    Connected,
    Degraded {
        last_error: String,
        retry_count: u32,
    },
}

impl ConnectionState {
    /// Enter `Connecting`, keeping the failure count for the backoff.
    pub fn begin_connect(&mut self) {
        *self = ConnectionState::Connecting {
            retry_count: self.retry_count(),
        };
    }

    pub fn mark_connected(&mut self) {
        *self = ConnectionState::Connected;
    }

    /// Record a failed connection attempt and return the new consecutive
    /// failure count.
    pub fn mark_failed(&mut self, error: impl Into<String>) -> u32 {
        let retry_count = self.retry_count() + 1;
        *self = ConnectionState::Degraded {
            last_error: error.into(),
            retry_count,
        };
        retry_count
    }

    /// Record an error on an established connection (failed read, lost
    /// session). The attempt counter is left alone.
    pub fn mark_degraded(&mut self, error: impl Into<String>) {
        *self = ConnectionState::Degraded {
            last_error: error.into(),
            retry_count: self.retry_count(),
        };
    }

    /// Connection released normally. A degraded endpoint stays degraded.
    pub fn mark_closed(&mut self) {
        if matches!(
            self,
            ConnectionState::Connected | ConnectionState::Connecting { .. }
        ) {
            *self = ConnectionState::Disconnected;
        }
    }

    pub fn retry_count(&self) -> u32 {
        match self {
            ConnectionState::Connecting { retry_count }
            | ConnectionState::Degraded { retry_count, .. } => *retry_count,
            _ => 0,
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "disconnected"),
            ConnectionState::Connecting { .. } => write!(f, "connecting"),
            ConnectionState::Connected => write!(f, "connected"),
            ConnectionState::Degraded {
                last_error,
                retry_count,
            } => write!(f, "degraded after {retry_count} failure(s): {last_error}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failures_accumulate_until_success() {
        let mut state = ConnectionState::default();
        state.begin_connect();
        assert_eq!(state, ConnectionState::Connecting { retry_count: 0 });
        assert_eq!(state.mark_failed("refused"), 1);
        state.begin_connect();
        assert_eq!(state, ConnectionState::Connecting { retry_count: 1 });
        assert_eq!(state.mark_failed("refused"), 2);
        assert_eq!(state.retry_count(), 2);
        state.begin_connect();
        state.mark_connected();
        assert!(state.is_connected());
        assert_eq!(state.retry_count(), 0);
    }

    #[test]
    fn closing_keeps_degraded() {
        let mut state = ConnectionState::default();
        state.mark_failed("timeout");
        state.mark_closed();
        assert_eq!(state.retry_count(), 1);

        state.mark_connected();
        state.mark_closed();
        assert_eq!(state, ConnectionState::Disconnected);
    }

    #[test]
    fn read_errors_do_not_count_as_connection_attempts() {
        let mut state = ConnectionState::default();
        state.begin_connect();
        state.mark_connected();
        state.mark_degraded("register 0x2007 timed out");
        state.mark_closed();
        assert!(matches!(state, ConnectionState::Degraded { retry_count: 0, .. }));

        // The next refused connection is the first failure, not the second
        state.begin_connect();
        assert!(matches!(state, ConnectionState::Connecting { .. }));
        assert_eq!(state.mark_failed("refused"), 1);
    }
}
