// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Push channel connection state shared between the read loop and readers.
//!
//! Uses atomic fields for lock-free reads from status handlers.

use std::sync::atomic::{AtomicU32, AtomicU8, Ordering};

/// Connection state values for atomic state field.
pub const STATE_DISCONNECTED: u8 = 0;
pub const STATE_CONNECTING: u8 = 1;
pub const STATE_CONNECTED: u8 = 2;
/// Terminal: the client was stopped and will not reconnect.
pub const STATE_STOPPED: u8 = 3;

/// Connection state visible to both the read loop and status readers.
pub struct SharedConnectionState {
    state: AtomicU8,
    /// Connect attempts since the last successful connect.
    attempt: AtomicU32,
}

impl SharedConnectionState {
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(STATE_DISCONNECTED),
            attempt: AtomicU32::new(0),
        }
    }

    pub fn get(&self) -> u8 {
        self.state.load(Ordering::Acquire)
    }

    /// Set the state. `Stopped` is terminal and is never left.
    pub fn set(&self, state: u8) {
        let _ = self
            .state
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                (current != STATE_STOPPED).then_some(state)
            });
    }

    pub fn attempt(&self) -> u32 {
        self.attempt.load(Ordering::Acquire)
    }

    /// Record the start of another connect attempt.
    pub fn begin_attempt(&self) -> u32 {
        self.set(STATE_CONNECTING);
        self.attempt.fetch_add(1, Ordering::AcqRel).saturating_add(1)
    }

    /// Record a successful connect.
    pub fn connected(&self) {
        self.set(STATE_CONNECTED);
        self.attempt.store(0, Ordering::Release);
    }

    pub fn is_connected(&self) -> bool {
        self.get() == STATE_CONNECTED
    }

    pub fn is_stopped(&self) -> bool {
        self.get() == STATE_STOPPED
    }

    /// Get a human-readable status string.
    pub fn status_string(&self) -> String {
        match self.get() {
            STATE_DISCONNECTED => "disconnected".to_string(),
            STATE_CONNECTING => {
                let attempt = self.attempt();
                if attempt > 1 {
                    format!("connecting (attempt {})", attempt)
                } else {
                    "connecting".to_string()
                }
            }
            STATE_CONNECTED => "connected".to_string(),
            STATE_STOPPED => "stopped".to_string(),
            _ => "unknown".to_string(),
        }
    }
}

impl Default for SharedConnectionState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "connection_tests.rs"]
mod tests;
