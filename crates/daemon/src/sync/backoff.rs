// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Randomized exponential backoff for push channel reconnects.
//!
//! The scheduler holds no state of its own: callers keep the current backoff
//! value, feed it to [`Backoff::next`] after each failure and replace it with
//! [`Backoff::floor`] after each successful connect.

use std::time::Duration;

use rand::Rng;

/// Reconnect timing parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    floor: Duration,
    ceiling: Duration,
}

impl Backoff {
    /// Creates a scheduler. A floor above the ceiling is clamped down to it.
    pub fn new(floor: Duration, ceiling: Duration) -> Self {
        Backoff {
            floor: floor.min(ceiling),
            ceiling,
        }
    }

    /// The backoff value to start from, and to reset to after a connect.
    pub fn floor(&self) -> Duration {
        self.floor
    }

    pub fn ceiling(&self) -> Duration {
        self.ceiling
    }

    /// Returns `(sleep, next)` for the current backoff value.
    ///
    /// `sleep` is `current` plus a uniform random fraction of `current`,
    /// capped at the ceiling; `next` doubles `current` up to the ceiling.
    pub fn next(&self, current: Duration) -> (Duration, Duration) {
        self.next_with(current, rand::rng().random_range(0.0..=1.0))
    }

    /// Deterministic form of [`Backoff::next`] with an explicit jitter in `0.0..=1.0`.
    pub fn next_with(&self, current: Duration, jitter: f64) -> (Duration, Duration) {
        let current = current.max(self.floor).min(self.ceiling);
        let jitter = jitter.clamp(0.0, 1.0);
        let sleep = (current + current.mul_f64(jitter)).min(self.ceiling);
        let next = current.saturating_mul(2).min(self.ceiling);
        (sleep, next)
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Backoff::new(Duration::from_secs(1), Duration::from_secs(60))
    }
}

#[cfg(test)]
#[path = "backoff_tests.rs"]
mod tests;
