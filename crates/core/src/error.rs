// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for ps-core operations.

use thiserror::Error;

/// All possible errors that can occur in ps-core operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed user input. Never sent to the remote service.
    #[error("invalid input: {0}")]
    Validation(String),

    /// Referenced vehicle or plan ordinal is absent from the current remote state.
    #[error("not found: {0}")]
    NotFound(String),

    /// Malformed push message.
    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Shorthand for a [`Error::NotFound`] naming a vehicle.
    pub fn vehicle_not_found(vehicle_id: &str) -> Self {
        Error::NotFound(format!("vehicle '{}'", vehicle_id))
    }

    /// Shorthand for a [`Error::NotFound`] naming a plan ordinal.
    pub fn plan_not_found(vehicle_id: &str, ordinal: usize, len: usize) -> Self {
        Error::NotFound(format!(
            "plan {} of vehicle '{}'\n  hint: the vehicle has {} plan(s)",
            ordinal, vehicle_id, len
        ))
    }
}

/// A specialized Result type for ps-core operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
