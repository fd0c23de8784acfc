// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the plansync daemon.

use thiserror::Error;

/// Failure talking to the remote service, over either the push channel or
/// the REST endpoint.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection could not be established.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Connection closed unexpectedly.
    #[error("connection closed")]
    ConnectionClosed,

    /// An open, read or request deadline elapsed.
    #[error("timed out: {0}")]
    Timeout(String),

    #[error("send failed: {0}")]
    SendFailed(String),

    #[error("receive failed: {0}")]
    ReceiveFailed(String),

    /// Network-level failure of a REST request.
    #[error("request failed: {0}")]
    Request(String),

    /// The remote service rejected a REST request.
    #[error("remote rejected request with HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// Response body could not be decoded.
    #[error("invalid response: {0}")]
    Decode(String),
}

/// Result type for transport operations.
pub type TransportResult<T> = std::result::Result<T, TransportError>;

/// All errors surfaced by the daemon library.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Core(#[from] ps_core::Error),

    #[error("config error: {0}")]
    Config(String),

    #[error("unknown connection: '{0}'")]
    UnknownConnection(String),

    #[error("object sink error: {0}")]
    Sink(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True for malformed user input that never reached the remote service.
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Core(ps_core::Error::Validation(_)))
    }

    /// True when a referenced vehicle or plan does not exist remotely.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::Core(ps_core::Error::NotFound(_)))
    }

    /// True for failures that the next scheduled fetch may recover from.
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Transport(_))
    }
}

/// A specialized Result type for daemon operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
