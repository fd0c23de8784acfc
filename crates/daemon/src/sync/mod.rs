// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Push channel for live state synchronization.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │   Remote    │────►│  Transport  │────►│  Read loop  │
//! │ /ws endpoint│     │   (trait)   │     │ + Filter    │
//! └─────────────┘     └─────────────┘     └─────────────┘
//!                                                │ try_send (shed when full)
//!                                                ▼
//!                                         ┌─────────────┐
//!                                         │ Relay queue │
//!                                         └─────────────┘
//!                                                │
//!                                                ▼
//!                                         ┌─────────────┐
//!                                         │  Consumer   │──► refresh callback
//!                                         └─────────────┘
//! ```
//!
//! # Features
//!
//! - Persistent connection with open, idle and keep-alive timeouts
//! - Randomized exponential reconnect backoff
//! - Relevance filtering and duplicate suppression per connection epoch
//! - Bounded relay that never stalls network reads
//! - Injectable transport trait for testing

mod backoff;
mod client;
mod connection;
mod filter;
mod relay;
mod transport;

pub use backoff::Backoff;
pub use client::{PushClient, PushSettings};
pub use connection::{
    SharedConnectionState, STATE_CONNECTED, STATE_CONNECTING, STATE_DISCONNECTED, STATE_STOPPED,
};
pub use filter::{classify, is_relevant, signature, EventFilter, Relevance};
pub use relay::{relay, Offer, RelayReceiver, RelaySender};
pub use transport::{Inbound, Transport, TransportFuture, WebSocketTransport};

#[cfg(test)]
pub(crate) mod test_helpers;
