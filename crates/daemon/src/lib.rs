// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! plansync: keeps a local entity table in step with the repeating charge
//! plans of one or more remote charge-control services.
//!
//! Every connection fetches the full remote state on a timer and whenever
//! the push channel reports a relevant change, then reconciles its
//! materialized objects against it. Plan edits go through an optimistic
//! read-modify-write path on the [`Coordinator`].

pub mod api;
pub mod config;
pub mod coordinator;
pub mod entities;
pub mod error;
pub mod events;
pub mod reconcile;
pub mod registry;
pub mod server;
pub mod sync;

#[cfg(test)]
mod test_helpers;

pub use api::{HttpApi, RemoteApi};
pub use config::{Config, ConnectionConfig, PushConfig, ServerConfig};
pub use coordinator::Coordinator;
pub use entities::{Entity, EntityTable};
pub use error::{Error, Result, TransportError, TransportResult};
pub use events::EventHub;
pub use reconcile::{ObjectSink, PlanBinding, Reconciler, SyncReport};
pub use registry::Registry;
