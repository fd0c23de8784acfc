// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! ps-core: Shared data model for plansync
//!
//! This crate provides the plan and snapshot types, plan key derivation, and
//! the wire messages used by the plansync daemon. It performs no I/O.

pub mod error;
pub mod key;
pub mod plan;
pub mod protocol;
pub mod snapshot;

pub use error::{Error, Result};
pub use key::PlanKey;
pub use plan::{Plan, PlanEdit, PlanPatch, ValidPatch};
pub use protocol::{LocalMessage, LocalRequest, PushEvent};
pub use snapshot::{PlanSlot, Snapshot, Vehicle, VehicleScope};
