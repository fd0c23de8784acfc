// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Reconciliation of materialized plan objects against a remote snapshot.
//!
//! Each [`Reconciler::sync`] computes the wanted plan keys from the snapshot,
//! diffs them against the keys currently materialized, and drives an
//! [`ObjectSink`] through the removals, updates and creations needed to make
//! the two sets equal. Failures are isolated per key.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde_json::Value;
use tracing::{debug, error, info, warn};

use ps_core::{Plan, PlanKey, PlanSlot, Snapshot};

use crate::error::Result;

/// Everything a sink needs to present one plan.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanBinding {
    pub key: PlanKey,
    pub vehicle_id: String,
    /// 1-based position within the vehicle's plan list.
    pub ordinal: usize,
    pub title: String,
    pub plan: Plan,
}

impl From<PlanSlot<'_>> for PlanBinding {
    fn from(slot: PlanSlot<'_>) -> Self {
        PlanBinding {
            key: slot.key,
            vehicle_id: slot.vehicle_id.to_string(),
            ordinal: slot.ordinal,
            title: slot.title.to_string(),
            plan: slot.plan.clone(),
        }
    }
}

/// Materializes, refreshes and tears down user-facing plan objects.
pub trait ObjectSink: Send {
    /// Opaque reference into the sink's own object space.
    type Handle: Clone + fmt::Debug + Send;

    fn create(&mut self, binding: &PlanBinding) -> Result<Self::Handle>;

    /// Refresh the presentation of an existing object in place.
    fn update(&mut self, handle: &Self::Handle, binding: &PlanBinding) -> Result<()>;

    fn remove(&mut self, handle: &Self::Handle) -> Result<()>;

    /// Current presentation state of an object.
    fn render(&self, handle: &Self::Handle) -> Value;
}

/// A plan object owned by the reconciler.
#[derive(Debug, Clone)]
pub struct MaterializedObject<H> {
    /// Current plan data.
    pub binding: PlanBinding,
    pub handle: H,
}

/// Outcome of one reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub created: usize,
    pub updated: usize,
    pub removed: usize,
    /// Keys whose sink call failed, with the error message.
    pub failed: Vec<(PlanKey, String)>,
}

impl SyncReport {
    pub fn is_noop(&self) -> bool {
        self.created == 0 && self.updated == 0 && self.removed == 0 && self.failed.is_empty()
    }
}

impl fmt::Display for SyncReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} created, {} updated, {} removed",
            self.created, self.updated, self.removed
        )?;
        if !self.failed.is_empty() {
            write!(f, ", {} failed", self.failed.len())?;
        }
        Ok(())
    }
}

/// Owns the materialized object set of one connection.
///
/// Not internally synchronized: callers serialize access, at most one
/// `sync` in flight per connection.
pub struct Reconciler<S: ObjectSink> {
    sink: S,
    objects: BTreeMap<PlanKey, MaterializedObject<S::Handle>>,
}

impl<S: ObjectSink> Reconciler<S> {
    pub fn new(sink: S) -> Self {
        Reconciler {
            sink,
            objects: BTreeMap::new(),
        }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn keys(&self) -> BTreeSet<PlanKey> {
        self.objects.keys().cloned().collect()
    }

    pub fn get(&self, key: &PlanKey) -> Option<&MaterializedObject<S::Handle>> {
        self.objects.get(key)
    }

    /// Presentation state of every object, ordered by key.
    pub fn render_all(&self) -> Vec<(PlanKey, Value)> {
        self.objects
            .iter()
            .map(|(key, obj)| (key.clone(), self.sink.render(&obj.handle)))
            .collect()
    }

    /// Brings the object set in line with `snapshot`.
    pub fn sync(&mut self, snapshot: &Snapshot) -> SyncReport {
        let mut wanted: BTreeMap<PlanKey, PlanBinding> = BTreeMap::new();
        for slot in snapshot.slots() {
            let binding = PlanBinding::from(slot);
            if let Some(previous) = wanted.insert(binding.key.clone(), binding) {
                warn!(
                    "plan key {} derived twice; vehicle {} plan {} is shadowed",
                    previous.key, previous.vehicle_id, previous.ordinal
                );
            }
        }

        let to_remove: Vec<PlanKey> = self
            .objects
            .keys()
            .filter(|key| !wanted.contains_key(*key))
            .cloned()
            .collect();

        let mut report = SyncReport::default();
        for key in to_remove {
            self.remove_key(&key, &mut report);
        }

        for (key, binding) in wanted {
            match self.objects.get_mut(&key) {
                Some(obj) => {
                    obj.binding = binding;
                    match self.sink.update(&obj.handle, &obj.binding) {
                        Ok(()) => report.updated += 1,
                        Err(e) => {
                            warn!("failed to refresh {}: {}", key, e);
                            report.failed.push((key, e.to_string()));
                        }
                    }
                }
                None => match self.sink.create(&binding) {
                    Ok(handle) => {
                        debug!("materialized {}", key);
                        self.objects
                            .insert(key, MaterializedObject { binding, handle });
                        report.created += 1;
                    }
                    Err(e) => {
                        error!("failed to materialize {}: {}", key, e);
                        report.failed.push((key, e.to_string()));
                    }
                },
            }
        }

        if report.created > 0 || report.removed > 0 || !report.failed.is_empty() {
            info!("reconciled: {}", report);
        } else {
            debug!("reconciled: {}", report);
        }
        report
    }

    /// Tears down every object.
    pub fn teardown_all(&mut self) -> SyncReport {
        let mut report = SyncReport::default();
        let keys: Vec<PlanKey> = self.objects.keys().cloned().collect();
        for key in keys {
            self.remove_key(&key, &mut report);
        }
        report
    }

    /// The local entry is dropped even if the sink fails to tear it down.
    fn remove_key(&mut self, key: &PlanKey, report: &mut SyncReport) {
        let Some(obj) = self.objects.remove(key) else {
            return;
        };
        match self.sink.remove(&obj.handle) {
            Ok(()) => debug!("removed {}", key),
            Err(e) => {
                warn!("failed to tear down {}: {}", key, e);
                report.failed.push((key.clone(), e.to_string()));
            }
        }
        report.removed += 1;
    }
}

#[cfg(test)]
#[path = "reconcile_tests.rs"]
mod tests;
