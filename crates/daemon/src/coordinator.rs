// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Per-connection coordinator.
//!
//! Owns the last reconciled snapshot and the materialized object set of one
//! connection, and runs every path that changes them:
//! - full refreshes (timer, push events, after writes)
//! - optimistic writes: mutate the in-memory plan list, submit it, fold the
//!   accepted list back in, broadcast, then refresh in the background

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use ps_core::{Plan, PlanEdit, PlanPatch, Snapshot, Vehicle, VehicleScope};

use crate::api::RemoteApi;
use crate::entities::EntityTable;
use crate::error::Result;
use crate::events::EventHub;
use crate::reconcile::{Reconciler, SyncReport};

/// Default snapshot age after which writes refetch first.
pub const DEFAULT_STALE_AFTER: Duration = Duration::from_secs(60);

struct Cached {
    snapshot: Snapshot,
    fetched_at: Instant,
}

/// Shared, cheaply cloneable handle to one connection's state.
#[derive(Clone)]
pub struct Coordinator {
    inner: Arc<CoordinatorInner>,
}

impl std::fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coordinator")
            .field("name", &self.inner.name)
            .finish_non_exhaustive()
    }
}

struct CoordinatorInner {
    name: String,
    api: Arc<dyn RemoteApi>,
    scope: VehicleScope,
    stale_after: Duration,
    events: EventHub,
    snapshot: RwLock<Option<Cached>>,
    /// Held for the whole of every fetch-and-sync and fold-and-sync, so at
    /// most one reconciliation runs per connection.
    reconciler: Mutex<Reconciler<EntityTable>>,
}

impl Coordinator {
    pub fn new(name: impl Into<String>, api: Arc<dyn RemoteApi>, events: EventHub) -> Self {
        Self::with_options(name, api, events, VehicleScope::All, DEFAULT_STALE_AFTER)
    }

    pub fn with_options(
        name: impl Into<String>,
        api: Arc<dyn RemoteApi>,
        events: EventHub,
        scope: VehicleScope,
        stale_after: Duration,
    ) -> Self {
        Coordinator {
            inner: Arc::new(CoordinatorInner {
                name: name.into(),
                api,
                scope,
                stale_after,
                events,
                snapshot: RwLock::new(None),
                reconciler: Mutex::new(Reconciler::new(EntityTable::new())),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn events(&self) -> &EventHub {
        &self.inner.events
    }

    /// The last reconciled snapshot, if any fetch has succeeded.
    pub async fn snapshot(&self) -> Option<Snapshot> {
        self.inner
            .snapshot
            .read()
            .await
            .as_ref()
            .map(|c| c.snapshot.clone())
    }

    /// Fetches the remote state and reconciles against it.
    ///
    /// On failure the last reconciled state is kept as is.
    pub async fn refresh(&self) -> Result<SyncReport> {
        let mut reconciler = self.inner.reconciler.lock().await;
        let snapshot = match self.inner.api.fetch_snapshot().await {
            Ok(snapshot) => snapshot.scoped(self.inner.scope),
            Err(e) => {
                error!("[{}] state fetch failed: {}", self.inner.name, e);
                return Err(e.into());
            }
        };
        let mut cached = self.inner.snapshot.write().await;
        let snapshot = self.keep_skipped(snapshot, cached.as_ref());
        let report = reconciler.sync(&snapshot);
        *cached = Some(Cached {
            snapshot,
            fetched_at: Instant::now(),
        });
        Ok(report)
    }

    /// Carries over the last known plans of vehicles the fetch could not
    /// decode, so their objects survive until a readable state arrives.
    fn keep_skipped(&self, mut snapshot: Snapshot, previous: Option<&Cached>) -> Snapshot {
        for id in snapshot.skipped().to_vec() {
            match previous.and_then(|c| c.snapshot.vehicle(&id)) {
                Some(vehicle) => {
                    warn!(
                        "[{}] plans of vehicle {} are unreadable; keeping last known plans",
                        self.inner.name, id
                    );
                    snapshot = snapshot.with_vehicle(&id, vehicle.clone());
                }
                None => warn!(
                    "[{}] plans of vehicle {} are unreadable; skipping it",
                    self.inner.name, id
                ),
            }
        }
        snapshot
    }

    /// Schedules a refresh without waiting for it.
    ///
    /// The caller never observes the outcome; failures are logged here.
    pub fn request_refresh(&self) -> JoinHandle<()> {
        let this = self.clone();
        tokio::spawn(async move {
            if let Err(e) = this.refresh().await {
                warn!("[{}] background refresh failed: {}", this.inner.name, e);
            }
        })
    }

    /// Refreshes every `interval` until cancelled. The first refresh is immediate.
    pub async fn run_polling(&self, interval: Duration, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }
            let refresh = tokio::select! {
                _ = cancel.cancelled() => break,
                result = self.refresh() => result,
            };
            if let Ok(report) = refresh {
                debug!("[{}] poll: {}", self.inner.name, report);
            }
        }
        debug!("[{}] polling stopped", self.inner.name);
    }

    /// The in-memory snapshot, refetched first when missing or stale.
    pub async fn current_snapshot(&self) -> Result<Snapshot> {
        {
            let cached = self.inner.snapshot.read().await;
            if let Some(c) = cached.as_ref() {
                if c.fetched_at.elapsed() < self.inner.stale_after {
                    return Ok(c.snapshot.clone());
                }
            }
        }
        debug!("[{}] snapshot missing or stale; refetching", self.inner.name);
        self.refresh().await?;
        let cached = self.inner.snapshot.read().await;
        Ok(cached
            .as_ref()
            .map(|c| c.snapshot.clone())
            .unwrap_or_default())
    }

    /// Every vehicle and plan, weekdays in user numbering.
    pub async fn state_view(&self) -> Result<Value> {
        Ok(self.current_snapshot().await?.user_view())
    }

    /// Rendered presentation state of every materialized plan.
    pub async fn entities(&self) -> Vec<Value> {
        self.inner
            .reconciler
            .lock()
            .await
            .render_all()
            .into_iter()
            .map(|(_, rendered)| rendered)
            .collect()
    }

    /// Applies one edit to plan `ordinal` (1-based) of a vehicle.
    ///
    /// Without a vehicle id the default vehicle is used. Returns the plan
    /// list the remote service accepted.
    pub async fn edit_plan(
        &self,
        vehicle_id: Option<&str>,
        ordinal: usize,
        edit: PlanEdit,
    ) -> Result<Vec<Plan>> {
        let patch = edit.validate()?;
        let snapshot = self.current_snapshot().await?;
        let (vehicle_id, vehicle) = resolve_vehicle(&snapshot, vehicle_id)?;
        let index = plan_index(&vehicle_id, vehicle, ordinal)?;

        let mut plans = vehicle.plans.clone();
        patch.apply_to(&mut plans[index]);
        info!(
            "[{}] updating plan {} of vehicle {}",
            self.inner.name, ordinal, vehicle_id
        );
        self.commit(&vehicle_id, plans).await
    }

    /// Appends a new plan to a vehicle.
    ///
    /// `time` and `weekdays` are required. `tz` and `precondition` default
    /// to the vehicle's last plan.
    pub async fn add_plan(&self, vehicle_id: Option<&str>, patch: PlanPatch) -> Result<Vec<Plan>> {
        let patch = patch.validate()?;
        let snapshot = self.current_snapshot().await?;
        let (vehicle_id, vehicle) = resolve_vehicle(&snapshot, vehicle_id)?;

        let mut plans = vehicle.plans.clone();
        let plan = patch.into_plan(plans.last())?;
        plans.push(plan);
        info!(
            "[{}] adding plan {} to vehicle {}",
            self.inner.name,
            plans.len(),
            vehicle_id
        );
        self.commit(&vehicle_id, plans).await
    }

    /// Removes plan `ordinal` (1-based); later plans move up by one.
    pub async fn delete_plan(&self, vehicle_id: Option<&str>, ordinal: usize) -> Result<Vec<Plan>> {
        let snapshot = self.current_snapshot().await?;
        let (vehicle_id, vehicle) = resolve_vehicle(&snapshot, vehicle_id)?;
        let index = plan_index(&vehicle_id, vehicle, ordinal)?;

        let mut plans = vehicle.plans.clone();
        plans.remove(index);
        info!(
            "[{}] deleting plan {} of vehicle {}",
            self.inner.name, ordinal, vehicle_id
        );
        self.commit(&vehicle_id, plans).await
    }

    /// Submits, folds, broadcasts and schedules a confirming refresh.
    /// Nothing is folded if the remote service rejects the list.
    async fn commit(&self, vehicle_id: &str, plans: Vec<Plan>) -> Result<Vec<Plan>> {
        let accepted = self.inner.api.submit_plans(vehicle_id, &plans).await?;
        self.fold(vehicle_id, accepted.clone()).await;
        self.inner
            .events
            .plans_updated(&self.inner.name, vehicle_id, &accepted);
        drop(self.request_refresh());
        Ok(accepted)
    }

    /// Replaces one vehicle's plans in the in-memory snapshot and reconciles.
    ///
    /// Without a cached snapshot only the folded vehicle is known, so the
    /// partial result is reconciled but not cached and the next write
    /// refetches.
    pub async fn fold(&self, vehicle_id: &str, plans: Vec<Plan>) -> SyncReport {
        let mut reconciler = self.inner.reconciler.lock().await;
        let mut cached = self.inner.snapshot.write().await;
        let report = match cached.as_mut() {
            Some(c) => {
                c.snapshot = c.snapshot.with_plans(vehicle_id, plans);
                reconciler.sync(&c.snapshot)
            }
            None => reconciler.sync(&Snapshot::default().with_plans(vehicle_id, plans)),
        };
        debug!(
            "[{}] folded plans of {} into snapshot: {}",
            self.inner.name, vehicle_id, report
        );
        report
    }

    /// Tears down every materialized object.
    pub async fn teardown(&self) -> SyncReport {
        let report = self.inner.reconciler.lock().await.teardown_all();
        *self.inner.snapshot.write().await = None;
        info!("[{}] torn down: {}", self.inner.name, report);
        report
    }
}

fn resolve_vehicle<'s>(
    snapshot: &'s Snapshot,
    requested: Option<&str>,
) -> Result<(String, &'s Vehicle)> {
    let id = match requested {
        Some(id) => id,
        None => snapshot
            .default_vehicle()
            .ok_or_else(|| ps_core::Error::NotFound("no vehicles available".into()))?,
    };
    let vehicle = snapshot
        .vehicle(id)
        .ok_or_else(|| ps_core::Error::vehicle_not_found(id))?;
    Ok((id.to_string(), vehicle))
}

fn plan_index(vehicle_id: &str, vehicle: &Vehicle, ordinal: usize) -> Result<usize> {
    if ordinal == 0 || ordinal > vehicle.plans.len() {
        return Err(ps_core::Error::plan_not_found(vehicle_id, ordinal, vehicle.plans.len()).into());
    }
    Ok(ordinal - 1)
}

#[cfg(test)]
#[path = "coordinator_tests.rs"]
mod tests;
