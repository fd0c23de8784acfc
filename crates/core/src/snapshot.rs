// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Point-in-time reads of every vehicle and its repeating plans.
//!
//! A [`Snapshot`] is produced fresh on every fetch and never mutated in place;
//! the optimistic write path builds a new snapshot with [`Snapshot::with_plans`].

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::key::PlanKey;
use crate::plan::Plan;

/// One vehicle as reported by the remote service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vehicle {
    pub title: String,
    #[serde(rename = "repeatingPlans", default)]
    pub plans: Vec<Plan>,
}

/// Which vehicles a connection tracks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VehicleScope {
    /// Every vehicle known to the remote service.
    #[default]
    All,
    /// Only vehicles currently selected on a loadpoint.
    Active,
}

/// Every vehicle and its plans at one point in time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    vehicles: BTreeMap<String, Vehicle>,
    /// Vehicle ids selected on any loadpoint, in loadpoint order.
    active: Vec<String>,
    /// Vehicles left out because a plan entry was not an object.
    skipped: Vec<String>,
}

/// A plan together with everything needed to materialize it.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanSlot<'a> {
    pub key: PlanKey,
    pub vehicle_id: &'a str,
    /// 1-based position within the vehicle's plan list.
    pub ordinal: usize,
    pub title: &'a str,
    pub plan: &'a Plan,
}

impl Snapshot {
    /// Builds a snapshot directly from vehicles.
    pub fn from_vehicles<I>(vehicles: I) -> Self
    where
        I: IntoIterator<Item = (String, Vehicle)>,
    {
        Snapshot {
            vehicles: vehicles.into_iter().collect(),
            active: Vec::new(),
            skipped: Vec::new(),
        }
    }

    /// Parses the remote state document.
    ///
    /// Accepts the state object itself or one wrapped as `{"result": {...}}`.
    /// Vehicle entries that are not objects are skipped, a missing title
    /// falls back to the vehicle id and a non-list plan field counts as no
    /// plans. Plan fields decode leniently. A vehicle with a plan entry that
    /// is not an object is left out and listed in [`Snapshot::skipped`],
    /// since dropping only that entry would shift every later ordinal.
    pub fn from_state(state: &Value) -> Result<Self> {
        let state = match state.get("result") {
            Some(inner) if inner.is_object() => inner,
            _ => state,
        };
        let obj = state
            .as_object()
            .ok_or_else(|| Error::Protocol("state is not a JSON object".into()))?;

        let mut vehicles = BTreeMap::new();
        let mut skipped = Vec::new();
        if let Some(Value::Object(raw)) = obj.get("vehicles") {
            for (id, data) in raw {
                let Some(data) = data.as_object() else {
                    continue;
                };
                let title = data
                    .get("title")
                    .and_then(Value::as_str)
                    .unwrap_or(id)
                    .to_string();
                let plans = match data.get("repeatingPlans") {
                    Some(Value::Array(items)) => {
                        match items
                            .iter()
                            .map(|item| serde_json::from_value::<Plan>(item.clone()))
                            .collect::<std::result::Result<Vec<_>, _>>()
                        {
                            Ok(plans) => plans,
                            Err(_) => {
                                skipped.push(id.clone());
                                continue;
                            }
                        }
                    }
                    _ => Vec::new(),
                };
                vehicles.insert(id.clone(), Vehicle { title, plans });
            }
        }

        let active = match obj.get("loadpoints") {
            Some(Value::Array(loadpoints)) => loadpoints
                .iter()
                .filter_map(|lp| lp.get("vehicleName").and_then(Value::as_str))
                .filter(|name| !name.is_empty())
                .map(str::to_string)
                .collect(),
            _ => Vec::new(),
        };

        Ok(Snapshot {
            vehicles,
            active,
            skipped,
        })
    }

    pub fn vehicles(&self) -> &BTreeMap<String, Vehicle> {
        &self.vehicles
    }

    pub fn vehicle(&self, id: &str) -> Option<&Vehicle> {
        self.vehicles.get(id)
    }

    /// Vehicle ids selected on a loadpoint.
    pub fn active_vehicles(&self) -> &[String] {
        &self.active
    }

    /// Vehicles whose plan list could not be decoded.
    pub fn skipped(&self) -> &[String] {
        &self.skipped
    }

    pub fn is_empty(&self) -> bool {
        self.vehicles.is_empty()
    }

    /// The vehicle a request without an explicit vehicle applies to: the
    /// first active vehicle that is known, otherwise the first vehicle.
    pub fn default_vehicle(&self) -> Option<&str> {
        self.active
            .iter()
            .find(|id| self.vehicles.contains_key(id.as_str()))
            .map(String::as_str)
            .or_else(|| self.vehicles.keys().next().map(String::as_str))
    }

    /// Restricts the snapshot to the vehicles a connection tracks.
    pub fn scoped(self, scope: VehicleScope) -> Self {
        match scope {
            VehicleScope::All => self,
            VehicleScope::Active => {
                let Snapshot {
                    mut vehicles,
                    active,
                    mut skipped,
                } = self;
                vehicles.retain(|id, _| active.contains(id));
                skipped.retain(|id| active.contains(id));
                Snapshot {
                    vehicles,
                    active,
                    skipped,
                }
            }
        }
    }

    /// Returns a copy with one vehicle's plan list replaced.
    ///
    /// Unknown vehicles are added with their id as title.
    pub fn with_plans(&self, vehicle_id: &str, plans: Vec<Plan>) -> Self {
        let mut next = self.clone();
        let title = next
            .vehicles
            .get(vehicle_id)
            .map(|v| v.title.clone())
            .unwrap_or_else(|| vehicle_id.to_string());
        next.vehicles
            .insert(vehicle_id.to_string(), Vehicle { title, plans });
        next
    }

    /// Returns a copy with one vehicle inserted or replaced as a whole.
    pub fn with_vehicle(&self, vehicle_id: &str, vehicle: Vehicle) -> Self {
        let mut next = self.clone();
        next.vehicles.insert(vehicle_id.to_string(), vehicle);
        next
    }

    /// Every plan slot, ordered by vehicle id then ordinal.
    pub fn slots(&self) -> impl Iterator<Item = PlanSlot<'_>> {
        self.vehicles.iter().flat_map(|(id, vehicle)| {
            vehicle.plans.iter().enumerate().map(move |(i, plan)| PlanSlot {
                key: PlanKey::derive(id, Some(&vehicle.title), i + 1),
                vehicle_id: id,
                ordinal: i + 1,
                title: &vehicle.title,
                plan,
            })
        })
    }

    /// The set of plan keys derivable from this snapshot.
    pub fn plan_keys(&self) -> BTreeSet<PlanKey> {
        self.slots().map(|slot| slot.key).collect()
    }

    /// JSON view for user-facing consumers (weekdays in user numbering).
    pub fn user_view(&self) -> Value {
        let vehicles: serde_json::Map<String, Value> = self
            .vehicles
            .iter()
            .map(|(id, v)| {
                let plans: Vec<Value> = v.plans.iter().map(Plan::user_view).collect();
                (
                    id.clone(),
                    serde_json::json!({ "title": v.title, "repeatingPlans": plans }),
                )
            })
            .collect();
        serde_json::json!({ "vehicles": vehicles, "active": self.active })
    }
}

#[cfg(test)]
#[path = "snapshot_tests.rs"]
mod tests;
