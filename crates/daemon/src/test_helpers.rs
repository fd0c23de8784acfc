// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory remote service for coordinator, registry and server tests.

#![allow(clippy::unwrap_used)]

use std::collections::BTreeMap;
use std::sync::Mutex;

use serde_json::{json, Value};

use ps_core::{Plan, Snapshot};

use crate::api::{ApiFuture, RemoteApi};
use crate::error::TransportError;

#[derive(Default)]
struct MemoryState {
    vehicles: BTreeMap<String, (String, Vec<Plan>)>,
    active: Vec<String>,
    /// Plan list documents served verbatim in place of stored plans.
    raw_plans: BTreeMap<String, Value>,
    fetches: usize,
    submissions: Vec<(String, Vec<Plan>)>,
    fail_fetch: bool,
    reject: Option<(u16, String)>,
}

/// Fake remote service holding vehicles and their plans in memory.
#[derive(Default)]
pub struct MemoryApi {
    state: Mutex<MemoryState>,
}

impl MemoryApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_vehicle(self, id: &str, title: &str, plans: Vec<Plan>) -> Self {
        self.set_vehicle(id, title, plans);
        self
    }

    pub fn set_vehicle(&self, id: &str, title: &str, plans: Vec<Plan>) {
        self.state
            .lock()
            .unwrap()
            .vehicles
            .insert(id.to_string(), (title.to_string(), plans));
    }

    /// Serves `plans` verbatim as the vehicle's plan list.
    pub fn set_raw_plans(&self, id: &str, plans: Value) {
        self.state
            .lock()
            .unwrap()
            .raw_plans
            .insert(id.to_string(), plans);
    }

    pub fn clear_raw_plans(&self, id: &str) {
        self.state.lock().unwrap().raw_plans.remove(id);
    }

    pub fn remove_vehicle(&self, id: &str) {
        self.state.lock().unwrap().vehicles.remove(id);
    }

    pub fn set_active(&self, ids: &[&str]) {
        self.state.lock().unwrap().active = ids.iter().map(|s| s.to_string()).collect();
    }

    pub fn fail_fetch(&self, fail: bool) {
        self.state.lock().unwrap().fail_fetch = fail;
    }

    pub fn reject_submissions(&self, status: u16, body: &str) {
        self.state.lock().unwrap().reject = Some((status, body.to_string()));
    }

    pub fn fetches(&self) -> usize {
        self.state.lock().unwrap().fetches
    }

    pub fn submissions(&self) -> Vec<(String, Vec<Plan>)> {
        self.state.lock().unwrap().submissions.clone()
    }

    pub fn plans(&self, id: &str) -> Vec<Plan> {
        self.state
            .lock()
            .unwrap()
            .vehicles
            .get(id)
            .map(|(_, plans)| plans.clone())
            .unwrap_or_default()
    }

    /// The state document as the remote service would serve it.
    pub fn state_json(&self) -> Value {
        let state = self.state.lock().unwrap();
        let vehicles: serde_json::Map<String, Value> = state
            .vehicles
            .iter()
            .map(|(id, (title, plans))| {
                let plans = match state.raw_plans.get(id) {
                    Some(raw) => raw.clone(),
                    None => json!(plans),
                };
                (
                    id.clone(),
                    json!({"title": title, "repeatingPlans": plans}),
                )
            })
            .collect();
        let loadpoints: Vec<Value> = state
            .active
            .iter()
            .map(|id| json!({"vehicleName": id}))
            .collect();
        json!({"result": {"vehicles": vehicles, "loadpoints": loadpoints}})
    }
}

impl RemoteApi for MemoryApi {
    fn fetch_snapshot(&self) -> ApiFuture<'_, Snapshot> {
        Box::pin(async move {
            {
                let mut state = self.state.lock().unwrap();
                state.fetches += 1;
                if state.fail_fetch {
                    return Err(TransportError::Request("connection refused".into()));
                }
            }
            Snapshot::from_state(&self.state_json()).map_err(|e| TransportError::Decode(e.to_string()))
        })
    }

    fn submit_plans<'a>(&'a self, vehicle_id: &'a str, plans: &'a [Plan]) -> ApiFuture<'a, Vec<Plan>> {
        Box::pin(async move {
            let mut state = self.state.lock().unwrap();
            state
                .submissions
                .push((vehicle_id.to_string(), plans.to_vec()));
            if let Some((status, body)) = state.reject.clone() {
                return Err(TransportError::Http { status, body });
            }
            match state.vehicles.get_mut(vehicle_id) {
                Some((_, stored)) => {
                    *stored = plans.to_vec();
                    Ok(plans.to_vec())
                }
                None => Err(TransportError::Http {
                    status: 404,
                    body: "vehicle not found".into(),
                }),
            }
        })
    }
}
