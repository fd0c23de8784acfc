// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory entity table, the daemon's presentation sink.
//!
//! Each plan key is presented as four entities:
//!
//! | entity id                | state                               |
//! |--------------------------|-------------------------------------|
//! | `switch.<key>`           | `"on"` / `"off"` (plan active)      |
//! | `time.<key>_time`        | `"HH:MM"`                           |
//! | `text.<key>_weekdays`    | user weekdays, e.g. `"1,2,3"`       |
//! | `number.<key>_soc`       | target state of charge, 0..100 %    |

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{json, Map, Value};

use ps_core::PlanKey;

use crate::error::{Error, Result};
use crate::reconcile::{ObjectSink, PlanBinding};

/// One presented entity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Entity {
    pub entity_id: String,
    pub state: Value,
    pub attributes: Map<String, Value>,
}

/// Handle to the four entities of one plan key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityIds {
    pub key: PlanKey,
    pub switch: String,
    pub time: String,
    pub weekdays: String,
    pub soc: String,
}

impl EntityIds {
    pub fn for_key(key: &PlanKey) -> Self {
        EntityIds {
            key: key.clone(),
            switch: format!("switch.{}", key),
            time: format!("time.{}_time", key),
            weekdays: format!("text.{}_weekdays", key),
            soc: format!("number.{}_soc", key),
        }
    }

    pub fn all(&self) -> [&str; 4] {
        [
            self.switch.as_str(),
            self.time.as_str(),
            self.weekdays.as_str(),
            self.soc.as_str(),
        ]
    }
}

/// Every entity the daemon presents for one connection.
#[derive(Debug, Default)]
pub struct EntityTable {
    entities: BTreeMap<String, Entity>,
}

impl EntityTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn get(&self, entity_id: &str) -> Option<&Entity> {
        self.entities.get(entity_id)
    }

    /// All entities ordered by entity id.
    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    fn write(&mut self, ids: &EntityIds, binding: &PlanBinding) {
        for entity in build(ids, binding) {
            self.entities.insert(entity.entity_id.clone(), entity);
        }
    }
}

fn common_attributes(binding: &PlanBinding) -> Map<String, Value> {
    let mut attrs = Map::new();
    attrs.insert("vehicle_id".into(), json!(binding.vehicle_id));
    attrs.insert("vehicle_title".into(), json!(binding.title));
    attrs.insert("plan_index".into(), json!(binding.ordinal));
    attrs
}

fn build(ids: &EntityIds, binding: &PlanBinding) -> [Entity; 4] {
    let plan = &binding.plan;
    let user_days = plan.user_weekdays();
    let weekdays_text = user_days
        .iter()
        .map(u8::to_string)
        .collect::<Vec<_>>()
        .join(",");

    let mut switch_attrs = common_attributes(binding);
    switch_attrs.insert("time".into(), json!(plan.time));
    switch_attrs.insert("weekdays".into(), json!(user_days));
    switch_attrs.insert("tz".into(), json!(plan.tz));
    switch_attrs.insert("soc".into(), json!(plan.soc));
    switch_attrs.insert("precondition".into(), json!(plan.precondition));

    let mut weekday_attrs = common_attributes(binding);
    weekday_attrs.insert("weekdays_list".into(), json!(user_days));

    let mut soc_attrs = common_attributes(binding);
    soc_attrs.insert("min".into(), json!(0));
    soc_attrs.insert("max".into(), json!(100));
    soc_attrs.insert("step".into(), json!(10));
    soc_attrs.insert("unit_of_measurement".into(), json!("%"));

    [
        Entity {
            entity_id: ids.switch.clone(),
            state: json!(if plan.active { "on" } else { "off" }),
            attributes: switch_attrs,
        },
        Entity {
            entity_id: ids.time.clone(),
            state: json!(plan.time),
            attributes: common_attributes(binding),
        },
        Entity {
            entity_id: ids.weekdays.clone(),
            state: json!(weekdays_text),
            attributes: weekday_attrs,
        },
        Entity {
            entity_id: ids.soc.clone(),
            state: json!(plan.soc),
            attributes: soc_attrs,
        },
    ]
}

impl ObjectSink for EntityTable {
    type Handle = EntityIds;

    fn create(&mut self, binding: &PlanBinding) -> Result<EntityIds> {
        let ids = EntityIds::for_key(&binding.key);
        if let Some(taken) = ids.all().into_iter().find(|id| self.entities.contains_key(*id)) {
            return Err(Error::Sink(format!("entity {} already exists", taken)));
        }
        self.write(&ids, binding);
        Ok(ids)
    }

    fn update(&mut self, handle: &EntityIds, binding: &PlanBinding) -> Result<()> {
        if !self.entities.contains_key(&handle.switch) {
            return Err(Error::Sink(format!("entity {} does not exist", handle.switch)));
        }
        self.write(handle, binding);
        Ok(())
    }

    fn remove(&mut self, handle: &EntityIds) -> Result<()> {
        let missing: Vec<&str> = handle
            .all()
            .into_iter()
            .filter(|id| self.entities.remove(*id).is_none())
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(Error::Sink(format!("entities not found: {}", missing.join(", "))))
        }
    }

    fn render(&self, handle: &EntityIds) -> Value {
        let entities: Vec<&Entity> = handle
            .all()
            .into_iter()
            .filter_map(|id| self.entities.get(id))
            .collect();
        json!({ "key": handle.key, "entities": entities })
    }
}

#[cfg(test)]
#[path = "entities_tests.rs"]
mod tests;
