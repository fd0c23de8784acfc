// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use serde_json::json;

fn state() -> Value {
    json!({
        "vehicles": {
            "db:1": {
                "title": "Car",
                "repeatingPlans": [
                    {"time": "08:00", "weekdays": [1, 2], "soc": 80, "active": true, "tz": "Europe/Berlin", "precondition": 0},
                    {"time": "17:30", "weekdays": [0], "soc": 60, "active": false, "tz": "Europe/Berlin", "precondition": 1}
                ]
            },
            "db:2": {"title": "Van", "repeatingPlans": []},
            "db:3": {"repeatingPlans": "not a list"},
            "db:4": "not an object"
        },
        "loadpoints": [
            {"vehicleName": ""},
            {"vehicleName": "db:2"}
        ]
    })
}

#[test]
fn from_state_parses_vehicles_and_plans() {
    let snapshot = Snapshot::from_state(&state()).unwrap();

    assert_eq!(snapshot.vehicles().len(), 3);
    let car = snapshot.vehicle("db:1").unwrap();
    assert_eq!(car.title, "Car");
    assert_eq!(car.plans.len(), 2);
    assert_eq!(car.plans[1].time, "17:30");
}

#[test]
fn from_state_is_tolerant() {
    let snapshot = Snapshot::from_state(&state()).unwrap();

    let untitled = snapshot.vehicle("db:3").unwrap();
    assert_eq!(untitled.title, "db:3");
    assert!(untitled.plans.is_empty());
    assert!(snapshot.vehicle("db:4").is_none());
}

#[test]
fn from_state_unwraps_result_envelope() {
    let wrapped = json!({ "result": state() });
    let snapshot = Snapshot::from_state(&wrapped).unwrap();
    assert_eq!(snapshot.vehicles().len(), 3);
}

#[test]
fn from_state_without_vehicles_is_empty() {
    let snapshot = Snapshot::from_state(&json!({"loadpoints": []})).unwrap();
    assert!(snapshot.is_empty());
    assert!(snapshot.plan_keys().is_empty());
}

#[test]
fn from_state_rejects_non_object() {
    assert!(matches!(
        Snapshot::from_state(&json!([1, 2])),
        Err(Error::Protocol(_))
    ));
}

#[test]
fn odd_plan_fields_do_not_block_other_vehicles() {
    let state = json!({"vehicles": {
        "db:1": {"title": "Car", "repeatingPlans": [{"time": "08:00", "weekdays": [1], "soc": 80, "active": true}]},
        "db:2": {"title": "Van", "repeatingPlans": [{"time": "06:00", "weekdays": [2], "tz": null, "soc": "lots"}]},
        "db:3": {"title": "Bike", "repeatingPlans": [{"time": "09:00"}, "garbage"]}
    }});

    let snapshot = Snapshot::from_state(&state).unwrap();

    assert_eq!(
        snapshot.plan_keys(),
        BTreeSet::from([
            PlanKey::derive("db:1", Some("Car"), 1),
            PlanKey::derive("db:2", Some("Van"), 1),
        ])
    );
    let van = &snapshot.vehicle("db:2").unwrap().plans[0];
    assert_eq!(van.tz, crate::plan::DEFAULT_TZ);
    assert_eq!(van.soc, 0);
    assert!(snapshot.vehicle("db:3").is_none());
    assert_eq!(snapshot.skipped(), ["db:3".to_string()]);
}

#[test]
fn active_vehicles_skip_empty_names() {
    let snapshot = Snapshot::from_state(&state()).unwrap();
    assert_eq!(snapshot.active_vehicles(), ["db:2".to_string()]);
    assert_eq!(snapshot.default_vehicle(), Some("db:2"));
}

#[test]
fn default_vehicle_falls_back_to_first() {
    let snapshot = Snapshot::from_state(&json!({"vehicles": {"b": {}, "a": {}}})).unwrap();
    assert_eq!(snapshot.default_vehicle(), Some("a"));
}

#[test]
fn scoped_active_keeps_only_selected_vehicles() {
    let snapshot = Snapshot::from_state(&state())
        .unwrap()
        .scoped(VehicleScope::Active);
    assert_eq!(snapshot.vehicles().keys().collect::<Vec<_>>(), ["db:2"]);
}

#[test]
fn scoped_all_is_identity() {
    let snapshot = Snapshot::from_state(&state()).unwrap();
    assert_eq!(snapshot.clone().scoped(VehicleScope::All), snapshot);
}

#[test]
fn slots_have_contiguous_ordinals_per_vehicle() {
    let snapshot = Snapshot::from_state(&state()).unwrap();
    let slots: Vec<_> = snapshot.slots().collect();

    assert_eq!(slots.len(), 2);
    assert_eq!(slots[0].ordinal, 1);
    assert_eq!(slots[1].ordinal, 2);
    assert_eq!(slots[0].key, PlanKey::derive("db:1", Some("Car"), 1));
    assert_eq!(slots[1].title, "Car");
}

#[test]
fn with_plans_replaces_one_vehicle_without_touching_original() {
    let snapshot = Snapshot::from_state(&state()).unwrap();
    let folded = snapshot.with_plans("db:2", vec![Plan::new("09:00", vec![3], 70)]);

    assert_eq!(folded.vehicle("db:2").unwrap().plans.len(), 1);
    assert_eq!(folded.vehicle("db:2").unwrap().title, "Van");
    assert_eq!(folded.vehicle("db:1"), snapshot.vehicle("db:1"));
    assert!(snapshot.vehicle("db:2").unwrap().plans.is_empty());
}

#[test]
fn with_plans_adds_unknown_vehicle() {
    let folded = Snapshot::default().with_plans("db:9", vec![Plan::new("09:00", vec![3], 70)]);
    assert_eq!(folded.vehicle("db:9").unwrap().title, "db:9");
}

#[test]
fn user_view_uses_user_weekdays() {
    let snapshot = Snapshot::from_state(&state()).unwrap();
    let view = snapshot.user_view();
    assert_eq!(
        view["vehicles"]["db:1"]["repeatingPlans"][1]["weekdays"],
        json!([7])
    );
    assert_eq!(view["active"], json!(["db:2"]));
}
