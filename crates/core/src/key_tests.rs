// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    with_title = { "db:1", Some("Car"), 1, "db_1_car_repeating_plan_01" },
    without_title = { "db:1", None, 2, "db_1_repeating_plan_02" },
    title_equals_id = { "db:1", Some("db:1"), 3, "db_1_repeating_plan_03" },
    blank_title = { "db:1", Some("  "), 1, "db_1_repeating_plan_01" },
    spaces_and_dashes = { "my-car", Some("Family Van"), 12, "my_car_family_van_repeating_plan_12" },
    punctuation_only = { "::", None, 1, "vehicle_repeating_plan_01" },
)]
fn derive_key(vehicle_id: &str, title: Option<&str>, ordinal: usize, expected: &str) {
    assert_eq!(PlanKey::derive(vehicle_id, title, ordinal).as_str(), expected);
}

#[test]
fn keys_are_deterministic() {
    let a = PlanKey::derive("db:1", Some("Car"), 1);
    let b = PlanKey::derive("db:1", Some("Car"), 1);
    assert_eq!(a, b);
}

#[test]
fn keys_differ_across_vehicles_with_same_title() {
    let a = PlanKey::derive("db:1", Some("Car"), 1);
    let b = PlanKey::derive("db:2", Some("Car"), 1);
    assert_ne!(a, b);
}

#[test]
fn key_serializes_as_plain_string() {
    let key = PlanKey::derive("db:1", Some("Car"), 1);
    assert_eq!(
        serde_json::to_string(&key).ok().as_deref(),
        Some("\"db_1_car_repeating_plan_01\"")
    );
}
