// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use serde_json::json;
use yare::parameterized;

#[test]
fn push_event_extracts_path_and_type() {
    let event =
        PushEvent::parse(r#"{"path": "/api/vehicles/db:1/plan/repeating", "type": "update"}"#)
            .unwrap();
    assert_eq!(
        event.path.as_deref(),
        Some("/api/vehicles/db:1/plan/repeating")
    );
    assert_eq!(event.event_type.as_deref(), Some("update"));
}

#[test]
fn push_event_falls_back_to_event_field() {
    let event = PushEvent::parse(r#"{"event": "state"}"#).unwrap();
    assert_eq!(event.event_type.as_deref(), Some("state"));
    assert!(event.path.is_none());
}

#[parameterized(
    not_json = { "hello" },
    truncated = { "{\"path\": " },
    array = { "[1, 2, 3]" },
    number = { "42" },
)]
fn push_event_rejects(text: &str) {
    assert!(matches!(PushEvent::parse(text), Err(Error::Protocol(_))));
}

#[parameterized(
    get = { json!({"type": "scheduler/get", "id": 1}), Some(1), None },
    entities = { json!({"type": "scheduler/entities", "connection": "garage"}), None, Some("garage") },
    delete = { json!({"type": "scheduler/delete", "id": 7, "plan_index": 2}), Some(7), None },
)]
fn local_request_accessors(value: Value, id: Option<u64>, connection: Option<&str>) {
    let req: LocalRequest = serde_json::from_value(value).unwrap();
    assert_eq!(req.id(), id);
    assert_eq!(req.connection(), connection);
}

#[test]
fn local_request_add_flattens_plan_fields() {
    let req = LocalRequest::from_json(
        r#"{"type": "scheduler/add", "id": 3, "time": "08:00", "weekdays": [1, 7], "soc": 80}"#,
    )
    .unwrap();

    let LocalRequest::Add {
        plan, vehicle_id, ..
    } = req
    else {
        unreachable!("expected add request");
    };
    assert!(vehicle_id.is_none());
    assert_eq!(plan.time.as_deref(), Some("08:00"));
    assert_eq!(plan.weekdays, Some(vec![1, 7]));
    assert_eq!(plan.soc, Some(80));
    assert!(plan.active.is_none());
}

#[test]
fn local_request_edit_requires_plan_index() {
    assert!(LocalRequest::from_json(r#"{"type": "scheduler/edit", "active": true}"#).is_err());
}

#[test]
fn local_request_status_targets_no_connection() {
    let req = LocalRequest::from_json(r#"{"type": "scheduler/status", "id": 4}"#).unwrap();
    assert_eq!(req, LocalRequest::Status { id: Some(4) });
    assert_eq!(req.id(), Some(4));
    assert!(req.connection().is_none());
}

#[test]
fn local_request_unknown_type_is_rejected() {
    assert!(LocalRequest::from_json(r#"{"type": "scheduler/deleate", "plan_index": 1}"#).is_err());
}

#[test]
fn plans_updated_json_format() {
    let msg = LocalMessage::PlansUpdated {
        connection: "garage".into(),
        vehicle_id: "db:1".into(),
        plans: vec![json!({"time": "08:00"})],
    };
    let value: Value = serde_json::from_str(&msg.to_json().unwrap()).unwrap();
    assert_eq!(value["type"], "plans_updated");
    assert_eq!(value["vehicle_id"], "db:1");
    assert_eq!(value["plans"][0]["time"], "08:00");
}

#[test]
fn result_messages_omit_absent_fields() {
    let ok: Value = serde_json::from_str(
        &LocalMessage::success(Some(1), json!({"n": 1}))
            .to_json()
            .unwrap(),
    )
    .unwrap();
    assert_eq!(ok["success"], true);
    assert!(ok.get("error").is_none());

    let err: Value =
        serde_json::from_str(&LocalMessage::failure(None, "boom").to_json().unwrap()).unwrap();
    assert_eq!(err["success"], false);
    assert_eq!(err["error"], "boom");
    assert!(err.get("result").is_none());
}

#[test]
fn local_message_roundtrip() {
    let msg = LocalMessage::failure(Some(9), "not found");
    let parsed = LocalMessage::from_json(&msg.to_json().unwrap()).unwrap();
    assert_eq!(msg, parsed);
}
