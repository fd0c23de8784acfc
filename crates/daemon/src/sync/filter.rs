// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Relevance classification and duplicate suppression for push events.
//!
//! The remote service pushes every state change it has, most of which have
//! nothing to do with charge plans. Only the events that can change the plan
//! entity set trigger a refresh:
//!
//! 1. Full state pushes carrying both `vehicles` and `loadpoints`.
//! 2. Paths under `/api/vehicles/<id>/plan/repeating`.
//! 3. Vehicle paths touching a `title` or `name`.
//! 4. Paths or top-level fields naming the active vehicle selection.
//!
//! Rules are evaluated in that order; the first match wins.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use tracing::debug;

use ps_core::PushEvent;

// Compile-time constant pattern, exercised by the tests below.
static PLAN_PATH_RE: LazyLock<Regex> =
    LazyLock::new(|| match Regex::new(r"^/api/vehicles/[^/]+/plan/repeating") {
        Ok(re) => re,
        Err(_) => unreachable!("static regex pattern"),
    });

const ACTIVE_VEHICLE_MARKERS: [&str; 2] = ["vehicleName", "activeVehicle"];

/// Which relevance rule matched an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relevance {
    FullState,
    PlanPath,
    VehicleTitle,
    ActiveVehicle,
}

/// Classifies a push event. Returns `None` for irrelevant events.
pub fn classify(event: &PushEvent) -> Option<Relevance> {
    let payload = event.payload.as_object()?;
    if payload.contains_key("vehicles") && payload.contains_key("loadpoints") {
        return Some(Relevance::FullState);
    }

    let path = event.path.as_deref().unwrap_or("");
    if PLAN_PATH_RE.is_match(path) {
        return Some(Relevance::PlanPath);
    }
    if path.contains("/vehicles/") && (path.contains("title") || path.contains("name")) {
        return Some(Relevance::VehicleTitle);
    }

    let names_active = |s: &str| ACTIVE_VEHICLE_MARKERS.iter().any(|m| s.contains(m));
    if names_active(path) || payload.keys().any(|k| names_active(k)) {
        return Some(Relevance::ActiveVehicle);
    }
    None
}

/// Returns true if the event can change the plan entity set.
pub fn is_relevant(event: &PushEvent) -> bool {
    classify(event).is_some()
}

/// Stable serialization of a JSON value with object keys sorted at every level.
pub fn signature(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                if let Some(v) = map.get(key) {
                    write_canonical(v, out);
                }
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

/// Relevance filter with suppression of immediate repeats.
///
/// Owned by the push read loop only. The stored signature must be cleared
/// with [`EventFilter::reset`] whenever the connection leaves `Connected`.
#[derive(Debug, Default)]
pub struct EventFilter {
    last_signature: Option<String>,
}

impl EventFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the event is relevant and not a repeat of the
    /// previously accepted one. Accepted events become the new reference.
    pub fn accept(&mut self, event: &PushEvent) -> bool {
        let Some(rule) = classify(event) else {
            return false;
        };
        let sig = signature(&event.payload);
        if self.last_signature.as_deref() == Some(sig.as_str()) {
            debug!("skipping duplicate push event ({:?})", rule);
            return false;
        }
        debug!("relevant push event ({:?})", rule);
        self.last_signature = Some(sig);
        true
    }

    /// Forgets the last accepted signature.
    pub fn reset(&mut self) {
        self.last_signature = None;
    }

    pub fn last_signature(&self) -> Option<&str> {
        self.last_signature.as_deref()
    }
}

#[cfg(test)]
#[path = "filter_tests.rs"]
mod tests;
