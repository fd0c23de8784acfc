// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Plan keys: deterministic, human-readable identities for materialized plans.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of one plan slot, derived from vehicle id, title and ordinal.
///
/// Stable across runs as long as none of its inputs change. A retitled
/// vehicle therefore produces new keys for all of its plans.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlanKey(String);

impl PlanKey {
    /// Derives the key for plan `ordinal` (1-based) of a vehicle.
    ///
    /// The title is folded in only when it adds information, i.e. when it is
    /// non-empty and differs from the vehicle id.
    pub fn derive(vehicle_id: &str, title: Option<&str>, ordinal: usize) -> Self {
        let mut key = slug(vehicle_id);
        if let Some(title) = title.filter(|t| !t.trim().is_empty() && *t != vehicle_id) {
            key.push('_');
            key.push_str(&slug(title));
        }
        PlanKey(format!("{}_repeating_plan_{:02}", key, ordinal))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlanKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lowercases and replaces every run of non-alphanumerics with one `_`.
fn slug(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.trim().chars().flat_map(char::to_lowercase) {
        if c.is_alphanumeric() {
            out.push(c);
        } else if !out.ends_with('_') {
            out.push('_');
        }
    }
    let trimmed = out.trim_matches('_');
    if trimmed.is_empty() {
        "vehicle".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
#[path = "key_tests.rs"]
mod tests;
