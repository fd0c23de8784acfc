// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Repeating charge plans and the edits that can be applied to them.
//!
//! Plans are stored exactly as the remote service reports them, which means
//! weekdays use the remote numbering (0 = Sunday .. 6 = Saturday). Everything
//! that faces a user speaks the ISO numbering (1 = Monday .. 7 = Sunday), and
//! conversion happens at the edges with [`to_api_weekday`] and
//! [`to_user_weekday`].

use chrono::NaiveTime;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// Default timezone for plans the remote service reports without one.
pub const DEFAULT_TZ: &str = "UTC";

/// Default state-of-charge target for newly added plans.
pub const DEFAULT_SOC: u8 = 100;

/// A recurring charge-scheduling rule for one vehicle.
///
/// Decoding is lenient field by field: a missing, `null` or mistyped field
/// takes its default instead of failing the whole plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    /// Departure time, `HH:MM`.
    #[serde(default, deserialize_with = "lenient")]
    pub time: String,
    /// Weekdays in remote numbering (0 = Sunday).
    #[serde(default, deserialize_with = "lenient")]
    pub weekdays: Vec<u8>,
    /// State-of-charge target in percent.
    #[serde(default, deserialize_with = "lenient")]
    pub soc: u8,
    #[serde(default, deserialize_with = "lenient")]
    pub active: bool,
    /// IANA timezone name.
    #[serde(default = "default_tz", deserialize_with = "lenient_tz")]
    pub tz: String,
    /// 0 or 1.
    #[serde(default, deserialize_with = "lenient")]
    pub precondition: u8,
    /// Fields this crate does not model, preserved across read-modify-write.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_tz() -> String {
    DEFAULT_TZ.to_string()
}

fn lenient<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(T::deserialize(value).unwrap_or_default())
}

fn lenient_tz<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(tz) if !tz.trim().is_empty() => tz,
        _ => default_tz(),
    })
}

impl Plan {
    /// Creates an active plan with the given time and remote weekdays.
    pub fn new(time: impl Into<String>, weekdays: Vec<u8>, soc: u8) -> Self {
        Plan {
            time: time.into(),
            weekdays,
            soc,
            active: true,
            tz: default_tz(),
            precondition: 0,
            extra: Map::new(),
        }
    }

    /// Weekdays in user numbering (1 = Monday .. 7 = Sunday), sorted.
    pub fn user_weekdays(&self) -> Vec<u8> {
        let mut days: Vec<u8> = self.weekdays.iter().map(|d| to_user_weekday(*d)).collect();
        days.sort_unstable();
        days.dedup();
        days
    }

    /// JSON view of the plan for user-facing consumers.
    ///
    /// Identical to the wire form except that `weekdays` uses user numbering.
    pub fn user_view(&self) -> Value {
        let mut obj = self.extra.clone();
        obj.insert("time".into(), Value::from(self.time.clone()));
        obj.insert("weekdays".into(), Value::from(self.user_weekdays()));
        obj.insert("soc".into(), Value::from(self.soc));
        obj.insert("active".into(), Value::from(self.active));
        obj.insert("tz".into(), Value::from(self.tz.clone()));
        obj.insert("precondition".into(), Value::from(self.precondition));
        Value::Object(obj)
    }
}

/// Converts a user weekday (1 = Monday .. 7 = Sunday) to remote numbering.
pub fn to_api_weekday(user: u8) -> u8 {
    if user == 7 {
        0
    } else {
        user
    }
}

/// Converts a remote weekday (0 = Sunday .. 6 = Saturday) to user numbering.
pub fn to_user_weekday(api: u8) -> u8 {
    if api == 0 {
        7
    } else {
        api
    }
}

/// Parses and normalizes an `HH:MM` time.
pub fn parse_time(s: &str) -> Result<String> {
    let s = s.trim();
    let well_formed = s.len() == 5 && s.as_bytes().get(2) == Some(&b':');
    let time = NaiveTime::parse_from_str(s, "%H:%M")
        .ok()
        .filter(|_| well_formed)
        .ok_or_else(|| Error::Validation(format!("time '{}' must be HH:MM", s)))?;
    Ok(time.format("%H:%M").to_string())
}

/// Validates user weekdays and converts them to sorted remote numbering.
pub fn parse_user_weekdays(days: &[i64]) -> Result<Vec<u8>> {
    let mut api = Vec::with_capacity(days.len());
    for &day in days {
        if !(1..=7).contains(&day) {
            return Err(Error::Validation(format!(
                "weekday {} out of range\n  hint: use 1 (Monday) .. 7 (Sunday)",
                day
            )));
        }
        api.push(to_api_weekday(day as u8));
    }
    api.sort_unstable();
    api.dedup();
    Ok(api)
}

/// Parses a comma-separated list of user weekdays, e.g. `"1,2,3"`.
pub fn parse_weekday_list(s: &str) -> Result<Vec<u8>> {
    let mut days = Vec::new();
    for part in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let day: i64 = part
            .parse()
            .map_err(|_| Error::Validation(format!("weekday '{}' is not a number", part)))?;
        days.push(day);
    }
    parse_user_weekdays(&days)
}

/// Validates a state-of-charge target.
pub fn parse_soc(soc: i64) -> Result<u8> {
    u8::try_from(soc)
        .ok()
        .filter(|s| *s <= 100)
        .ok_or_else(|| Error::Validation(format!("soc {} must be between 0 and 100", soc)))
}

fn parse_precondition(value: i64) -> Result<u8> {
    match value {
        0 => Ok(0),
        1 => Ok(1),
        other => Err(Error::Validation(format!(
            "precondition {} must be 0 or 1",
            other
        ))),
    }
}

/// A partial update to a plan, as received from a user.
///
/// Weekdays are in user numbering. Nothing here has been validated yet; call
/// [`PlanPatch::validate`] before touching any plan.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weekdays: Option<Vec<i64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub soc: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tz: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precondition: Option<i64>,
}

impl PlanPatch {
    /// Returns true if the patch changes nothing.
    pub fn is_empty(&self) -> bool {
        *self == PlanPatch::default()
    }

    /// Validates every present field.
    pub fn validate(&self) -> Result<ValidPatch> {
        let tz = match &self.tz {
            Some(tz) if tz.trim().is_empty() => {
                return Err(Error::Validation("tz must not be empty".into()))
            }
            Some(tz) => Some(tz.trim().to_string()),
            None => None,
        };
        Ok(ValidPatch {
            time: self.time.as_deref().map(parse_time).transpose()?,
            weekdays: self
                .weekdays
                .as_deref()
                .map(parse_user_weekdays)
                .transpose()?,
            soc: self.soc.map(parse_soc).transpose()?,
            active: self.active,
            tz,
            precondition: self.precondition.map(parse_precondition).transpose()?,
        })
    }
}

/// A single user-initiated change to one plan.
#[derive(Debug, Clone, PartialEq)]
pub enum PlanEdit {
    SetActive(bool),
    /// `HH:MM`.
    SetTime(String),
    SetSoc(i64),
    /// User numbering.
    SetWeekdays(Vec<i64>),
    /// Several fields at once.
    Patch(PlanPatch),
}

impl PlanEdit {
    /// Validates the edit without applying it.
    pub fn validate(&self) -> Result<ValidPatch> {
        self.to_patch().validate()
    }

    fn to_patch(&self) -> PlanPatch {
        match self {
            PlanEdit::SetActive(active) => PlanPatch {
                active: Some(*active),
                ..PlanPatch::default()
            },
            PlanEdit::SetTime(time) => PlanPatch {
                time: Some(time.clone()),
                ..PlanPatch::default()
            },
            PlanEdit::SetSoc(soc) => PlanPatch {
                soc: Some(*soc),
                ..PlanPatch::default()
            },
            PlanEdit::SetWeekdays(days) => PlanPatch {
                weekdays: Some(days.clone()),
                ..PlanPatch::default()
            },
            PlanEdit::Patch(patch) => patch.clone(),
        }
    }
}

/// A validated [`PlanPatch`], in remote representation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidPatch {
    pub time: Option<String>,
    /// Remote numbering.
    pub weekdays: Option<Vec<u8>>,
    pub soc: Option<u8>,
    pub active: Option<bool>,
    pub tz: Option<String>,
    pub precondition: Option<u8>,
}

impl ValidPatch {
    /// Overwrites the fields present in the patch, leaving the rest untouched.
    pub fn apply_to(&self, plan: &mut Plan) {
        if let Some(time) = &self.time {
            plan.time = time.clone();
        }
        if let Some(weekdays) = &self.weekdays {
            plan.weekdays = weekdays.clone();
        }
        if let Some(soc) = self.soc {
            plan.soc = soc;
        }
        if let Some(active) = self.active {
            plan.active = active;
        }
        if let Some(tz) = &self.tz {
            plan.tz = tz.clone();
        }
        if let Some(precondition) = self.precondition {
            plan.precondition = precondition;
        }
    }

    /// Builds a new plan from the patch.
    ///
    /// `time` and `weekdays` are required. `tz` and `precondition` fall back
    /// to `template` (usually the vehicle's last plan) when absent.
    pub fn into_plan(self, template: Option<&Plan>) -> Result<Plan> {
        let time = self
            .time
            .ok_or_else(|| Error::Validation("a new plan needs a time".into()))?;
        let weekdays = self
            .weekdays
            .ok_or_else(|| Error::Validation("a new plan needs weekdays".into()))?;
        Ok(Plan {
            time,
            weekdays,
            soc: self.soc.unwrap_or(DEFAULT_SOC),
            active: self.active.unwrap_or(true),
            tz: self
                .tz
                .or_else(|| template.map(|t| t.tz.clone()))
                .unwrap_or_else(default_tz),
            precondition: self
                .precondition
                .or_else(|| template.map(|t| t.precondition))
                .unwrap_or(0),
            extra: Map::new(),
        })
    }
}

#[cfg(test)]
#[path = "plan_tests.rs"]
mod tests;
