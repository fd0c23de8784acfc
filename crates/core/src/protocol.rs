// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Wire messages.
//!
//! Two protocols live here:
//! - Inbound push events from the remote service, which are arbitrary JSON
//!   objects and only ever classified, never fully decoded.
//! - The local subscriber protocol: requests tagged by `type` and the
//!   responses and broadcasts sent back.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::plan::PlanPatch;

/// One message received on the push channel.
#[derive(Debug, Clone, PartialEq)]
pub struct PushEvent {
    /// The complete decoded message.
    pub payload: Value,
    /// `path` field, when the message carries one.
    pub path: Option<String>,
    /// `type` (or `event`) field, when the message carries one.
    pub event_type: Option<String>,
}

impl PushEvent {
    /// Decodes a text frame. Anything but a JSON object is a protocol error.
    pub fn parse(text: &str) -> Result<Self> {
        let payload: Value = serde_json::from_str(text)
            .map_err(|e| Error::Protocol(format!("malformed push message: {}", e)))?;
        Self::from_value(payload)
    }

    pub fn from_value(payload: Value) -> Result<Self> {
        if !payload.is_object() {
            return Err(Error::Protocol("push message is not a JSON object".into()));
        }
        let field = |name: &str| payload.get(name).and_then(Value::as_str).map(str::to_string);
        let path = field("path");
        let event_type = field("type").or_else(|| field("event"));
        Ok(PushEvent {
            payload,
            path,
            event_type,
        })
    }
}

/// Requests a local subscriber may send.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum LocalRequest {
    /// All vehicles and plans, weekdays in user numbering.
    #[serde(rename = "scheduler/get")]
    Get {
        #[serde(default)]
        id: Option<u64>,
        #[serde(default)]
        connection: Option<String>,
    },

    /// Append a plan to a vehicle.
    #[serde(rename = "scheduler/add")]
    Add {
        #[serde(default)]
        id: Option<u64>,
        #[serde(default)]
        connection: Option<String>,
        #[serde(default)]
        vehicle_id: Option<String>,
        #[serde(flatten)]
        plan: PlanPatch,
    },

    /// Change fields of an existing plan.
    #[serde(rename = "scheduler/edit")]
    Edit {
        #[serde(default)]
        id: Option<u64>,
        #[serde(default)]
        connection: Option<String>,
        #[serde(default)]
        vehicle_id: Option<String>,
        /// 1-based.
        plan_index: usize,
        #[serde(flatten)]
        plan: PlanPatch,
    },

    /// Remove a plan.
    #[serde(rename = "scheduler/delete")]
    Delete {
        #[serde(default)]
        id: Option<u64>,
        #[serde(default)]
        connection: Option<String>,
        #[serde(default)]
        vehicle_id: Option<String>,
        /// 1-based.
        plan_index: usize,
    },

    /// Rendered presentation state of every materialized plan.
    #[serde(rename = "scheduler/entities")]
    Entities {
        #[serde(default)]
        id: Option<u64>,
        #[serde(default)]
        connection: Option<String>,
    },

    /// Push channel status of every connection.
    #[serde(rename = "scheduler/status")]
    Status {
        #[serde(default)]
        id: Option<u64>,
    },
}

impl LocalRequest {
    /// The client-chosen id echoed in the response.
    pub fn id(&self) -> Option<u64> {
        match self {
            LocalRequest::Get { id, .. }
            | LocalRequest::Add { id, .. }
            | LocalRequest::Edit { id, .. }
            | LocalRequest::Delete { id, .. }
            | LocalRequest::Entities { id, .. }
            | LocalRequest::Status { id } => *id,
        }
    }

    /// The configured connection the request targets, if named.
    pub fn connection(&self) -> Option<&str> {
        match self {
            LocalRequest::Get { connection, .. }
            | LocalRequest::Add { connection, .. }
            | LocalRequest::Edit { connection, .. }
            | LocalRequest::Delete { connection, .. }
            | LocalRequest::Entities { connection, .. } => connection.as_deref(),
            LocalRequest::Status { .. } => None,
        }
    }

    pub fn from_json(s: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

/// Messages sent to local subscribers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LocalMessage {
    /// Response to a [`LocalRequest`].
    Result {
        id: Option<u64>,
        success: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        result: Option<Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },

    /// Broadcast after every successful plan mutation.
    PlansUpdated {
        connection: String,
        vehicle_id: String,
        /// Plans in user representation.
        plans: Vec<Value>,
    },
}

impl LocalMessage {
    pub fn success(id: Option<u64>, result: Value) -> Self {
        LocalMessage::Result {
            id,
            success: true,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: Option<u64>, error: impl Into<String>) -> Self {
        LocalMessage::Result {
            id,
            success: false,
            result: None,
            error: Some(error.into()),
        }
    }

    pub fn to_json(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(s: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
