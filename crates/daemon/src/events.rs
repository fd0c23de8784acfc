// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Outward event broadcast to local subscribers.

use tokio::sync::broadcast;
use tracing::debug;

use ps_core::{LocalMessage, Plan};

const EVENT_BUFFER: usize = 1024;

/// Fire-and-forget fan-out of [`LocalMessage`]s.
///
/// Subscribers that fall behind lose the oldest events instead of blocking
/// the publisher.
#[derive(Debug, Clone)]
pub struct EventHub {
    tx: broadcast::Sender<LocalMessage>,
}

impl EventHub {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_BUFFER);
        EventHub { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LocalMessage> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Returns the number of subscribers the message was delivered to.
    pub fn publish(&self, msg: LocalMessage) -> usize {
        self.tx.send(msg).unwrap_or(0)
    }

    /// Announces a vehicle's new plan list, weekdays in user numbering.
    pub fn plans_updated(&self, connection: &str, vehicle_id: &str, plans: &[Plan]) -> usize {
        let delivered = self.publish(LocalMessage::PlansUpdated {
            connection: connection.to_string(),
            vehicle_id: vehicle_id.to_string(),
            plans: plans.iter().map(Plan::user_view).collect(),
        });
        debug!(
            "plans_updated for {} on {} sent to {} subscriber(s)",
            vehicle_id, connection, delivered
        );
        delivered
    }
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "events_tests.rs"]
mod tests;
