// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Every configured connection, keyed by name.
//!
//! Each connection owns a [`Coordinator`], a poll timer and, unless disabled,
//! a [`PushClient`] whose events trigger a full refresh. All connections
//! share one [`EventHub`].

use std::sync::Arc;

use serde_json::{json, Value};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use ps_core::PushEvent;

use crate::api::{HttpApi, RemoteApi};
use crate::config::{Config, ConnectionConfig};
use crate::coordinator::Coordinator;
use crate::error::{Error, Result};
use crate::events::EventHub;
use crate::reconcile::SyncReport;
use crate::sync::{PushClient, PushSettings, Transport, WebSocketTransport};

struct Connection {
    name: String,
    coordinator: Coordinator,
    push: Option<PushClient>,
    poll_cancel: CancellationToken,
    poller: JoinHandle<()>,
}

/// Owner of every running connection.
pub struct Registry {
    events: EventHub,
    /// In configuration order.
    connections: Mutex<Vec<Connection>>,
}

impl Registry {
    pub fn new(events: EventHub) -> Self {
        Registry {
            events,
            connections: Mutex::new(Vec::new()),
        }
    }

    /// Starts every connection in `config` against its HTTP API.
    pub async fn setup(config: &Config) -> Result<Self> {
        let registry = Registry::new(EventHub::new());
        for conn in &config.connections {
            let api = HttpApi::from_config(conn)?;
            let transport = conn.websocket.then(WebSocketTransport::new);
            registry.add(conn, Arc::new(api), transport).await?;
        }
        Ok(registry)
    }

    pub fn events(&self) -> &EventHub {
        &self.events
    }

    /// Starts one connection. Without a transport the connection relies on
    /// polling alone.
    pub async fn add<T>(
        &self,
        conn: &ConnectionConfig,
        api: Arc<dyn RemoteApi>,
        transport: Option<T>,
    ) -> Result<Coordinator>
    where
        T: Transport + 'static,
    {
        let name = conn.name();
        let mut connections = self.connections.lock().await;
        if connections.iter().any(|c| c.name == name) {
            return Err(Error::Config(format!("duplicate connection name '{}'", name)));
        }

        let coordinator = Coordinator::with_options(
            name.clone(),
            api,
            self.events.clone(),
            conn.vehicles,
            conn.stale_after(),
        );

        let poll_cancel = CancellationToken::new();
        let poller = {
            let coordinator = coordinator.clone();
            let cancel = poll_cancel.clone();
            let interval = conn.poll_interval();
            tokio::spawn(async move { coordinator.run_polling(interval, cancel).await })
        };

        let push = transport.map(|transport| {
            let settings = PushSettings::from_config(conn);
            info!("[{}] push channel enabled: {}", name, settings.url);
            let coordinator = coordinator.clone();
            PushClient::start(settings, transport, move |event: PushEvent| {
                let coordinator = coordinator.clone();
                async move {
                    debug!(
                        "[{}] refresh on push event {:?}",
                        coordinator.name(),
                        event.path
                    );
                    coordinator.refresh().await.map(|_| ())
                }
            })
        });

        info!(
            "[{}] connection started (poll every {:?})",
            name,
            conn.poll_interval()
        );
        connections.push(Connection {
            name,
            coordinator: coordinator.clone(),
            push,
            poll_cancel,
            poller,
        });
        Ok(coordinator)
    }

    /// Push channel status of every connection, in configuration order.
    /// `push` is null for connections that rely on polling alone.
    pub async fn status(&self) -> Vec<Value> {
        self.connections
            .lock()
            .await
            .iter()
            .map(|c| {
                let push = c.push.as_ref().map_or(Value::Null, |push| {
                    json!({
                        "state": push.state().status_string(),
                        "queued": push.queued(),
                        "dropped": push.dropped(),
                    })
                });
                json!({ "name": c.name, "push": push })
            })
            .collect()
    }

    pub async fn get(&self, name: &str) -> Option<Coordinator> {
        self.connections
            .lock()
            .await
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.coordinator.clone())
    }

    /// The first configured connection.
    pub async fn first(&self) -> Option<Coordinator> {
        self.connections
            .lock()
            .await
            .first()
            .map(|c| c.coordinator.clone())
    }

    /// Looks up a named connection, or the first one when unnamed.
    pub async fn resolve(&self, name: Option<&str>) -> Result<Coordinator> {
        match name {
            Some(name) => self
                .get(name)
                .await
                .ok_or_else(|| Error::UnknownConnection(name.to_string())),
            None => self
                .first()
                .await
                .ok_or_else(|| Error::UnknownConnection("(none configured)".into())),
        }
    }

    /// Stops one connection and removes every object it materialized.
    ///
    /// Push events already queued are still handled before the timer stops.
    pub async fn teardown(&self, name: &str) -> Result<SyncReport> {
        let connection = {
            let mut connections = self.connections.lock().await;
            let index = connections
                .iter()
                .position(|c| c.name == name)
                .ok_or_else(|| Error::UnknownConnection(name.to_string()))?;
            connections.remove(index)
        };
        Ok(stop(connection).await)
    }

    /// Stops every connection.
    pub async fn teardown_all(&self) -> SyncReport {
        let connections: Vec<Connection> = self.connections.lock().await.drain(..).collect();
        let mut total = SyncReport::default();
        for connection in connections {
            let report = stop(connection).await;
            total.created += report.created;
            total.updated += report.updated;
            total.removed += report.removed;
            total.failed.extend(report.failed);
        }
        total
    }
}

async fn stop(connection: Connection) -> SyncReport {
    let Connection {
        name,
        coordinator,
        push,
        poll_cancel,
        poller,
    } = connection;

    if let Some(push) = push {
        let handled = push.shutdown().await;
        debug!("[{}] push channel stopped after {} event(s)", name, handled);
    }
    poll_cancel.cancel();
    if let Err(e) = poller.await {
        warn!("[{}] poll timer ended abnormally: {}", name, e);
    }
    let report = coordinator.teardown().await;
    info!("[{}] connection stopped", name);
    report
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
