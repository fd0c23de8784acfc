// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Local subscriber API.
//!
//! A WebSocket server answering `scheduler/*` requests against the
//! registry's coordinators, and forwarding every `plans_updated` broadcast to
//! each connected subscriber.

use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast::error::RecvError;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use ps_core::{LocalMessage, LocalRequest, Plan, PlanEdit};

use crate::error::{Error, Result};
use crate::registry::Registry;

type ConnectionResult = std::result::Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// Binds the listening socket.
pub async fn bind(addr: SocketAddr) -> Result<TcpListener> {
    let listener = TcpListener::bind(addr).await?;
    info!("local API listening on {}", listener.local_addr()?);
    Ok(listener)
}

/// Accepts subscribers until `shutdown` is cancelled.
pub async fn serve(
    listener: TcpListener,
    registry: Arc<Registry>,
    shutdown: CancellationToken,
) -> Result<()> {
    loop {
        let (stream, peer_addr) = tokio::select! {
            _ = shutdown.cancelled() => break,
            accepted = listener.accept() => accepted?,
        };
        let registry = Arc::clone(&registry);
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, peer_addr, registry, shutdown).await {
                error!("subscriber {} failed: {}", peer_addr, e);
            }
        });
    }
    debug!("local API stopped accepting");
    Ok(())
}

/// Runs one subscriber session.
async fn handle_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    registry: Arc<Registry>,
    shutdown: CancellationToken,
) -> ConnectionResult {
    let ws_stream = tokio_tungstenite::accept_async(stream).await?;
    info!("subscriber connected: {}", peer_addr);

    let (mut ws_sink, mut ws_stream) = ws_stream.split();
    let mut broadcast_rx = registry.events().subscribe();

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                let _ = ws_sink.send(Message::Close(None)).await;
                break;
            }

            msg = ws_stream.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let response = handle_text(text.as_str(), &registry).await;
                        ws_sink.send(Message::text(response.to_json()?)).await?;
                    }
                    Some(Ok(Message::Close(_))) => {
                        info!("subscriber {} disconnected", peer_addr);
                        break;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        ws_sink.send(Message::Pong(data)).await?;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!("websocket error from {}: {}", peer_addr, e);
                        break;
                    }
                    None => break,
                }
            }

            broadcast = broadcast_rx.recv() => {
                match broadcast {
                    Ok(msg) => {
                        if let Err(e) = ws_sink.send(Message::text(msg.to_json()?)).await {
                            warn!("failed to forward event to {}: {}", peer_addr, e);
                            break;
                        }
                    }
                    Err(RecvError::Lagged(n)) => {
                        warn!("subscriber {} lagged by {} events", peer_addr, n);
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        }
    }

    debug!("subscriber session ended: {}", peer_addr);
    Ok(())
}

async fn handle_text(text: &str, registry: &Registry) -> LocalMessage {
    match LocalRequest::from_json(text) {
        Ok(request) => handle_request(registry, request).await,
        Err(e) => {
            debug!("malformed request: {}", e);
            LocalMessage::failure(None, format!("invalid request: {}", e))
        }
    }
}

/// Answers one request. Failures become `success: false` results.
pub async fn handle_request(registry: &Registry, request: LocalRequest) -> LocalMessage {
    let id = request.id();
    match dispatch(registry, request).await {
        Ok(result) => LocalMessage::success(id, result),
        Err(e) => {
            if e.is_validation() || e.is_not_found() {
                debug!("request {:?} rejected: {}", id, e);
            } else {
                warn!("request {:?} failed: {}", id, e);
            }
            LocalMessage::failure(id, e.to_string())
        }
    }
}

async fn dispatch(registry: &Registry, request: LocalRequest) -> Result<Value> {
    // Status spans every connection, including when none is configured.
    if let LocalRequest::Status { .. } = request {
        return Ok(status_result(registry).await);
    }
    let coordinator = registry.resolve(request.connection()).await?;
    match request {
        LocalRequest::Get { .. } => coordinator.state_view().await,
        LocalRequest::Add {
            vehicle_id, plan, ..
        } => {
            let plans = coordinator.add_plan(vehicle_id.as_deref(), plan).await?;
            Ok(plans_result(&plans))
        }
        LocalRequest::Edit {
            vehicle_id,
            plan_index,
            plan,
            ..
        } => {
            if plan.is_empty() {
                return Err(Error::Core(ps_core::Error::Validation(
                    "edit changes no fields".into(),
                )));
            }
            let plans = coordinator
                .edit_plan(vehicle_id.as_deref(), plan_index, PlanEdit::Patch(plan))
                .await?;
            Ok(plans_result(&plans))
        }
        LocalRequest::Delete {
            vehicle_id,
            plan_index,
            ..
        } => {
            let plans = coordinator
                .delete_plan(vehicle_id.as_deref(), plan_index)
                .await?;
            Ok(plans_result(&plans))
        }
        LocalRequest::Entities { .. } => Ok(Value::from(coordinator.entities().await)),
        LocalRequest::Status { .. } => Ok(status_result(registry).await),
    }
}

async fn status_result(registry: &Registry) -> Value {
    json!({ "connections": registry.status().await })
}

fn plans_result(plans: &[Plan]) -> Value {
    let plans: Vec<Value> = plans.iter().map(Plan::user_view).collect();
    json!({ "plans": plans })
}

#[cfg(test)]
#[path = "server_tests.rs"]
mod tests;
