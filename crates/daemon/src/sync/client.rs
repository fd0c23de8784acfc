// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Push channel client.
//!
//! Runs two tasks per connection:
//! - The read loop: connect, read, filter, relay, and reconnect with
//!   randomized backoff until stopped.
//! - The consumer loop: drains the relay queue and invokes the refresh
//!   callback for each relayed event.
//!
//! The tasks communicate only through the relay queue.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use ps_core::PushEvent;

use super::backoff::Backoff;
use super::connection::{SharedConnectionState, STATE_DISCONNECTED, STATE_STOPPED};
use super::filter::EventFilter;
use super::relay::{relay, Offer, RelaySender};
use super::transport::{Inbound, Transport};
use crate::config::ConnectionConfig;
use crate::error::Result;

/// Timing and sizing for one push connection.
#[derive(Debug, Clone)]
pub struct PushSettings {
    pub url: String,
    pub backoff: Backoff,
    pub open_timeout: Duration,
    /// `None` disables keep-alive pings.
    pub ping_interval: Option<Duration>,
    pub ping_timeout: Duration,
    pub idle_timeout: Duration,
    pub queue_capacity: usize,
    pub max_message_bytes: usize,
}

impl PushSettings {
    pub fn from_config(conn: &ConnectionConfig) -> Self {
        let push = &conn.push;
        PushSettings {
            url: conn.ws_url(),
            backoff: Backoff::new(
                Duration::from_millis(push.backoff_floor_ms),
                Duration::from_secs(push.backoff_ceiling_secs),
            ),
            open_timeout: Duration::from_secs(push.open_timeout_secs),
            ping_interval: (push.ping_interval_secs > 0)
                .then(|| Duration::from_secs(push.ping_interval_secs)),
            ping_timeout: Duration::from_secs(push.ping_timeout_secs),
            idle_timeout: Duration::from_secs(push.idle_timeout_secs),
            queue_capacity: push.queue_capacity,
            max_message_bytes: push.max_message_bytes,
        }
    }
}

/// Handle to a running push client.
pub struct PushClient {
    state: Arc<SharedConnectionState>,
    relay: RelaySender<PushEvent>,
    /// Stops the read loop.
    stop: CancellationToken,
    /// Stops the consumer loop without draining.
    force: CancellationToken,
    reader: JoinHandle<()>,
    consumer: JoinHandle<usize>,
}

impl PushClient {
    /// Spawns the read and consumer loops.
    ///
    /// `on_event` runs on the consumer loop, one event at a time.
    pub fn start<T, F, Fut>(settings: PushSettings, transport: T, on_event: F) -> Self
    where
        T: Transport + 'static,
        F: FnMut(PushEvent) -> Fut + Send + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let state = Arc::new(SharedConnectionState::new());
        let (tx, rx) = relay(settings.queue_capacity);
        let stop = CancellationToken::new();
        let force = CancellationToken::new();

        let reader = tokio::spawn(read_loop(
            settings,
            transport,
            Arc::clone(&state),
            tx.clone(),
            stop.clone(),
        ));
        let consumer = tokio::spawn(rx.consume(force.clone(), on_event));

        PushClient {
            state,
            relay: tx,
            stop,
            force,
            reader,
            consumer,
        }
    }

    pub fn state(&self) -> &Arc<SharedConnectionState> {
        &self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state.is_connected()
    }

    /// Relayed events dropped because the queue was full.
    pub fn dropped(&self) -> u64 {
        self.relay.dropped()
    }

    /// Relayed events waiting for the consumer.
    pub fn queued(&self) -> usize {
        self.relay.len()
    }

    /// Stops reading and waits for every already-queued event to be handled.
    ///
    /// Returns the number of events the consumer handled over its lifetime.
    pub async fn shutdown(self) -> usize {
        let PushClient {
            relay,
            stop,
            reader,
            consumer,
            ..
        } = self;
        stop.cancel();
        if let Err(e) = reader.await {
            warn!("push read loop ended abnormally: {}", e);
        }
        // The read loop's sender is gone; dropping ours lets the consumer drain and exit.
        drop(relay);
        join_consumer(consumer).await
    }

    /// Stops both loops immediately, discarding queued events.
    pub async fn stop_now(self) -> usize {
        self.stop.cancel();
        self.force.cancel();
        if let Err(e) = self.reader.await {
            warn!("push read loop ended abnormally: {}", e);
        }
        join_consumer(self.consumer).await
    }
}

async fn join_consumer(consumer: JoinHandle<usize>) -> usize {
    match consumer.await {
        Ok(processed) => processed,
        Err(e) => {
            warn!("push consumer ended abnormally: {}", e);
            0
        }
    }
}

/// Why a connected session ended.
#[derive(Debug, PartialEq, Eq)]
enum SessionEnd {
    Stopped,
    Lost(String),
}

async fn read_loop<T: Transport>(
    settings: PushSettings,
    mut transport: T,
    state: Arc<SharedConnectionState>,
    relay: RelaySender<PushEvent>,
    stop: CancellationToken,
) {
    let mut filter = EventFilter::new();
    let mut backoff = settings.backoff.floor();

    while !stop.is_cancelled() {
        let attempt = state.begin_attempt();
        debug!("connecting to {} (attempt {})", settings.url, attempt);

        let connect = tokio::time::timeout(
            settings.open_timeout,
            transport.connect(&settings.url, settings.max_message_bytes),
        );
        let outcome = tokio::select! {
            biased;
            _ = stop.cancelled() => break,
            outcome = connect => outcome,
        };

        match outcome {
            Ok(Ok(())) => {
                info!("connected to push channel at {}", settings.url);
                state.connected();
                backoff = settings.backoff.floor();

                let end = read_session(&settings, &mut transport, &mut filter, &relay, &stop).await;
                filter.reset();
                state.set(STATE_DISCONNECTED);
                close(&mut transport, settings.ping_timeout).await;
                match end {
                    SessionEnd::Stopped => break,
                    SessionEnd::Lost(reason) => {
                        warn!("push channel {} lost: {}", settings.url, reason)
                    }
                }
            }
            Ok(Err(e)) => {
                state.set(STATE_DISCONNECTED);
                warn!("push connect to {} failed: {}", settings.url, e);
            }
            Err(_) => {
                state.set(STATE_DISCONNECTED);
                warn!(
                    "push connect to {} timed out after {:?}",
                    settings.url, settings.open_timeout
                );
            }
        }

        let (sleep, next) = settings.backoff.next(backoff);
        backoff = next;
        debug!("reconnecting in {:.2}s", sleep.as_secs_f64());
        tokio::select! {
            biased;
            _ = stop.cancelled() => break,
            _ = tokio::time::sleep(sleep) => {}
        }
    }

    if transport.is_connected() {
        close(&mut transport, settings.ping_timeout).await;
    }
    state.set(STATE_STOPPED);
    debug!("push read loop for {} stopped", settings.url);
}

/// Closes the connection, giving up after `limit`. A peer that stopped
/// reading can block the close handshake indefinitely.
async fn close<T: Transport>(transport: &mut T, limit: Duration) {
    match tokio::time::timeout(limit, transport.disconnect()).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => debug!("error closing push connection: {}", e),
        Err(_) => debug!("closing push connection timed out after {:?}; dropped", limit),
    }
}

async fn read_session<T: Transport>(
    settings: &PushSettings,
    transport: &mut T,
    filter: &mut EventFilter,
    relay: &RelaySender<PushEvent>,
    stop: &CancellationToken,
) -> SessionEnd {
    let mut last_frame = Instant::now();
    let mut pong_deadline: Option<Instant> = None;
    let mut pinger = settings.ping_interval.map(|period| {
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        interval
    });

    loop {
        let idle_deadline = last_frame + settings.idle_timeout;
        let (deadline, reason) = match pong_deadline {
            Some(p) if p < idle_deadline => (p, "ping timeout"),
            _ => (idle_deadline, "idle timeout"),
        };

        tokio::select! {
            biased;
            _ = stop.cancelled() => return SessionEnd::Stopped,
            _ = tokio::time::sleep_until(deadline) => return SessionEnd::Lost(reason.into()),
            _ = tick(&mut pinger) => {
                match tokio::time::timeout(settings.ping_timeout, transport.ping()).await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => return SessionEnd::Lost(e.to_string()),
                    Err(_) => return SessionEnd::Lost("ping send timed out".into()),
                }
                if pong_deadline.is_none() {
                    pong_deadline = Some(Instant::now() + settings.ping_timeout);
                }
            }
            frame = transport.recv() => match frame {
                Ok(Some(inbound)) => {
                    last_frame = Instant::now();
                    pong_deadline = None;
                    if let Inbound::Text(text) = inbound {
                        relay_text(&text, filter, relay);
                    }
                }
                Ok(None) => return SessionEnd::Lost("closed by remote".into()),
                Err(e) => return SessionEnd::Lost(e.to_string()),
            },
        }
    }
}

fn relay_text(text: &str, filter: &mut EventFilter, relay: &RelaySender<PushEvent>) {
    match PushEvent::parse(text) {
        Ok(event) => {
            if filter.accept(&event) && relay.offer(event) == Offer::Closed {
                debug!("push consumer gone; event discarded");
            }
        }
        Err(e) => debug!("ignoring push message: {}", e),
    }
}

async fn tick(pinger: &mut Option<Interval>) {
    match pinger {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
