// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Transport abstraction for the push channel.
//!
//! Provides a trait-based transport layer that enables:
//! - Real WebSocket connections for production
//! - Mock transports for unit testing
//!
//! Outbound traffic is limited to protocol keep-alives, so the trait has no
//! general send operation.

use std::future::Future;
use std::pin::Pin;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use crate::error::{TransportError, TransportResult};

/// Boxed future returned by [`Transport`] methods.
pub type TransportFuture<'a, T> = Pin<Box<dyn Future<Output = TransportResult<T>> + Send + 'a>>;

/// A frame received from the push channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// A text message, not yet parsed.
    Text(String),
    /// Any other frame (pong, ping, binary). Only proves liveness.
    Heartbeat,
}

/// Transport trait for the push connection.
pub trait Transport: Send + Sync {
    /// Open a connection. Messages larger than `max_message_bytes` fail the read.
    fn connect(&mut self, url: &str, max_message_bytes: usize) -> TransportFuture<'_, ()>;

    /// Close the connection, if open.
    ///
    /// The connection is released even if the returned future is dropped
    /// before it completes.
    fn disconnect(&mut self) -> TransportFuture<'_, ()>;

    /// Send a keep-alive ping.
    fn ping(&mut self) -> TransportFuture<'_, ()>;

    /// Receive the next frame.
    ///
    /// Returns `None` if the connection is closed.
    fn recv(&mut self) -> TransportFuture<'_, Option<Inbound>>;

    /// Check if connected.
    fn is_connected(&self) -> bool;
}

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// WebSocket transport implementation using tokio-tungstenite.
pub struct WebSocketTransport {
    /// The WebSocket connection, if connected.
    ws: Option<WebSocketConnection>,
}

struct WebSocketConnection {
    sink: SplitSink<WsStream, Message>,
    stream: SplitStream<WsStream>,
}

impl WebSocketTransport {
    pub fn new() -> Self {
        WebSocketTransport { ws: None }
    }
}

impl Default for WebSocketTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for WebSocketTransport {
    fn connect(&mut self, url: &str, max_message_bytes: usize) -> TransportFuture<'_, ()> {
        let url = url.to_string();
        Box::pin(async move {
            // A previous connection is replaced, never reused.
            self.ws = None;
            let config = WebSocketConfig::default()
                .max_message_size(Some(max_message_bytes))
                .max_frame_size(Some(max_message_bytes));
            let (ws_stream, _) =
                tokio_tungstenite::connect_async_with_config(url.as_str(), Some(config), false)
                    .await
                    .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;

            let (sink, stream) = ws_stream.split();
            self.ws = Some(WebSocketConnection { sink, stream });
            Ok(())
        })
    }

    fn disconnect(&mut self) -> TransportFuture<'_, ()> {
        Box::pin(async move {
            if let Some(mut ws) = self.ws.take() {
                ws.sink
                    .close()
                    .await
                    .map_err(|e| TransportError::SendFailed(e.to_string()))?;
            }
            Ok(())
        })
    }

    fn ping(&mut self) -> TransportFuture<'_, ()> {
        Box::pin(async move {
            let ws = self.ws.as_mut().ok_or(TransportError::ConnectionClosed)?;
            if let Err(e) = ws.sink.send(Message::Ping(Default::default())).await {
                self.ws = None;
                return Err(TransportError::SendFailed(e.to_string()));
            }
            Ok(())
        })
    }

    fn recv(&mut self) -> TransportFuture<'_, Option<Inbound>> {
        Box::pin(async move {
            let ws = self.ws.as_mut().ok_or(TransportError::ConnectionClosed)?;

            match ws.stream.next().await {
                Some(Ok(Message::Text(text))) => Ok(Some(Inbound::Text(text.as_str().to_owned()))),
                Some(Ok(Message::Close(_))) | None => {
                    self.ws = None;
                    Ok(None)
                }
                Some(Ok(_)) => Ok(Some(Inbound::Heartbeat)),
                Some(Err(e)) => {
                    self.ws = None;
                    Err(TransportError::ReceiveFailed(e.to_string()))
                }
            }
        })
    }

    fn is_connected(&self) -> bool {
        self.ws.is_some()
    }
}
