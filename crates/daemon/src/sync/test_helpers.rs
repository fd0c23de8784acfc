// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Scripted transport for push client tests.

#![allow(clippy::unwrap_used)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use super::transport::{Inbound, Transport, TransportFuture};
use crate::error::TransportError;

/// What happens once a session's scripted frames are used up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// `recv` reports a clean close.
    Close,
    /// `recv` reports a read error.
    Error,
    /// `recv` never completes.
    Hang,
}

/// One scripted connect attempt.
#[derive(Debug, Clone)]
pub enum Session {
    Refuse,
    Accept {
        frames: Vec<Inbound>,
        end: SessionEnd,
    },
}

impl Session {
    pub fn texts(texts: &[&str], end: SessionEnd) -> Self {
        Session::Accept {
            frames: texts.iter().map(|t| Inbound::Text(t.to_string())).collect(),
            end,
        }
    }
}

/// Counters shared between a [`MockTransport`] and the test.
#[derive(Debug, Default)]
pub struct MockStats {
    pub connects: AtomicUsize,
    pub disconnects: AtomicUsize,
    pub pings: AtomicUsize,
}

impl MockStats {
    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn disconnects(&self) -> usize {
        self.disconnects.load(Ordering::SeqCst)
    }

    pub fn pings(&self) -> usize {
        self.pings.load(Ordering::SeqCst)
    }
}

/// Mock transport replaying scripted sessions. Once the script is exhausted
/// every further connect is refused.
pub struct MockTransport {
    script: Arc<Mutex<VecDeque<Session>>>,
    current: Option<(VecDeque<Inbound>, SessionEnd)>,
    /// Sends never complete, like a socket whose peer stopped reading.
    stuck_writes: bool,
    stats: Arc<MockStats>,
}

impl MockTransport {
    pub fn new(sessions: Vec<Session>) -> Self {
        MockTransport {
            script: Arc::new(Mutex::new(sessions.into())),
            current: None,
            stuck_writes: false,
            stats: Arc::new(MockStats::default()),
        }
    }

    /// Makes `ping` and `disconnect` hang forever.
    pub fn with_stuck_writes(mut self) -> Self {
        self.stuck_writes = true;
        self
    }

    pub fn stats(&self) -> Arc<MockStats> {
        Arc::clone(&self.stats)
    }
}

impl Transport for MockTransport {
    fn connect(&mut self, _url: &str, _max_message_bytes: usize) -> TransportFuture<'_, ()> {
        Box::pin(async move {
            self.stats.connects.fetch_add(1, Ordering::SeqCst);
            let next = self.script.lock().unwrap().pop_front();
            match next {
                Some(Session::Accept { frames, end }) => {
                    self.current = Some((frames.into(), end));
                    Ok(())
                }
                Some(Session::Refuse) | None => {
                    self.current = None;
                    Err(TransportError::ConnectionFailed("mock refused".into()))
                }
            }
        })
    }

    fn disconnect(&mut self) -> TransportFuture<'_, ()> {
        Box::pin(async move {
            if self.current.take().is_some() {
                self.stats.disconnects.fetch_add(1, Ordering::SeqCst);
            }
            if self.stuck_writes {
                std::future::pending::<()>().await;
            }
            Ok(())
        })
    }

    fn ping(&mut self) -> TransportFuture<'_, ()> {
        Box::pin(async move {
            if self.current.is_none() {
                return Err(TransportError::ConnectionClosed);
            }
            self.stats.pings.fetch_add(1, Ordering::SeqCst);
            if self.stuck_writes {
                std::future::pending::<()>().await;
            }
            Ok(())
        })
    }

    fn recv(&mut self) -> TransportFuture<'_, Option<Inbound>> {
        Box::pin(async move {
            let Some((frames, end)) = self.current.as_mut() else {
                return Err(TransportError::ConnectionClosed);
            };
            if let Some(frame) = frames.pop_front() {
                return Ok(Some(frame));
            }
            match *end {
                SessionEnd::Close => {
                    self.current = None;
                    Ok(None)
                }
                SessionEnd::Error => {
                    self.current = None;
                    Err(TransportError::ReceiveFailed("mock reset".into()))
                }
                SessionEnd::Hang => std::future::pending().await,
            }
        })
    }

    fn is_connected(&self) -> bool {
        self.current.is_some()
    }
}
