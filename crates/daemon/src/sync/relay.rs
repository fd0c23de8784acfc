// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded relay between the push read loop and the refresh consumer.
//!
//! Enqueue never waits: when the queue is full the new item is dropped and a
//! warning is logged, so a slow consumer can never stall network reads.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::error::Result;

/// Outcome of [`RelaySender::offer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Offer {
    Queued,
    /// Queue was full; the item was dropped.
    Dropped,
    /// Consumer is gone; the item was dropped.
    Closed,
}

/// Producer half, held by the read loop.
#[derive(Debug, Clone)]
pub struct RelaySender<T> {
    tx: mpsc::Sender<T>,
    dropped: Arc<AtomicU64>,
}

/// Consumer half, drained by exactly one consumer loop.
#[derive(Debug)]
pub struct RelayReceiver<T> {
    rx: mpsc::Receiver<T>,
}

/// Creates a relay queue holding at most `capacity` items (minimum 1).
pub fn relay<T>(capacity: usize) -> (RelaySender<T>, RelayReceiver<T>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (
        RelaySender {
            tx,
            dropped: Arc::new(AtomicU64::new(0)),
        },
        RelayReceiver { rx },
    )
}

impl<T> RelaySender<T> {
    /// Enqueues without blocking.
    pub fn offer(&self, item: T) -> Offer {
        match self.tx.try_send(item) {
            Ok(()) => Offer::Queued,
            Err(TrySendError::Full(_)) => {
                let total = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                warn!("relay queue full; dropping message ({} dropped so far)", total);
                Offer::Dropped
            }
            Err(TrySendError::Closed(_)) => Offer::Closed,
        }
    }

    /// Number of items dropped because the queue was full.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Items currently waiting for the consumer.
    pub fn len(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.tx.max_capacity()
    }
}

impl<T> RelayReceiver<T> {
    /// Runs `handle` for every item until all senders are dropped and the
    /// queue is empty, or until `force` is cancelled.
    ///
    /// Handler failures are logged and do not stop the loop. On forced stop
    /// any items still queued are discarded.
    pub async fn consume<F, Fut>(mut self, force: CancellationToken, mut handle: F) -> usize
    where
        F: FnMut(T) -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        let mut processed = 0;
        loop {
            let item = tokio::select! {
                biased;
                _ = force.cancelled() => break,
                item = self.rx.recv() => item,
            };
            let Some(item) = item else {
                debug!("relay drained; consumer exiting");
                return processed;
            };
            if let Err(e) = handle(item).await {
                error!("relay consumer failed to handle message: {}", e);
            }
            processed += 1;
        }

        let discarded = self.clear();
        if discarded > 0 {
            debug!("relay stopped; discarded {} queued messages", discarded);
        }
        processed
    }

    /// Closes the queue and discards everything still in it.
    pub fn clear(&mut self) -> usize {
        self.rx.close();
        let mut discarded = 0;
        while self.rx.try_recv().is_ok() {
            discarded += 1;
        }
        discarded
    }
}

#[cfg(test)]
#[path = "relay_tests.rs"]
mod tests;
