//! Relay-backed unbounded queue.
//!
//! Producers push into an unbounded tokio channel, so feeding never waits.
//! A single relay task moves elements into a bounded output channel and
//! spills into a [`VecDeque`] whenever the consumer falls behind. The relay
//! is the only task touching the spill buffer.
//!
//! ```text
//! safe_feed ──► inbound (unbounded) ──► relay ──► outbound (bounded) ──► recv
//!                                         │ ▲
//!                                         ▼ │
//!                                       VecDeque
//! ```
//!
//! Two ways to stop:
//!
//! - [`QueueSender::close`] (or dropping every sender) drains everything fed
//!   so far, then ends the stream.
//! - Cancelling the token aborts the relay; buffered elements are dropped.

use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures_core::Stream;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::sync::CancellationToken;

use crate::error::ChunkError;

/// Creates a queue and spawns its relay task on the current tokio runtime.
///
/// `capacity` bounds the outbound channel and is also the size the spill
/// buffer shrinks back to once drained.
///
/// # Errors
///
/// Returns [`ChunkError::InvalidConfig`] if `capacity` is zero and
/// [`ChunkError::NoRuntime`] when called outside a tokio runtime.
///
/// # Example
///
/// ```
/// use chunkstream::unbounded_queue;
/// use tokio_util::sync::CancellationToken;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), chunkstream::ChunkError> {
/// let (tx, mut rx) = unbounded_queue::<u32>(&CancellationToken::new(), 2)?;
/// for i in 0..10 {
///     tx.safe_feed(i);
/// }
/// tx.close();
///
/// let mut seen = Vec::new();
/// while let Some(v) = rx.recv().await {
///     seen.push(v);
/// }
/// assert_eq!(seen, (0..10).collect::<Vec<_>>());
/// # Ok(())
/// # }
/// ```
pub fn unbounded_queue<T: Send + 'static>(
    cancel: &CancellationToken,
    capacity: usize,
) -> Result<(QueueSender<T>, QueueReceiver<T>), ChunkError> {
    if capacity == 0 {
        return Err(ChunkError::InvalidConfig {
            message: "queue capacity must be positive",
        });
    }
    let handle = tokio::runtime::Handle::try_current()?;

    let (in_tx, in_rx) = mpsc::unbounded_channel();
    let (out_tx, out_rx) = mpsc::channel(capacity);
    let closing = CancellationToken::new();

    let relay = Relay {
        inbound: in_rx,
        outbound: out_tx,
        spill: VecDeque::with_capacity(capacity),
        capacity,
        cancel: cancel.clone(),
        closing: closing.clone(),
    };
    handle.spawn(relay.run());

    Ok((
        QueueSender {
            inbound: in_tx,
            closing,
        },
        QueueReceiver { outbound: out_rx },
    ))
}

/// Producer half of an unbounded queue.
///
/// Clone it freely; every clone feeds the same queue and the relay keeps the
/// order in which feeds happened.
#[derive(Debug)]
pub struct QueueSender<T> {
    inbound: mpsc::UnboundedSender<T>,
    closing: CancellationToken,
}

impl<T> QueueSender<T> {
    /// Enqueues `value` without blocking.
    ///
    /// After [`QueueSender::close`] or cancellation the value is dropped.
    pub fn safe_feed(&self, value: T) {
        if self.closing.is_cancelled() {
            tracing::trace!("feed after close, dropping element");
            return;
        }
        if self.inbound.send(value).is_err() {
            tracing::trace!("queue relay stopped, dropping element");
        }
    }

    /// Signals that no more input will arrive.
    ///
    /// Everything fed before this call is still delivered. Idempotent.
    pub fn close(&self) {
        self.closing.cancel();
    }

    /// Returns true once the queue stopped accepting input.
    pub fn is_closed(&self) -> bool {
        self.closing.is_cancelled() || self.inbound.is_closed()
    }
}

impl<T> Clone for QueueSender<T> {
    fn clone(&self) -> Self {
        Self {
            inbound: self.inbound.clone(),
            closing: self.closing.clone(),
        }
    }
}

impl<T> Extend<T> for QueueSender<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for value in iter {
            self.safe_feed(value);
        }
    }
}

/// Consumer half of an unbounded queue.
#[derive(Debug)]
pub struct QueueReceiver<T> {
    outbound: mpsc::Receiver<T>,
}

impl<T> QueueReceiver<T> {
    /// Receives the next element, or `None` once the queue is closed and
    /// drained (or cancelled).
    pub async fn recv(&mut self) -> Option<T> {
        self.outbound.recv().await
    }

    /// Blocking variant of [`QueueReceiver::recv`] for synchronous callers.
    ///
    /// Panics if called from within an async execution context, like
    /// [`mpsc::Receiver::blocking_recv`].
    pub fn blocking_recv(&mut self) -> Option<T> {
        self.outbound.blocking_recv()
    }

    /// Returns the next element if one is ready right now.
    pub fn try_recv(&mut self) -> Option<T> {
        self.outbound.try_recv().ok()
    }
}

impl<T> Stream for QueueReceiver<T> {
    type Item = T;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        self.outbound.poll_recv(cx)
    }
}

/// State owned by the relay task.
struct Relay<T> {
    inbound: mpsc::UnboundedReceiver<T>,
    outbound: mpsc::Sender<T>,
    spill: VecDeque<T>,
    capacity: usize,
    cancel: CancellationToken,
    closing: CancellationToken,
}

impl<T: Send + 'static> Relay<T> {
    async fn run(mut self) {
        let mut inbound_open = true;
        let mut close_seen = false;

        loop {
            if !inbound_open && self.spill.is_empty() {
                tracing::trace!("queue drained, closing output");
                return;
            }

            if self.spill.is_empty() {
                tokio::select! {
                    biased;
                    () = self.cancel.cancelled() => {
                        tracing::debug!("queue cancelled");
                        return;
                    }
                    () = self.closing.cancelled(), if !close_seen => {
                        // Stop new sends; already queued values still arrive.
                        self.inbound.close();
                        close_seen = true;
                    }
                    value = self.inbound.recv(), if inbound_open => match value {
                        Some(value) => match self.outbound.try_send(value) {
                            Ok(()) => {}
                            Err(TrySendError::Full(value)) => self.spill.push_back(value),
                            Err(TrySendError::Closed(_)) => {
                                tracing::trace!("queue consumer dropped");
                                return;
                            }
                        },
                        None => inbound_open = false,
                    },
                    () = self.outbound.closed() => {
                        tracing::trace!("queue consumer dropped");
                        return;
                    }
                }
            } else {
                tokio::select! {
                    biased;
                    () = self.cancel.cancelled() => {
                        tracing::debug!(dropped = self.spill.len(), "queue cancelled, dropping buffered elements");
                        return;
                    }
                    permit = self.outbound.reserve() => match permit {
                        Ok(permit) => {
                            if let Some(value) = self.spill.pop_front() {
                                permit.send(value);
                            }
                            if self.spill.is_empty() {
                                self.spill.shrink_to(self.capacity);
                            }
                        }
                        Err(_) => {
                            tracing::trace!(dropped = self.spill.len(), "queue consumer dropped");
                            return;
                        }
                    },
                    () = self.closing.cancelled(), if !close_seen => {
                        self.inbound.close();
                        close_seen = true;
                    }
                    value = self.inbound.recv(), if inbound_open => match value {
                        Some(value) => self.spill.push_back(value),
                        None => inbound_open = false,
                    },
                }
            }
        }
    }
}
