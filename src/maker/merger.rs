//! Fan-in of several chunk sources into one output.

use futures_core::Stream;
use futures_util::StreamExt;
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::chunk::Chunk;
use crate::config::DEFAULT_QUEUE_CAPACITY;
use crate::error::ChunkError;
use crate::queue::{QueueReceiver, QueueSender, unbounded_queue};

use super::{ChunkMaker, impl_chunk_stream};

/// Merges any number of chunk streams into a single output.
///
/// Each source gets its own forwarding task. Chunks of one source keep their
/// order; chunks of different sources interleave in arrival order, with no
/// global ordering. Chunks are forwarded as they are, links included.
///
/// Two ways to end the merge:
///
/// - [`MergerChunkMaker::finish`] waits for every source to end on its own.
/// - [`MergerChunkMaker::shutdown`] (or [`ChunkMaker::close`]) stops every
///   forwarder now; chunks not yet pulled from a source are left there.
#[derive(Debug)]
pub struct MergerChunkMaker {
    sender: QueueSender<Chunk>,
    output: QueueReceiver<Chunk>,
    tracker: TaskTracker,
    stop: CancellationToken,
    handle: Handle,
}

impl MergerChunkMaker {
    /// Creates an empty merger. Cancelling `cancel` aborts it.
    ///
    /// # Errors
    ///
    /// Returns [`ChunkError::NoRuntime`] outside a tokio runtime.
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn new(cancel: &CancellationToken) -> Result<Self, ChunkError> {
        let handle = Handle::try_current()?;
        let (sender, output) = unbounded_queue(cancel, DEFAULT_QUEUE_CAPACITY)?;
        Ok(Self {
            sender,
            output,
            tracker: TaskTracker::new(),
            stop: cancel.child_token(),
            handle,
        })
    }

    /// Starts forwarding `source` into the merged output.
    ///
    /// Ignored once the merger is closed.
    pub fn add_input<S>(&self, source: S)
    where
        S: Stream<Item = Chunk> + Send + Unpin + 'static,
    {
        if self.tracker.is_closed() || self.stop.is_cancelled() {
            tracing::warn!("merger closed, input ignored");
            return;
        }
        let sources = self.tracker.len() + 1;
        tracing::debug!(sources, "merger input added");
        self.tracker
            .spawn_on(forward_chunks(source, self.sender.clone(), self.stop.clone()), &self.handle);
    }

    /// Stops accepting inputs, waits until every source is exhausted, then
    /// closes the output.
    pub async fn finish(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        self.sender.close();
    }

    /// Stops every forwarder, waits for them to exit, then closes the output.
    pub async fn shutdown(&self) {
        shutdown_forwarders(self.tracker.clone(), self.stop.clone(), self.sender.clone()).await;
    }
}

impl ChunkMaker for MergerChunkMaker {
    fn output(&mut self) -> &mut QueueReceiver<Chunk> {
        &mut self.output
    }

    fn into_output(self) -> QueueReceiver<Chunk> {
        self.output
    }

    /// Same as [`MergerChunkMaker::shutdown`], run in the background.
    fn close(&self) {
        self.stop.cancel();
        self.tracker.close();
        self.handle.spawn(shutdown_forwarders(
            self.tracker.clone(),
            self.stop.clone(),
            self.sender.clone(),
        ));
    }
}

impl_chunk_stream!(MergerChunkMaker);

async fn shutdown_forwarders(tracker: TaskTracker, stop: CancellationToken, sender: QueueSender<Chunk>) {
    stop.cancel();
    tracker.close();
    tracker.wait().await;
    tracing::debug!("merger shut down");
    sender.close();
}

async fn forward_chunks<S>(mut source: S, output: QueueSender<Chunk>, stop: CancellationToken)
where
    S: Stream<Item = Chunk> + Unpin,
{
    let mut forwarded = 0usize;
    loop {
        tokio::select! {
            biased;
            () = stop.cancelled() => break,
            chunk = source.next() => match chunk {
                Some(chunk) => {
                    output.safe_feed(chunk);
                    forwarded += 1;
                }
                None => break,
            },
        }
    }
    tracing::trace!(chunks = forwarded, "merger input finished");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ChunkConfig;
    use crate::maker::TextChunkMaker;
    use std::time::Duration;

    fn ids(chunks: &[Chunk], prefix: u8) -> Vec<u8> {
        chunks
            .iter()
            .filter(|c| c.data()[0] == prefix)
            .map(|c| c.data()[1])
            .collect()
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_per_source_order() {
        let cancel = CancellationToken::new();
        let mut merger = MergerChunkMaker::new(&cancel).unwrap();

        for prefix in [b'a', b'b', b'c'] {
            let (tx, rx) = unbounded_queue::<Chunk>(&cancel, 2).unwrap();
            merger.add_input(rx);
            tokio::spawn(async move {
                for i in 0..50u8 {
                    tx.safe_feed(Chunk::new(vec![prefix, i]));
                    tokio::task::yield_now().await;
                }
                tx.close();
            });
        }

        merger.finish().await;
        let chunks = merger.collect_all().await;
        assert_eq!(chunks.len(), 150);
        for prefix in [b'a', b'b', b'c'] {
            assert_eq!(ids(&chunks, prefix), (0..50).collect::<Vec<_>>());
        }
    }

    #[tokio::test]
    async fn test_merges_maker_outputs_with_links() {
        let cancel = CancellationToken::new();
        let mut merger = MergerChunkMaker::new(&cancel).unwrap();
        let config = ChunkConfig::new(3).unwrap().with_cancel_token(cancel.clone());
        merger.add_input(TextChunkMaker::from_bytes("abcdef", config.clone()).unwrap());
        merger.add_input(TextChunkMaker::from_bytes("xyz", config).unwrap());

        merger.finish().await;
        let chunks = merger.collect_all().await;
        assert_eq!(chunks.len(), 3);
        let def = chunks.iter().find(|c| c.data().as_ref() == b"def").unwrap();
        assert_eq!(def.last_chunk().unwrap().data().as_ref(), b"abc");
    }

    #[tokio::test]
    async fn test_shutdown_stops_endless_sources() {
        let cancel = CancellationToken::new();
        let mut merger = MergerChunkMaker::new(&cancel).unwrap();
        let (tx, rx) = unbounded_queue::<Chunk>(&cancel, 2).unwrap();
        merger.add_input(rx);
        tx.safe_feed(Chunk::from("early"));

        let first = merger.recv().await.unwrap();
        assert_eq!(first.data().as_ref(), b"early");

        tokio::time::timeout(Duration::from_secs(2), merger.shutdown())
            .await
            .expect("shutdown must not wait for open sources");
        assert!(merger.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_parent_cancel_ends_output() {
        let cancel = CancellationToken::new();
        let mut merger = MergerChunkMaker::new(&cancel).unwrap();
        let source_cancel = CancellationToken::new();
        let (tx, rx) = unbounded_queue::<Chunk>(&source_cancel, 2).unwrap();
        merger.add_input(rx);
        tx.safe_feed(Chunk::from("before"));

        let first = merger.recv().await.unwrap();
        assert_eq!(first.data().as_ref(), b"before");

        cancel.cancel();
        let next = tokio::time::timeout(Duration::from_secs(2), merger.recv())
            .await
            .expect("parent cancel must end the output");
        assert!(next.is_none());
        drop(tx);
    }

    #[tokio::test]
    async fn test_add_input_after_close_is_ignored() {
        let cancel = CancellationToken::new();
        let mut merger = MergerChunkMaker::new(&cancel).unwrap();
        merger.close();

        let (tx, rx) = unbounded_queue::<Chunk>(&cancel, 2).unwrap();
        merger.add_input(rx);
        tx.safe_feed(Chunk::from("late"));
        tx.close();

        let chunks = tokio::time::timeout(Duration::from_secs(2), merger.collect_all())
            .await
            .unwrap();
        assert!(chunks.is_empty());
    }
}
