//! One upstream item, one chunk.

use futures_core::Stream;
use futures_util::StreamExt;
use tokio_util::sync::CancellationToken;

use crate::chunk::{Chunk, ChunkLinker};
use crate::config::ChunkConfig;
use crate::error::ChunkError;
use crate::queue::{QueueReceiver, QueueSender, unbounded_queue};

use super::{ChunkMaker, impl_chunk_stream};

/// Adapts a stream of arbitrary items into linked chunks.
///
/// Every item becomes exactly one chunk through the mapping function; no
/// size, time or separator logic applies. The chunk size in the config is
/// still validated but otherwise unused.
///
/// # Example
///
/// ```
/// use chunkstream::{Chunk, ChunkConfig, ChunkMaker, SimpleChunkMaker, unbounded_queue};
/// use tokio_util::sync::CancellationToken;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), chunkstream::ChunkError> {
/// let (tx, rx) = unbounded_queue::<u32>(&CancellationToken::new(), 8)?;
/// let mut maker = SimpleChunkMaker::new(rx, |n| Chunk::from(n.to_string()), ChunkConfig::default())?;
/// tx.safe_feed(7);
/// tx.safe_feed(42);
/// tx.close();
///
/// let chunks = maker.collect_all().await;
/// assert_eq!(chunks[1].data().as_ref(), b"42");
/// assert_eq!(chunks[1].prev_n_bytes(10).as_ref(), b"7");
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct SimpleChunkMaker {
    output: QueueReceiver<Chunk>,
    stop: CancellationToken,
}

impl SimpleChunkMaker {
    /// Spawns a task mapping every item of `source` into one chunk.
    ///
    /// # Errors
    ///
    /// Returns [`ChunkError::InvalidConfig`] or [`ChunkError::NoRuntime`].
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn new<T, S, F>(source: S, map: F, config: ChunkConfig) -> Result<Self, ChunkError>
    where
        T: Send + 'static,
        S: Stream<Item = T> + Send + Unpin + 'static,
        F: FnMut(T) -> Chunk + Send + 'static,
    {
        let (output, stop) = spawn_item_forwarder(source, map, &config)?;
        Ok(Self { output, stop })
    }
}

impl ChunkMaker for SimpleChunkMaker {
    fn output(&mut self) -> &mut QueueReceiver<Chunk> {
        &mut self.output
    }

    fn into_output(self) -> QueueReceiver<Chunk> {
        self.output
    }

    /// Stops pulling from the source. Chunks already produced still arrive.
    fn close(&self) {
        self.stop.cancel();
    }
}

impl_chunk_stream!(SimpleChunkMaker);

/// Spawns the forwarding task shared by the item-based makers.
///
/// Returns the output queue and the token that stops the forwarder.
pub(super) fn spawn_item_forwarder<T, S, F>(
    source: S,
    map: F,
    config: &ChunkConfig,
) -> Result<(QueueReceiver<Chunk>, CancellationToken), ChunkError>
where
    T: Send + 'static,
    S: Stream<Item = T> + Send + Unpin + 'static,
    F: FnMut(T) -> Chunk + Send + 'static,
{
    config.validate()?;
    let handle = tokio::runtime::Handle::try_current()?;
    let (tx, output) = unbounded_queue(config.cancel_token(), config.queue_capacity())?;
    let stop = config.cancel_token().child_token();
    handle.spawn(forward_items(source, map, tx, stop.clone()));
    Ok((output, stop))
}

async fn forward_items<T, S, F>(mut source: S, mut map: F, output: QueueSender<Chunk>, stop: CancellationToken)
where
    S: Stream<Item = T> + Unpin,
    F: FnMut(T) -> Chunk,
{
    let mut linker = ChunkLinker::new();
    let mut forwarded = 0usize;

    loop {
        tokio::select! {
            biased;
            () = stop.cancelled() => {
                tracing::debug!(items = forwarded, "item forwarder stopped");
                break;
            }
            item = source.next() => match item {
                Some(item) => {
                    output.safe_feed(linker.link(map(item)));
                    forwarded += 1;
                }
                None => break,
            },
        }
    }

    tracing::trace!(items = forwarded, "item source finished");
    output.close();
}
