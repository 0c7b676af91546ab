//! Text chunk maker: size, time and separator triggers with backward links.

use bytes::Bytes;
use futures_io::AsyncRead;

use crate::chunk::{Chunk, ChunkLinker};
use crate::config::ChunkConfig;
use crate::error::ChunkError;
use crate::queue::{QueueReceiver, QueueSender};

use super::engine::{spawn_pipeline, spawn_reader_pump};
use super::{ChunkMaker, impl_chunk_stream};

/// Chunk maker for text streams.
///
/// Cuts on whichever fires first: the chunk size, the time trigger, or the
/// configured separator (kept at the end of the chunk it closes). Every
/// emitted chunk links back to the one emitted before it, so
/// [`Chunk::prev_n_bytes`] can look across chunk boundaries.
///
/// # Example
///
/// ```
/// use chunkstream::{ChunkConfig, ChunkMaker, TextChunkMaker};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), chunkstream::ChunkError> {
/// let config = ChunkConfig::new(5)?.with_separator("\n");
/// let mut maker = TextChunkMaker::new(config)?;
/// maker.write("Hello");
/// maker.write(",\n");
/// maker.write("World");
/// maker.close_write();
///
/// let chunks = maker.collect_all().await;
/// let texts: Vec<_> = chunks.iter().map(|c| c.data().clone()).collect();
/// assert_eq!(texts, ["Hello", ",\n", "World"]);
/// assert!(chunks[2].last_chunk().unwrap().ptr_eq(&chunks[1]));
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct TextChunkMaker {
    input: QueueSender<Bytes>,
    output: QueueReceiver<Chunk>,
}

impl TextChunkMaker {
    /// Creates a writer-fed maker. Feed it with [`TextChunkMaker::write`].
    ///
    /// # Errors
    ///
    /// Returns [`ChunkError::InvalidConfig`] for an invalid configuration and
    /// [`ChunkError::NoRuntime`] outside a tokio runtime.
    #[tracing::instrument(level = "debug", skip_all, fields(chunk_size = config.chunk_size()))]
    pub fn new(config: ChunkConfig) -> Result<Self, ChunkError> {
        let pipeline = spawn_pipeline(&config, config.separator().cloned(), true)?;
        Ok(Self {
            input: pipeline.input,
            output: pipeline.output,
        })
    }

    /// Creates a maker that reads `reader` to EOF in a background task.
    ///
    /// # Errors
    ///
    /// Same as [`TextChunkMaker::new`].
    #[tracing::instrument(level = "debug", skip_all, fields(chunk_size = config.chunk_size()))]
    pub fn from_reader<R>(reader: R, config: ChunkConfig) -> Result<Self, ChunkError>
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let pipeline = spawn_pipeline(&config, config.separator().cloned(), true)?;
        spawn_reader_pump(&pipeline.handle, reader, pipeline.input.clone(), &config);
        Ok(Self {
            input: pipeline.input,
            output: pipeline.output,
        })
    }

    /// Creates a maker over an in-memory buffer. The input is already closed.
    ///
    /// # Errors
    ///
    /// Same as [`TextChunkMaker::new`].
    pub fn from_bytes(data: impl Into<Bytes>, config: ChunkConfig) -> Result<Self, ChunkError> {
        let maker = Self::new(config)?;
        maker.write(data);
        maker.close_write();
        Ok(maker)
    }

    /// Appends data without blocking.
    pub fn write(&self, data: impl Into<Bytes>) {
        let data = data.into();
        if !data.is_empty() {
            self.input.safe_feed(data);
        }
    }

    /// Ends the input; remaining data is flushed as the final chunk.
    pub fn close_write(&self) {
        self.input.close();
    }
}

impl ChunkMaker for TextChunkMaker {
    fn output(&mut self) -> &mut QueueReceiver<Chunk> {
        &mut self.output
    }

    fn into_output(self) -> QueueReceiver<Chunk> {
        self.output
    }

    fn close(&self) {
        self.close_write();
    }
}

impl_chunk_stream!(TextChunkMaker);

/// Stamps each flushed chunk with its predecessor before publishing it.
///
/// One flush can produce several chunks, so linking happens here, in
/// emission order, rather than inside the core loop.
pub(super) async fn link_relay(mut flushed: QueueReceiver<Chunk>, output: QueueSender<Chunk>) {
    let mut linker = ChunkLinker::new();
    while let Some(chunk) = flushed.recv().await {
        output.safe_feed(linker.link(chunk));
    }
    output.close();
}
