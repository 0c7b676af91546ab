//! Size and time triggered chunking without links.

use bytes::Bytes;
use futures_io::AsyncRead;

use crate::chunk::Chunk;
use crate::config::ChunkConfig;
use crate::error::ChunkError;
use crate::queue::{QueueReceiver, QueueSender};

use super::engine::{spawn_pipeline, spawn_reader_pump};
use super::{ChunkMaker, impl_chunk_stream};

/// Chunk maker with only the size and time triggers.
///
/// Chunks go straight from the core loop to the output, so they carry no
/// backward link. Use [`TextChunkMaker`](super::TextChunkMaker) when
/// lookback or a separator is needed.
#[derive(Debug)]
pub struct BasicChunkMaker {
    input: QueueSender<Bytes>,
    output: QueueReceiver<Chunk>,
}

impl BasicChunkMaker {
    /// Creates a writer-fed maker.
    ///
    /// # Errors
    ///
    /// Returns [`ChunkError::InvalidConfig`] or [`ChunkError::NoRuntime`].
    #[tracing::instrument(level = "debug", skip_all, fields(chunk_size = config.chunk_size()))]
    pub fn new(config: ChunkConfig) -> Result<Self, ChunkError> {
        if config.separator().is_some() {
            tracing::debug!("separator ignored by basic chunk maker");
        }
        let pipeline = spawn_pipeline(&config, None, false)?;
        Ok(Self {
            input: pipeline.input,
            output: pipeline.output,
        })
    }

    /// Creates a maker fed by `reader` until EOF.
    ///
    /// # Errors
    ///
    /// Returns [`ChunkError::InvalidConfig`] or [`ChunkError::NoRuntime`].
    #[tracing::instrument(level = "debug", skip_all, fields(chunk_size = config.chunk_size()))]
    pub fn from_reader<R>(reader: R, config: ChunkConfig) -> Result<Self, ChunkError>
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let pipeline = spawn_pipeline(&config, None, false)?;
        spawn_reader_pump(&pipeline.handle, reader, pipeline.input.clone(), &config);
        Ok(Self {
            input: pipeline.input,
            output: pipeline.output,
        })
    }

    /// Appends data without blocking.
    pub fn write(&self, data: impl Into<Bytes>) {
        let data = data.into();
        if !data.is_empty() {
            self.input.safe_feed(data);
        }
    }

    /// Ends the input.
    pub fn close_write(&self) {
        self.input.close();
    }
}

impl ChunkMaker for BasicChunkMaker {
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

impl_chunk_stream!(BasicChunkMaker);
