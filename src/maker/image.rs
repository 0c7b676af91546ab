//! Image frames as atomic chunks.
//!
//! Decoding containers (video, PDF, animated images) is left to a
//! [`FrameExtractor`]. The maker only turns each extracted frame into one
//! linked image chunk.

use std::path::Path;

use bytes::Bytes;
use futures_core::Stream;
use tokio_util::sync::CancellationToken;

use crate::chunk::Chunk;
use crate::config::ChunkConfig;
use crate::error::ChunkError;
use crate::queue::{QueueReceiver, unbounded_queue};

use super::simple::spawn_item_forwarder;
use super::{ChunkMaker, impl_chunk_stream};

/// One raw image with its MIME type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFrame {
    /// Encoded image bytes.
    pub data: Bytes,
    /// MIME type, e.g. `image/png`.
    pub mime_type: String,
}

impl ImageFrame {
    /// Creates a frame.
    pub fn new(data: impl Into<Bytes>, mime_type: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            mime_type: mime_type.into(),
        }
    }
}

/// Produces image frames from a file.
pub trait FrameExtractor {
    /// Stream of extracted frames.
    type Frames: Stream<Item = ImageFrame> + Send + Unpin + 'static;

    /// Opens `path` and starts extracting frames.
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be read or decoded.
    fn extract(&self, path: &Path) -> Result<Self::Frames, ChunkError>;
}

/// Yields the whole file as a single frame with a fixed MIME type.
#[derive(Debug, Clone)]
pub struct WholeFileExtractor {
    mime_type: String,
}

impl WholeFileExtractor {
    /// Creates an extractor labelling its frame with `mime_type`.
    pub fn new(mime_type: impl Into<String>) -> Self {
        Self {
            mime_type: mime_type.into(),
        }
    }
}

impl FrameExtractor for WholeFileExtractor {
    type Frames = QueueReceiver<ImageFrame>;

    fn extract(&self, path: &Path) -> Result<Self::Frames, ChunkError> {
        let data = std::fs::read(path)?;
        let (tx, rx) = unbounded_queue(&CancellationToken::new(), 1)?;
        tx.safe_feed(ImageFrame::new(data, self.mime_type.clone()));
        tx.close();
        Ok(rx)
    }
}

/// Turns each image frame into one linked chunk with
/// [`Chunk::is_image`] set.
#[derive(Debug)]
pub struct ImageChunkMaker {
    output: QueueReceiver<Chunk>,
    stop: CancellationToken,
}

impl ImageChunkMaker {
    /// Chunks frames from an existing stream.
    ///
    /// # Errors
    ///
    /// Returns [`ChunkError::InvalidConfig`] or [`ChunkError::NoRuntime`].
    pub fn from_frames<S>(frames: S, config: ChunkConfig) -> Result<Self, ChunkError>
    where
        S: Stream<Item = ImageFrame> + Send + Unpin + 'static,
    {
        let (output, stop) =
            spawn_item_forwarder(frames, |frame: ImageFrame| Chunk::image(frame.data, frame.mime_type), &config)?;
        Ok(Self { output, stop })
    }

    /// Extracts frames from the file at `path` and chunks them.
    ///
    /// # Errors
    ///
    /// Returns [`ChunkError::Io`] when extraction fails, plus the errors of
    /// [`ImageChunkMaker::from_frames`].
    #[tracing::instrument(level = "debug", skip_all, fields(path = %path.as_ref().display()))]
    pub fn from_file<E>(path: impl AsRef<Path>, extractor: &E, config: ChunkConfig) -> Result<Self, ChunkError>
    where
        E: FrameExtractor,
    {
        config.validate()?;
        let frames = extractor.extract(path.as_ref()).inspect_err(|e| {
            tracing::warn!(error = %e, "frame extraction failed");
        })?;
        Self::from_frames(frames, config)
    }
}

impl ChunkMaker for ImageChunkMaker {
    fn output(&mut self) -> &mut QueueReceiver<Chunk> {
        &mut self.output
    }

    fn into_output(self) -> QueueReceiver<Chunk> {
        self.output
    }

    fn close(&self) {
        self.stop.cancel();
    }
}

impl_chunk_stream!(ImageChunkMaker);
