//! Chunk makers: background tasks that turn a stream into chunks.
//!
//! - [`BasicChunkMaker`] - Size and time triggers, unlinked output
//! - [`TextChunkMaker`] - Adds the separator trigger and backward linking
//! - [`SimpleChunkMaker`] - One upstream item of any type becomes one chunk
//! - [`ImageChunkMaker`] - One image frame becomes one chunk
//! - [`MergerChunkMaker`] - Fans several chunk sources into one output
//!
//! Every maker exposes its output through [`ChunkMaker`] and also implements
//! [`futures_core::Stream`], so makers can be merged into each other.

mod basic;
mod engine;
mod image;
mod merger;
mod simple;
mod text;

use std::future::Future;

use crate::chunk::Chunk;
use crate::queue::QueueReceiver;

pub use basic::BasicChunkMaker;
pub use image::{FrameExtractor, ImageChunkMaker, ImageFrame, WholeFileExtractor};
pub use merger::MergerChunkMaker;
pub use simple::SimpleChunkMaker;
pub use text::TextChunkMaker;

/// Common surface of every chunk maker.
///
/// The output is closed exactly once, after the final flush.
pub trait ChunkMaker: Send {
    /// Returns the receiving half of the output queue.
    fn output(&mut self) -> &mut QueueReceiver<Chunk>;

    /// Consumes the maker and returns its output queue.
    ///
    /// The background tasks keep running until the input ends.
    fn into_output(self) -> QueueReceiver<Chunk>
    where
        Self: Sized;

    /// Stops taking input. Whatever was already accepted is still flushed
    /// before the output closes. Idempotent.
    fn close(&self);

    /// Receives the next chunk, or `None` once the output is closed.
    fn recv(&mut self) -> impl Future<Output = Option<Chunk>> + Send {
        self.output().recv()
    }

    /// Receives chunks until the output closes.
    fn collect_all(&mut self) -> impl Future<Output = Vec<Chunk>> + Send {
        async move {
            let mut chunks = Vec::new();
            while let Some(chunk) = self.output().recv().await {
                chunks.push(chunk);
            }
            chunks
        }
    }
}

/// Implements [`futures_core::Stream`] for a maker by delegating to its `output` field.
macro_rules! impl_chunk_stream {
    ($maker:ty) => {
        impl futures_core::Stream for $maker {
            type Item = $crate::chunk::Chunk;

            fn poll_next(
                mut self: std::pin::Pin<&mut Self>,
                cx: &mut std::task::Context<'_>,
            ) -> std::task::Poll<Option<Self::Item>> {
                futures_core::Stream::poll_next(std::pin::Pin::new(&mut self.output), cx)
            }
        }
    };
}

pub(crate) use impl_chunk_stream;
