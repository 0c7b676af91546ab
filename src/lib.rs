//! chunkstream
//!
//! Streaming chunk segmentation for async Rust.
//!
//! `chunkstream` turns an unbounded byte stream (text or binary) into bounded,
//! ordered chunks, suitable for feeding a fixed-size context window or any
//! consumer that wants its input in pieces. A chunk is cut by whichever
//! trigger fires first:
//!
//! - **size**: `chunk_size` runes while the data is valid UTF-8, bytes otherwise
//! - **time**: a periodic flush of whatever is buffered
//! - **separator**: right after each occurrence of a byte sequence
//!
//! Concatenating every emitted chunk reproduces the input exactly. Chunks of
//! the linking makers point back at their predecessor, so
//! [`Chunk::prev_n_bytes`] can look across chunk boundaries.
//!
//! Producers never block: every stage is joined by an [`unbounded_queue`].
//!
//! The crate intentionally:
//! - does NOT walk directories or detect MIME types
//! - does NOT decode video or documents (see [`FrameExtractor`])
//! - does NOT persist chunks
//! - does NOT apply backpressure to producers
//!
//! # Writer-fed
//!
//! ```
//! use chunkstream::{ChunkConfig, ChunkMaker, TextChunkMaker};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), chunkstream::ChunkError> {
//! let mut maker = TextChunkMaker::new(ChunkConfig::new(5)?)?;
//! maker.write("你好世界123");
//! maker.close_write();
//!
//! while let Some(chunk) = maker.recv().await {
//!     println!("{chunk} ({} runes)", chunk.runes_size());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Reader-fed
//!
//! ```no_run
//! use chunkstream::{ChunkConfig, ChunkMaker, TextChunkMaker};
//! use tokio_util::compat::TokioAsyncReadCompatExt;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), chunkstream::ChunkError> {
//! let file = tokio::fs::File::open("notes.txt").await?;
//! let config = ChunkConfig::new(1024)?.with_separator("\n\n").with_time_trigger_seconds(1.0);
//! let mut maker = TextChunkMaker::from_reader(file.compat(), config)?;
//!
//! for chunk in maker.collect_all().await {
//!     println!("chunk {} bytes", chunk.bytes_size());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Synchronous
//!
//! ```
//! let chunks = chunkstream::chunk_bytes("HelloWorld", 5, None);
//! assert_eq!(chunks[1].prev_n_bytes(3).as_ref(), b"llo");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod buffer;
mod chunk;
mod config;
mod error;
mod maker;
mod queue;

mod util; // internal utf-8 and byte search helpers

//
// Public surface
//

pub use buffer::{ChunkBuffer, chunk_bytes};
pub use chunk::Chunk;
pub use config::{ChunkConfig, DEFAULT_CHUNK_SIZE, DEFAULT_QUEUE_CAPACITY, DEFAULT_READ_BUFFER_SIZE};
pub use error::{ChunkError, Result};
pub use maker::{
    BasicChunkMaker, ChunkMaker, FrameExtractor, ImageChunkMaker, ImageFrame, MergerChunkMaker, SimpleChunkMaker,
    TextChunkMaker, WholeFileExtractor,
};
pub use queue::{QueueReceiver, QueueSender, unbounded_queue};
