//! Accumulation buffer for streaming chunking.
//!
//! - [`ChunkBuffer`] - Mutable accumulator with UTF-8 aware flush operations
//! - [`chunk_bytes`] - One-shot splitting of an in-memory buffer
//!
//! The async makers drive a [`ChunkBuffer`] from their core loop; it is also
//! usable directly as a synchronous push/flush chunker.

mod accumulator;

pub use accumulator::{ChunkBuffer, chunk_bytes};
