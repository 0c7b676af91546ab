//! Chunk types.
//!
//! - [`Chunk`] - Immutable, linked snapshot of flushed data

mod data;
mod history;
mod linker;

pub use data::Chunk;
pub(crate) use linker::ChunkLinker;
