//! Stamps backward links in emission order.

use std::sync::Weak;

use super::data::{Chunk, ChunkInner};

/// Remembers the last emitted chunk and links each new one to it.
///
/// Owned by exactly one task per maker, so the chain always mirrors the
/// order chunks reach the output. Only a weak handle is kept, so the linker
/// never holds emitted data alive.
#[derive(Debug, Default)]
pub(crate) struct ChunkLinker {
    last: Option<Weak<ChunkInner>>,
}

impl ChunkLinker {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Links `chunk` to the previously emitted chunk and records it as the newest.
    pub(crate) fn link(&mut self, chunk: Chunk) -> Chunk {
        let linked = chunk.linked(self.last.take());
        self.last = Some(linked.downgrade());
        linked
    }
}
