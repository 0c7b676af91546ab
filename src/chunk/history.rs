//! Backward lookback over linked chunks.

use bytes::Bytes;

use super::data::Chunk;

impl Chunk {
    /// Returns up to `n` bytes emitted immediately before this chunk.
    ///
    /// Walks the backward chain (skipping empty chunks) until at least `n`
    /// bytes are collected or the history ends, then returns the trailing `n`
    /// bytes in stream order. Returns fewer bytes when less history exists
    /// and an empty buffer for `n == 0` or for the first chunk.
    ///
    /// Links are weak, so the walk stops at the first ancestor that has
    /// already been dropped. Keep the chunks you want to look back into.
    ///
    /// # Example
    ///
    /// ```
    /// # #[tokio::main(flavor = "current_thread")]
    /// # async fn main() -> Result<(), chunkstream::ChunkError> {
    /// use chunkstream::{ChunkConfig, ChunkMaker, TextChunkMaker};
    ///
    /// let mut maker = TextChunkMaker::from_bytes("HelloWorld!", ChunkConfig::new(5)?)?;
    /// let chunks = maker.collect_all().await;
    /// assert_eq!(chunks[2].prev_n_bytes(7).as_ref(), b"loWorld");
    /// # Ok(())
    /// # }
    /// ```
    pub fn prev_n_bytes(&self, n: usize) -> Bytes {
        if n == 0 {
            return Bytes::new();
        }

        // Newest first.
        let mut parts: Vec<Bytes> = Vec::new();
        let mut total = 0usize;
        let mut cursor = self.last_chunk();
        while let Some(chunk) = cursor {
            if total >= n {
                break;
            }
            if !chunk.is_empty() {
                total += chunk.bytes_size();
                parts.push(chunk.data().clone());
            }
            cursor = chunk.last_chunk();
        }

        match parts.as_slice() {
            [] => Bytes::new(),
            [only] => only.slice(only.len().saturating_sub(n)..),
            _ => {
                let mut skip = total.saturating_sub(n);
                let mut out = Vec::with_capacity(total.min(n));
                for part in parts.iter().rev() {
                    if skip >= part.len() {
                        skip -= part.len();
                        continue;
                    }
                    out.extend_from_slice(&part[skip..]);
                    skip = 0;
                }
                Bytes::from(out)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain(parts: &[&'static str]) -> Vec<Chunk> {
        let mut out: Vec<Chunk> = Vec::new();
        for part in parts {
            let prev = out.last().map(Chunk::downgrade);
            out.push(Chunk::new(*part).linked(prev));
        }
        out
    }

    #[test]
    fn test_zero_and_first_chunk() {
        let chunks = chain(&["abc", "def"]);
        assert!(chunks[1].prev_n_bytes(0).is_empty());
        assert!(chunks[0].prev_n_bytes(10).is_empty());
    }

    #[test]
    fn test_within_single_ancestor() {
        let chunks = chain(&["abcdef", "ghi"]);
        assert_eq!(chunks[1].prev_n_bytes(2).as_ref(), b"ef");
        assert_eq!(chunks[1].prev_n_bytes(6).as_ref(), b"abcdef");
    }

    #[test]
    fn test_across_ancestors_with_empty_ones() {
        let chunks = chain(&["ab", "", "cd", "", "", "ef", "now"]);
        let last = chunks.last().unwrap();
        assert_eq!(last.prev_n_bytes(3).as_ref(), b"def");
        assert_eq!(last.prev_n_bytes(5).as_ref(), b"bcdef");
        assert_eq!(last.prev_n_bytes(100).as_ref(), b"abcdef");
    }

    #[test]
    fn test_long_chain() {
        let parts = vec!["x"; 100_000];
        let chunks = chain(&parts);
        let last = chunks.last().unwrap();
        assert_eq!(last.prev_n_bytes(4).as_ref(), b"xxxx");
        assert_eq!(last.prev_n_bytes(usize::MAX).len(), 99_999);
    }

    #[test]
    fn test_stops_at_dropped_ancestor() {
        let mut chunks = chain(&["ab", "cd", "ef", "gh"]);
        let last = chunks.pop().unwrap();
        assert_eq!(last.prev_n_bytes(100).as_ref(), b"abcdef");

        // drop "cd"; "ef" stays reachable, everything older is gone
        chunks.remove(1);
        assert_eq!(last.prev_n_bytes(100).as_ref(), b"ef");

        drop(chunks);
        assert!(last.have_last_chunk());
        assert!(last.prev_n_bytes(100).is_empty());
    }
}
