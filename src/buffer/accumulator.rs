//! The accumulation buffer.
//!
//! Sizing follows the contents: while the buffered bytes are valid UTF-8 a
//! chunk is `size` runes, otherwise `size` bytes. Validity is re-derived from
//! the whole buffer on every write, so appending a broken sequence flips the
//! buffer into byte mode until a flush leaves valid data behind.
//!
//! A rune cut in half by the producer is not broken: an incomplete sequence
//! at the end of the buffer stays pending in rune mode until the rest of it
//! arrives.

use std::iter;

use bytes::{Bytes, BytesMut};

use crate::chunk::{Chunk, ChunkLinker};
use crate::util::{find_subslice, rune_byte_offset, utf8_prefix_runes};

/// Mutable byte accumulator that cuts [`Chunk`]s on request.
///
/// Chunks emitted here are unlinked; the maker that owns the buffer stamps
/// backward links when it publishes them.
///
/// # Example
///
/// ```
/// use chunkstream::{Chunk, ChunkBuffer};
///
/// let mut buffer = ChunkBuffer::new();
/// let mut out: Vec<Chunk> = Vec::new();
///
/// buffer.write("你好世界123".as_bytes());
/// buffer.flush_full_chunk_size_to(&mut out, 2);
/// assert_eq!(out.len(), 3);
/// assert_eq!(buffer.runes_len(), 1);
///
/// buffer.flush_all_chunk_size_to(&mut out, 2);
/// let texts: Vec<_> = out.iter().map(|c| c.data().clone()).collect();
/// assert_eq!(texts, ["你好", "世界", "12", "3"].map(|s| s.as_bytes()));
/// ```
#[derive(Debug)]
pub struct ChunkBuffer {
    data: BytesMut,
    is_utf8: bool,
    runes: usize,
    partial_tail: bool,
}

impl ChunkBuffer {
    /// Creates an empty buffer.
    pub fn new() -> Self {
        Self {
            data: BytesMut::new(),
            is_utf8: true,
            runes: 0,
            partial_tail: false,
        }
    }

    fn from_segment(data: BytesMut) -> Self {
        let mut buffer = Self {
            data,
            is_utf8: true,
            runes: 0,
            partial_tail: false,
        };
        buffer.refresh();
        buffer
    }

    /// Appends bytes and re-derives the sizing mode.
    pub fn write(&mut self, bytes: &[u8]) {
        if bytes.is_empty() {
            return;
        }
        self.data.extend_from_slice(bytes);
        self.refresh();
    }

    fn refresh(&mut self) {
        match utf8_prefix_runes(&self.data) {
            Some((runes, partial_tail)) => {
                self.is_utf8 = true;
                self.runes = runes;
                self.partial_tail = partial_tail;
            }
            None => {
                self.is_utf8 = false;
                self.runes = self.data.len();
                self.partial_tail = false;
            }
        }
    }

    /// Returns the number of buffered bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if nothing is buffered.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns the buffered size in runes, or in bytes while in byte mode.
    ///
    /// A trailing incomplete rune is not counted.
    pub fn runes_len(&self) -> usize {
        self.runes
    }

    /// Returns true while the buffered bytes are valid UTF-8, allowing for
    /// an incomplete rune at the end.
    pub fn is_utf8(&self) -> bool {
        self.is_utf8
    }

    /// Discards everything buffered.
    pub fn reset(&mut self) {
        self.data.clear();
        self.is_utf8 = true;
        self.runes = 0;
        self.partial_tail = false;
    }

    /// Emits every complete chunk of exactly `size` units and keeps the rest.
    ///
    /// Returns the number of chunks emitted. A zero `size` emits nothing.
    pub fn flush_full_chunk_size_to(&mut self, dst: &mut impl Extend<Chunk>, size: usize) -> usize {
        if size == 0 {
            return 0;
        }

        let mut emitted = 0;
        if self.is_utf8 {
            while self.runes >= size {
                let end = rune_byte_offset(&self.data, size);
                let piece = self.data.split_to(end).freeze();
                self.runes -= size;
                dst.extend(iter::once(Chunk::from_parts(piece, true, size)));
                emitted += 1;
            }
        } else {
            while self.data.len() >= size {
                let piece = self.data.split_to(size).freeze();
                dst.extend(iter::once(Chunk::new(piece)));
                emitted += 1;
            }
            if emitted > 0 {
                self.refresh();
            }
        }
        emitted
    }

    /// Emits everything buffered: full chunks of `size` units, then the
    /// remainder as a final, smaller chunk.
    ///
    /// Returns the number of chunks emitted.
    pub fn flush_all_chunk_size_to(&mut self, dst: &mut impl Extend<Chunk>, size: usize) -> usize {
        let mut emitted = self.flush_full_chunk_size_to(dst, size);
        if !self.data.is_empty() {
            let piece = self.data.split().freeze();
            let chunk = if self.is_utf8 && !self.partial_tail {
                Chunk::from_parts(piece, true, self.runes)
            } else {
                Chunk::new(piece)
            };
            self.reset();
            dst.extend(iter::once(chunk));
            emitted += 1;
        }
        emitted
    }

    /// Cuts right after every occurrence of `separator`, left to right.
    ///
    /// Each separated segment keeps its separator and is emitted whole,
    /// unless it is longer than `size` units, in which case it is split by
    /// size first. Bytes after the last occurrence stay buffered.
    ///
    /// Returns the number of chunks emitted.
    pub fn flush_to_separator(
        &mut self,
        dst: &mut impl Extend<Chunk>,
        separator: &[u8],
        size: usize,
    ) -> usize {
        let mut emitted = 0;
        let mut cut = false;
        while let Some(pos) = find_subslice(&self.data, separator, 0) {
            let segment = self.data.split_to(pos + separator.len());
            emitted += Self::from_segment(segment).flush_all_chunk_size_to(dst, size);
            cut = true;
        }
        if cut {
            self.refresh();
        }
        emitted
    }
}

impl Default for ChunkBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// Splits an in-memory buffer into linked chunks.
///
/// Equivalent to writing `data` into a text maker and closing it: separator
/// cuts first (when given), then `size`-unit cuts, then the final partial
/// chunk. A zero `size` yields a single chunk holding all of `data`.
///
/// # Example
///
/// ```
/// use chunkstream::chunk_bytes;
///
/// let chunks = chunk_bytes("HelloWorld", 5, None);
/// assert_eq!(chunks.len(), 2);
/// assert!(chunks[1].last_chunk().unwrap().ptr_eq(&chunks[0]));
/// ```
pub fn chunk_bytes(data: impl AsRef<[u8]>, size: usize, separator: Option<&[u8]>) -> Vec<Chunk> {
    let mut buffer = ChunkBuffer::new();
    let mut raw = Vec::new();

    buffer.write(data.as_ref());
    if let Some(separator) = separator.filter(|s| !s.is_empty()) {
        buffer.flush_to_separator(&mut raw, separator, size);
    }
    if size == 0 {
        if !buffer.is_empty() {
            raw.push(Chunk::new(Bytes::copy_from_slice(&buffer.data)));
        }
    } else {
        buffer.flush_all_chunk_size_to(&mut raw, size);
    }

    let mut linker = ChunkLinker::new();
    raw.into_iter().map(|chunk| linker.link(chunk)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(chunks: &[Chunk]) -> Vec<String> {
        chunks
            .iter()
            .map(|c| String::from_utf8_lossy(c.data()).into_owned())
            .collect()
    }

    #[test]
    fn test_write_tracks_sizes() {
        let mut buffer = ChunkBuffer::new();
        assert!(buffer.is_utf8());
        buffer.write("你好".as_bytes());
        assert_eq!(buffer.len(), 6);
        assert_eq!(buffer.runes_len(), 2);
    }

    #[test]
    fn test_mode_flips_on_invalid_bytes() {
        let mut buffer = ChunkBuffer::new();
        buffer.write(b"abc");
        buffer.write(&[0xff]);
        assert!(!buffer.is_utf8());
        assert_eq!(buffer.runes_len(), 4);
    }

    #[test]
    fn test_split_rune_stays_pending() {
        let bytes = "a你".as_bytes();
        let mut buffer = ChunkBuffer::new();
        let mut out = Vec::new();
        buffer.write(&bytes[..2]);
        assert!(buffer.is_utf8());
        assert_eq!(buffer.runes_len(), 1);

        // The half rune is not counted toward a full chunk.
        assert_eq!(buffer.flush_full_chunk_size_to(&mut out, 2), 0);
        buffer.write(&bytes[2..]);
        assert_eq!(buffer.runes_len(), 2);
        assert_eq!(buffer.flush_full_chunk_size_to(&mut out, 2), 1);
        assert_eq!(texts(&out), ["a你"]);
    }

    #[test]
    fn test_final_flush_of_half_rune_is_binary() {
        let mut buffer = ChunkBuffer::new();
        let mut out = Vec::new();
        buffer.write(&"ab你".as_bytes()[..3]);
        assert_eq!(buffer.flush_all_chunk_size_to(&mut out, 5), 1);
        assert!(!out[0].is_utf8());
        assert_eq!(out[0].bytes_size(), 3);
    }

    #[test]
    fn test_flush_full_leaves_remainder() {
        let mut buffer = ChunkBuffer::new();
        let mut out = Vec::new();
        buffer.write(b"HelloWorld!");
        assert_eq!(buffer.flush_full_chunk_size_to(&mut out, 5), 2);
        assert_eq!(texts(&out), ["Hello", "World"]);
        assert_eq!(buffer.len(), 1);
    }

    #[test]
    fn test_flush_full_zero_size_is_noop() {
        let mut buffer = ChunkBuffer::new();
        let mut out = Vec::new();
        buffer.write(b"abc");
        assert_eq!(buffer.flush_full_chunk_size_to(&mut out, 0), 0);
        assert_eq!(buffer.len(), 3);
    }

    #[test]
    fn test_rune_mode_never_splits_runes() {
        let mut buffer = ChunkBuffer::new();
        let mut out = Vec::new();
        buffer.write("你好世界123".as_bytes());
        buffer.flush_all_chunk_size_to(&mut out, 2);
        assert_eq!(texts(&out), ["你好", "世界", "12", "3"]);
        assert!(out.iter().all(Chunk::is_utf8));
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_byte_mode_cuts_exact_bytes() {
        let mut buffer = ChunkBuffer::new();
        let mut out = Vec::new();
        let data: Vec<u8> = (0..10u8).map(|i| 0xf0 ^ i).collect();
        buffer.write(&data);
        assert!(!buffer.is_utf8());
        buffer.flush_all_chunk_size_to(&mut out, 4);
        let sizes: Vec<_> = out.iter().map(Chunk::bytes_size).collect();
        assert_eq!(sizes, [4, 4, 2]);
    }

    #[test]
    fn test_byte_mode_returns_to_rune_mode() {
        let mut buffer = ChunkBuffer::new();
        let mut out = Vec::new();
        buffer.write(&[0xff, b'a', b'b']);
        buffer.write("cd你".as_bytes());
        assert_eq!(buffer.flush_full_chunk_size_to(&mut out, 5), 1);
        assert_eq!(out[0].data().as_ref(), b"\xffabcd");
        assert!(buffer.is_utf8());
        assert_eq!(buffer.runes_len(), 1);
    }

    #[test]
    fn test_separator_cuts_each_match() {
        let mut buffer = ChunkBuffer::new();
        let mut out = Vec::new();
        buffer.write(b"a\nbb\nccc");
        assert_eq!(buffer.flush_to_separator(&mut out, b"\n", 100), 2);
        assert_eq!(texts(&out), ["a\n", "bb\n"]);
        assert_eq!(buffer.len(), 3);
    }

    #[test]
    fn test_separator_segment_longer_than_size() {
        let mut buffer = ChunkBuffer::new();
        let mut out = Vec::new();
        buffer.write(b"Hello,\nWorld");
        buffer.flush_to_separator(&mut out, b"\n", 5);
        buffer.flush_all_chunk_size_to(&mut out, 5);
        assert_eq!(texts(&out), ["Hello", ",\n", "World"]);
    }

    #[test]
    fn test_multi_byte_separator() {
        let chunks = chunk_bytes(
            "Hello\nWorld\n\nHello again\nWorld\n\n",
            100,
            Some(b"\n\n".as_slice()),
        );
        assert_eq!(texts(&chunks), ["Hello\nWorld\n\n", "Hello again\nWorld\n\n"]);
    }

    #[test]
    fn test_chunk_bytes_links_and_reassembles() {
        let input = "The quick brown fox jumps over the lazy dog";
        let chunks = chunk_bytes(input, 7, None);
        let joined: Vec<u8> = chunks.iter().flat_map(|c| c.data().to_vec()).collect();
        assert_eq!(joined, input.as_bytes());
        for pair in chunks.windows(2) {
            assert!(pair[1].last_chunk().unwrap().ptr_eq(&pair[0]));
        }
    }

    #[test]
    fn test_chunk_bytes_zero_size() {
        let chunks = chunk_bytes("abc", 0, None);
        assert_eq!(texts(&chunks), ["abc"]);
        assert!(chunk_bytes("", 3, None).is_empty());
    }
}
