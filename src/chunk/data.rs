//! The Chunk type - an immutable, linked snapshot of flushed data.

use std::fmt;
use std::sync::{Arc, Weak};

use bytes::Bytes;

use crate::util::utf8_runes;

/// A flushed chunk with metadata and a link to the chunk emitted before it.
///
/// Chunks are cheap to clone (one `Arc`) and never change after they leave a
/// maker. The backward link is weak: it records which chunk came before but
/// does not keep it alive. History stays reachable only while the consumer
/// holds on to it, so a long stream never accumulates in memory. See
/// [`Chunk::prev_n_bytes`] for lookback across boundaries.
///
/// # Example
///
/// ```
/// use chunkstream::Chunk;
///
/// let chunk = Chunk::new("你好");
/// assert!(chunk.is_utf8());
/// assert_eq!(chunk.bytes_size(), 6);
/// assert_eq!(chunk.runes_size(), 2);
/// assert!(!chunk.have_last_chunk());
/// ```
#[derive(Clone)]
pub struct Chunk {
    pub(super) inner: Arc<ChunkInner>,
}

pub(super) struct ChunkInner {
    pub(super) data: Bytes,
    pub(super) is_utf8: bool,
    pub(super) runes: usize,
    pub(super) mime_type: Option<String>,
    pub(super) prev: Option<Weak<ChunkInner>>,
}

impl Chunk {
    /// Creates an unlinked chunk, classifying the data as UTF-8 or binary.
    pub fn new(data: impl Into<Bytes>) -> Self {
        let data = data.into();
        match utf8_runes(&data) {
            Some(runes) => Self::from_parts(data, true, runes),
            None => {
                let len = data.len();
                Self::from_parts(data, false, len)
            }
        }
    }

    /// Creates an unlinked image chunk. Image data is always sized in bytes.
    pub fn image(data: impl Into<Bytes>, mime_type: impl Into<String>) -> Self {
        let data = data.into();
        let runes = data.len();
        Self {
            inner: Arc::new(ChunkInner {
                data,
                is_utf8: false,
                runes,
                mime_type: Some(mime_type.into()),
                prev: None,
            }),
        }
    }

    /// Builds a chunk from already-classified data.
    pub(crate) fn from_parts(data: Bytes, is_utf8: bool, runes: usize) -> Self {
        Self {
            inner: Arc::new(ChunkInner {
                data,
                is_utf8,
                runes,
                mime_type: None,
                prev: None,
            }),
        }
    }

    /// Returns this chunk with its backward link set to `prev`.
    ///
    /// Reuses the allocation when this is the only handle to the chunk.
    pub(super) fn linked(self, prev: Option<Weak<ChunkInner>>) -> Self {
        match Arc::try_unwrap(self.inner) {
            Ok(mut inner) => {
                inner.prev = prev;
                Self {
                    inner: Arc::new(inner),
                }
            }
            Err(shared) => Self {
                inner: Arc::new(ChunkInner {
                    data: shared.data.clone(),
                    is_utf8: shared.is_utf8,
                    runes: shared.runes,
                    mime_type: shared.mime_type.clone(),
                    prev,
                }),
            },
        }
    }

    pub(super) fn downgrade(&self) -> Weak<ChunkInner> {
        Arc::downgrade(&self.inner)
    }

    /// Returns the chunk data.
    pub fn data(&self) -> &Bytes {
        &self.inner.data
    }

    /// Consumes the handle and returns the data.
    pub fn into_data(self) -> Bytes {
        self.inner.data.clone()
    }

    /// Returns true if the data was valid UTF-8 when the chunk was cut.
    pub fn is_utf8(&self) -> bool {
        self.inner.is_utf8
    }

    /// Returns the size in bytes.
    pub fn bytes_size(&self) -> usize {
        self.inner.data.len()
    }

    /// Returns the size in runes, or in bytes for non-UTF-8 data.
    pub fn runes_size(&self) -> usize {
        self.inner.runes
    }

    /// Returns true if the chunk has no data.
    pub fn is_empty(&self) -> bool {
        self.inner.data.is_empty()
    }

    /// Returns the MIME type of image chunks.
    pub fn mime_type(&self) -> Option<&str> {
        self.inner.mime_type.as_deref()
    }

    /// Returns true for chunks produced from an image frame.
    pub fn is_image(&self) -> bool {
        self.inner.mime_type.is_some()
    }

    /// Returns true if a chunk was emitted before this one, whether or not
    /// it is still alive.
    pub fn have_last_chunk(&self) -> bool {
        self.inner.prev.is_some()
    }

    /// Returns the chunk emitted immediately before this one.
    ///
    /// Returns `None` for the first chunk and once every handle to the
    /// previous chunk has been dropped.
    pub fn last_chunk(&self) -> Option<Chunk> {
        self.inner
            .prev
            .as_ref()
            .and_then(Weak::upgrade)
            .map(|inner| Chunk { inner })
    }

    /// Returns true if both handles point at the same chunk.
    pub fn ptr_eq(&self, other: &Chunk) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl From<Bytes> for Chunk {
    fn from(data: Bytes) -> Self {
        Self::new(data)
    }
}

impl From<Vec<u8>> for Chunk {
    fn from(data: Vec<u8>) -> Self {
        Self::new(data)
    }
}

impl From<String> for Chunk {
    fn from(data: String) -> Self {
        Self::new(data)
    }
}

impl From<&'static str> for Chunk {
    fn from(data: &'static str) -> Self {
        Self::new(data)
    }
}

impl fmt::Debug for Chunk {
    // Print only whether a predecessor exists, never the chain.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chunk")
            .field("bytes", &self.bytes_size())
            .field("runes", &self.runes_size())
            .field("is_utf8", &self.is_utf8())
            .field("mime_type", &self.mime_type())
            .field("has_prev", &self.have_last_chunk())
            .finish()
    }
}

impl fmt::Display for Chunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Chunk({} bytes", self.bytes_size())?;
        if self.is_utf8() {
            write!(f, ", {} runes", self.runes_size())?;
        }
        if let Some(mime) = self.mime_type() {
            write!(f, ", {mime}")?;
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_utf8() {
        let chunk = Chunk::new("hello");
        assert!(chunk.is_utf8());
        assert_eq!(chunk.bytes_size(), 5);
        assert_eq!(chunk.runes_size(), 5);
        assert!(!chunk.is_empty());
    }

    #[test]
    fn test_new_binary_sized_in_bytes() {
        let chunk = Chunk::new(vec![0xff, 0xfe, 0x00]);
        assert!(!chunk.is_utf8());
        assert_eq!(chunk.runes_size(), 3);
    }

    #[test]
    fn test_empty() {
        let chunk = Chunk::new(Bytes::new());
        assert!(chunk.is_empty());
        assert!(chunk.is_utf8());
    }

    #[test]
    fn test_image() {
        let chunk = Chunk::image(&b"hello"[..], "image/png");
        assert!(chunk.is_image());
        assert!(!chunk.is_utf8());
        assert_eq!(chunk.mime_type(), Some("image/png"));
        assert_eq!(chunk.runes_size(), 5);
    }

    #[test]
    fn test_linked_unique_and_shared() {
        let first = Chunk::new("a");
        let second = Chunk::new("b").linked(Some(first.downgrade()));
        assert!(second.last_chunk().unwrap().ptr_eq(&first));

        let shared = Chunk::new("c");
        let keep = shared.clone();
        let relinked = shared.linked(Some(second.downgrade()));
        assert!(!keep.have_last_chunk());
        assert!(relinked.last_chunk().unwrap().ptr_eq(&second));
        assert_eq!(relinked.data(), keep.data());
    }

    #[test]
    fn test_display() {
        let s = Chunk::new("你好").to_string();
        assert!(s.contains("6 bytes"));
        assert!(s.contains("2 runes"));
        let s = Chunk::image(vec![1u8, 2], "image/jpeg").to_string();
        assert!(s.contains("image/jpeg"));
    }

    #[test]
    fn test_debug_does_not_walk_chain() {
        let first = Chunk::new("a");
        let second = Chunk::new("b").linked(Some(first.downgrade()));
        let s = format!("{second:?}");
        assert!(s.contains("has_prev: true"));
    }

    #[test]
    fn test_link_does_not_own_predecessor() {
        let first = Chunk::new("a");
        let second = Chunk::new("b").linked(Some(first.downgrade()));
        assert_eq!(Arc::strong_count(&first.inner), 1);

        drop(first);
        assert!(second.have_last_chunk());
        assert!(second.last_chunk().is_none());
    }
}
