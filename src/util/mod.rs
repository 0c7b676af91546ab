//! Internal utility functions and helpers.
//!
//! Small UTF-8 and byte-search helpers used by the accumulation buffer and the
//! chunk type. Not part of the public API.

/// Returns the number of runes in `data`, or `None` if it is not valid UTF-8.
pub(crate) fn utf8_runes(data: &[u8]) -> Option<usize> {
    std::str::from_utf8(data).ok().map(|s| s.chars().count())
}

/// Like [`utf8_runes`], but tolerates an incomplete sequence at the very end.
///
/// Returns the rune count of the complete prefix and whether a partial rune
/// trails it. A stream read in pieces often ends mid-rune; only bytes that
/// can never become valid yield `None`.
pub(crate) fn utf8_prefix_runes(data: &[u8]) -> Option<(usize, bool)> {
    match std::str::from_utf8(data) {
        Ok(s) => Some((s.chars().count(), false)),
        Err(e) if e.error_len().is_none() => {
            let valid = &data[..e.valid_up_to()];
            utf8_runes(valid).map(|runes| (runes, true))
        }
        Err(_) => None,
    }
}

/// Returns the byte offset where rune `n` of a valid UTF-8 slice starts, or
/// `data.len()` when it holds `n` runes or fewer.
///
/// Counts lead bytes only, so it never looks past the prefix it needs.
pub(crate) fn rune_byte_offset(data: &[u8], n: usize) -> usize {
    data.iter()
        .enumerate()
        .filter(|(_, b)| (**b & 0xC0) != 0x80)
        .nth(n)
        .map_or(data.len(), |(offset, _)| offset)
}

/// Finds the first occurrence of `needle` in `haystack` starting at `from`.
pub(crate) fn find_subslice(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if needle.is_empty() || from >= haystack.len() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|pos| from + pos)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_utf8_runes() {
        assert_eq!(utf8_runes("你好ab".as_bytes()), Some(4));
        assert_eq!(utf8_runes(b""), Some(0));
        assert_eq!(utf8_runes(&[0xff, 0x00]), None);
        // Truncated multi-byte sequence.
        assert_eq!(utf8_runes(&"你".as_bytes()[..2]), None);
    }

    #[test]
    fn test_utf8_prefix_runes() {
        assert_eq!(utf8_prefix_runes("你好".as_bytes()), Some((2, false)));
        assert_eq!(utf8_prefix_runes(&"a你".as_bytes()[..3]), Some((1, true)));
        assert_eq!(utf8_prefix_runes(&[0xe4]), Some((0, true)));
        assert_eq!(utf8_prefix_runes(&[0xff, b'a']), None);
        // Broken in the middle, not just truncated.
        assert_eq!(utf8_prefix_runes(&[0xe4, b'a', b'b']), None);
    }

    #[test]
    fn test_rune_byte_offset() {
        assert_eq!(rune_byte_offset("你好世界".as_bytes(), 2), 6);
        assert_eq!(rune_byte_offset("你好".as_bytes(), 2), 6);
        assert_eq!(rune_byte_offset(b"abc", 5), 3);
        assert_eq!(rune_byte_offset(b"abc", 0), 0);
    }

    #[test]
    fn test_find_subslice() {
        assert_eq!(find_subslice(b"a\n\nb\n\n", b"\n\n", 0), Some(1));
        assert_eq!(find_subslice(b"a\n\nb\n\n", b"\n\n", 3), Some(4));
        assert_eq!(find_subslice(b"abc", b"", 0), None);
        assert_eq!(find_subslice(b"abc", b"abcd", 0), None);
        assert_eq!(find_subslice(b"abc", b"c", 3), None);
    }
}
