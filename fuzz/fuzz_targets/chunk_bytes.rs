#![no_main]

use libfuzzer_sys::fuzz_target;
use chunkstream::chunk_bytes;

fuzz_target!(|input: (u8, Vec<u8>)| {
    let (size, data) = input;
    let size = usize::from(size % 64);
    let is_text = std::str::from_utf8(&data).is_ok();

    for separator in [None, Some(b"\n".as_slice()), Some(b"\r\n".as_slice())] {
        let chunks = chunk_bytes(&data, size, separator);

        // Verify: total bytes match input
        let joined: Vec<u8> = chunks.iter().flat_map(|c| c.data().iter().copied()).collect();
        assert_eq!(joined, data);

        // Verify: no empty chunks
        assert!(chunks.iter().all(|c| !c.is_empty()));

        // Verify: links follow emission order
        for pair in chunks.windows(2) {
            assert!(pair[1].last_chunk().is_some_and(|prev| prev.ptr_eq(&pair[0])));
        }

        // Verify: without a separator, full chunks hold exactly `size` units
        if separator.is_none() && size > 0 {
            if let Some((_, full)) = chunks.split_last() {
                for chunk in full {
                    if is_text {
                        assert_eq!(chunk.runes_size(), size);
                    } else {
                        assert_eq!(chunk.bytes_size(), size);
                    }
                }
            }
        }
    }
});
