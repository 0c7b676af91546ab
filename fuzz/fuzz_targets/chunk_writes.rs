#![no_main]

use libfuzzer_sys::fuzz_target;
use chunkstream::{ChunkConfig, ChunkMaker, TextChunkMaker};

fuzz_target!(|input: (u8, Vec<Vec<u8>>)| {
    let (size, writes) = input;
    let size = i64::from(size % 32) + 1;
    let expected: Vec<u8> = writes.concat();

    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap();
    let chunks = runtime.block_on(async {
        let config = ChunkConfig::new(size).unwrap().with_separator("\n");
        let mut maker = TextChunkMaker::new(config).unwrap();
        for write in writes {
            maker.write(write);
        }
        maker.close_write();
        maker.collect_all().await
    });

    // Verify: arbitrary write boundaries never lose or reorder bytes
    let joined: Vec<u8> = chunks.iter().flat_map(|c| c.data().iter().copied()).collect();
    assert_eq!(joined, expected);

    for pair in chunks.windows(2) {
        assert!(pair[1].last_chunk().is_some_and(|prev| prev.ptr_eq(&pair[0])));
    }
});
