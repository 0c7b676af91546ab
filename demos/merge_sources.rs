//! Fan-in of several makers into one output.
//!
//! Each source keeps its own order; sources interleave freely.
//!
//! Run with:
//!     cargo run --example merge_sources

use chunkstream::{BasicChunkMaker, Chunk, ChunkConfig, ChunkMaker, MergerChunkMaker, SimpleChunkMaker, TextChunkMaker};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cancel = CancellationToken::new();
    let config = ChunkConfig::new(8)?.with_cancel_token(cancel.clone());

    let text = TextChunkMaker::from_bytes("lines from a text source\n", config.clone().with_separator("\n"))?;

    let basic = BasicChunkMaker::new(config.clone())?;
    basic.write((0..20u8).collect::<Vec<_>>());
    basic.close_write();

    // One upstream item, one chunk
    let (numbers, rx) = chunkstream::unbounded_queue::<u64>(&cancel, 4)?;
    let simple = SimpleChunkMaker::new(rx, |n| Chunk::from(format!("#{n}")), config)?;
    for n in 1..=3 {
        numbers.safe_feed(n * n);
    }
    numbers.close();

    let mut merger = MergerChunkMaker::new(&cancel)?;
    merger.add_input(text);
    merger.add_input(basic);
    merger.add_input(simple);
    merger.finish().await;

    while let Some(chunk) = merger.recv().await {
        println!("{chunk:?}");
    }

    Ok(())
}
