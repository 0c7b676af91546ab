//! Writer-fed text chunking with all three triggers.
//!
//! Run with:
//!     RUST_LOG=chunkstream=trace cargo run --example text_basic

use std::time::Duration;

use chunkstream::{ChunkConfig, ChunkMaker, TextChunkMaker};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // 16 runes, cut early at blank lines, flushed every 200ms when idle
    let config = ChunkConfig::new(16)?
        .with_separator("\n\n")
        .with_time_trigger(Duration::from_millis(200));
    let mut maker = TextChunkMaker::new(config)?;

    maker.write("First paragraph.\n\nSecond paragraph, a bit longer than sixteen runes.\n\n");
    maker.write("多字节文本按字符计数，而不是按字节。");
    maker.write("Trailing words");

    // Let the time trigger flush the tail before closing
    tokio::time::sleep(Duration::from_millis(300)).await;
    maker.close_write();

    // Links are weak: hold the previous chunk so lookback can reach it
    let mut previous = None;
    while let Some(chunk) = maker.recv().await {
        println!(
            "{:>3} bytes {:>3} runes | {:?} | lookback {:?}",
            chunk.bytes_size(),
            chunk.runes_size(),
            String::from_utf8_lossy(chunk.data()),
            String::from_utf8_lossy(&chunk.prev_n_bytes(8)),
        );
        previous = Some(chunk);
    }
    drop(previous);

    Ok(())
}
