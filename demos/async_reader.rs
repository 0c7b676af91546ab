//! Chunking a file through an async reader.
//!
//! Run with:
//!     cargo run --example async_reader -- <path>

use chunkstream::{ChunkConfig, ChunkMaker, TextChunkMaker};
use tokio_util::compat::TokioAsyncReadCompatExt;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let path = std::env::args().nth(1).unwrap_or_else(|| "Cargo.toml".to_string());
    let file = tokio::fs::File::open(&path).await?;

    let config = ChunkConfig::new(256)?
        .with_separator("\n\n")
        .with_read_buffer_size(1024);
    let mut maker = TextChunkMaker::from_reader(file.compat(), config)?;

    let mut chunk_count = 0;
    let mut total_bytes = 0;
    let mut binary_chunks = 0;

    while let Some(chunk) = maker.recv().await {
        chunk_count += 1;
        total_bytes += chunk.bytes_size();
        if !chunk.is_utf8() {
            binary_chunks += 1;
        }
    }

    println!("{path}: {chunk_count} chunks, {total_bytes} bytes, {binary_chunks} binary");

    Ok(())
}
