//! Core chunking loop shared by the byte-stream makers.
//!
//! One task per maker owns the [`ChunkBuffer`] and races three triggers:
//!
//! - new data: cut at every separator match, then every full chunk
//! - timer tick: flush everything buffered, even below the size threshold
//! - input closed: flush everything, then close the output
//!
//! Cancellation stops the loop at once and drops whatever is buffered.
//!
//! ```text
//! write / reader pump ──► input queue ──► core loop ──► [link relay] ──► output queue
//! ```

use std::future::pending;
use std::io::ErrorKind;
use std::time::Duration;

use bytes::Bytes;
use futures_io::AsyncRead;
use futures_util::AsyncReadExt;
use tokio::runtime::Handle;
use tokio::time::{self, Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::buffer::ChunkBuffer;
use crate::chunk::Chunk;
use crate::config::ChunkConfig;
use crate::error::ChunkError;
use crate::queue::{QueueReceiver, QueueSender, unbounded_queue};

use super::text::link_relay;

/// The spawned halves of a byte-stream maker.
pub(crate) struct Pipeline {
    pub(crate) input: QueueSender<Bytes>,
    pub(crate) output: QueueReceiver<Chunk>,
    pub(crate) handle: Handle,
}

/// Validates `config` and spawns the core loop, plus the link relay when
/// `link` is set.
pub(crate) fn spawn_pipeline(
    config: &ChunkConfig,
    separator: Option<Bytes>,
    link: bool,
) -> Result<Pipeline, ChunkError> {
    config.validate()?;
    let handle = Handle::try_current()?;
    let cancel = config.cancel_token();
    let capacity = config.queue_capacity();

    let (input, input_rx) = unbounded_queue::<Bytes>(cancel, capacity)?;
    let (output_tx, output) = unbounded_queue::<Chunk>(cancel, capacity)?;
    let core = CoreLoop::new(config, separator);

    if link {
        let (flushed_tx, flushed_rx) = unbounded_queue::<Chunk>(cancel, capacity)?;
        handle.spawn(core.run(input_rx, flushed_tx));
        handle.spawn(link_relay(flushed_rx, output_tx));
    } else {
        handle.spawn(core.run(input_rx, output_tx));
    }

    Ok(Pipeline {
        input,
        output,
        handle,
    })
}

/// Spawns a task that copies `reader` into `input`, closing it at EOF.
///
/// A read error ends the input like EOF does; it is logged, not returned.
pub(crate) fn spawn_reader_pump<R>(
    handle: &Handle,
    reader: R,
    input: QueueSender<Bytes>,
    config: &ChunkConfig,
) where
    R: AsyncRead + Unpin + Send + 'static,
{
    handle.spawn(pump_reader(
        reader,
        input,
        config.read_buffer_size(),
        config.cancel_token().clone(),
    ));
}

async fn pump_reader<R: AsyncRead + Unpin>(
    mut reader: R,
    input: QueueSender<Bytes>,
    read_size: usize,
    cancel: CancellationToken,
) {
    let mut buf = vec![0u8; read_size];
    let mut total = 0usize;

    loop {
        if input.is_closed() {
            tracing::debug!(bytes = total, "input closed, reader abandoned");
            return;
        }

        let read = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                tracing::debug!(bytes = total, "reader cancelled");
                return;
            }
            read = reader.read(&mut buf) => read,
        };

        match read {
            Ok(0) => break,
            Ok(n) => {
                total += n;
                input.safe_feed(Bytes::copy_from_slice(&buf[..n]));
            }
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => {
                tracing::warn!(error = %e, bytes = total, "read failed, ending input");
                break;
            }
        }
    }

    tracing::trace!(bytes = total, "reader exhausted");
    input.close();
}

/// The accumulation state machine.
pub(crate) struct CoreLoop {
    buffer: ChunkBuffer,
    chunk_size: usize,
    separator: Option<Bytes>,
    time_trigger: Option<Duration>,
    cancel: CancellationToken,
}

impl CoreLoop {
    pub(crate) fn new(config: &ChunkConfig, separator: Option<Bytes>) -> Self {
        Self {
            buffer: ChunkBuffer::new(),
            chunk_size: config.chunk_size_units(),
            separator,
            time_trigger: config.time_trigger(),
            cancel: config.cancel_token().clone(),
        }
    }

    pub(crate) async fn run(mut self, mut input: QueueReceiver<Bytes>, mut output: QueueSender<Chunk>) {
        let mut ticker = self.time_trigger.and_then(|period| {
            let Some(start) = Instant::now().checked_add(period) else {
                tracing::debug!(?period, "time trigger beyond the clock range, disabled");
                return None;
            };
            let mut ticker = time::interval_at(start, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            Some(ticker)
        });
        let mut emitted = 0usize;

        loop {
            tokio::select! {
                biased;
                () = self.cancel.cancelled() => {
                    tracing::debug!(dropped = self.buffer.len(), "chunking cancelled");
                    break;
                }
                data = input.recv() => match data {
                    Some(data) => emitted += self.on_data(&data, &mut output),
                    None => {
                        emitted += self.on_close(&mut output);
                        break;
                    }
                },
                () = tick(ticker.as_mut()) => emitted += self.on_timer(&mut output),
            }
        }

        tracing::trace!(chunks = emitted, "core loop finished");
        output.close();
    }

    fn on_data(&mut self, data: &[u8], output: &mut QueueSender<Chunk>) -> usize {
        self.buffer.write(data);
        let mut emitted = 0;
        if let Some(separator) = &self.separator {
            emitted += self
                .buffer
                .flush_to_separator(output, separator, self.chunk_size);
        }
        emitted + self.buffer.flush_full_chunk_size_to(output, self.chunk_size)
    }

    fn on_timer(&mut self, output: &mut QueueSender<Chunk>) -> usize {
        if self.buffer.is_empty() {
            return 0;
        }
        let emitted = self.buffer.flush_all_chunk_size_to(output, self.chunk_size);
        tracing::trace!(chunks = emitted, "time trigger flushed");
        emitted
    }

    fn on_close(&mut self, output: &mut QueueSender<Chunk>) -> usize {
        self.buffer.flush_all_chunk_size_to(output, self.chunk_size)
    }
}

async fn tick(ticker: Option<&mut Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn run_core(config: ChunkConfig, separator: Option<&'static str>, writes: &[&[u8]]) -> Vec<Chunk> {
        let cancel = config.cancel_token().clone();
        let (input, input_rx) = unbounded_queue::<Bytes>(&cancel, 4).unwrap();
        let (output_tx, mut output) = unbounded_queue::<Chunk>(&cancel, 4).unwrap();
        let core = CoreLoop::new(&config, separator.map(Bytes::from));
        let task = tokio::spawn(core.run(input_rx, output_tx));

        for write in writes {
            input.safe_feed(Bytes::copy_from_slice(write));
        }
        input.close();

        let mut chunks = Vec::new();
        while let Some(chunk) = output.recv().await {
            chunks.push(chunk);
        }
        task.await.unwrap();
        chunks
    }

    fn texts(chunks: &[Chunk]) -> Vec<&str> {
        chunks
            .iter()
            .map(|c| std::str::from_utf8(c.data()).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_size_trigger_across_writes() {
        let config = ChunkConfig::new(4).unwrap();
        let chunks = run_core(config, None, &[b"ab", b"cdef", b"g"]).await;
        assert_eq!(texts(&chunks), ["abcd", "efg"]);
    }

    #[tokio::test]
    async fn test_separator_before_size() {
        let config = ChunkConfig::new(5).unwrap();
        let chunks = run_core(config, Some("\n"), &[b"Hello", b",\n", b"World"]).await;
        assert_eq!(texts(&chunks), ["Hello", ",\n", "World"]);
    }

    #[tokio::test]
    async fn test_separator_split_across_writes() {
        let config = ChunkConfig::new(100).unwrap();
        let chunks = run_core(config, Some("\n\n"), &[b"one\n", b"\ntwo"]).await;
        assert_eq!(texts(&chunks), ["one\n\n", "two"]);
    }

    #[tokio::test]
    async fn test_timer_flushes_partial() {
        let config = ChunkConfig::new(100).unwrap().with_time_trigger_seconds(0.05);
        let cancel = config.cancel_token().clone();
        let (input, input_rx) = unbounded_queue::<Bytes>(&cancel, 4).unwrap();
        let (output_tx, mut output) = unbounded_queue::<Chunk>(&cancel, 4).unwrap();
        tokio::spawn(CoreLoop::new(&config, None).run(input_rx, output_tx));

        input.safe_feed(Bytes::from_static(b"tick"));
        let chunk = time::timeout(Duration::from_secs(2), output.recv())
            .await
            .expect("timer should flush")
            .unwrap();
        assert_eq!(chunk.data().as_ref(), b"tick");

        input.close();
        assert!(output.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_cancel_drops_buffered_data() {
        let config = ChunkConfig::new(100).unwrap();
        let cancel = config.cancel_token().clone();
        let (input, input_rx) = unbounded_queue::<Bytes>(&cancel, 4).unwrap();
        let (output_tx, mut output) = unbounded_queue::<Chunk>(&cancel, 4).unwrap();
        let task = tokio::spawn(CoreLoop::new(&config, None).run(input_rx, output_tx));

        input.safe_feed(Bytes::from_static(b"never flushed"));
        cancel.cancel();
        task.await.unwrap();
        assert!(output.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_reader_pump_closes_input() {
        let config = ChunkConfig::new(4).unwrap().with_read_buffer_size(3);
        let cancel = config.cancel_token().clone();
        let (input, mut input_rx) = unbounded_queue::<Bytes>(&cancel, 4).unwrap();
        spawn_reader_pump(&Handle::current(), &b"abcdefg"[..], input, &config);

        let mut got = Vec::new();
        while let Some(bytes) = input_rx.recv().await {
            assert!(bytes.len() <= 3);
            got.extend_from_slice(&bytes);
        }
        assert_eq!(got, b"abcdefg");
    }
}
