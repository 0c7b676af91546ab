//! Configuration for chunk makers.
//!
//! - [`ChunkConfig`] - Chunk size, flush triggers, cancellation and queue sizing
//!
//! # Example
//!
//! ```
//! use chunkstream::ChunkConfig;
//!
//! let config = ChunkConfig::new(512)?
//!     .with_time_trigger_seconds(0.5)
//!     .with_separator("\n\n");
//! config.validate()?;
//! # Ok::<(), chunkstream::ChunkError>(())
//! ```

use std::time::Duration;

use bytes::Bytes;
use tokio_util::sync::CancellationToken;

use crate::error::ChunkError;

/// Default chunk size (runes for UTF-8 input, bytes otherwise).
pub const DEFAULT_CHUNK_SIZE: i64 = 1024;

/// Default capacity of the bounded side of every output queue.
pub const DEFAULT_QUEUE_CAPACITY: usize = 128;

/// Default size of a single read when pumping an async reader (8 KiB).
pub const DEFAULT_READ_BUFFER_SIZE: usize = 8 * 1024;

/// Configuration for a chunk maker.
///
/// The chunk size is counted in runes while the accumulated data is valid
/// UTF-8 and in bytes otherwise. The time trigger and the separator are
/// optional and race with the size threshold; whichever fires first cuts the
/// chunk.
///
/// Setters never validate. Makers call [`ChunkConfig::validate`] on
/// construction, so an invalid value surfaces as a constructor error.
///
/// # Example
///
/// ```
/// use chunkstream::ChunkConfig;
///
/// let config = ChunkConfig::default().with_chunk_size(0);
/// assert!(config.validate().is_err());
/// ```
#[derive(Debug, Clone)]
pub struct ChunkConfig {
    chunk_size: i64,
    time_trigger: Option<f64>,
    separator: Option<Bytes>,
    cancel: CancellationToken,
    queue_capacity: usize,
    read_buffer_size: usize,
}

impl ChunkConfig {
    /// Creates a configuration with the given chunk size.
    ///
    /// # Errors
    ///
    /// Returns [`ChunkError::InvalidConfig`] if `chunk_size <= 0`.
    ///
    /// # Example
    ///
    /// ```
    /// use chunkstream::ChunkConfig;
    ///
    /// let config = ChunkConfig::new(64)?;
    /// assert_eq!(config.chunk_size(), 64);
    /// assert!(ChunkConfig::new(-1).is_err());
    /// # Ok::<(), chunkstream::ChunkError>(())
    /// ```
    pub fn new(chunk_size: i64) -> Result<Self, ChunkError> {
        let config = Self::default().with_chunk_size(chunk_size);
        config.validate()?;
        Ok(config)
    }

    /// Sets the chunk size.
    pub fn with_chunk_size(mut self, size: i64) -> Self {
        self.chunk_size = size;
        self
    }

    /// Enables the time trigger, flushing everything buffered every `seconds`.
    pub fn with_time_trigger_seconds(mut self, seconds: f64) -> Self {
        self.time_trigger = Some(seconds);
        self
    }

    /// Enables the time trigger with a [`Duration`] interval.
    pub fn with_time_trigger(mut self, interval: Duration) -> Self {
        self.time_trigger = Some(interval.as_secs_f64());
        self
    }

    /// Sets the separator that forces a cut right after each occurrence.
    ///
    /// An empty separator disables the trigger.
    pub fn with_separator(mut self, separator: impl Into<Bytes>) -> Self {
        let separator = separator.into();
        self.separator = (!separator.is_empty()).then_some(separator);
        self
    }

    /// Sets the cancellation token shared by every task the maker spawns.
    pub fn with_cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Sets the capacity of the bounded half of the output queue.
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Sets how many bytes are requested per read when pumping a reader.
    pub fn with_read_buffer_size(mut self, size: usize) -> Self {
        self.read_buffer_size = size;
        self
    }

    /// Returns the chunk size.
    pub fn chunk_size(&self) -> i64 {
        self.chunk_size
    }

    /// Returns the time trigger interval, if enabled and valid.
    pub fn time_trigger(&self) -> Option<Duration> {
        self.time_trigger
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
            .filter(|period| !period.is_zero())
    }

    /// Returns the separator, if any.
    pub fn separator(&self) -> Option<&Bytes> {
        self.separator.as_ref()
    }

    /// Returns the cancellation token.
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Returns the output queue capacity.
    pub fn queue_capacity(&self) -> usize {
        self.queue_capacity
    }

    /// Returns the read buffer size.
    pub fn read_buffer_size(&self) -> usize {
        self.read_buffer_size
    }

    /// Returns the chunk size as a `usize`. Only meaningful after validation.
    pub(crate) fn chunk_size_units(&self) -> usize {
        usize::try_from(self.chunk_size).unwrap_or(usize::MAX)
    }

    /// Validates the current configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ChunkError::InvalidConfig`] if the chunk size, the time
    /// trigger interval, the queue capacity or the read buffer size is not
    /// positive, or if the interval does not fit a [`Duration`].
    pub fn validate(&self) -> Result<(), ChunkError> {
        if self.chunk_size <= 0 {
            return Err(ChunkError::InvalidConfig {
                message: "chunk size must be positive",
            });
        }

        if let Some(secs) = self.time_trigger {
            if !secs.is_finite() || secs <= 0.0 {
                return Err(ChunkError::InvalidConfig {
                    message: "time trigger interval must be positive",
                });
            }
            match Duration::try_from_secs_f64(secs) {
                Ok(period) if period.is_zero() => {
                    return Err(ChunkError::InvalidConfig {
                        message: "time trigger interval must be positive",
                    });
                }
                Ok(_) => {}
                Err(_) => {
                    return Err(ChunkError::InvalidConfig {
                        message: "time trigger interval out of range",
                    });
                }
            }
        }

        if self.queue_capacity == 0 {
            return Err(ChunkError::InvalidConfig {
                message: "queue capacity must be positive",
            });
        }

        if self.read_buffer_size == 0 {
            return Err(ChunkError::InvalidConfig {
                message: "read buffer size must be positive",
            });
        }

        Ok(())
    }
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            time_trigger: None,
            separator: None,
            cancel: CancellationToken::new(),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
        }
    }
}
