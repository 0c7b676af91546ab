//! Error types for chunkstream.
//!
//! All validation happens once, at construction. A running maker never
//! reports an error: malformed UTF-8 switches sizing mode, reader failures end
//! the input, and cancellation silently drops whatever is still buffered.

/// Errors that can occur while building a chunk maker.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ChunkError {
    /// An I/O error occurred while preparing the input (e.g. frame extraction).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration parameter.
    #[error("invalid config: {message}")]
    InvalidConfig {
        /// Description of what was invalid.
        message: &'static str,
    },

    /// The maker was constructed outside of a tokio runtime.
    #[error("no tokio runtime available to spawn the chunking task: {0}")]
    NoRuntime(#[from] tokio::runtime::TryCurrentError),
}

/// Result type for chunkstream operations.
pub type Result<T, E = ChunkError> = std::result::Result<T, E>;
