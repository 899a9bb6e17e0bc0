/// Errors that can occur while decoding frames from the stream.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The header implies a payload exceeding the configured maximum.
    ///
    /// Fatal: the stream cannot be resynchronized past an arbitrarily large
    /// binary body.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// An I/O error occurred while reading from the stream.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream ended cleanly while scanning for a header line.
    #[error("connection closed")]
    ConnectionClosed,

    /// The stream ended while payload bytes were still owed.
    #[error("connection closed mid-payload ({received} of {expected} bytes)")]
    TruncatedPayload { received: usize, expected: usize },
}

pub type Result<T> = std::result::Result<T, FrameError>;
