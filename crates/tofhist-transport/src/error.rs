use crate::state::ConnectionState;

/// Errors that can occur in transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to connect to the specified endpoint.
    #[error("failed to connect to {host}:{port}: {source}")]
    Connect {
        host: String,
        port: u16,
        source: std::io::Error,
    },

    /// An I/O error occurred on the connected stream.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The connection is not in a state that allows the operation.
    #[error("connection is {0}, expected {1}")]
    InvalidState(ConnectionState, ConnectionState),

    /// The peer closed the connection while an exact-count read was pending.
    #[error("peer closed connection mid-read ({received} of {expected} bytes)")]
    ClosedMidRead { received: usize, expected: usize },
}

pub type Result<T> = std::result::Result<T, TransportError>;
