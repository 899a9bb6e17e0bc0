//! Blocking TCP client transport.
//!
//! Supplies bytes on demand from one connected stream. This is the lowest
//! layer of tofhist; the frame decoder builds on the [`TcpClient`] type
//! provided here. One connection per run: every edge out of the streaming
//! state is terminal and there is no reconnect transition.

pub mod error;
pub mod state;
pub mod tcp;

pub use error::{Result, TransportError};
pub use state::ConnectionState;
pub use tcp::{ConnectOptions, TcpClient, DEFAULT_RECV_BUFFER};
