use std::fmt;
use std::io;

use tofhist_frame::FrameError;
use tofhist_histogram::HistogramError;
use tofhist_transport::TransportError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::ConnectionRefused | io::ErrorKind::ConnectionReset => FAILURE,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::Connect { source, .. } | TransportError::Io(source) => {
            io_error(context, source)
        }
        other => CliError::new(TRANSPORT_ERROR, format!("{context}: {other}")),
    }
}

pub fn frame_error(context: &str, err: FrameError) -> CliError {
    match err {
        FrameError::Io(source) => io_error(context, source),
        FrameError::PayloadTooLarge { .. } => CliError::new(DATA_INVALID, format!("{context}: {err}")),
        FrameError::ConnectionClosed | FrameError::TruncatedPayload { .. } => {
            CliError::new(FAILURE, format!("{context}: {err}"))
        }
    }
}

pub fn histogram_error(context: &str, err: HistogramError) -> CliError {
    match err {
        HistogramError::BinCountMismatch { .. } => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        HistogramError::LockPoisoned => CliError::new(INTERNAL, format!("{context}: {err}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_io_errors_map_to_timeout_code() {
        let err = io_error("recv", io::Error::from(io::ErrorKind::WouldBlock));
        assert_eq!(err.code, TIMEOUT);
        let err = io_error("recv", io::Error::from(io::ErrorKind::TimedOut));
        assert_eq!(err.code, TIMEOUT);
    }

    #[test]
    fn bin_count_mismatch_maps_to_data_invalid() {
        let err = histogram_error(
            "merge failed",
            HistogramError::BinCountMismatch {
                expected: 10,
                actual: 11,
            },
        );
        assert_eq!(err.code, DATA_INVALID);
        assert!(err.message.contains("10"));
    }

    #[test]
    fn truncated_payload_maps_to_failure() {
        let err = frame_error(
            "receive failed",
            FrameError::TruncatedPayload {
                received: 3,
                expected: 8,
            },
        );
        assert_eq!(err.code, FAILURE);
    }
}
