use std::io::{ErrorKind, Read};

use bytes::BytesMut;
use tofhist_transport::TcpClient;
use tracing::{debug, warn};

use crate::codec::{DecoderConfig, Frame, FrameHeader};
use crate::error::{FrameError, Result};

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;
const READ_CHUNK_SIZE: usize = 8 * 1024;

/// Reads complete frames from any `Read` stream.
///
/// Handles partial reads internally — callers always get complete frames.
/// The sequence is lazy and non-restartable: one decode pass per connection.
pub struct FrameReader<T> {
    inner: T,
    buf: BytesMut,
    config: DecoderConfig,
}

impl<T: Read> FrameReader<T> {
    /// Create a new frame reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, DecoderConfig::default())
    }

    /// Create a new frame reader with explicit configuration.
    pub fn with_config(inner: T, config: DecoderConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
        }
    }

    /// Read the next complete frame (blocking).
    ///
    /// Malformed header lines are skipped without yielding a frame. Returns
    /// `Err(FrameError::ConnectionClosed)` on a clean EOF between frames;
    /// EOF while payload bytes are owed is `TruncatedPayload`.
    pub fn read_frame(&mut self) -> Result<Frame> {
        loop {
            while let Some(line) = self.take_line() {
                let Some(header) = FrameHeader::parse(&line) else {
                    debug!(len = line.len(), "skipping malformed header line");
                    continue;
                };

                let payload_len = header.payload_len();
                if payload_len > self.config.max_payload_size {
                    return Err(FrameError::PayloadTooLarge {
                        size: payload_len,
                        max: self.config.max_payload_size,
                    });
                }

                let payload = self.read_payload(payload_len)?;
                return Ok(Frame::from_wire(&header, payload));
            }

            // Bounded-resource guard: a buffer full of bytes with no newline
            // cannot ever produce a header. Discarding it sacrifices any
            // partially received frame.
            if self.buf.len() >= self.config.max_buffer_size {
                warn!(
                    buffered = self.buf.len(),
                    "decode buffer full without newline, resetting"
                );
                self.buf.clear();
            }

            if self.fill_buf()? == 0 {
                return Err(FrameError::ConnectionClosed);
            }
        }
    }

    /// Split off one `\n`-terminated line from the buffer, newline excluded.
    fn take_line(&mut self) -> Option<BytesMut> {
        let pos = self.buf.iter().position(|&b| b == b'\n')?;
        let mut line = self.buf.split_to(pos + 1);
        line.truncate(pos);
        Some(line)
    }

    /// Pull one chunk from the stream into the buffer. `Ok(0)` is EOF.
    fn fill_buf(&mut self) -> Result<usize> {
        let mut chunk = [0u8; READ_CHUNK_SIZE];
        loop {
            match self.inner.read(&mut chunk) {
                Ok(n) => {
                    self.buf.extend_from_slice(&chunk[..n]);
                    return Ok(n);
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
    }

    /// Assemble exactly `needed` payload bytes.
    ///
    /// Bytes already buffered after the header newline are the start of the
    /// payload; the remainder comes from an exact-count read. EOF here is
    /// fatal: the header promised the bytes.
    fn read_payload(&mut self, needed: usize) -> Result<BytesMut> {
        let have = needed.min(self.buf.len());
        let mut payload = self.buf.split_to(have);

        if payload.len() < needed {
            let mut rest = vec![0u8; needed - payload.len()];
            self.inner.read_exact(&mut rest).map_err(|err| {
                if err.kind() == ErrorKind::UnexpectedEof {
                    FrameError::TruncatedPayload {
                        received: payload.len(),
                        expected: needed,
                    }
                } else {
                    FrameError::Io(err)
                }
            })?;
            payload.extend_from_slice(&rest);
        }

        Ok(payload)
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current decoder configuration.
    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }
}

impl FrameReader<TcpClient> {
    /// Create a frame reader for a `TcpClient` and apply the configured
    /// read timeout at the connection boundary.
    pub fn with_config_tcp(inner: TcpClient, config: DecoderConfig) -> Result<Self> {
        inner
            .set_read_timeout(config.read_timeout)
            .map_err(transport_to_frame_error)?;
        Ok(Self::with_config(inner, config))
    }
}

fn transport_to_frame_error(err: tofhist_transport::TransportError) -> FrameError {
    match err {
        tofhist_transport::TransportError::Io(io) => FrameError::Io(io),
        tofhist_transport::TransportError::Connect { source, .. } => FrameError::Io(source),
        other => FrameError::Io(std::io::Error::other(other.to_string())),
    }
}
