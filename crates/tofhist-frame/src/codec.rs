use bytes::{Buf, BytesMut};
use serde::Deserialize;

/// Maximum decode buffer size before forced resynchronization: 32 KiB.
pub const DEFAULT_MAX_BUFFER: usize = 32 * 1024;

/// Default maximum payload size: 16 MiB.
pub const DEFAULT_MAX_PAYLOAD: usize = 16 * 1024 * 1024;

/// One decoded measurement frame.
///
/// Immutable once decoded; produced exactly once per successfully parsed
/// wire message. `counts` is already in host byte order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Sender-assigned frame number (informational, not required unique).
    pub frame_number: i64,
    /// Bin width in digitizer clock ticks.
    pub bin_width: i64,
    /// Offset of the first bin in digitizer clock ticks.
    pub bin_offset: i64,
    /// Per-bin counts, one entry per bin.
    pub counts: Vec<u32>,
}

impl Frame {
    /// Number of histogram bins in this frame.
    pub fn bin_count(&self) -> usize {
        self.counts.len()
    }

    /// Assemble a frame from a parsed header and its network-order payload.
    ///
    /// `payload` must hold exactly `header.payload_len()` bytes.
    pub fn from_wire(header: &FrameHeader, mut payload: BytesMut) -> Self {
        debug_assert_eq!(payload.len(), header.payload_len());
        let bin_count = header.bin_size as usize;
        let mut counts = Vec::with_capacity(bin_count);
        for _ in 0..bin_count {
            counts.push(payload.get_u32());
        }
        Self {
            frame_number: header.frame_number,
            bin_width: header.bin_width,
            bin_offset: header.bin_offset,
            counts,
        }
    }
}

/// Wire header for one frame.
///
/// All four fields are mandatory; any additional fields on the line are
/// ignored.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameHeader {
    pub frame_number: i64,
    pub bin_size: i64,
    pub bin_width: i64,
    pub bin_offset: i64,
}

impl FrameHeader {
    /// Parse one header line (newline already stripped).
    ///
    /// Returns `None` for anything that is not a well-formed header: a line
    /// that is not JSON, is missing a mandatory field, or carries a negative
    /// bin count. Such lines are skipped by the reader and yield no frame.
    pub fn parse(line: &[u8]) -> Option<Self> {
        let header: FrameHeader = serde_json::from_slice(line).ok()?;
        if header.bin_size < 0 {
            return None;
        }
        Some(header)
    }

    /// Payload length implied by the header, in bytes.
    ///
    /// Saturates on absurd bin counts; the reader's payload cap rejects the
    /// frame before any allocation happens.
    pub fn payload_len(&self) -> usize {
        usize::try_from(self.bin_size)
            .unwrap_or(usize::MAX)
            .saturating_mul(4)
    }
}

/// Configuration for the frame decoder.
#[derive(Debug, Clone)]
pub struct DecoderConfig {
    /// Maximum buffered bytes while scanning for a header newline.
    /// Reaching this without a newline discards the buffer and restarts
    /// scanning. Default: 32 KiB.
    pub max_buffer_size: usize,
    /// Maximum payload size implied by a header. Default: 16 MiB.
    pub max_payload_size: usize,
    /// Read timeout for blocking receives.
    pub read_timeout: Option<std::time::Duration>,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            max_buffer_size: DEFAULT_MAX_BUFFER,
            max_payload_size: DEFAULT_MAX_PAYLOAD,
            read_timeout: None,
        }
    }
}
