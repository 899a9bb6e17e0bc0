//! Frame decoding for digitizer measurement streams.
//!
//! Each wire message is a one-line JSON header followed immediately by a raw
//! binary payload of per-bin counts:
//! - Header: UTF-8 JSON object terminated by a single `\n`, carrying
//!   `frameNumber`, `binSize`, `binWidth`, `binOffset`. Unknown fields are
//!   ignored; malformed lines are skipped.
//! - Payload: exactly `binSize` unsigned 32-bit integers in network byte
//!   order, with no delimiter after the newline.
//!
//! No partial reads, no buffer management in user code.

pub mod codec;
pub mod error;
pub mod reader;

pub use codec::{DecoderConfig, Frame, FrameHeader, DEFAULT_MAX_BUFFER, DEFAULT_MAX_PAYLOAD};
pub use error::{FrameError, Result};
pub use reader::FrameReader;
