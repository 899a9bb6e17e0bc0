//! Histogram accumulation for digitizer frame streams.
//!
//! Converts integer bin geometry into physical time edges, maintains one
//! overflow-safe 64-bit running sum across all frames of a run, and persists
//! snapshots to a text file after each merge.

pub mod accumulator;
pub mod error;
pub mod geometry;
pub mod histogram;
pub mod persist;

pub use accumulator::{Accumulator, MergeReport};
pub use error::{HistogramError, Result};
pub use geometry::{bin_edges, TDC_CLOCK_PERIOD_SEC};
pub use histogram::{FrameHistogram, RunningSum};
pub use persist::write_running_sum;
