use std::sync::Mutex;

use tofhist_frame::Frame;
use tracing::{debug, info};

use crate::error::{HistogramError, Result};
use crate::histogram::RunningSum;

/// Summary of one merge operation.
#[derive(Debug, Clone, Copy, Default)]
pub struct MergeReport {
    /// Bins clamped at `u64::MAX` during this merge. Non-fatal.
    pub saturated_bins: usize,
}

/// Owns the single running-sum histogram of a run.
///
/// `merge` and `snapshot` are serialized by one exclusive lock, held only
/// for the in-memory mutation or read, never across file I/O. Callers take
/// a snapshot, release the lock, then persist.
pub struct Accumulator {
    running_sum: Mutex<Option<RunningSum>>,
}

impl Accumulator {
    /// Create an accumulator with no running sum yet.
    pub fn new() -> Self {
        Self {
            running_sum: Mutex::new(None),
        }
    }

    /// Merge one frame into the running sum.
    ///
    /// The first frame establishes the geometry: bin count and edges are
    /// fixed from it for the rest of the run. A later frame with a different
    /// bin count fails with `BinCountMismatch` and leaves the running sum
    /// untouched.
    pub fn merge(&self, frame: &Frame) -> Result<MergeReport> {
        let mut guard = self
            .running_sum
            .lock()
            .map_err(|_| HistogramError::LockPoisoned)?;

        if let Some(sum) = guard.as_ref() {
            if sum.bin_count() != frame.bin_count() {
                return Err(HistogramError::BinCountMismatch {
                    expected: sum.bin_count(),
                    actual: frame.bin_count(),
                });
            }
        }

        let sum = guard.get_or_insert_with(|| {
            info!(
                bins = frame.bin_count(),
                bin_width = frame.bin_width,
                bin_offset = frame.bin_offset,
                "initializing running sum"
            );
            RunningSum::new(frame.bin_count(), frame.bin_width, frame.bin_offset)
        });

        let saturated_bins = sum.add_frame_counts(&frame.counts);
        debug!(frame = frame.frame_number, saturated_bins, "frame merged");
        Ok(MergeReport { saturated_bins })
    }

    /// Clone of the current running sum, taken under the lock.
    ///
    /// Internally consistent and safe to read from any thread; `None` until
    /// the first frame has been merged.
    pub fn snapshot(&self) -> Option<RunningSum> {
        self.running_sum
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or(None)
    }
}

impl Default for Accumulator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::geometry::TDC_CLOCK_PERIOD_SEC;

    fn frame(frame_number: i64, counts: &[u32]) -> Frame {
        Frame {
            frame_number,
            bin_width: 100,
            bin_offset: 0,
            counts: counts.to_vec(),
        }
    }

    #[test]
    fn first_merge_creates_running_sum() {
        let acc = Accumulator::new();
        assert!(acc.snapshot().is_none());

        acc.merge(&frame(1, &[3, 5])).unwrap();

        let sum = acc.snapshot().unwrap();
        assert_eq!(sum.bin_count(), 2);
        assert_eq!(sum.counts(), &[3, 5]);
        assert_eq!(
            sum.bin_edges(),
            &[
                0.0,
                100.0 * TDC_CLOCK_PERIOD_SEC,
                200.0 * TDC_CLOCK_PERIOD_SEC
            ]
        );
    }

    #[test]
    fn repeated_merges_accumulate() {
        let acc = Accumulator::new();
        acc.merge(&frame(1, &[3, 5])).unwrap();
        acc.merge(&frame(2, &[3, 5])).unwrap();

        assert_eq!(acc.snapshot().unwrap().counts(), &[6, 10]);
    }

    #[test]
    fn merge_is_order_insensitive() {
        let f1 = frame(1, &[1, 100, 7]);
        let f2 = frame(2, &[9, 2, 50]);

        let forward = Accumulator::new();
        forward.merge(&f1).unwrap();
        forward.merge(&f2).unwrap();

        let reverse = Accumulator::new();
        reverse.merge(&f2).unwrap();
        reverse.merge(&f1).unwrap();

        assert_eq!(
            forward.snapshot().unwrap().counts(),
            reverse.snapshot().unwrap().counts()
        );
    }

    #[test]
    fn bin_count_mismatch_leaves_running_sum_unmodified() {
        let acc = Accumulator::new();
        acc.merge(&frame(1, &[1; 10])).unwrap();
        let before = acc.snapshot().unwrap();

        let err = acc.merge(&frame(2, &[1; 11])).unwrap_err();
        assert!(matches!(
            err,
            HistogramError::BinCountMismatch {
                expected: 10,
                actual: 11
            }
        ));
        assert_eq!(acc.snapshot().unwrap(), before);
    }

    #[test]
    fn merge_reports_no_saturation_for_in_range_totals() {
        // Clamping itself is covered by the RunningSum tests; reaching it
        // through merge would need ~2^32 frames.
        let acc = Accumulator::new();
        let report = acc.merge(&frame(1, &[u32::MAX, 1])).unwrap();
        assert_eq!(report.saturated_bins, 0);

        let report = acc.merge(&frame(2, &[1, 1])).unwrap();
        assert_eq!(report.saturated_bins, 0);
        assert_eq!(
            acc.snapshot().unwrap().counts(),
            &[u64::from(u32::MAX) + 1, 2]
        );
    }

    #[test]
    fn geometry_fixed_by_first_frame() {
        let acc = Accumulator::new();
        acc.merge(&frame(1, &[0, 0])).unwrap();

        // A frame with different width/offset but the same bin count merges;
        // edges stay as established by the first frame.
        let other_geometry = Frame {
            frame_number: 2,
            bin_width: 999,
            bin_offset: 123,
            counts: vec![1, 1],
        };
        acc.merge(&other_geometry).unwrap();

        let sum = acc.snapshot().unwrap();
        assert_eq!(sum.bin_edges()[1], 100.0 * TDC_CLOCK_PERIOD_SEC);
    }

    #[test]
    fn snapshot_from_another_thread() {
        let acc = Arc::new(Accumulator::new());
        acc.merge(&frame(1, &[2, 4])).unwrap();

        let reader = {
            let acc = Arc::clone(&acc);
            std::thread::spawn(move || acc.snapshot().unwrap())
        };

        let sum = reader.join().unwrap();
        assert_eq!(sum.counts(), &[2, 4]);
    }

    #[test]
    fn concurrent_merges_serialize() {
        let acc = Arc::new(Accumulator::new());
        acc.merge(&frame(0, &[0; 8])).unwrap();

        let mut handles = Vec::new();
        for t in 0..4 {
            let acc = Arc::clone(&acc);
            handles.push(std::thread::spawn(move || {
                for i in 0..100 {
                    acc.merge(&frame(t * 100 + i, &[1; 8])).unwrap();
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(acc.snapshot().unwrap().counts(), &[400u64; 8]);
    }
}
