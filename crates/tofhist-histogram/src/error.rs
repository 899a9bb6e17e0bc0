/// Errors that can occur during histogram accumulation.
#[derive(Debug, thiserror::Error)]
pub enum HistogramError {
    /// A frame's bin count differs from the established running sum.
    ///
    /// Fatal to the run: the aggregate's geometry is defined once by the
    /// first frame and cannot change.
    #[error("bin count mismatch: running sum has {expected} bins, frame has {actual}")]
    BinCountMismatch { expected: usize, actual: usize },

    /// The accumulator lock was poisoned by a panicking thread.
    #[error("accumulator lock poisoned")]
    LockPoisoned,
}

pub type Result<T> = std::result::Result<T, HistogramError>;
