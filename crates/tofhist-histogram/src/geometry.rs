//! Bin geometry: integer clock-tick parameters to physical time edges.

/// Physical duration of one digitizer TDC clock tick, in seconds.
pub const TDC_CLOCK_PERIOD_SEC: f64 = (1.5625 / 6.0) * 1e-9;

/// Compute the `bin_count + 1` physical bin edges for the given geometry.
///
/// `edges[i] = (offset + i * width) * TDC_CLOCK_PERIOD_SEC`. Pure; callers
/// reject negative bin counts before this point (`bin_count` is unsigned at
/// this boundary).
pub fn bin_edges(bin_count: usize, bin_width: i64, bin_offset: i64) -> Vec<f64> {
    (0..=bin_count)
        .map(|i| (bin_offset + i as i64 * bin_width) as f64 * TDC_CLOCK_PERIOD_SEC)
        .collect()
}
