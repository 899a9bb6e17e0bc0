use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use tracing::debug;

use crate::histogram::RunningSum;

/// Serialize a running-sum snapshot, fully overwriting `path`.
///
/// Text layout: a `#` comment header carrying the bin count, then one
/// `lower_edge<TAB>count` line per bin, then the final upper edge on its own
/// line. Edges use C-style `%.9e` scientific notation. No atomic rename; a
/// concurrent reader may observe a torn write.
pub fn write_running_sum(path: impl AsRef<Path>, sum: &RunningSum) -> std::io::Result<()> {
    let path = path.as_ref();
    let mut out = BufWriter::new(File::create(path)?);

    writeln!(out, "# Time of Flight Histogram Data")?;
    writeln!(out, "# Bins: {}", sum.bin_count())?;
    writeln!(out, "#")?;

    let edges = sum.bin_edges();
    for (edge, count) in edges.iter().zip(sum.counts()) {
        writeln!(out, "{}\t{count}", format_edge(*edge))?;
    }
    if let Some(upper) = edges.last() {
        writeln!(out, "{}", format_edge(*upper))?;
    }

    out.flush()?;
    debug!(?path, bins = sum.bin_count(), "running sum persisted");
    Ok(())
}

/// Format a bin edge like C's `%.9e`: nine fractional digits and a signed,
/// two-digit exponent. Rust's `{:e}` leaves the exponent unpadded and drops
/// the `+` sign.
fn format_edge(value: f64) -> String {
    let s = format!("{value:.9e}");
    let (mantissa, exp) = s.split_once('e').unwrap_or((s.as_str(), "0"));
    let (sign, digits) = match exp.strip_prefix('-') {
        Some(digits) => ('-', digits),
        None => ('+', exp),
    };
    format!("{mantissa}e{sign}{digits:0>2}")
}
