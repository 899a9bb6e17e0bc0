use std::io::IsTerminal;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use tofhist_frame::Frame;
use tofhist_histogram::FrameHistogram;

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct FrameOutput<'a> {
    frame_number: i64,
    bin_count: usize,
    bin_width: i64,
    bin_offset: i64,
    first_edge_sec: f64,
    last_edge_sec: f64,
    total_count: u64,
    counts: &'a [u32],
}

pub fn print_frame(frame: &Frame, format: OutputFormat) {
    let hist = FrameHistogram::from_frame(frame);
    let first_edge = hist.bin_edges().first().copied().unwrap_or_default();
    let last_edge = hist.bin_edges().last().copied().unwrap_or_default();
    let total: u64 = frame.counts.iter().map(|&c| u64::from(c)).sum();

    match format {
        OutputFormat::Json => {
            let out = FrameOutput {
                frame_number: frame.frame_number,
                bin_count: frame.bin_count(),
                bin_width: frame.bin_width,
                bin_offset: frame.bin_offset,
                first_edge_sec: first_edge,
                last_edge_sec: last_edge,
                total_count: total,
                counts: &frame.counts,
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["FRAME", "BINS", "WIDTH", "OFFSET", "TOTAL"])
                .add_row(vec![
                    frame.frame_number.to_string(),
                    frame.bin_count().to_string(),
                    frame.bin_width.to_string(),
                    frame.bin_offset.to_string(),
                    total.to_string(),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "frame={} bins={} width={} offset={} span=[{:.3e}s, {:.3e}s] total={}",
                frame.frame_number,
                frame.bin_count(),
                frame.bin_width,
                frame.bin_offset,
                first_edge,
                last_edge,
                total
            );
        }
    }
}
