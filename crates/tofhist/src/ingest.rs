use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tofhist_frame::{DecoderConfig, FrameError, FrameReader};
use tofhist_histogram::{write_running_sum, Accumulator};
use tofhist_transport::{ConnectOptions, TcpClient};
use tracing::{info, warn};

use crate::exit::{
    frame_error, histogram_error, io_error, transport_error, CliError, CliResult, SUCCESS,
};
use crate::output::{print_frame, OutputFormat};

pub struct IngestArgs<'a> {
    pub host: &'a str,
    pub port: u16,
    pub output: &'a Path,
    pub read_timeout: Option<Duration>,
}

/// Run one ingestion pass: connect, decode frames until the stream ends,
/// merge each frame into the running sum and persist a snapshot after every
/// merge.
pub fn run(args: &IngestArgs, format: OutputFormat) -> CliResult<i32> {
    if let Some(dir) = args.output.parent() {
        if !dir.as_os_str().is_empty() {
            std::fs::create_dir_all(dir)
                .map_err(|err| io_error("failed to create output directory", err))?;
        }
    }

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let mut client = TcpClient::new();
    client
        .connect(args.host, args.port, &ConnectOptions::default())
        .map_err(|err| transport_error("connect failed", err))?;

    let config = DecoderConfig {
        read_timeout: args.read_timeout,
        ..DecoderConfig::default()
    };
    let mut reader = FrameReader::with_config_tcp(client, config)
        .map_err(|err| frame_error("reader setup failed", err))?;

    let accumulator = Accumulator::new();
    info!("waiting for data");

    while running.load(Ordering::SeqCst) {
        let frame = match reader.read_frame() {
            Ok(frame) => frame,
            Err(FrameError::ConnectionClosed) => {
                info!("stream ended");
                return Ok(SUCCESS);
            }
            Err(err) => return Err(frame_error("receive failed", err)),
        };

        print_frame(&frame, format);

        let report = accumulator
            .merge(&frame)
            .map_err(|err| histogram_error("merge failed", err))?;
        if report.saturated_bins > 0 {
            warn!(
                frame = frame.frame_number,
                bins = report.saturated_bins,
                "counters clamped at maximum"
            );
        }

        // Snapshot under the lock, write with the lock released.
        if let Some(snapshot) = accumulator.snapshot() {
            if let Err(err) = write_running_sum(args.output, &snapshot) {
                warn!(%err, path = ?args.output, "failed to persist running sum");
            }
        }
    }

    reader.get_mut().shutdown();
    info!("shutdown requested, exiting");
    Ok(SUCCESS)
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| {
        CliError::new(
            crate::exit::INTERNAL,
            format!("signal handler setup failed: {err}"),
        )
    })
}
