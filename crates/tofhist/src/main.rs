mod exit;
mod ingest;
mod logging;
mod output;

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::exit::{CliError, CliResult, USAGE};
use crate::ingest::IngestArgs;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

const DEFAULT_OUTPUT: &str = "data/tof-histogram-running-sum.txt";

#[derive(Parser, Debug)]
#[command(
    name = "tofhist",
    version,
    about = "Streaming time-of-flight histogram client"
)]
struct Cli {
    /// Server hostname or IP.
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Server port.
    #[arg(long, default_value_t = 8451)]
    port: u16,

    /// Path of the persisted running-sum file.
    #[arg(long, value_name = "FILE", default_value = DEFAULT_OUTPUT)]
    output: PathBuf,

    /// Console frame reporting format.
    #[arg(long, value_name = "FORMAT")]
    format: Option<OutputFormat>,

    /// Receive timeout (e.g. 5s, 500ms). Unset blocks indefinitely.
    #[arg(long, value_name = "DURATION")]
    read_timeout: Option<String>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text")]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "info")]
    log_level: LogLevel,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let result = run(&cli, format);

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

fn run(cli: &Cli, format: OutputFormat) -> CliResult<i32> {
    let read_timeout = cli
        .read_timeout
        .as_deref()
        .map(parse_timeout)
        .transpose()?;

    ingest::run(
        &IngestArgs {
            host: &cli.host,
            port: cli.port,
            output: &cli.output,
            read_timeout,
        },
        format,
    )
}

fn parse_timeout(input: &str) -> CliResult<Duration> {
    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid timeout value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "timeout must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        "s" => Ok(Duration::from_secs(value)),
        _ => Err(CliError::new(
            USAGE,
            format!("unsupported timeout unit: {unit}"),
        )),
    }
}
