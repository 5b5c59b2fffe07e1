mod decode;
mod encode;
mod trial;

use std::io::stderr;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use aisgmsk::{BitOrder, Config};

#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Decode frames from a recovered-bit capture.
    ///
    /// The capture holds one byte per hard-sliced line level; any non-zero byte is a 1.
    Decode {
        /// Recovered-bit capture file
        input: PathBuf,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: decode::Format,

        /// Report fields were packed least significant bit first.
        #[arg(long, action)]
        lsb_first: bool,

        /// Input holds logical bits rather than NRZI line levels.
        #[arg(long, action)]
        no_nrzi: bool,
    },
    /// Encode a position report into a transmit buffer.
    Encode {
        #[command(flatten)]
        report: encode::ReportArgs,

        /// JSON modem and radio config. Missing values take their defaults.
        #[arg(short, long, value_name = "path")]
        config: Option<PathBuf>,

        /// Write NRZI line levels in recovered-bit format instead of cs16 samples.
        #[arg(long, action)]
        bits: bool,

        /// Delete output file if it already exists
        #[arg(long, action)]
        clobber: bool,

        /// Output file path.
        #[arg(short, long, value_name = "path")]
        output: PathBuf,
    },
    /// Run a transmit and feedback trial against a receiver.
    ///
    /// Every transmit buffer is written to --output as cs16 samples. Receiver console lines
    /// are read from stdin; lines containing MMSI:<digits> acknowledge a report. One JSON
    /// record per report is written to stdout.
    Trial {
        /// Number of reports to send.
        #[arg(short = 'n', long, default_value_t = 50)]
        count: usize,

        /// Milliseconds between reports.
        #[arg(short, long, default_value_t = 4000)]
        interval_ms: u64,

        /// MMSI of the first report; each following report increments it.
        #[arg(short, long, default_value_t = 200_000_000)]
        mmsi_base: u32,

        /// Seconds to wait for outstanding acknowledgements after the last report.
        #[arg(long, default_value_t = 10)]
        linger: u64,

        /// JSON modem and radio config. Missing values take their defaults.
        #[arg(short, long, value_name = "path")]
        config: Option<PathBuf>,

        /// Delete output file if it already exists
        #[arg(long, action)]
        clobber: bool,

        /// Output file path.
        #[arg(short, long, value_name = "path")]
        output: PathBuf,
    },
}

fn load_config(path: Option<&PathBuf>) -> Result<Config> {
    match path {
        Some(path) => {
            Config::from_path(path).with_context(|| format!("failed to load config {path:?}"))
        }
        None => Ok(Config::default()),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_target(false)
        .with_writer(stderr)
        .with_ansi(false)
        .without_time()
        .with_env_filter(
            EnvFilter::try_from_env("AISGMSK_LOG").unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    debug!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));

    match &cli.command {
        Commands::Decode {
            input,
            format,
            lsb_first,
            no_nrzi,
        } => {
            let order = if *lsb_first {
                BitOrder::LsbFirst
            } else {
                BitOrder::MsbFirst
            };
            decode::decode(input, format, order, !no_nrzi)
        }
        Commands::Encode {
            report,
            config,
            bits,
            clobber,
            output,
        } => {
            if !clobber && output.exists() {
                bail!("{output:?} exists; use --clobber");
            }
            let config = load_config(config.as_ref())?;
            encode::encode(&report.to_report(), &config, *bits, output)
        }
        Commands::Trial {
            count,
            interval_ms,
            mmsi_base,
            linger,
            config,
            clobber,
            output,
        } => {
            if !clobber && output.exists() {
                bail!("{output:?} exists; use --clobber");
            }
            let config = load_config(config.as_ref())?;
            trial::trial(
                &config,
                output,
                *count,
                *mmsi_base,
                std::time::Duration::from_millis(*interval_ms),
                std::time::Duration::from_secs(*linger),
            )
        }
    }
}
