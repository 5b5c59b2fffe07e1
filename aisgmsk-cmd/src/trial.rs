use std::{
    io::{stdin, stdout, BufReader, Write},
    ops::Range,
    path::Path,
    sync::atomic::AtomicBool,
    time::Duration,
};

use aisgmsk::harness::{run_trial, spawn_line_reader, LatencyRecord, TrialOpts};
use aisgmsk::radio::FileSink;
use aisgmsk::{Config, Encoder, Report, Transmitter};
use anyhow::{bail, Context, Result};
use tracing::{info, warn};

fn write_record(record: &LatencyRecord) {
    let mut out = stdout().lock();
    let written = serde_json::to_writer(&mut out, record)
        .map_err(std::io::Error::from)
        .and_then(|()| writeln!(out))
        .and_then(|()| out.flush());
    if let Err(err) = written {
        warn!("failed to write record: {err}");
    }
}

/// MMSIs `base`, `base + 1`, ... for `count` reports, all within the 30-bit MMSI field so
/// the echoed MMSI matches what was sent.
fn mmsi_range(base: u32, count: usize) -> Result<Range<u32>> {
    let last = u32::try_from(count.saturating_sub(1))
        .ok()
        .and_then(|n| base.checked_add(n));
    match last {
        Some(last) if last <= Report::MMSI_MAX => Ok(base..last + u32::from(count > 0)),
        _ => bail!(
            "{count} reports from MMSI {base} exceed the largest MMSI {}",
            Report::MMSI_MAX
        ),
    }
}

pub fn trial(
    config: &Config,
    output: &Path,
    count: usize,
    mmsi_base: u32,
    interval: Duration,
    linger: Duration,
) -> Result<()> {
    config.validate().context("invalid config")?;
    let mmsis = mmsi_range(mmsi_base, count)?;
    let encoder = Encoder::new(config.modem.clone()).context("invalid modem config")?;
    let sink = FileSink::create(output)
        .with_context(|| format!("failed to create output {output:?}"))?;
    let mut tx =
        Transmitter::open(Box::new(sink), &config.radio).context("failed to open radio")?;

    let reports = mmsis.map(|mmsi| Report::builder().mmsi(mmsi).build());
    let feedback = spawn_line_reader(BufReader::new(stdin()));
    let opts = TrialOpts::builder()
        .interval(interval)
        .linger(linger)
        .build();
    let stop = AtomicBool::new(false);

    info!("sending {count} reports every {interval:?}");
    let summary = run_trial(
        &encoder,
        &mut tx,
        reports,
        feedback,
        &opts,
        &stop,
        write_record,
    )
    .context("trial failed")?;
    tx.close().context("releasing radio")?;

    info!(
        "sent {} received {} loss {:.1}%",
        summary.sent,
        summary.received,
        summary.loss_percent()
    );
    Ok(())
}
