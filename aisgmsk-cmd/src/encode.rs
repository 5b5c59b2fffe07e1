use std::{fs::File, io::BufWriter, io::Write, path::Path};

use aisgmsk::bits::to_recovered_bytes;
use aisgmsk::report::{course_from_degrees, position_from_degrees, speed_from_knots};
use aisgmsk::{Config, Encoder, Report};
use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

/// Position report fields. Anything not given is zero.
#[derive(Args, Debug, Clone)]
pub struct ReportArgs {
    /// Maritime mobile service identity.
    #[arg(short, long)]
    pub mmsi: u32,

    /// Message type, 1, 2 or 3.
    #[arg(long, default_value_t = 1)]
    pub message_type: u8,

    /// Navigation status code.
    #[arg(long, default_value_t = 0)]
    pub status: u8,

    /// Latitude in decimal degrees.
    #[arg(long, allow_hyphen_values = true)]
    pub lat: Option<f64>,

    /// Longitude in decimal degrees.
    #[arg(long, allow_hyphen_values = true)]
    pub lon: Option<f64>,

    /// Speed over ground in knots.
    #[arg(long)]
    pub sog: Option<f64>,

    /// Course over ground in degrees.
    #[arg(long)]
    pub cog: Option<f64>,

    /// True heading in degrees, 511 if not available.
    #[arg(long)]
    pub heading: Option<u16>,

    /// UTC second of the report.
    #[arg(long)]
    pub timestamp: Option<u8>,
}

impl ReportArgs {
    pub fn to_report(&self) -> Report {
        Report::builder()
            .mmsi(self.mmsi)
            .message_type(self.message_type)
            .status(self.status)
            .latitude(self.lat.map(position_from_degrees).unwrap_or_default())
            .longitude(self.lon.map(position_from_degrees).unwrap_or_default())
            .speed(self.sog.map(speed_from_knots).unwrap_or_default())
            .course(self.cog.map(course_from_degrees).unwrap_or_default())
            .heading(self.heading.unwrap_or_default())
            .timestamp(self.timestamp.unwrap_or_default())
            .build()
    }
}

pub fn encode(report: &Report, config: &Config, bits: bool, output: &Path) -> Result<()> {
    let encoder = Encoder::new(config.modem.clone()).context("invalid modem config")?;
    let data = if bits {
        to_recovered_bytes(&encoder.levels(report))
    } else {
        let waveform = encoder.waveform(report);
        info!(
            samples = waveform.len(),
            seconds = waveform.duration(),
            "encoded burst"
        );
        waveform.to_cs16_bytes()
    };

    let file =
        File::create(output).with_context(|| format!("failed to create output {output:?}"))?;
    let mut writer = BufWriter::new(file);
    writer.write_all(&data).context("writing output")?;
    writer.flush().context("writing output")?;
    info!("wrote {} bytes to {output:?}", data.len());
    Ok(())
}
