use std::{
    fs::File,
    io::{stdout, BufReader, Write},
    path::Path,
};

use aisgmsk::{read_recovered_bits, BitOrder, DecodedFrame, Decoder};
use anyhow::{Context, Result};
use handlebars::handlebars_helper;
use serde::Serialize;
use tracing::debug;

#[derive(Debug, Clone)]
pub enum Format {
    Json,
    Text,
}

impl clap::ValueEnum for Format {
    fn value_variants<'a>() -> &'a [Self] {
        &[Self::Json, Self::Text]
    }

    fn to_possible_value(&self) -> Option<clap::builder::PossibleValue> {
        match self {
            Self::Json => Some(clap::builder::PossibleValue::new("json")),
            Self::Text => Some(clap::builder::PossibleValue::new("text")),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
struct Summary {
    filename: String,
    levels: usize,
    total_frames: usize,
    ok_frames: usize,
    frames: Vec<DecodedFrame>,
}

fn summarize(fpath: &Path, order: BitOrder, nrzi: bool) -> Result<Summary> {
    let reader = File::open(fpath).context("opening input")?;
    let levels = read_recovered_bits(BufReader::new(reader)).context("reading input")?;
    debug!("read {} levels from {fpath:?}", levels.len());

    let mut decoder = Decoder::new().with_bit_order(order);
    if !nrzi {
        decoder = decoder.without_nrzi();
    }
    let frames = decoder.decode(&levels);

    Ok(Summary {
        filename: fpath.to_string_lossy().to_string(),
        levels: levels.len(),
        total_frames: frames.len(),
        ok_frames: frames.iter().filter(|f| f.ok).count(),
        frames,
    })
}

pub fn decode(fpath: &Path, format: &Format, order: BitOrder, nrzi: bool) -> Result<()> {
    let summary = summarize(fpath, order, nrzi)?;

    match format {
        Format::Json => {
            serde_json::to_writer_pretty(stdout(), &summary).context("serializing to json")
        }
        Format::Text => {
            let data = render_text(&summary).context("serializing summary")?;
            stdout()
                .write_all(str::as_bytes(&data))
                .context("writing to stdout")
        }
    }
}

fn render_text(summary: &Summary) -> Result<String> {
    handlebars_helper!(left_pad: |num: u64, v: Json| {
        let v = match v {
            serde_json::Value::String(s) => s.to_owned(),
            serde_json::Value::Null => "-".to_string(),
            _ => v.to_string()
        };
        let num = usize::try_from(num).unwrap_or(0).max(v.len());
        format!("{v:>num$}")
    });
    let mut hb = handlebars::Handlebars::new();
    hb.register_escape_fn(handlebars::no_escape);
    hb.register_helper("lpad", Box::new(left_pad));
    hb.register_template_string("decode", TEXT_TEMPLATE)
        .context("registering template")?;

    hb.render("decode", &summary).context("rendering text")
}

const TEXT_TEMPLATE: &str = r"{{ filename }}
===============================================================================================
Levels:   {{ levels }}
Frames:   {{ total_frames }}
Ok:       {{ ok_frames }}
-----------------------------------------------------------------------------------------------
  #   Ok  Type       MMSI   Longitude   Latitude  Speed  Course  Heading  Data
-----------------------------------------------------------------------------------------------
{{ #each frames }}{{ lpad 3 @index }}  {{ #if ok }}yes{{ else }} no{{ /if }}  {{ lpad 4 report.message_type }}  {{ lpad 9 report.mmsi }}  {{ lpad 10 report.longitude }}  {{ lpad 9 report.latitude }}  {{ lpad 5 report.speed }}  {{ lpad 6 report.course }}  {{ lpad 7 report.heading }}  {{ data }}
{{/each }}
";
