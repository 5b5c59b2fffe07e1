//! Over the air trial loop.
//!
//! A producer thread encodes and transmits reports at a fixed interval, remembering each MMSI
//! in a pending table. A consumer thread watches a feedback stream, usually the console of the
//! receiver under test, for `MMSI:<digits>` lines and matches them against the table to measure
//! latency. Whatever is still pending at the end counts as lost.
use std::collections::HashMap;
use std::io::BufRead;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, OnceLock};
use std::thread;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use crossbeam::channel::{self, Receiver, RecvTimeoutError};
use regex::Regex;
use serde::Serialize;
use tracing::{debug, info, warn};
use typed_builder::TypedBuilder;

use crate::encoder::Encoder;
use crate::prelude::*;
use crate::radio::Transmitter;
use crate::{nmea, Report};

/// Result of polling a [FeedbackSource].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Poll {
    Line(String),
    Timeout,
    /// The source will never produce another line.
    Closed,
}

/// Text lines reported by the receiver under test.
pub trait FeedbackSource: Send {
    fn poll(&mut self, timeout: Duration) -> Poll;
}

impl FeedbackSource for Receiver<String> {
    fn poll(&mut self, timeout: Duration) -> Poll {
        match self.recv_timeout(timeout) {
            Ok(line) => Poll::Line(line),
            Err(RecvTimeoutError::Timeout) => Poll::Timeout,
            Err(RecvTimeoutError::Disconnected) => Poll::Closed,
        }
    }
}

/// Read lines from `reader` on a background thread. The channel disconnects at end of input or
/// on a read error.
pub fn spawn_line_reader<R: BufRead + Send + 'static>(reader: R) -> Receiver<String> {
    let (tx, rx) = channel::unbounded();
    thread::spawn(move || {
        for line in reader.lines() {
            let Ok(line) = line else {
                warn!("feedback read failed, closing");
                break;
            };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

/// Extract the MMSI from a receiver console line such as `RX MMSI: 123456789`.
#[must_use]
pub fn parse_mmsi(line: &str) -> Option<u32> {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let re = PATTERN.get_or_init(|| Regex::new(r"MMSI:\s*(\d+)").expect("valid mmsi pattern"));
    re.captures(line)?.get(1)?.as_str().parse().ok()
}

#[derive(Debug, Clone)]
struct Pending {
    sent: Instant,
    wall: DateTime<Utc>,
    nmea: String,
}

/// Reports transmitted and not yet seen by the receiver, keyed by MMSI.
#[derive(Debug, Default)]
pub struct PendingTable {
    inner: Mutex<HashMap<u32, Pending>>,
}

impl PendingTable {
    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<u32, Pending>> {
        // a panicking holder cannot leave the map half updated
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn insert(&self, mmsi: u32, nmea: String) {
        let prev = self.lock().insert(
            mmsi,
            Pending {
                sent: Instant::now(),
                wall: Utc::now(),
                nmea,
            },
        );
        if prev.is_some() {
            debug!(mmsi, "mmsi re-sent before it was received");
        }
    }

    fn take(&self, mmsi: u32) -> Option<Pending> {
        self.lock().remove(&mmsi)
    }

    fn drain(&self) -> Vec<(u32, Pending)> {
        let mut items: Vec<_> = self.lock().drain().collect();
        items.sort_by_key(|(_, p)| p.sent);
        items
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Received,
    Lost,
}

/// One row of trial output.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct LatencyRecord {
    pub timestamp: DateTime<Utc>,
    pub mmsi: u32,
    pub status: Status,
    /// Seconds from transmit to feedback.
    pub latency: Option<f64>,
    /// Sentence describing what was sent.
    pub sent: String,
    /// Feedback line that matched.
    pub received: Option<String>,
}

#[derive(Debug, Clone, TypedBuilder)]
pub struct TrialOpts {
    /// Pause between transmissions.
    #[builder(default = Duration::from_secs(4))]
    pub interval: Duration,
    /// Longest single wait on the feedback source.
    #[builder(default = Duration::from_millis(100))]
    pub poll_timeout: Duration,
    /// How long to keep listening after the last transmission.
    #[builder(default = Duration::from_secs(10))]
    pub linger: Duration,
}

impl Default for TrialOpts {
    fn default() -> Self {
        Self::builder().build()
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct TrialSummary {
    pub sent: usize,
    pub received: usize,
    pub records: Vec<LatencyRecord>,
}

impl TrialSummary {
    #[must_use]
    pub fn lost(&self) -> usize {
        self.sent.saturating_sub(self.received)
    }

    /// Percentage of sent reports never received.
    #[must_use]
    pub fn loss_percent(&self) -> f64 {
        if self.sent == 0 {
            return 0.0;
        }
        100.0 * (1.0 - self.received as f64 / self.sent as f64)
    }
}

/// Sleep for `dur`, waking early if `stop` is set.
fn sleep_unless_stopped(dur: Duration, stop: &AtomicBool) {
    let deadline = Instant::now() + dur;
    while !stop.load(Ordering::Acquire) {
        let now = Instant::now();
        if now >= deadline {
            break;
        }
        thread::sleep((deadline - now).min(Duration::from_millis(50)));
    }
}

fn produce<I>(
    encoder: &Encoder,
    tx: &mut Transmitter,
    reports: I,
    table: &PendingTable,
    opts: &TrialOpts,
    stop: &AtomicBool,
) -> Result<usize>
where
    I: Iterator<Item = Report>,
{
    let mut sent = 0;
    for report in reports {
        if stop.load(Ordering::Acquire) {
            break;
        }
        if sent > 0 {
            sleep_unless_stopped(opts.interval, stop);
            if stop.load(Ordering::Acquire) {
                break;
            }
        }

        let samples = encoder.waveform(&report).to_cs16();
        table.insert(report.mmsi, nmea::report_sentence(&report));
        if let Err(err) = tx.send(&samples) {
            table.take(report.mmsi);
            return Err(err);
        }
        sent += 1;
        info!(count = sent, mmsi = report.mmsi, "sent");
    }
    Ok(sent)
}

fn consume<F: FeedbackSource>(
    mut feedback: F,
    table: &PendingTable,
    records: &channel::Sender<LatencyRecord>,
    opts: &TrialOpts,
    stop: &AtomicBool,
) {
    let mut stopped_at: Option<Instant> = None;
    loop {
        match feedback.poll(opts.poll_timeout) {
            Poll::Line(line) => {
                if let Some((mmsi, pending)) =
                    parse_mmsi(&line).and_then(|m| table.take(m).map(|p| (m, p)))
                {
                    let latency = pending.sent.elapsed().as_secs_f64();
                    info!(mmsi, latency, "received");
                    let record = LatencyRecord {
                        timestamp: Utc::now(),
                        mmsi,
                        status: Status::Received,
                        latency: Some(latency),
                        sent: pending.nmea,
                        received: Some(line),
                    };
                    if records.send(record).is_err() {
                        break;
                    }
                }
            }
            Poll::Timeout => {}
            Poll::Closed => {
                debug!("feedback closed");
                break;
            }
        }

        if stop.load(Ordering::Acquire) {
            if table.is_empty() {
                break;
            }
            let since = *stopped_at.get_or_insert_with(Instant::now);
            if since.elapsed() >= opts.linger {
                debug!(pending = table.len(), "giving up on pending reports");
                break;
            }
        }
    }
}

/// Transmit every report from `reports` and match receiver feedback against them.
///
/// `on_record` is called on the calling thread for each record as it is produced. Setting
/// `stop` ends the trial early; it is also set once the producer is done.
///
/// # Errors
/// The first transmit error. The trial stops when one occurs.
pub fn run_trial<I, F, C>(
    encoder: &Encoder,
    tx: &mut Transmitter,
    reports: I,
    feedback: F,
    opts: &TrialOpts,
    stop: &AtomicBool,
    mut on_record: C,
) -> Result<TrialSummary>
where
    I: IntoIterator<Item = Report>,
    I::IntoIter: Send,
    F: FeedbackSource,
    C: FnMut(&LatencyRecord),
{
    let table = PendingTable::default();
    let (records_tx, records_rx) = channel::unbounded();
    let mut records = Vec::default();
    let reports = reports.into_iter();

    let sent = thread::scope(|s| {
        let table = &table;
        let producer = s.spawn(move || {
            let result = produce(encoder, tx, reports, table, opts, stop);
            stop.store(true, Ordering::Release);
            result
        });
        s.spawn(move || consume(feedback, table, &records_tx, opts, stop));

        for record in &records_rx {
            on_record(&record);
            records.push(record);
        }

        match producer.join() {
            Ok(result) => result,
            Err(_) => Err(Error::Radio("producer panicked".to_string())),
        }
    })?;

    for (mmsi, pending) in table.drain() {
        let record = LatencyRecord {
            timestamp: pending.wall,
            mmsi,
            status: Status::Lost,
            latency: None,
            sent: pending.nmea,
            received: None,
        };
        on_record(&record);
        records.push(record);
    }

    let received = records
        .iter()
        .filter(|r| r.status == Status::Received)
        .count();
    let summary = TrialSummary {
        sent,
        received,
        records,
    };
    info!(
        sent = summary.sent,
        received = summary.received,
        loss_percent = summary.loss_percent(),
        "trial complete"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use test_case::test_case;

    use super::*;
    use crate::radio::{MemorySink, RadioConfig};
    use crate::ModemConfig;

    /// Acknowledges transmitted buffers by position, like a receiver that hears them.
    struct Loopback {
        sink: Arc<Mutex<MemorySink>>,
        mmsis: Vec<u32>,
        seen: usize,
        drop_every: Option<usize>,
    }

    impl FeedbackSource for Loopback {
        fn poll(&mut self, timeout: Duration) -> Poll {
            let available = self.sink.lock().unwrap().buffers.len();
            if self.seen >= available {
                thread::sleep(timeout.min(Duration::from_millis(5)));
                return Poll::Timeout;
            }
            let idx = self.seen;
            self.seen += 1;
            if self.drop_every.is_some_and(|n| idx % n == n - 1) {
                return Poll::Line("noise".to_string());
            }
            Poll::Line(format!("RX MMSI: {}", self.mmsis[idx]))
        }
    }

    fn setup() -> (Encoder, Arc<Mutex<MemorySink>>, Transmitter) {
        let encoder = Encoder::new(
            ModemConfig::builder()
                .sample_rate(9600.0 * 2.0)
                .preamble_length(8)
                .build(),
        )
        .unwrap();
        let sink = Arc::new(Mutex::new(MemorySink::new()));
        let tx = Transmitter::open(Box::new(sink.clone()), &RadioConfig::default()).unwrap();
        (encoder, sink, tx)
    }

    fn opts() -> TrialOpts {
        TrialOpts::builder()
            .interval(Duration::from_millis(1))
            .poll_timeout(Duration::from_millis(5))
            .linger(Duration::from_millis(50))
            .build()
    }

    fn reports(mmsis: &[u32]) -> Vec<Report> {
        mmsis.iter().map(|m| Report::builder().mmsi(*m).build()).collect()
    }

    #[test_case("MMSI: 123456789", Some(123_456_789))]
    #[test_case("[rx] MMSI:42 ok", Some(42))]
    #[test_case("MMSI 42", None)]
    #[test_case("MMSI: 99999999999", None; "overflow")]
    fn mmsi_lines(line: &str, expected: Option<u32>) {
        assert_eq!(parse_mmsi(line), expected);
    }

    #[test]
    fn all_received() {
        let (encoder, sink, mut tx) = setup();
        let mmsis = vec![200_000_001, 200_000_002, 200_000_003];
        let feedback = Loopback {
            sink: sink.clone(),
            mmsis: mmsis.clone(),
            seen: 0,
            drop_every: None,
        };
        let stop = AtomicBool::new(false);
        let mut seen = 0;
        let summary = run_trial(
            &encoder,
            &mut tx,
            reports(&mmsis),
            feedback,
            &opts(),
            &stop,
            |_| seen += 1,
        )
        .unwrap();

        assert_eq!(summary.sent, 3);
        assert_eq!(summary.received, 3);
        assert_eq!(summary.loss_percent(), 0.0);
        assert_eq!(seen, 3);
        let mut got: Vec<u32> = summary.records.iter().map(|r| r.mmsi).collect();
        got.sort_unstable();
        assert_eq!(got, mmsis);
        for record in &summary.records {
            assert!(record.latency.unwrap() >= 0.0);
            assert!(record.sent.starts_with("!AIVDM,1,1,,A,"));
        }
        assert!(stop.load(Ordering::Acquire));
    }

    #[test]
    fn unacknowledged_reports_are_lost() {
        let (encoder, sink, mut tx) = setup();
        let mmsis = vec![1, 2, 3, 4];
        let feedback = Loopback {
            sink: sink.clone(),
            mmsis: mmsis.clone(),
            seen: 0,
            drop_every: Some(2),
        };
        let stop = AtomicBool::new(false);
        let summary = run_trial(
            &encoder,
            &mut tx,
            reports(&mmsis),
            feedback,
            &opts(),
            &stop,
            |_| {},
        )
        .unwrap();

        assert_eq!(summary.sent, 4);
        assert_eq!(summary.received, 2);
        assert_eq!(summary.lost(), 2);
        assert_eq!(summary.loss_percent(), 50.0);
        let lost: Vec<u32> = summary
            .records
            .iter()
            .filter(|r| r.status == Status::Lost)
            .map(|r| r.mmsi)
            .collect();
        assert_eq!(lost, vec![2, 4]);
    }

    #[test]
    fn stop_before_start() {
        let (encoder, _sink, mut tx) = setup();
        let (_lines_tx, lines_rx) = channel::unbounded::<String>();
        let stop = AtomicBool::new(true);
        let summary = run_trial(
            &encoder,
            &mut tx,
            reports(&[1, 2]),
            lines_rx,
            &opts(),
            &stop,
            |_| {},
        )
        .unwrap();
        assert_eq!(summary.sent, 0);
        assert!(summary.records.is_empty());
    }

    #[test]
    fn line_reader_closes_at_eof() {
        let mut rx = spawn_line_reader(std::io::Cursor::new("a\nMMSI: 5\n"));
        assert_eq!(rx.poll(Duration::from_secs(1)), Poll::Line("a".to_string()));
        assert_eq!(
            rx.poll(Duration::from_secs(1)),
            Poll::Line("MMSI: 5".to_string())
        );
        assert_eq!(rx.poll(Duration::from_secs(1)), Poll::Closed);
    }

    #[test]
    fn record_json() {
        let record = LatencyRecord {
            timestamp: DateTime::parse_from_rfc3339("2024-05-01T12:00:00Z")
                .unwrap()
                .with_timezone(&Utc),
            mmsi: 7,
            status: Status::Lost,
            latency: None,
            sent: "!AIVDM".to_string(),
            received: None,
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["status"], "lost");
        assert_eq!(json["timestamp"], "2024-05-01T12:00:00Z");
        assert!(json["latency"].is_null());
    }
}
