use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use flate2::read::GzDecoder;
use serde::{Deserialize, Serialize};

use run_tracker_rs::session::FixStatus;
use run_tracker_rs::splits::SplitSummary;
use run_tracker_rs::storage::SessionStore;
use run_tracker_rs::{
    FinishedSession, JsonFileStore, MemoryStore, RawFix, SessionController, TrackerConfig,
};

#[derive(Parser, Debug)]
#[command(about = "Replay a recorded run log through the tracker")]
struct Args {
    /// Path to a run log (.json or .json.gz)
    #[arg(long)]
    log: PathBuf,

    /// Split length in metres (overrides the log and config file)
    #[arg(long)]
    segment_size: Option<u32>,

    /// JSON file with tracker parameters
    #[arg(long)]
    config: Option<PathBuf>,

    /// Also write the finished session into this directory
    #[arg(long)]
    save_dir: Option<PathBuf>,
}

#[derive(Deserialize, Debug)]
#[serde(tag = "type", rename_all = "snake_case")]
enum LogEvent {
    Fix(RawFix),
    Pause { timestamp_ms: i64 },
    Resume { timestamp_ms: i64 },
    SensorError { timestamp_ms: i64, message: String },
}

impl LogEvent {
    fn timestamp_ms(&self) -> i64 {
        match self {
            LogEvent::Fix(fix) => fix.timestamp_ms,
            LogEvent::Pause { timestamp_ms }
            | LogEvent::Resume { timestamp_ms }
            | LogEvent::SensorError { timestamp_ms, .. } => *timestamp_ms,
        }
    }
}

#[derive(Deserialize, Debug)]
struct RunLog {
    #[serde(default)]
    segment_size_m: Option<u32>,
    /// Defaults to the first event
    #[serde(default)]
    start_ms: Option<i64>,
    /// Defaults to the last event
    #[serde(default)]
    stop_ms: Option<i64>,
    events: Vec<LogEvent>,
}

#[derive(Serialize, Debug, Default)]
struct StatusCounts {
    unusable: u32,
    warming_up: u32,
    locked: u32,
    spike_rejected: u32,
    negligible_movement: u32,
    moved: u32,
    sensor_unavailable: u32,
}

impl StatusCounts {
    fn record(&mut self, status: FixStatus) {
        let slot = match status {
            FixStatus::Unusable => &mut self.unusable,
            FixStatus::WarmingUp => &mut self.warming_up,
            FixStatus::Locked => &mut self.locked,
            FixStatus::SpikeRejected => &mut self.spike_rejected,
            FixStatus::NegligibleMovement => &mut self.negligible_movement,
            FixStatus::Moved => &mut self.moved,
            FixStatus::SensorUnavailable => &mut self.sensor_unavailable,
        };
        *slot += 1;
    }
}

#[derive(Serialize, Debug)]
struct ReplayOutput {
    session: FinishedSession,
    would_persist: bool,
    fixes: StatusCounts,
    splits: Option<SplitSummary>,
}

fn load_log(path: &Path) -> anyhow::Result<RunLog> {
    let file = File::open(path)?;
    let reader: Box<dyn Read> = if path.extension().map(|e| e == "gz").unwrap_or(false) {
        Box::new(GzDecoder::new(file))
    } else {
        Box::new(file)
    };
    Ok(serde_json::from_reader(BufReader::new(reader))?)
}

fn replay(log: &RunLog, config: TrackerConfig) -> anyhow::Result<ReplayOutput> {
    let first_ms = log.events.first().map(LogEvent::timestamp_ms).unwrap_or(0);
    let last_ms = log.events.last().map(LogEvent::timestamp_ms).unwrap_or(first_ms);
    let start_ms = log.start_ms.unwrap_or(first_ms);
    let stop_ms = log.stop_ms.unwrap_or(last_ms);

    let mut session = SessionController::new(config)?;
    let mut counts = StatusCounts::default();
    session.start(start_ms)?;

    for event in &log.events {
        match event {
            LogEvent::Fix(fix) => match session.on_fix(fix) {
                Ok(report) => counts.record(report.status()),
                Err(e) => log::debug!("fix at {} skipped: {e}", fix.timestamp_ms),
            },
            LogEvent::Pause { timestamp_ms } => {
                if let Err(e) = session.pause(*timestamp_ms) {
                    log::warn!("pause at {timestamp_ms} ignored: {e}");
                }
            }
            LogEvent::Resume { timestamp_ms } => {
                if let Err(e) = session.resume(*timestamp_ms) {
                    log::warn!("resume at {timestamp_ms} ignored: {e}");
                }
            }
            LogEvent::SensorError { message, .. } => {
                counts.record(session.report_sensor_error(message));
            }
        }
    }

    let report = session.stop(stop_ms)?;
    let splits = SplitSummary::from_segments(&report.session.segments, report.session.segment_size_m);
    Ok(ReplayOutput {
        would_persist: report.should_persist,
        session: report.session,
        fixes: counts,
        splits,
    })
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let log = load_log(&args.log).with_context(|| format!("reading {}", args.log.display()))?;

    let mut config = match &args.config {
        Some(path) => TrackerConfig::from_json_file(path)?,
        None => TrackerConfig::default(),
    };
    if let Some(size) = args.segment_size.or(log.segment_size_m) {
        config = config.with_segment_size(size);
    }

    let output = replay(&log, config)?;

    let mut store: Box<dyn SessionStore> = match &args.save_dir {
        Some(dir) => Box::new(JsonFileStore::new(dir)?),
        None => Box::new(MemoryStore::default()),
    };
    if output.would_persist {
        store.persist(&output.session)?;
    }

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
