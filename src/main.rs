use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use std::path::PathBuf;
use tokio::sync::mpsc;
use tokio::time::{interval, sleep, Duration};

use run_tracker_rs::live_status::{current_timestamp_ms, format_clock};
use run_tracker_rs::sensors::{self, SensorEvent};
use run_tracker_rs::session::FixReport;
use run_tracker_rs::splits::SplitSummary;
use run_tracker_rs::track::TrackUpdate;
use run_tracker_rs::{JsonFileStore, SessionController, TrackerConfig};

#[derive(Parser, Debug)]
#[command(name = "run_tracker")]
#[command(about = "GPS run tracker with fixed-distance splits", long_about = None)]
struct Args {
    /// Duration in seconds (0 = until Ctrl-C)
    #[arg(value_name = "SECONDS", default_value = "0")]
    duration: u64,

    /// Split length in metres (overrides the config file)
    #[arg(long)]
    segment_size: Option<u32>,

    /// JSON file with tracker parameters
    #[arg(long)]
    config: Option<PathBuf>,

    /// Location provider passed to termux-location (gps, network, passive)
    #[arg(long, default_value = "gps")]
    provider: String,

    /// Seconds between location polls
    #[arg(long, default_value = "1")]
    poll_interval: u64,

    /// Output directory
    #[arg(long, default_value = "run_tracker_sessions")]
    output_dir: PathBuf,
}

fn ts_now() -> String {
    Local::now().format("%H:%M:%S").to_string()
}

fn log_fix(report: &FixReport) {
    match &report.update {
        TrackUpdate::Moved { displacement } => log::debug!(
            "+{:.1}m in {:.1}s, total {:.1}m ({} signal)",
            displacement.delta_m,
            displacement.dt_s,
            report.total_distance_m,
            report.signal.label()
        ),
        _ => log::debug!("fix: {:?} ({} signal)", report.status(), report.signal.label()),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => TrackerConfig::from_json_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => TrackerConfig::default(),
    };
    if let Some(size) = args.segment_size {
        config = config.with_segment_size(size);
    }

    println!("[{}] Run Tracker Starting", ts_now());
    println!("  Duration: {} seconds (0=continuous)", args.duration);
    println!("  Segment size: {} m", config.segment_size_m);
    println!("  Provider: {}", args.provider);
    println!("  Output Dir: {}", args.output_dir.display());

    let mut store = JsonFileStore::new(&args.output_dir)?;
    let mut session = SessionController::new(config)?;

    let (gps_tx, mut gps_rx) = mpsc::channel::<SensorEvent>(100);
    let _gps_handle = tokio::spawn(sensors::gps_loop(
        gps_tx,
        args.provider.clone(),
        Duration::from_secs(args.poll_interval.max(1)),
    ));

    session.start(current_timestamp_ms())?;

    let deadline = async {
        if args.duration > 0 {
            sleep(Duration::from_secs(args.duration)).await;
        } else {
            std::future::pending::<()>().await;
        }
    };
    tokio::pin!(deadline);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let status_path = args.output_dir.join("live_status.json");
    let mut status_tick = interval(Duration::from_secs(2));

    loop {
        tokio::select! {
            event = gps_rx.recv() => {
                match event {
                    Some(SensorEvent::Fix(fix)) => {
                        let report = session.on_fix(&fix)?;
                        log_fix(&report);
                        for segment in &report.completed_segments {
                            println!(
                                "[{}] {} m  {}  ({} /km)",
                                ts_now(),
                                segment.distance_label_m,
                                format_clock(segment.elapsed_s),
                                format_clock(segment.pace_s_per_km)
                            );
                        }
                    }
                    Some(SensorEvent::Unavailable(message)) => {
                        session.report_sensor_error(&message);
                    }
                    None => {
                        log::warn!("location reader stopped");
                        break;
                    }
                }
            }
            _ = status_tick.tick() => {
                let status = session.live_status(current_timestamp_ms());
                if let Err(e) = status.save(&status_path) {
                    log::warn!("could not write {}: {e}", status_path.display());
                }
            }
            _ = &mut deadline => {
                println!("[{}] Duration reached", ts_now());
                break;
            }
            _ = &mut ctrl_c => {
                println!("[{}] Interrupted", ts_now());
                break;
            }
        }
    }

    let stop_ms = current_timestamp_ms();
    let final_status = session.live_status(stop_ms);
    let report = session.stop(stop_ms)?;
    let _ = final_status.save(args.output_dir.join("live_status_final.json"));

    let saved = report.persist_into(&mut store)?;

    let finished = &report.session;
    println!("\n=== Final Stats ===");
    println!("Distance: {:.1} m", finished.distance_m);
    println!("Time: {}", format_clock(finished.total_time_s));
    if let Some(pace) = finished.average_pace_s_per_km {
        println!("Average pace: {} /km", format_clock(pace));
    }
    println!("Elevation gain: {:.0} m", finished.elevation_gain_m);
    println!("Calories: {:.0} kcal", finished.calories_kcal);
    if let Some(summary) = SplitSummary::from_segments(&finished.segments, finished.segment_size_m)
    {
        match (summary.best_pace_s_per_km, summary.worst_pace_s_per_km) {
            (Some(best), Some(worst)) => println!(
                "Splits: {} (best {} /km, worst {} /km)",
                summary.lines.len(),
                format_clock(best),
                format_clock(worst)
            ),
            _ => println!("Splits: {}", summary.lines.len()),
        }
    }
    if saved {
        println!("Saved to {}", store.path_for(&finished.session_id).display());
    }

    Ok(())
}
