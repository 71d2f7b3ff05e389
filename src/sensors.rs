use serde::Deserialize;
use tokio::process::Command;
use tokio::sync::mpsc::Sender;
use tokio::time::{interval, Duration};

use crate::error::{TrackerError, TrackerResult};
use crate::fix::RawFix;
use crate::live_status::current_timestamp_ms;

/// What the location reader hands to the session loop
#[derive(Clone, Debug, PartialEq)]
pub enum SensorEvent {
    Fix(RawFix),
    Unavailable(String),
}

/// Subset of the `termux-location` JSON output
#[derive(Deserialize)]
struct TermuxLocation {
    latitude: f64,
    longitude: f64,
    accuracy: f64,
    #[serde(default)]
    altitude: Option<f64>,
}

/// Parse one `termux-location` reading, stamped with `timestamp_ms`
pub fn parse_termux_location(output: &str, timestamp_ms: i64) -> Option<RawFix> {
    let location: TermuxLocation = serde_json::from_str(output.trim()).ok()?;
    if !location.latitude.is_finite() || !location.longitude.is_finite() {
        return None;
    }
    Some(RawFix {
        latitude: location.latitude,
        longitude: location.longitude,
        accuracy: location.accuracy,
        // Termux reports 0.0 when the provider has no altitude
        altitude: location.altitude.filter(|a| *a != 0.0),
        timestamp_ms,
    })
}

async fn read_gps(provider: &str) -> TrackerResult<RawFix> {
    let output = Command::new("termux-location")
        .arg("-p")
        .arg(provider)
        .arg("-r")
        .arg("once")
        .output()
        .await
        .map_err(|e| TrackerError::SensorFailed(format!("termux-location failed to start: {e}")))?;

    if !output.status.success() {
        return Err(TrackerError::SensorFailed(format!(
            "termux-location exited with {}",
            output.status
        )));
    }
    let text = String::from_utf8_lossy(&output.stdout);
    parse_termux_location(&text, current_timestamp_ms())
        .ok_or_else(|| {
            TrackerError::SensorFailed(format!("unreadable location output: {}", text.trim()))
        })
}

/// Poll the location provider every `period` until the receiver goes away
pub async fn gps_loop(tx: Sender<SensorEvent>, provider: String, period: Duration) {
    let mut interval = interval(period);
    let mut fix_count = 0u64;

    loop {
        interval.tick().await;

        let event = match read_gps(&provider).await {
            Ok(fix) => {
                fix_count += 1;
                log::debug!("[gps] fix #{fix_count} ±{:.1}m", fix.accuracy);
                SensorEvent::Fix(fix)
            }
            Err(e) => SensorEvent::Unavailable(e.to_string()),
        };

        match tx.try_send(event) {
            Ok(_) => {}
            Err(tokio::sync::mpsc::error::TrySendError::Closed(_)) => {
                log::info!("[gps] channel closed after {fix_count} fixes");
                break;
            }
            Err(tokio::sync::mpsc::error::TrySendError::Full(_)) => {
                // Channel full, drop this reading
            }
        }
    }
}
