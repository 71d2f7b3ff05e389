use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::gate::SignalGrade;
use crate::session::{FixStatus, SessionState};

/// Snapshot of a session for display collaborators
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct LiveStatus {
    pub timestamp_ms: i64,
    pub session_id: Option<String>,
    pub state: SessionState,
    /// Active time, pauses excluded
    pub elapsed_s: f64,
    /// Time spent in the current split
    pub segment_elapsed_s: f64,
    pub distance_m: f64,
    pub speed_kmh: Option<f64>,
    /// Rolling pace; `None` when stale or too little distance in the window
    pub live_pace_s_per_km: Option<f64>,
    pub projected_5k_s: Option<f64>,
    pub calories_kcal: f64,
    pub elevation_gain_m: f64,
    pub segments_completed: usize,
    pub signal: Option<SignalGrade>,
    pub last_status: Option<FixStatus>,
    pub track_locked: bool,
}

impl LiveStatus {
    pub fn save(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}

/// Wall clock in milliseconds since the Unix epoch
pub fn current_timestamp_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}

/// `m:ss` for a duration in seconds
pub fn format_clock(seconds: f64) -> String {
    if !seconds.is_finite() || seconds < 0.0 {
        return "--:--".to_string();
    }
    let total = seconds.round() as u64;
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;
    if hours > 0 {
        format!("{hours}:{minutes:02}:{secs:02}")
    } else {
        format!("{minutes}:{secs:02}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_clock() {
        assert_eq!(format_clock(0.0), "0:00");
        assert_eq!(format_clock(309.4), "5:09");
        assert_eq!(format_clock(3725.0), "1:02:05");
        assert_eq!(format_clock(f64::NAN), "--:--");
    }

    #[test]
    fn test_save_writes_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("live_status.json");
        let status = LiveStatus {
            timestamp_ms: 1_000,
            session_id: Some("session_0".to_string()),
            state: SessionState::Running,
            elapsed_s: 1.0,
            segment_elapsed_s: 1.0,
            distance_m: 3.0,
            speed_kmh: Some(10.8),
            live_pace_s_per_km: None,
            projected_5k_s: None,
            calories_kcal: 0.186,
            elevation_gain_m: 0.0,
            segments_completed: 0,
            signal: Some(SignalGrade::Good),
            last_status: Some(FixStatus::Moved),
            track_locked: true,
        };
        status.save(&path).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"state\": \"running\""));
        let loaded: LiveStatus = serde_json::from_str(&text).unwrap();
        assert_eq!(loaded, status);
    }
}
