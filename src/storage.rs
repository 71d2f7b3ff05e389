use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::TrackerResult;
use crate::segmentation::Segment;

/// Completed run as handed to the persistence collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinishedSession {
    pub session_id: String,
    pub start_time: String,
    pub segment_size_m: u32,
    /// Rounded to 0.1 m
    pub distance_m: f64,
    /// Active time, pauses excluded, whole seconds
    pub total_time_s: f64,
    pub elevation_gain_m: f64,
    pub calories_kcal: f64,
    /// Total time over total distance; `None` without distance
    pub average_pace_s_per_km: Option<f64>,
    pub segments: Vec<Segment>,
}

impl FinishedSession {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Round to a number of decimal places
pub(crate) fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// Segment with time and pace trimmed to 0.1 for storage
pub(crate) fn rounded_segment(segment: &Segment) -> Segment {
    Segment {
        distance_label_m: segment.distance_label_m,
        distance_m: round_to(segment.distance_m, 1),
        elapsed_s: round_to(segment.elapsed_s, 1),
        pace_s_per_km: round_to(segment.pace_s_per_km, 1),
        partial: segment.partial,
    }
}

/// Destination for finished sessions
pub trait SessionStore {
    fn persist(&mut self, session: &FinishedSession) -> TrackerResult<()>;
}

/// Keeps sessions in memory, newest last
#[derive(Debug, Default)]
pub struct MemoryStore {
    pub sessions: Vec<FinishedSession>,
}

impl SessionStore for MemoryStore {
    fn persist(&mut self, session: &FinishedSession) -> TrackerResult<()> {
        self.sessions.push(session.clone());
        Ok(())
    }
}

/// Writes each session to `<dir>/<session_id>.json`
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl AsRef<Path>) -> TrackerResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn path_for(&self, session_id: &str) -> PathBuf {
        self.dir.join(format!("{session_id}.json"))
    }
}

impl SessionStore for JsonFileStore {
    fn persist(&mut self, session: &FinishedSession) -> TrackerResult<()> {
        let path = self.path_for(&session.session_id);
        let json = session.to_json()?;
        fs::write(&path, json)?;
        log::info!("saved {} to {}", session.session_id, path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_session() -> FinishedSession {
        FinishedSession {
            session_id: "session_1700000000000".to_string(),
            start_time: "2023-11-14T22:13:20+00:00".to_string(),
            segment_size_m: 250,
            distance_m: 612.4,
            total_time_s: 245.0,
            elevation_gain_m: 7.0,
            calories_kcal: 38.0,
            average_pace_s_per_km: Some(400.1),
            segments: vec![Segment {
                distance_label_m: 250,
                distance_m: 250.0,
                elapsed_s: 98.2,
                pace_s_per_km: 392.8,
                partial: false,
            }],
        }
    }

    #[test]
    fn test_rounding() {
        assert_eq!(round_to(12.345, 1), 12.3);
        assert_eq!(round_to(12.35, 0), 12.0);
        let seg = rounded_segment(&Segment {
            distance_label_m: 500,
            distance_m: 49.987,
            elapsed_s: 20.04,
            pace_s_per_km: 80.16,
            partial: true,
        });
        assert_eq!(seg.distance_m, 50.0);
        assert_eq!(seg.elapsed_s, 20.0);
        assert_eq!(seg.pace_s_per_km, 80.2);
    }

    #[test]
    fn test_memory_store() {
        let mut store = MemoryStore::default();
        store.persist(&sample_session()).unwrap();
        assert_eq!(store.sessions.len(), 1);
    }

    #[test]
    fn test_json_file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = JsonFileStore::new(dir.path().join("runs")).unwrap();
        let session = sample_session();
        store.persist(&session).unwrap();

        let text = fs::read_to_string(store.path_for(&session.session_id)).unwrap();
        let loaded: FinishedSession = serde_json::from_str(&text).unwrap();
        assert_eq!(loaded, session);
    }
}
