use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{TrackerError, TrackerResult};

/// Fixes with a worse horizontal accuracy than this are discarded outright (m)
pub const MAX_ACCURACY_M: f64 = 50.0;
/// Accuracy required before the first fix may anchor the track (m)
pub const GPS_WARMUP_ACC_M: f64 = 20.0;
/// Minimum filtered movement before distance is accumulated (m)
pub const MIN_DELTA_M: f64 = 2.0;
/// Implied speeds above this are treated as GPS jumps (m/s, ~36 km/h)
pub const MAX_SPEED_MPS: f64 = 10.0;
/// Expected positional drift per update cycle (deg²)
pub const PROCESS_NOISE: f64 = 5e-9;
/// Converts squared accuracy in metres to squared degrees
pub const MEASUREMENT_VARIANCE_SCALE: f64 = 1e-10;
pub const DEFAULT_SEGMENT_SIZE_M: u32 = 250;

/// Tunable parameters for the tracking pipeline.
///
/// Every field has a default, so a config file only needs the keys it overrides.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TrackerConfig {
    /// Split length (m); segment labels are multiples of this
    pub segment_size_m: u32,
    pub max_accuracy_m: f64,
    pub warmup_accuracy_m: f64,
    pub min_delta_m: f64,
    pub max_speed_mps: f64,
    pub process_noise: f64,
    pub measurement_variance_scale: f64,
    /// Sessions shorter than this are reported but never persisted
    pub min_persist_duration_s: f64,
    /// Number of accepted displacements in the rolling pace window
    pub live_pace_window: usize,
    /// Live pace goes stale when no fix has been accepted for this long
    pub pace_stale_after_ms: i64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            segment_size_m: DEFAULT_SEGMENT_SIZE_M,
            max_accuracy_m: MAX_ACCURACY_M,
            warmup_accuracy_m: GPS_WARMUP_ACC_M,
            min_delta_m: MIN_DELTA_M,
            max_speed_mps: MAX_SPEED_MPS,
            process_noise: PROCESS_NOISE,
            measurement_variance_scale: MEASUREMENT_VARIANCE_SCALE,
            min_persist_duration_s: 5.0,
            live_pace_window: 12,
            pace_stale_after_ms: 5_000,
        }
    }
}

impl TrackerConfig {
    /// Load a config from a JSON file and validate it
    pub fn from_json_file(path: impl AsRef<Path>) -> TrackerResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| {
            TrackerError::InvalidParameters(format!("cannot read {}: {e}", path.display()))
        })?;
        let config: TrackerConfig = serde_json::from_str(&text).map_err(|e| {
            TrackerError::InvalidParameters(format!("cannot parse {}: {e}", path.display()))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_segment_size(mut self, segment_size_m: u32) -> Self {
        self.segment_size_m = segment_size_m;
        self
    }

    pub fn validate(&self) -> TrackerResult<()> {
        if self.segment_size_m == 0 {
            return Err(TrackerError::InvalidParameters(
                "segment_size_m must be > 0".to_string(),
            ));
        }

        let non_negative = [
            ("max_accuracy_m", self.max_accuracy_m),
            ("warmup_accuracy_m", self.warmup_accuracy_m),
            ("min_delta_m", self.min_delta_m),
            ("max_speed_mps", self.max_speed_mps),
            ("process_noise", self.process_noise),
            ("measurement_variance_scale", self.measurement_variance_scale),
            ("min_persist_duration_s", self.min_persist_duration_s),
        ];
        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(TrackerError::InvalidParameters(format!(
                    "{name} must be finite and >= 0 (got {value})"
                )));
            }
        }

        if self.warmup_accuracy_m > self.max_accuracy_m {
            return Err(TrackerError::InvalidParameters(format!(
                "warmup_accuracy_m ({}) exceeds max_accuracy_m ({})",
                self.warmup_accuracy_m, self.max_accuracy_m
            )));
        }
        if self.live_pace_window == 0 {
            return Err(TrackerError::InvalidParameters(
                "live_pace_window must be >= 1".to_string(),
            ));
        }
        if self.pace_stale_after_ms < 0 {
            return Err(TrackerError::InvalidParameters(
                "pace_stale_after_ms must be >= 0".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = TrackerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.segment_size_m, 250);
        assert_eq!(config.max_accuracy_m, 50.0);
        assert_eq!(config.warmup_accuracy_m, 20.0);
    }

    #[test]
    fn test_rejects_zero_segment_size() {
        let config = TrackerConfig::default().with_segment_size(0);
        assert!(matches!(
            config.validate(),
            Err(TrackerError::InvalidParameters(_))
        ));

        let config = TrackerConfig {
            max_speed_mps: f64::NAN,
            ..TrackerConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_warmup_looser_than_max() {
        let config = TrackerConfig {
            warmup_accuracy_m: 60.0,
            ..TrackerConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_json_file_uses_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "segment_size_m": 400, "min_delta_m": 3.0 }}"#).unwrap();

        let config = TrackerConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.segment_size_m, 400);
        assert_eq!(config.min_delta_m, 3.0);
        assert_eq!(config.max_speed_mps, MAX_SPEED_MPS);
        assert_eq!(config.live_pace_window, 12);
    }

    #[test]
    fn test_invalid_json_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "segment_size_m": -5 }}"#).unwrap();
        assert!(TrackerConfig::from_json_file(file.path()).is_err());

        let missing = TrackerConfig::from_json_file("/nonexistent/run_tracker.json");
        assert!(matches!(missing, Err(TrackerError::InvalidParameters(_))));
    }
}
