use serde::{Deserialize, Serialize};

/// One location measurement as delivered by the positioning source
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawFix {
    pub latitude: f64,
    pub longitude: f64,
    /// Horizontal accuracy radius (m)
    pub accuracy: f64,
    #[serde(default)]
    pub altitude: Option<f64>,
    /// Milliseconds since the Unix epoch
    pub timestamp_ms: i64,
}

impl RawFix {
    pub fn new(latitude: f64, longitude: f64, accuracy: f64, timestamp_ms: i64) -> Self {
        Self {
            latitude,
            longitude,
            accuracy,
            altitude: None,
            timestamp_ms,
        }
    }

    pub fn with_altitude(mut self, altitude: f64) -> Self {
        self.altitude = Some(altitude);
        self
    }
}

/// Position after passing through the axis filters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FilteredFix {
    pub latitude: f64,
    pub longitude: f64,
    pub timestamp_ms: i64,
}

/// Validated movement between two accepted filtered fixes
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Displacement {
    pub delta_m: f64,
    /// Seconds since the previous accepted fix; may be <= 0 for out-of-order timestamps
    pub dt_s: f64,
    pub to: FilteredFix,
}

impl Displacement {
    /// Instantaneous speed in km/h, when the interval is positive
    pub fn speed_kmh(&self) -> Option<f64> {
        if self.dt_s > 0.0 {
            Some(self.delta_m / self.dt_s * 3.6)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn displacement(delta_m: f64, dt_s: f64) -> Displacement {
        Displacement {
            delta_m,
            dt_s,
            to: FilteredFix {
                latitude: 0.0,
                longitude: 0.0,
                timestamp_ms: 0,
            },
        }
    }

    #[test]
    fn test_speed_kmh() {
        assert_relative_eq!(displacement(100.0, 36.0).speed_kmh().unwrap(), 10.0);
        assert!(displacement(5.0, 0.0).speed_kmh().is_none());
    }

    #[test]
    fn test_raw_fix_altitude_is_optional_in_json() {
        let fix: RawFix = serde_json::from_str(
            r#"{"latitude": 1.0, "longitude": 2.0, "accuracy": 4.0, "timestamp_ms": 1000}"#,
        )
        .unwrap();
        assert_eq!(fix, RawFix::new(1.0, 2.0, 4.0, 1000));
        assert_eq!(fix.with_altitude(12.0).altitude, Some(12.0));
    }
}
