//! Track estimator: accuracy gating, per-axis Kalman filtering, and movement validation.
//!
//! Every raw fix passes through the same ordered checks:
//!
//! 1. accuracy gate (unusable fixes never touch the filter)
//! 2. axis filter update (seeds the filter on the first usable fix)
//! 3. warm-up lock (waits for a fix tight enough to anchor the track)
//! 4. speed-spike rejection against the anchor (rolls filter values back)
//! 5. anti-drift rejection against the anchor (anchor stays put)
//!
//! Only a fix that survives all five produces a `Displacement`.

use serde::{Deserialize, Serialize};

use crate::config::TrackerConfig;
use crate::filters::{AxisEstimate, AxisKalman};
use crate::fix::{Displacement, FilteredFix, RawFix};
use crate::gate::FixQualityGate;
use crate::geodesy::haversine_distance;

/// Lock state of the estimator
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TrackPhase {
    /// No usable fix seen yet
    Cold,
    /// Filter seeded, waiting for a fix accurate enough to anchor on
    WarmingUp,
    /// Locked; distance is measured from `anchor`
    Tracking { anchor: FilteredFix },
}

/// Outcome of feeding one raw fix to the estimator
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TrackUpdate {
    Unusable { accuracy_m: f64 },
    WarmingUp { accuracy_m: f64 },
    Locked { at: FilteredFix },
    SpikeRejected { delta_m: f64, dt_s: f64, speed_mps: f64 },
    NegligibleMovement { delta_m: f64 },
    Moved { displacement: Displacement },
}

pub struct TrackEstimator {
    gate: FixQualityGate,
    filter: AxisKalman,
    min_delta_m: f64,
    max_speed_mps: f64,
    lat: Option<AxisEstimate>,
    lon: Option<AxisEstimate>,
    phase: TrackPhase,
}

impl TrackEstimator {
    pub fn new(config: &TrackerConfig) -> Self {
        Self {
            gate: FixQualityGate::from_config(config),
            filter: AxisKalman::new(config.process_noise, config.measurement_variance_scale),
            min_delta_m: config.min_delta_m,
            max_speed_mps: config.max_speed_mps,
            lat: None,
            lon: None,
            phase: TrackPhase::Cold,
        }
    }

    /// Drop all filter state and return to `Cold`
    pub fn reset(&mut self) {
        self.lat = None;
        self.lon = None;
        self.phase = TrackPhase::Cold;
    }

    pub fn phase(&self) -> TrackPhase {
        self.phase
    }

    pub fn anchor(&self) -> Option<FilteredFix> {
        match self.phase {
            TrackPhase::Tracking { anchor } => Some(anchor),
            _ => None,
        }
    }

    pub fn lat_estimate(&self) -> Option<AxisEstimate> {
        self.lat
    }

    pub fn lon_estimate(&self) -> Option<AxisEstimate> {
        self.lon
    }

    pub fn gate(&self) -> &FixQualityGate {
        &self.gate
    }

    pub fn process(&mut self, fix: &RawFix) -> TrackUpdate {
        if !self.gate.is_usable(fix.accuracy) {
            log::debug!("fix rejected: accuracy ±{:.1}m", fix.accuracy);
            return TrackUpdate::Unusable {
                accuracy_m: fix.accuracy,
            };
        }

        let lat = self.filter.update(self.lat, fix.latitude, fix.accuracy);
        let lon = self.filter.update(self.lon, fix.longitude, fix.accuracy);
        self.lat = Some(lat);
        self.lon = Some(lon);

        let current = FilteredFix {
            latitude: lat.value,
            longitude: lon.value,
            timestamp_ms: fix.timestamp_ms,
        };

        let anchor = match self.phase {
            TrackPhase::Cold | TrackPhase::WarmingUp => {
                if self.gate.can_anchor(fix.accuracy) {
                    log::info!("GPS locked at ±{:.1}m", fix.accuracy);
                    self.phase = TrackPhase::Tracking { anchor: current };
                    return TrackUpdate::Locked { at: current };
                }
                self.phase = TrackPhase::WarmingUp;
                return TrackUpdate::WarmingUp {
                    accuracy_m: fix.accuracy,
                };
            }
            TrackPhase::Tracking { anchor } => anchor,
        };

        let delta_m = haversine_distance(
            anchor.latitude,
            anchor.longitude,
            current.latitude,
            current.longitude,
        );
        let dt_s = (current.timestamp_ms - anchor.timestamp_ms) as f64 / 1000.0;

        if dt_s > 0.0 && delta_m / dt_s > self.max_speed_mps {
            // Discard the jump but keep the variance growth it caused
            self.lat = Some(AxisEstimate {
                value: anchor.latitude,
                variance: lat.variance,
            });
            self.lon = Some(AxisEstimate {
                value: anchor.longitude,
                variance: lon.variance,
            });
            let speed_mps = delta_m / dt_s;
            log::debug!(
                "spike rejected: {:.1}m in {:.1}s ({:.1} m/s)",
                delta_m,
                dt_s,
                speed_mps
            );
            return TrackUpdate::SpikeRejected {
                delta_m,
                dt_s,
                speed_mps,
            };
        }

        if delta_m < self.min_delta_m {
            // Anchor stays put so slow movement still adds up against it
            log::debug!("movement below threshold: {:.2}m", delta_m);
            return TrackUpdate::NegligibleMovement { delta_m };
        }

        self.phase = TrackPhase::Tracking { anchor: current };
        TrackUpdate::Moved {
            displacement: Displacement {
                delta_m,
                dt_s,
                to: current,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geodesy::offset_by_meters;
    use approx::assert_relative_eq;

    const LAT0: f64 = 47.3769;
    const LON0: f64 = 8.5417;

    fn estimator() -> TrackEstimator {
        TrackEstimator::new(&TrackerConfig::default())
    }

    fn fix_north(meters: f64, accuracy: f64, t_ms: i64) -> RawFix {
        let (lat, lon) = offset_by_meters(LAT0, LON0, meters, 0.0);
        RawFix::new(lat, lon, accuracy, t_ms)
    }

    #[test]
    fn test_unusable_fix_is_idempotent() {
        let mut track = estimator();
        let bad = RawFix::new(LAT0, LON0, 80.0, 1_000);
        for _ in 0..5 {
            assert_eq!(track.process(&bad), TrackUpdate::Unusable { accuracy_m: 80.0 });
            assert_eq!(track.phase(), TrackPhase::Cold);
            assert!(track.lat_estimate().is_none());
            assert!(track.lon_estimate().is_none());
        }

        // Same once locked: estimates and anchor are untouched
        track.process(&fix_north(0.0, 5.0, 0));
        let before = (track.lat_estimate(), track.lon_estimate(), track.phase());
        for _ in 0..5 {
            track.process(&bad);
        }
        assert_eq!(before, (track.lat_estimate(), track.lon_estimate(), track.phase()));
    }

    #[test]
    fn test_warmup_waits_for_accurate_fix() {
        let mut track = estimator();

        let update = track.process(&fix_north(0.0, 35.0, 0));
        assert_eq!(update, TrackUpdate::WarmingUp { accuracy_m: 35.0 });
        assert_eq!(track.phase(), TrackPhase::WarmingUp);
        assert!(track.anchor().is_none());
        assert!(track.lat_estimate().is_some());

        let update = track.process(&fix_north(0.0, 25.0, 1_000));
        assert!(matches!(update, TrackUpdate::WarmingUp { .. }));

        let update = track.process(&fix_north(0.0, 12.0, 2_000));
        let TrackUpdate::Locked { at } = update else {
            panic!("expected lock, got {update:?}");
        };
        assert_eq!(at.timestamp_ms, 2_000);
        assert_eq!(track.anchor(), Some(at));
    }

    #[test]
    fn test_first_fix_can_lock_immediately() {
        let mut track = estimator();
        let update = track.process(&fix_north(0.0, 4.0, 0));
        assert!(matches!(update, TrackUpdate::Locked { .. }));
        let anchor = track.anchor().unwrap();
        assert_eq!(anchor.latitude, LAT0);
        assert_eq!(anchor.longitude, LON0);
    }

    #[test]
    fn test_anchor_stays_put_on_sub_threshold_deltas() {
        let mut track = estimator();
        track.process(&fix_north(0.0, 0.0, 0));
        let anchor = track.anchor().unwrap();

        for (i, meters) in [1.0, 1.5, 1.8].iter().enumerate() {
            let t = (i as i64 + 1) * 10_000;
            let update = track.process(&fix_north(*meters, 0.0, t));
            let TrackUpdate::NegligibleMovement { delta_m } = update else {
                panic!("expected drift rejection, got {update:?}");
            };
            assert_relative_eq!(delta_m, *meters, epsilon = 1e-6);
            assert_eq!(track.anchor(), Some(anchor));
        }

        let update = track.process(&fix_north(3.0, 0.0, 40_000));
        let TrackUpdate::Moved { displacement } = update else {
            panic!("expected movement, got {update:?}");
        };
        // Measured from the original anchor, not from the last drift fix
        assert_relative_eq!(displacement.delta_m, 3.0, epsilon = 1e-6);
        assert_relative_eq!(displacement.dt_s, 40.0);
        assert_eq!(track.anchor(), Some(displacement.to));
    }

    #[test]
    fn test_spike_rolls_back_value_but_keeps_variance() {
        let config = TrackerConfig::default();
        let kalman = AxisKalman::new(config.process_noise, config.measurement_variance_scale);
        let mut track = TrackEstimator::new(&config);

        track.process(&fix_north(0.0, 5.0, 0));
        let anchor = track.anchor().unwrap();
        let lat_before = track.lat_estimate().unwrap();

        // 200 m in one second
        let jump = fix_north(200.0, 5.0, 1_000);
        let update = track.process(&jump);
        let TrackUpdate::SpikeRejected { speed_mps, .. } = update else {
            panic!("expected spike rejection, got {update:?}");
        };
        assert!(speed_mps > config.max_speed_mps);

        let expected = kalman.update(Some(lat_before), jump.latitude, jump.accuracy);
        let lat_after = track.lat_estimate().unwrap();
        assert_eq!(lat_after.value, anchor.latitude);
        assert_eq!(lat_after.variance, expected.variance);
        assert!(lat_after.variance != lat_before.variance);
        assert_eq!(track.lon_estimate().unwrap().value, anchor.longitude);
        assert_eq!(track.anchor(), Some(anchor));
    }

    #[test]
    fn test_spike_check_runs_before_drift_check() {
        let mut track = estimator();
        track.process(&fix_north(0.0, 0.0, 0));

        // Tiny movement but in 100 ms: 1.5 m / 0.1 s = 15 m/s
        let update = track.process(&fix_north(1.5, 0.0, 100));
        assert!(matches!(update, TrackUpdate::SpikeRejected { .. }));
    }

    #[test]
    fn test_non_positive_dt_skips_spike_check() {
        let mut track = estimator();
        track.process(&fix_north(0.0, 0.0, 5_000));

        let update = track.process(&fix_north(50.0, 0.0, 5_000));
        let TrackUpdate::Moved { displacement } = update else {
            panic!("expected movement, got {update:?}");
        };
        assert_eq!(displacement.dt_s, 0.0);
        assert!(displacement.speed_kmh().is_none());
    }

    #[test]
    fn test_reset_returns_to_cold() {
        let mut track = estimator();
        track.process(&fix_north(0.0, 5.0, 0));
        track.reset();
        assert_eq!(track.phase(), TrackPhase::Cold);
        assert!(track.lat_estimate().is_none());
        assert!(track.anchor().is_none());
    }
}
