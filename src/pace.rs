use std::collections::VecDeque;

/// Rough energy cost of running, kcal per km for a ~70 kg runner
pub const KCAL_PER_KM: f64 = 62.0;
/// Window needs at least this much distance before it reports a pace (m)
const MIN_WINDOW_DISTANCE_M: f64 = 5.0;
/// Projections are noisy before this much distance (m)
const MIN_PROJECTION_DISTANCE_M: f64 = 100.0;

/// Rolling pace over the most recent accepted displacements
pub struct LivePace {
    window: VecDeque<(f64, f64)>,
    window_size: usize,
    last_accepted_ms: Option<i64>,
}

impl LivePace {
    pub fn new(window_size: usize) -> Self {
        LivePace {
            window: VecDeque::with_capacity(window_size),
            window_size: window_size.max(1),
            last_accepted_ms: None,
        }
    }

    pub fn push(&mut self, delta_m: f64, dt_s: f64, timestamp_ms: i64) {
        self.window.push_back((delta_m, dt_s));
        while self.window.len() > self.window_size {
            self.window.pop_front();
        }
        self.last_accepted_ms = Some(timestamp_ms);
    }

    pub fn clear(&mut self) {
        self.window.clear();
        self.last_accepted_ms = None;
    }

    /// Pace over the window in seconds per km, regardless of staleness
    pub fn pace_s_per_km(&self) -> Option<f64> {
        let distance: f64 = self.window.iter().map(|(d, _)| d).sum();
        let time: f64 = self.window.iter().map(|(_, t)| t).sum();
        if distance > MIN_WINDOW_DISTANCE_M && time > 0.0 {
            Some(1000.0 / (distance / time))
        } else {
            None
        }
    }

    /// Pace at `now_ms`; `None` once no fix has been accepted for `stale_after_ms`
    pub fn current(&self, now_ms: i64, stale_after_ms: i64) -> Option<f64> {
        let last = self.last_accepted_ms?;
        if now_ms - last > stale_after_ms {
            return None;
        }
        self.pace_s_per_km()
    }
}

/// Whole-session pace in seconds per km
pub fn average_pace_s_per_km(elapsed_s: f64, distance_m: f64) -> Option<f64> {
    if distance_m > 0.0 && elapsed_s > 0.0 {
        Some(elapsed_s / distance_m * 1000.0)
    } else {
        None
    }
}

/// Projected 5 km finish time at the current average pace (s)
pub fn projected_5k_s(elapsed_s: f64, distance_m: f64) -> Option<f64> {
    if distance_m > MIN_PROJECTION_DISTANCE_M {
        Some(elapsed_s / distance_m * 5000.0)
    } else {
        None
    }
}

pub fn calories_kcal(distance_m: f64) -> f64 {
    distance_m / 1000.0 * KCAL_PER_KM
}
