use serde::{Deserialize, Serialize};

use crate::config::TrackerConfig;
use crate::error::{TrackerError, TrackerResult};
use crate::fix::RawFix;
use crate::gate::SignalGrade;
use crate::live_status::LiveStatus;
use crate::pace::{self, LivePace};
use crate::segmentation::{Segment, SegmentationEngine};
use crate::storage::{self, FinishedSession, SessionStore};
use crate::track::{TrackEstimator, TrackPhase, TrackUpdate};

/// Session state machine states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// No session, or the last one has been stopped
    Idle,
    /// Accepting fixes
    Running,
    /// Fixes are refused and active time is frozen
    Paused,
}

/// Advisory status of the most recent input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FixStatus {
    Unusable,
    WarmingUp,
    Locked,
    SpikeRejected,
    NegligibleMovement,
    Moved,
    SensorUnavailable,
}

impl From<&TrackUpdate> for FixStatus {
    fn from(update: &TrackUpdate) -> Self {
        match update {
            TrackUpdate::Unusable { .. } => FixStatus::Unusable,
            TrackUpdate::WarmingUp { .. } => FixStatus::WarmingUp,
            TrackUpdate::Locked { .. } => FixStatus::Locked,
            TrackUpdate::SpikeRejected { .. } => FixStatus::SpikeRejected,
            TrackUpdate::NegligibleMovement { .. } => FixStatus::NegligibleMovement,
            TrackUpdate::Moved { .. } => FixStatus::Moved,
        }
    }
}

/// Cumulative results of the current session
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionAccumulator {
    pub total_distance_m: f64,
    pub elevation_gain_m: f64,
    pub segments: Vec<Segment>,
    pub segment_start_ms: i64,
    pub last_elevation_m: Option<f64>,
}

impl SessionAccumulator {
    fn new(start_ms: i64) -> Self {
        Self {
            segment_start_ms: start_ms,
            ..Self::default()
        }
    }

    /// Climbs add to the gain, descents only move the reference
    fn record_altitude(&mut self, altitude_m: f64) {
        if let Some(last) = self.last_elevation_m {
            if altitude_m > last {
                self.elevation_gain_m += altitude_m - last;
            }
        }
        self.last_elevation_m = Some(altitude_m);
    }
}

/// Result of handing one fix to the controller
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FixReport {
    pub update: TrackUpdate,
    pub signal: SignalGrade,
    pub total_distance_m: f64,
    /// Only for accepted movement with a positive interval
    pub speed_kmh: Option<f64>,
    pub elevation_gain_m: f64,
    pub completed_segments: Vec<Segment>,
}

impl FixReport {
    pub fn status(&self) -> FixStatus {
        FixStatus::from(&self.update)
    }
}

/// Everything produced by stopping a session
#[derive(Debug, Clone, PartialEq)]
pub struct StopReport {
    pub session: FinishedSession,
    /// Partial split emitted at stop, if any distance was left over
    pub flushed: Option<Segment>,
    /// Distance was recorded and the run was long enough to keep
    pub should_persist: bool,
}

impl StopReport {
    /// Hand the session to `store` when it qualifies; returns whether it was stored
    pub fn persist_into(&self, store: &mut dyn SessionStore) -> TrackerResult<bool> {
        if !self.should_persist {
            log::warn!(
                "{} not saved ({:.1} m in {:.0} s)",
                self.session.session_id,
                self.session.distance_m,
                self.session.total_time_s
            );
            return Ok(false);
        }
        store.persist(&self.session)?;
        Ok(true)
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct SessionClock {
    start_ms: i64,
    paused_ms: i64,
    pause_started_ms: Option<i64>,
}

impl SessionClock {
    fn started(start_ms: i64) -> Self {
        Self {
            start_ms,
            ..Self::default()
        }
    }

    /// Timestamp at which active time stops counting
    fn effective_now(&self, now_ms: i64) -> i64 {
        self.pause_started_ms.unwrap_or(now_ms)
    }

    fn active_elapsed_s(&self, now_ms: i64) -> f64 {
        let active_ms = self.effective_now(now_ms) - self.start_ms - self.paused_ms;
        (active_ms as f64 / 1000.0).max(0.0)
    }
}

/// Owns one activity session: lifecycle, the track estimator, and the accumulated results.
///
/// All calls take the caller's clock (ms since epoch) so the controller itself never
/// reads wall time.
pub struct SessionController {
    config: TrackerConfig,
    state: SessionState,
    track: TrackEstimator,
    segmenter: SegmentationEngine,
    accumulator: SessionAccumulator,
    clock: SessionClock,
    live_pace: LivePace,
    session_id: Option<String>,
    start_time: Option<String>,
    last_status: Option<FixStatus>,
    last_signal: Option<SignalGrade>,
    last_speed_kmh: Option<f64>,
}

impl SessionController {
    pub fn new(config: TrackerConfig) -> TrackerResult<Self> {
        config.validate()?;
        Ok(Self {
            track: TrackEstimator::new(&config),
            segmenter: SegmentationEngine::new(config.segment_size_m),
            live_pace: LivePace::new(config.live_pace_window),
            config,
            state: SessionState::Idle,
            accumulator: SessionAccumulator::default(),
            clock: SessionClock::default(),
            session_id: None,
            start_time: None,
            last_status: None,
            last_signal: None,
            last_speed_kmh: None,
        })
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == SessionState::Running
    }

    pub fn accumulator(&self) -> &SessionAccumulator {
        &self.accumulator
    }

    pub fn track(&self) -> &TrackEstimator {
        &self.track
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn last_status(&self) -> Option<FixStatus> {
        self.last_status
    }

    /// Active time so far, pauses excluded
    pub fn elapsed_s(&self, now_ms: i64) -> f64 {
        if self.state == SessionState::Idle {
            return 0.0;
        }
        self.clock.active_elapsed_s(now_ms)
    }

    /// Split length can only change between sessions
    pub fn set_segment_size(&mut self, segment_size_m: u32) -> TrackerResult<()> {
        if self.state != SessionState::Idle {
            return Err(TrackerError::AlreadyRunning);
        }
        let config = self.config.clone().with_segment_size(segment_size_m);
        config.validate()?;
        self.segmenter = SegmentationEngine::new(segment_size_m);
        self.config = config;
        Ok(())
    }

    /// Idle → Running with fresh accumulator and a cold track
    pub fn start(&mut self, now_ms: i64) -> TrackerResult<()> {
        match self.state {
            SessionState::Idle => {}
            SessionState::Running => return Err(TrackerError::AlreadyRunning),
            SessionState::Paused => {
                return Err(TrackerError::InvalidState(
                    "Session paused; resume or stop it first".to_string(),
                ))
            }
        }

        self.track.reset();
        self.accumulator = SessionAccumulator::new(now_ms);
        self.clock = SessionClock::started(now_ms);
        self.live_pace.clear();
        self.session_id = Some(format!("session_{now_ms}"));
        self.start_time = chrono::DateTime::from_timestamp_millis(now_ms).map(|t| t.to_rfc3339());
        self.last_status = None;
        self.last_signal = None;
        self.last_speed_kmh = None;
        self.state = SessionState::Running;

        log::info!(
            "session_{now_ms} started ({} m segments)",
            self.config.segment_size_m
        );
        Ok(())
    }

    /// Running → Paused
    pub fn pause(&mut self, now_ms: i64) -> TrackerResult<()> {
        match self.state {
            SessionState::Running => {
                self.clock.pause_started_ms = Some(now_ms);
                self.state = SessionState::Paused;
                log::info!("session paused at {:.0}s", self.clock.active_elapsed_s(now_ms));
                Ok(())
            }
            SessionState::Paused => Err(TrackerError::InvalidState("Already paused".to_string())),
            SessionState::Idle => Err(TrackerError::NotRunning),
        }
    }

    /// Paused → Running. The track restarts cold; distance and splits carry over.
    pub fn resume(&mut self, now_ms: i64) -> TrackerResult<()> {
        match self.state {
            SessionState::Paused => {
                self.close_pause(now_ms);
                self.track.reset();
                self.state = SessionState::Running;
                log::info!("session resumed");
                Ok(())
            }
            SessionState::Running => Err(TrackerError::AlreadyRunning),
            SessionState::Idle => Err(TrackerError::NotRunning),
        }
    }

    fn close_pause(&mut self, now_ms: i64) {
        if let Some(paused_at) = self.clock.pause_started_ms.take() {
            self.clock.paused_ms += (now_ms - paused_at).max(0);
        }
    }

    /// Running/Paused → Idle. Flushes the trailing partial split and builds the
    /// finished-session record.
    pub fn stop(&mut self, now_ms: i64) -> TrackerResult<StopReport> {
        if self.state == SessionState::Idle {
            return Err(TrackerError::NotRunning);
        }
        let flush_at = self.clock.effective_now(now_ms);
        self.close_pause(now_ms);

        let flushed = self.segmenter.flush(
            self.accumulator.total_distance_m,
            self.accumulator.segments.len(),
            self.accumulator.segment_start_ms,
            flush_at,
        );
        if let Some(segment) = &flushed {
            log::info!(
                "final split {} m ({:.1} m) in {:.1}s",
                segment.distance_label_m,
                segment.distance_m,
                segment.elapsed_s
            );
            self.accumulator.segments.push(segment.clone());
        }

        let total_time_s = self.clock.active_elapsed_s(now_ms);
        let distance_m = self.accumulator.total_distance_m;
        let session = FinishedSession {
            session_id: self.session_id.clone().unwrap_or_default(),
            start_time: self.start_time.clone().unwrap_or_default(),
            segment_size_m: self.config.segment_size_m,
            distance_m: storage::round_to(distance_m, 1),
            total_time_s: total_time_s.round(),
            elevation_gain_m: self.accumulator.elevation_gain_m.round(),
            calories_kcal: pace::calories_kcal(distance_m).round(),
            average_pace_s_per_km: pace::average_pace_s_per_km(total_time_s, distance_m)
                .map(|p| storage::round_to(p, 1)),
            segments: self
                .accumulator
                .segments
                .iter()
                .map(storage::rounded_segment)
                .collect(),
        };
        let should_persist =
            distance_m > 0.0 && total_time_s > self.config.min_persist_duration_s;

        self.track.reset();
        self.state = SessionState::Idle;
        log::info!(
            "{} stopped: {:.1} m in {:.0}s, {} splits",
            session.session_id,
            distance_m,
            total_time_s,
            session.segments.len()
        );

        Ok(StopReport {
            session,
            flushed,
            should_persist,
        })
    }

    /// Process one raw fix. Refused unless the session is running.
    pub fn on_fix(&mut self, fix: &RawFix) -> TrackerResult<FixReport> {
        if self.state != SessionState::Running {
            return Err(TrackerError::NotRunning);
        }

        let signal = self.track.gate().grade(fix.accuracy);
        let update = self.track.process(fix);

        if !matches!(update, TrackUpdate::Unusable { .. }) {
            if let Some(altitude) = fix.altitude {
                self.accumulator.record_altitude(altitude);
            }
        }

        let mut speed_kmh = None;
        let mut completed_segments = Vec::new();

        if let TrackUpdate::Moved { displacement } = &update {
            self.accumulator.total_distance_m += displacement.delta_m;
            speed_kmh = displacement.speed_kmh();
            if speed_kmh.is_some() {
                self.last_speed_kmh = speed_kmh;
            }
            self.live_pace
                .push(displacement.delta_m, displacement.dt_s, fix.timestamp_ms);

            completed_segments = self.segmenter.advance(
                self.accumulator.total_distance_m,
                self.accumulator.segments.len(),
                self.accumulator.segment_start_ms,
                fix.timestamp_ms,
            );
            if !completed_segments.is_empty() {
                self.accumulator.segment_start_ms = fix.timestamp_ms;
                for segment in &completed_segments {
                    log::info!(
                        "split {} m in {:.1}s ({:.0} s/km)",
                        segment.distance_label_m,
                        segment.elapsed_s,
                        segment.pace_s_per_km
                    );
                }
                self.accumulator
                    .segments
                    .extend(completed_segments.iter().cloned());
            }
        }

        self.last_status = Some(FixStatus::from(&update));
        self.last_signal = Some(signal);

        Ok(FixReport {
            update,
            signal,
            total_distance_m: self.accumulator.total_distance_m,
            speed_kmh,
            elevation_gain_m: self.accumulator.elevation_gain_m,
            completed_segments,
        })
    }

    /// The positioning source reported a failure. Advisory only: session state is kept.
    pub fn report_sensor_error(&mut self, message: &str) -> FixStatus {
        log::warn!("location unavailable: {message}");
        self.last_status = Some(FixStatus::SensorUnavailable);
        FixStatus::SensorUnavailable
    }

    /// Snapshot for display collaborators
    pub fn live_status(&self, now_ms: i64) -> LiveStatus {
        let elapsed_s = self.elapsed_s(now_ms);
        let distance_m = self.accumulator.total_distance_m;
        let segment_elapsed_s = if self.state == SessionState::Idle {
            0.0
        } else {
            let now = self.clock.effective_now(now_ms);
            ((now - self.accumulator.segment_start_ms) as f64 / 1000.0).max(0.0)
        };
        let live_pace_s_per_km = if self.state == SessionState::Running {
            self.live_pace.current(now_ms, self.config.pace_stale_after_ms)
        } else {
            None
        };

        LiveStatus {
            timestamp_ms: now_ms,
            session_id: self.session_id.clone(),
            state: self.state,
            elapsed_s,
            segment_elapsed_s,
            distance_m,
            speed_kmh: self.last_speed_kmh,
            live_pace_s_per_km,
            projected_5k_s: pace::projected_5k_s(elapsed_s, distance_m),
            calories_kcal: pace::calories_kcal(distance_m),
            elevation_gain_m: self.accumulator.elevation_gain_m,
            segments_completed: self.accumulator.segments.len(),
            signal: self.last_signal,
            last_status: self.last_status,
            track_locked: matches!(self.track.phase(), TrackPhase::Tracking { .. }),
        }
    }
}
