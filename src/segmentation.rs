use serde::{Deserialize, Serialize};

/// One completed split of the session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// Cumulative distance at the end of this split: N × segment size
    pub distance_label_m: u32,
    /// Distance actually covered; less than the segment size only for a final partial split
    pub distance_m: f64,
    pub elapsed_s: f64,
    /// 0 when the elapsed time is not positive
    pub pace_s_per_km: f64,
    #[serde(default)]
    pub partial: bool,
}

/// Turns cumulative distance into fixed-length splits.
///
/// Stateless apart from the segment size: callers pass in how many segments they
/// already hold and when the current one started.
#[derive(Debug, Clone, Copy)]
pub struct SegmentationEngine {
    segment_size_m: u32,
}

impl SegmentationEngine {
    pub fn new(segment_size_m: u32) -> Self {
        Self { segment_size_m }
    }

    pub fn segment_size_m(&self) -> u32 {
        self.segment_size_m
    }

    /// Number of whole segments contained in `total_m`
    pub fn completed_count(&self, total_m: f64) -> usize {
        if total_m.is_nan() || total_m <= 0.0 || self.segment_size_m == 0 {
            return 0;
        }
        (total_m / self.segment_size_m as f64).floor() as usize
    }

    fn synthesize(&self, index: usize, elapsed_s: f64, distance_m: f64, partial: bool) -> Segment {
        let size = self.segment_size_m as f64;
        let elapsed_s = elapsed_s.max(0.0);
        let pace_s_per_km = if elapsed_s > 0.0 {
            elapsed_s / size * 1000.0
        } else {
            0.0
        };
        Segment {
            distance_label_m: (index as u32 + 1) * self.segment_size_m,
            distance_m,
            elapsed_s,
            pace_s_per_km,
            partial,
        }
    }

    /// Segments completed by reaching `total_m`, given `completed` already recorded.
    ///
    /// The first new segment is timed from `segment_start_ms`; any further boundaries
    /// crossed in the same step start and end at `now_ms`. When the result is non-empty
    /// the caller's segment start becomes `now_ms`.
    pub fn advance(
        &self,
        total_m: f64,
        completed: usize,
        segment_start_ms: i64,
        now_ms: i64,
    ) -> Vec<Segment> {
        let target = self.completed_count(total_m);
        let mut start_ms = segment_start_ms;
        let mut segments = Vec::new();

        for index in completed..target {
            let elapsed_s = (now_ms - start_ms) as f64 / 1000.0;
            segments.push(self.synthesize(index, elapsed_s, self.segment_size_m as f64, false));
            start_ms = now_ms;
        }
        segments
    }

    /// Final segment at session end, covering whatever distance lies past the last
    /// recorded boundary. Emits at most one segment.
    pub fn flush(
        &self,
        total_m: f64,
        completed: usize,
        segment_start_ms: i64,
        now_ms: i64,
    ) -> Option<Segment> {
        let size = self.segment_size_m as f64;
        let remainder = total_m - completed as f64 * size;
        if remainder.is_nan() || remainder <= 0.0 {
            return None;
        }

        let distance_m = remainder.min(size);
        let elapsed_s = (now_ms - segment_start_ms) as f64 / 1000.0;
        Some(self.synthesize(completed, elapsed_s, distance_m, remainder < size))
    }
}
