//! Split statistics over a finished or running list of segments.

use serde::{Deserialize, Serialize};

use crate::segmentation::Segment;

const FAST_RATIO: f64 = 0.97;
const SLOW_RATIO: f64 = 1.03;
/// Segments per row in the grouped split table
pub const GROUP_SIZE: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaceZone {
    Fast,
    Average,
    Slow,
}

impl PaceZone {
    /// Zone of `pace` relative to the mean split pace, ±3 %
    pub fn classify(pace_s_per_km: f64, average_s_per_km: f64) -> Self {
        if pace_s_per_km < average_s_per_km * FAST_RATIO {
            PaceZone::Fast
        } else if pace_s_per_km > average_s_per_km * SLOW_RATIO {
            PaceZone::Slow
        } else {
            PaceZone::Average
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitLine {
    pub distance_label_m: u32,
    pub elapsed_s: f64,
    pub pace_s_per_km: f64,
    /// `None` for a partial split, which is not ranked
    pub zone: Option<PaceZone>,
    pub partial: bool,
    pub is_best: bool,
    pub is_worst: bool,
}

/// Consecutive run of up to `GROUP_SIZE` splits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitGroup {
    /// Distance at which the first split of the group starts
    pub from_m: u32,
    pub elapsed_s: Vec<f64>,
    pub total_s: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitSummary {
    /// Mean pace of the full splits; `None` when there are only partial ones
    pub average_pace_s_per_km: Option<f64>,
    pub best_pace_s_per_km: Option<f64>,
    pub worst_pace_s_per_km: Option<f64>,
    pub lines: Vec<SplitLine>,
    pub groups: Vec<SplitGroup>,
}

impl SplitSummary {
    /// `None` for an empty segment list
    pub fn from_segments(segments: &[Segment], segment_size_m: u32) -> Option<Self> {
        if segments.is_empty() {
            return None;
        }

        // Partial splits are timed over less than a full segment and never ranked
        let paces: Vec<f64> = segments
            .iter()
            .filter(|s| !s.partial)
            .map(|s| s.pace_s_per_km)
            .collect();
        let (average, best, worst) = if paces.is_empty() {
            (None, None, None)
        } else {
            (
                Some(paces.iter().sum::<f64>() / paces.len() as f64),
                Some(paces.iter().copied().fold(f64::INFINITY, f64::min)),
                Some(paces.iter().copied().fold(f64::NEG_INFINITY, f64::max)),
            )
        };
        // Best/worst highlights only mean something with a few splits to compare
        let highlight = paces.len() > 2;

        let lines = segments
            .iter()
            .map(|s| {
                let ranked = !s.partial;
                let is_best = ranked && highlight && Some(s.pace_s_per_km) == best;
                SplitLine {
                    distance_label_m: s.distance_label_m,
                    elapsed_s: s.elapsed_s,
                    pace_s_per_km: s.pace_s_per_km,
                    zone: average
                        .filter(|_| ranked)
                        .map(|avg| PaceZone::classify(s.pace_s_per_km, avg)),
                    partial: s.partial,
                    is_best,
                    is_worst: ranked && highlight && !is_best && Some(s.pace_s_per_km) == worst,
                }
            })
            .collect();

        let groups = segments
            .chunks(GROUP_SIZE)
            .enumerate()
            .map(|(i, chunk)| {
                let elapsed_s: Vec<f64> = chunk.iter().map(|s| s.elapsed_s).collect();
                SplitGroup {
                    from_m: (i * GROUP_SIZE) as u32 * segment_size_m,
                    total_s: elapsed_s.iter().sum(),
                    elapsed_s,
                }
            })
            .collect();

        Some(Self {
            average_pace_s_per_km: average,
            best_pace_s_per_km: best,
            worst_pace_s_per_km: worst,
            lines,
            groups,
        })
    }
}
