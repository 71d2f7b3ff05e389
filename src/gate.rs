use serde::{Deserialize, Serialize};

use crate::config::TrackerConfig;

/// Coarse signal quality derived from the accuracy radius
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalGrade {
    /// ≤ 8 m
    Excellent,
    /// ≤ 15 m
    Good,
    /// Usable but loose
    Fair,
    /// Beyond the usable limit; the fix is skipped
    Unusable,
}

impl SignalGrade {
    pub fn label(&self) -> &'static str {
        match self {
            SignalGrade::Excellent => "excellent",
            SignalGrade::Good => "good",
            SignalGrade::Fair => "fair",
            SignalGrade::Unusable => "skipped",
        }
    }
}

/// Accuracy-based admission of raw fixes.
///
/// Fixes beyond `max_accuracy_m` never reach the filter. Until the track has a lock,
/// only fixes within `warmup_accuracy_m` may anchor it.
#[derive(Debug, Clone, Copy)]
pub struct FixQualityGate {
    max_accuracy_m: f64,
    warmup_accuracy_m: f64,
}

impl FixQualityGate {
    pub fn new(max_accuracy_m: f64, warmup_accuracy_m: f64) -> Self {
        Self {
            max_accuracy_m,
            warmup_accuracy_m,
        }
    }

    pub fn from_config(config: &TrackerConfig) -> Self {
        Self::new(config.max_accuracy_m, config.warmup_accuracy_m)
    }

    /// Negative or non-finite accuracy is as useless as a huge radius
    pub fn is_usable(&self, accuracy_m: f64) -> bool {
        accuracy_m.is_finite() && accuracy_m >= 0.0 && accuracy_m <= self.max_accuracy_m
    }

    pub fn can_anchor(&self, accuracy_m: f64) -> bool {
        self.is_usable(accuracy_m) && accuracy_m <= self.warmup_accuracy_m
    }

    pub fn grade(&self, accuracy_m: f64) -> SignalGrade {
        if !self.is_usable(accuracy_m) {
            SignalGrade::Unusable
        } else if accuracy_m <= 8.0 {
            SignalGrade::Excellent
        } else if accuracy_m <= 15.0 {
            SignalGrade::Good
        } else {
            SignalGrade::Fair
        }
    }
}

impl Default for FixQualityGate {
    fn default() -> Self {
        Self::from_config(&TrackerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usable_boundaries() {
        let gate = FixQualityGate::default();
        assert!(gate.is_usable(0.0));
        assert!(gate.is_usable(50.0));
        assert!(!gate.is_usable(50.01));
        assert!(!gate.is_usable(-1.0));
        assert!(!gate.is_usable(f64::NAN));
    }

    #[test]
    fn test_anchor_threshold() {
        let gate = FixQualityGate::default();
        assert!(gate.can_anchor(20.0));
        assert!(!gate.can_anchor(20.5));
        assert!(!gate.can_anchor(70.0));
    }

    #[test]
    fn test_grades() {
        let gate = FixQualityGate::default();
        assert_eq!(gate.grade(5.0), SignalGrade::Excellent);
        assert_eq!(gate.grade(8.0), SignalGrade::Excellent);
        assert_eq!(gate.grade(12.0), SignalGrade::Good);
        assert_eq!(gate.grade(30.0), SignalGrade::Fair);
        assert_eq!(gate.grade(51.0), SignalGrade::Unusable);
        assert_eq!(gate.grade(51.0).label(), "skipped");
    }
}
