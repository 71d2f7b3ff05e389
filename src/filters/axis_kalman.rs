use serde::{Deserialize, Serialize};

use crate::config::{MEASUREMENT_VARIANCE_SCALE, PROCESS_NOISE};

/// Estimate of a single coordinate axis (degrees) and its variance (deg²)
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AxisEstimate {
    pub value: f64,
    pub variance: f64,
}

/// Scalar Kalman filter for one coordinate axis.
///
/// Latitude and longitude are filtered independently with the same parameters.
/// The filter has no state of its own: callers hold the `AxisEstimate` and feed it
/// back on the next update.
#[derive(Clone, Copy, Debug)]
pub struct AxisKalman {
    process_noise: f64,
    variance_scale: f64,
}

impl Default for AxisKalman {
    fn default() -> Self {
        Self::new(PROCESS_NOISE, MEASUREMENT_VARIANCE_SCALE)
    }
}

impl AxisKalman {
    pub fn new(process_noise: f64, variance_scale: f64) -> Self {
        Self {
            process_noise,
            variance_scale,
        }
    }

    /// Measurement variance in deg² for an accuracy radius in metres
    pub fn measurement_variance(&self, accuracy_m: f64) -> f64 {
        accuracy_m * accuracy_m * self.variance_scale
    }

    /// Kalman gain for a predicted variance against a measurement variance, in [0, 1].
    ///
    /// A zero denominator means both sides are certain; the measurement wins.
    /// An undefined gain (inf/inf) keeps the prior.
    pub fn gain(predicted_variance: f64, measurement_variance: f64) -> f64 {
        let denominator = predicted_variance + measurement_variance;
        if denominator == 0.0 {
            return 1.0;
        }
        let gain = predicted_variance / denominator;
        if gain.is_nan() {
            0.0
        } else {
            gain.clamp(0.0, 1.0)
        }
    }

    /// Blend a new measurement into the prior estimate.
    ///
    /// Cold start (no prior) takes the measurement as-is with its own variance.
    pub fn update(
        &self,
        prior: Option<AxisEstimate>,
        measurement: f64,
        accuracy_m: f64,
    ) -> AxisEstimate {
        let measurement_variance = self.measurement_variance(accuracy_m);

        let Some(prior) = prior else {
            return AxisEstimate {
                value: measurement,
                variance: measurement_variance,
            };
        };

        // Predict: position may have moved since the last cycle
        let predicted_variance = prior.variance + self.process_noise;

        let gain = Self::gain(predicted_variance, measurement_variance);
        let value = prior.value + gain * (measurement - prior.value);
        let variance = ((1.0 - gain) * predicted_variance).max(0.0);

        AxisEstimate { value, variance }
    }
}
