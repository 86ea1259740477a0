//! Wasted-time scoring curve shared by time-efficiency checks

use crate::{Error, Result};

/// Step curve from total wasted milliseconds to a score in `[0, 1]`
///
/// Nothing wasted scores 1; under `average_ms` scores 0.9; under `poor_ms`
/// scores 0.65; anything else scores 0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreCurve {
    pub average_ms: f64,
    pub poor_ms: f64,
}

impl Default for ScoreCurve {
    fn default() -> Self {
        Self {
            average_ms: 300.0,
            poor_ms: 750.0,
        }
    }
}

impl ScoreCurve {
    pub fn validate(&self) -> Result<()> {
        let ordered = self.average_ms > 0.0 && self.average_ms <= self.poor_ms;
        if !ordered || !self.poor_ms.is_finite() {
            return Err(Error::ConfigError(format!(
                "score curve thresholds must satisfy 0 < average ({}) <= poor ({})",
                self.average_ms, self.poor_ms
            )));
        }
        Ok(())
    }

    /// Non-increasing in `wasted_ms`. Non-positive input (clock skew between
    /// trace domains) scores 1; NaN scores 0.
    pub fn score_for_wasted_ms(&self, wasted_ms: f64) -> f64 {
        if wasted_ms.is_nan() {
            0.0
        } else if wasted_ms <= 0.0 {
            1.0
        } else if wasted_ms < self.average_ms {
            0.9
        } else if wasted_ms < self.poor_ms {
            0.65
        } else {
            0.0
        }
    }
}
