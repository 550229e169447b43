use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One forecast period for one entity. Bounds always satisfy
/// `lower_bound <= point_estimate <= upper_bound`; point estimates may be
/// negative and are clamped only at display boundaries.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub entity_id: i64,
    pub date: NaiveDate,
    pub point_estimate: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
}

impl ForecastPoint {
    pub fn new(
        entity_id: i64,
        date: NaiveDate,
        point_estimate: f64,
        lower_bound: f64,
        upper_bound: f64,
    ) -> Self {
        let lower = lower_bound.min(point_estimate);
        let upper = upper_bound.max(point_estimate);
        Self { entity_id, date, point_estimate, lower_bound: lower, upper_bound: upper }
    }

    pub fn uncertainty(&self) -> f64 {
        self.upper_bound - self.lower_bound
    }

    /// Uncertainty width relative to the point estimate. Undefined (None)
    /// when the estimate is at or below `epsilon`, so zero-demand forecasts
    /// never leak NaN or infinity into serialized output.
    pub fn coefficient_of_variation(&self, epsilon: f64) -> Option<f64> {
        if self.point_estimate <= epsilon {
            None
        } else {
            Some(self.uncertainty() / self.point_estimate)
        }
    }

    /// Non-negative estimate for display surfaces.
    pub fn display_estimate(&self) -> f64 {
        self.point_estimate.max(0.0)
    }
}

/// Outcome of one entity's fit. Too little history is an explicit outcome,
/// not an error: the batch carries on.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ForecastOutcome {
    Forecast { points: Vec<ForecastPoint> },
    InsufficientHistory { observed_periods: usize, required_periods: usize },
}

impl ForecastOutcome {
    pub fn points(&self) -> &[ForecastPoint] {
        match self {
            Self::Forecast { points } => points,
            Self::InsufficientHistory { .. } => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn constructor_enforces_bound_ordering() {
        let point = ForecastPoint::new(1, date(2025, 6, 1), 10.0, 12.0, 8.0);
        assert!(point.lower_bound <= point.point_estimate);
        assert!(point.point_estimate <= point.upper_bound);
    }

    #[test]
    fn cv_is_none_at_zero_estimate() {
        let point = ForecastPoint::new(1, date(2025, 6, 1), 0.0, -2.0, 2.0);
        assert_eq!(point.coefficient_of_variation(1e-9), None);
    }

    #[test]
    fn cv_is_none_for_negative_estimate() {
        let point = ForecastPoint::new(1, date(2025, 6, 1), -3.0, -5.0, 1.0);
        assert_eq!(point.coefficient_of_variation(1e-9), None);
    }

    #[test]
    fn cv_is_finite_for_positive_estimate() {
        let point = ForecastPoint::new(1, date(2025, 6, 1), 10.0, 8.0, 12.0);
        let cv = point.coefficient_of_variation(1e-9).unwrap();
        assert!((cv - 0.4).abs() < 1e-9);
        assert!(cv.is_finite());
    }

    #[test]
    fn negative_estimate_clamps_for_display() {
        let point = ForecastPoint::new(1, date(2025, 6, 1), -1.5, -3.0, 0.5);
        assert_eq!(point.display_estimate(), 0.0);
    }
}
