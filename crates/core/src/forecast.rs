//! Additive trend-plus-seasonality forecasting over bucketed observations.
//!
//! Product demand is bucketed per day and projected `product_horizon_days`
//! forward; customer spend is bucketed per ISO week (Monday start) and
//! projected `customer_horizon_weeks` forward. Buckets between the first and
//! last observation with no activity count as zero, so a sparse seller still
//! fits against its real calendar. Forecast points start strictly after the
//! last observed bucket.
//!
//! The fit is ordinary least squares on the bucket index plus per-slot
//! residual means (weekday for daily series, a four-week cycle for weekly
//! ones). Interval half-width is `interval_z` residual standard deviations.

use chrono::{Datelike, Days, NaiveDate};
use std::collections::BTreeMap;

use crate::config::ForecastConfig;
use crate::domain::forecast::{ForecastOutcome, ForecastPoint};
use crate::domain::product::DemandPoint;

const WEEKLY_CYCLE: usize = 4;

#[derive(Clone, Debug)]
pub struct Forecaster {
    config: ForecastConfig,
}

impl Forecaster {
    pub fn new(config: ForecastConfig) -> Self {
        Self { config }
    }

    /// Daily demand forecast for one product over the configured horizon.
    pub fn forecast_product_demand(
        &self,
        entity_id: i64,
        observations: &[DemandPoint],
    ) -> ForecastOutcome {
        let buckets = bucket_daily(observations);
        if buckets.len() < self.config.product_min_daily_periods {
            return ForecastOutcome::InsufficientHistory {
                observed_periods: buckets.len(),
                required_periods: self.config.product_min_daily_periods,
            };
        }

        let values: Vec<f64> = buckets.iter().map(|(_, v)| *v).collect();
        let slots: Vec<usize> =
            buckets.iter().map(|(date, _)| weekday_slot(*date)).collect();
        let fit = AdditiveFit::fit(&values, &slots, 7);

        let last_date = buckets[buckets.len() - 1].0;
        let points = (1..=self.config.product_horizon_days as u64)
            .filter_map(|step| {
                let date = last_date.checked_add_days(Days::new(step))?;
                let t = (buckets.len() - 1) as f64 + step as f64;
                let estimate = fit.predict(t, weekday_slot(date));
                Some(self.interval_point(entity_id, date, estimate, fit.residual_std))
            })
            .collect();

        ForecastOutcome::Forecast { points }
    }

    /// Weekly spend forecast for one customer. Each forecast point is dated
    /// at the Monday of its week.
    pub fn forecast_customer_spend(
        &self,
        entity_id: i64,
        observations: &[DemandPoint],
    ) -> ForecastOutcome {
        let buckets = bucket_weekly(observations);
        if buckets.len() < self.config.customer_min_weekly_periods {
            return ForecastOutcome::InsufficientHistory {
                observed_periods: buckets.len(),
                required_periods: self.config.customer_min_weekly_periods,
            };
        }

        let values: Vec<f64> = buckets.iter().map(|(_, v)| *v).collect();
        let slots: Vec<usize> = (0..buckets.len()).map(|i| i % WEEKLY_CYCLE).collect();
        let fit = AdditiveFit::fit(&values, &slots, WEEKLY_CYCLE);

        let last_week = buckets[buckets.len() - 1].0;
        let points = (1..=self.config.customer_horizon_weeks as u64)
            .filter_map(|step| {
                let date = last_week.checked_add_days(Days::new(step * 7))?;
                let index = (buckets.len() - 1) as u64 + step;
                let estimate = fit.predict(index as f64, index as usize % WEEKLY_CYCLE);
                Some(self.interval_point(entity_id, date, estimate, fit.residual_std))
            })
            .collect();

        ForecastOutcome::Forecast { points }
    }

    fn interval_point(
        &self,
        entity_id: i64,
        date: NaiveDate,
        estimate: f64,
        residual_std: f64,
    ) -> ForecastPoint {
        let half_width = self.config.interval_z * residual_std;
        ForecastPoint::new(entity_id, date, estimate, estimate - half_width, estimate + half_width)
    }
}

/// Linear trend plus per-slot seasonal offsets, both fitted on the observed
/// series. With one observation the trend degenerates to a constant.
struct AdditiveFit {
    intercept: f64,
    slope: f64,
    seasonal: Vec<f64>,
    residual_std: f64,
}

impl AdditiveFit {
    fn fit(values: &[f64], slots: &[usize], slot_count: usize) -> Self {
        let n = values.len() as f64;
        let mean_t = (values.len() - 1) as f64 / 2.0;
        let mean_y: f64 = values.iter().sum::<f64>() / n;

        let mut covariance = 0.0;
        let mut variance = 0.0;
        for (i, y) in values.iter().enumerate() {
            let dt = i as f64 - mean_t;
            covariance += dt * (y - mean_y);
            variance += dt * dt;
        }
        let slope = if variance > 0.0 { covariance / variance } else { 0.0 };
        let intercept = mean_y - slope * mean_t;

        // Seasonal component: mean detrended residual per slot. Slots that
        // never occur in the history contribute no offset.
        let mut slot_sums = vec![0.0; slot_count];
        let mut slot_counts = vec![0usize; slot_count];
        for (i, (y, slot)) in values.iter().zip(slots).enumerate() {
            slot_sums[*slot] += y - (intercept + slope * i as f64);
            slot_counts[*slot] += 1;
        }
        let seasonal: Vec<f64> = slot_sums
            .iter()
            .zip(&slot_counts)
            .map(|(sum, count)| if *count > 0 { sum / *count as f64 } else { 0.0 })
            .collect();

        let residuals: Vec<f64> = values
            .iter()
            .zip(slots)
            .enumerate()
            .map(|(i, (y, slot))| y - (intercept + slope * i as f64 + seasonal[*slot]))
            .collect();
        let residual_var = residuals.iter().map(|r| r * r).sum::<f64>() / n;

        Self { intercept, slope, seasonal, residual_std: residual_var.sqrt() }
    }

    fn predict(&self, t: f64, slot: usize) -> f64 {
        self.intercept + self.slope * t + self.seasonal.get(slot).copied().unwrap_or(0.0)
    }
}

fn weekday_slot(date: NaiveDate) -> usize {
    date.weekday().num_days_from_monday() as usize
}

fn week_start(date: NaiveDate) -> NaiveDate {
    let back = date.weekday().num_days_from_monday() as u64;
    date.checked_sub_days(Days::new(back)).unwrap_or(date)
}

/// Sum observations per calendar day, then fill every day between the first
/// and last observation so gaps read as zero demand.
pub fn bucket_daily(observations: &[DemandPoint]) -> Vec<(NaiveDate, f64)> {
    fill_buckets(sum_by(observations, |date| date), 1)
}

/// Sum observations per Monday-anchored week, zero-filling skipped weeks.
pub fn bucket_weekly(observations: &[DemandPoint]) -> Vec<(NaiveDate, f64)> {
    fill_buckets(sum_by(observations, week_start), 7)
}

fn sum_by(
    observations: &[DemandPoint],
    key: impl Fn(NaiveDate) -> NaiveDate,
) -> BTreeMap<NaiveDate, f64> {
    let mut sums = BTreeMap::new();
    for obs in observations {
        *sums.entry(key(obs.date)).or_insert(0.0) += obs.quantity;
    }
    sums
}

fn fill_buckets(sums: BTreeMap<NaiveDate, f64>, step_days: u64) -> Vec<(NaiveDate, f64)> {
    let (Some(first), Some(last)) = (sums.keys().next().copied(), sums.keys().last().copied())
    else {
        return Vec::new();
    };

    let mut buckets = Vec::new();
    let mut cursor = first;
    while cursor <= last {
        buckets.push((cursor, sums.get(&cursor).copied().unwrap_or(0.0)));
        match cursor.checked_add_days(Days::new(step_days)) {
            Some(next) => cursor = next,
            None => break,
        }
    }
    buckets
}

#[cfg(test)]
mod tests {
    use chrono::Weekday;

    use super::*;
    use crate::config::AnalyticsConfig;

    fn forecaster() -> Forecaster {
        Forecaster::new(AnalyticsConfig::default().forecast)
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn daily_series(start: NaiveDate, quantities: &[f64]) -> Vec<DemandPoint> {
        quantities
            .iter()
            .enumerate()
            .map(|(i, &q)| DemandPoint {
                date: start.checked_add_days(Days::new(i as u64)).unwrap(),
                quantity: q,
            })
            .collect()
    }

    #[test]
    fn short_history_is_reported_not_forecast() {
        let obs = daily_series(date(2025, 6, 1), &[1.0, 2.0, 3.0]);
        let outcome = forecaster().forecast_product_demand(7, &obs);
        assert_eq!(
            outcome,
            ForecastOutcome::InsufficientHistory { observed_periods: 3, required_periods: 10 }
        );
        assert!(outcome.points().is_empty());
    }

    #[test]
    fn product_forecast_covers_horizon_strictly_after_history() {
        let obs =
            daily_series(date(2025, 6, 1), &[5.0, 6.0, 4.0, 5.0, 7.0, 6.0, 5.0, 6.0, 7.0, 5.0, 6.0, 8.0]);
        let last_observed = date(2025, 6, 12);

        let outcome = forecaster().forecast_product_demand(7, &obs);
        let points = outcome.points();
        assert_eq!(points.len(), 30);
        assert_eq!(points[0].date, date(2025, 6, 13));
        for point in points {
            assert!(point.date > last_observed);
            assert!(point.lower_bound <= point.point_estimate);
            assert!(point.point_estimate <= point.upper_bound);
            assert_eq!(point.entity_id, 7);
        }
    }

    #[test]
    fn rising_demand_forecasts_above_history_mean() {
        let obs = daily_series(
            date(2025, 6, 1),
            &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0, 11.0, 12.0],
        );
        let outcome = forecaster().forecast_product_demand(1, &obs);
        let mean = 6.5;
        assert!(outcome.points().iter().all(|p| p.point_estimate > mean));
    }

    #[test]
    fn constant_series_yields_tight_intervals() {
        let obs = daily_series(date(2025, 6, 2), &[4.0; 14]);
        let outcome = forecaster().forecast_product_demand(1, &obs);
        for point in outcome.points() {
            assert!((point.point_estimate - 4.0).abs() < 1e-9);
            assert!(point.uncertainty() < 1e-9);
        }
    }

    #[test]
    fn customer_forecast_uses_weekly_buckets() {
        // Four orders across four distinct weeks.
        let obs = vec![
            DemandPoint { date: date(2025, 6, 2), quantity: 100.0 },
            DemandPoint { date: date(2025, 6, 10), quantity: 110.0 },
            DemandPoint { date: date(2025, 6, 18), quantity: 120.0 },
            DemandPoint { date: date(2025, 6, 26), quantity: 130.0 },
        ];
        let outcome = forecaster().forecast_customer_spend(3, &obs);
        let points = outcome.points();
        assert_eq!(points.len(), 8);
        // Last observed week starts Monday 2025-06-23; forecasts start a
        // week later and stay Monday-anchored.
        assert_eq!(points[0].date, date(2025, 6, 30));
        for pair in points.windows(2) {
            assert_eq!((pair[1].date - pair[0].date).num_days(), 7);
        }
    }

    #[test]
    fn two_weeks_of_orders_is_insufficient_for_customers() {
        let obs = vec![
            DemandPoint { date: date(2025, 6, 2), quantity: 50.0 },
            DemandPoint { date: date(2025, 6, 12), quantity: 60.0 },
        ];
        let outcome = forecaster().forecast_customer_spend(3, &obs);
        assert_eq!(
            outcome,
            ForecastOutcome::InsufficientHistory { observed_periods: 2, required_periods: 3 }
        );
    }

    #[test]
    fn daily_buckets_zero_fill_gaps() {
        let obs = vec![
            DemandPoint { date: date(2025, 6, 1), quantity: 2.0 },
            DemandPoint { date: date(2025, 6, 1), quantity: 3.0 },
            DemandPoint { date: date(2025, 6, 4), quantity: 1.0 },
        ];
        let buckets = bucket_daily(&obs);
        assert_eq!(
            buckets,
            vec![
                (date(2025, 6, 1), 5.0),
                (date(2025, 6, 2), 0.0),
                (date(2025, 6, 3), 0.0),
                (date(2025, 6, 4), 1.0),
            ]
        );
    }

    #[test]
    fn weekly_buckets_anchor_on_monday() {
        let obs = vec![
            DemandPoint { date: date(2025, 6, 4), quantity: 10.0 }, // Wednesday
            DemandPoint { date: date(2025, 6, 8), quantity: 5.0 },  // Sunday, same week
            DemandPoint { date: date(2025, 6, 16), quantity: 7.0 }, // Monday, two weeks on
        ];
        let buckets = bucket_weekly(&obs);
        assert_eq!(
            buckets,
            vec![
                (date(2025, 6, 2), 15.0),
                (date(2025, 6, 9), 0.0),
                (date(2025, 6, 16), 7.0),
            ]
        );
    }

    #[test]
    fn empty_history_has_no_buckets() {
        assert!(bucket_daily(&[]).is_empty());
        assert!(bucket_weekly(&[]).is_empty());
    }

    #[test]
    fn week_start_is_identity_on_mondays() {
        let monday = date(2025, 6, 2);
        assert_eq!(monday.weekday(), Weekday::Mon);
        assert_eq!(week_start(monday), monday);
        assert_eq!(week_start(date(2025, 6, 7)), monday);
    }
}
