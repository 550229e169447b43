//! Batch orchestration: classification, segmentation, forecasting, and offer
//! assignment over whole customer and product populations.
//!
//! One entity's bad data never aborts a batch. Entities that cannot be
//! processed are recorded as skips with a reason and the run carries on.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::classify::Classifier;
use crate::config::AnalyticsConfig;
use crate::domain::classification::{ClassificationRecord, Segment};
use crate::domain::customer::{CustomerAggregate, CustomerId};
use crate::domain::forecast::ForecastOutcome;
use crate::domain::offer::OfferDecision;
use crate::domain::product::{DemandPoint, ProductAggregate, ProductId};
use crate::errors::SkipReason;
use crate::forecast::Forecaster;
use crate::offers::OfferTable;
use crate::segment::SegmentationEngine;

/// One full classification pass over the customer population.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClassificationRun {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub run_date: NaiveDate,
    pub records: Vec<ClassificationRecord>,
    pub skipped: Vec<(CustomerId, SkipReason)>,
}

/// Forecasts plus offer decisions for one entity population.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ForecastRun {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub forecasts: Vec<(i64, ForecastOutcome)>,
    pub offers: Vec<OfferDecision>,
    pub skipped: Vec<(i64, SkipReason)>,
}

#[derive(Clone, Debug)]
pub struct AnalyticsPipeline {
    classifier: Classifier,
    segmentation: SegmentationEngine,
    forecaster: Forecaster,
    customer_offers: OfferTable,
    product_offers: OfferTable,
    cv_epsilon: f64,
}

impl AnalyticsPipeline {
    pub fn new(config: &AnalyticsConfig) -> Self {
        Self {
            classifier: Classifier::new(
                config.behavior.clone(),
                config.churn.clone(),
                config.spend.clone(),
            ),
            segmentation: SegmentationEngine::new(config.segmentation.clone()),
            forecaster: Forecaster::new(config.forecast.clone()),
            customer_offers: config.offers.customer.clone(),
            product_offers: config.offers.product.clone(),
            cv_epsilon: config.forecast.cv_epsilon,
        }
    }

    /// Classify and segment every customer aggregate as of `run_date`.
    pub fn classify_customers(
        &self,
        aggregates: &[CustomerAggregate],
        run_date: NaiveDate,
    ) -> ClassificationRun {
        let run_id = Uuid::new_v4();
        info!(
            event_name = "classification_started",
            %run_id,
            customer_count = aggregates.len(),
            %run_date,
        );

        let segments = self.segmentation.segment_customers(aggregates, run_date);
        let mut records = Vec::with_capacity(aggregates.len());
        let skipped = Vec::new();

        for aggregate in aggregates {
            let (behavior_tier, churn_risk, spend_tier) =
                self.classifier.classify(aggregate, run_date);
            let segment = segments
                .get(&aggregate.id)
                .cloned()
                .unwrap_or(Segment::Unsegmented);

            debug!(
                event_name = "customer_classified",
                customer_id = %aggregate.id,
                behavior_tier = ?behavior_tier,
                churn_risk = ?churn_risk,
            );
            records.push(ClassificationRecord {
                customer_id: aggregate.id,
                customer_name: aggregate.name.clone(),
                phone: aggregate.phone.clone(),
                order_count: aggregate.order_count,
                total_spent: aggregate.total_spent,
                last_order_date: aggregate.last_order_date,
                behavior_tier,
                churn_risk,
                spend_tier,
                segment,
            });
        }

        info!(
            event_name = "classification_finished",
            %run_id,
            record_count = records.len(),
            skip_count = skipped.len(),
        );
        ClassificationRun { run_id, generated_at: Utc::now(), run_date, records, skipped }
    }

    /// Forecast daily demand per product and pick an offer from the projected
    /// horizon total. Products without enough history become skips.
    pub fn forecast_products(
        &self,
        demand: &[(ProductId, Vec<DemandPoint>)],
    ) -> ForecastRun {
        self.forecast_population(
            demand.iter().map(|(id, obs)| (id.0, obs.as_slice())),
            &self.product_offers,
            |entity_id, observations| self.forecaster.forecast_product_demand(entity_id, observations),
        )
    }

    /// Forecast weekly spend per customer and pick an offer the same way.
    pub fn forecast_customers(
        &self,
        spend: &[(CustomerId, Vec<DemandPoint>)],
    ) -> ForecastRun {
        self.forecast_population(
            spend.iter().map(|(id, obs)| (id.0, obs.as_slice())),
            &self.customer_offers,
            |entity_id, observations| self.forecaster.forecast_customer_spend(entity_id, observations),
        )
    }

    fn forecast_population<'a>(
        &self,
        populations: impl Iterator<Item = (i64, &'a [DemandPoint])>,
        offers: &OfferTable,
        fit: impl Fn(i64, &[DemandPoint]) -> ForecastOutcome,
    ) -> ForecastRun {
        let run_id = Uuid::new_v4();
        let mut forecasts = Vec::new();
        let mut decisions = Vec::new();
        let mut skipped = Vec::new();

        for (entity_id, observations) in populations {
            let outcome = fit(entity_id, observations);
            match &outcome {
                ForecastOutcome::Forecast { points } => {
                    let (projected, cv) = horizon_summary(points, self.cv_epsilon);
                    let decision = offers.decide(entity_id, projected, cv);
                    debug!(
                        event_name = "offer_decided",
                        entity_id,
                        projected,
                        action = decision.action.as_deref().unwrap_or("none"),
                    );
                    decisions.push(decision);
                }
                ForecastOutcome::InsufficientHistory { observed_periods, required_periods } => {
                    warn!(
                        event_name = "forecast_skipped",
                        entity_id,
                        observed_periods,
                        required_periods,
                    );
                    skipped.push((
                        entity_id,
                        SkipReason::InsufficientHistory {
                            observed: *observed_periods,
                            required: *required_periods,
                        },
                    ));
                }
            }
            forecasts.push((entity_id, outcome));
        }

        info!(
            event_name = "forecast_finished",
            %run_id,
            forecast_count = forecasts.len(),
            offer_count = decisions.len(),
            skip_count = skipped.len(),
        );
        ForecastRun { run_id, generated_at: Utc::now(), forecasts, offers: decisions, skipped }
    }

    /// Segment the product population as of `run_date`.
    pub fn segment_products(
        &self,
        aggregates: &[ProductAggregate],
        run_date: NaiveDate,
    ) -> Vec<(ProductId, Segment)> {
        let mut segments: Vec<(ProductId, Segment)> = self
            .segmentation
            .segment_products(aggregates, run_date)
            .into_iter()
            .collect();
        segments.sort_by_key(|(id, _)| *id);
        segments
    }
}

/// Projected horizon total and its aggregate coefficient of variation. The
/// total sums display estimates so negative tails do not cancel real demand;
/// the cv compares summed uncertainty to the summed raw estimates, and is
/// undefined when those are at or below `epsilon`.
fn horizon_summary(points: &[crate::domain::forecast::ForecastPoint], epsilon: f64) -> (f64, Option<f64>) {
    let projected: f64 = points.iter().map(|p| p.display_estimate()).sum();
    let raw_total: f64 = points.iter().map(|p| p.point_estimate).sum();
    let uncertainty: f64 = points.iter().map(|p| p.uncertainty()).sum();
    let cv = if raw_total > epsilon { Some(uncertainty / raw_total) } else { None };
    (projected, cv)
}
