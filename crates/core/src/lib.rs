pub mod classify;
pub mod config;
pub mod domain;
pub mod errors;
pub mod forecast;
pub mod offers;
pub mod pipeline;
pub mod reorder;
pub mod segment;

pub use classify::Classifier;
pub use config::{
    AnalyticsConfig, AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat,
    LoggingConfig, WhatsAppConfig,
};
pub use domain::classification::{
    BehaviorTier, ChurnRisk, ClassificationRecord, Segment, SpendTier,
};
pub use domain::customer::{CustomerAggregate, CustomerId, OrderHistory, ProductQuantity};
pub use domain::forecast::{ForecastOutcome, ForecastPoint};
pub use domain::offer::OfferDecision;
pub use domain::product::{DemandPoint, ProductAggregate, ProductId};
pub use errors::{PipelineError, SkipReason};
pub use forecast::Forecaster;
pub use offers::OfferTable;
pub use pipeline::{AnalyticsPipeline, ClassificationRun, ForecastRun};
pub use reorder::{
    select_reminders, simulate_days, CooldownPolicy, CooldownState, ReminderRun,
    ReminderSelection, ReminderSkip,
};
pub use segment::SegmentationEngine;
