use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::offers::OfferTable;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub analytics: AnalyticsConfig,
    pub whatsapp: WhatsAppConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

/// Every business threshold the pipeline consults. All of these are tunable
/// without recompiling: file, environment, or CLI override.
#[derive(Clone, Debug)]
pub struct AnalyticsConfig {
    pub behavior: BehaviorThresholds,
    pub churn: ChurnThresholds,
    pub spend: SpendThresholds,
    pub segmentation: SegmentationConfig,
    pub forecast: ForecastConfig,
    pub cooldown: CooldownConfig,
    pub offers: OfferRuleConfig,
}

/// Order-count bands for the behavior tiers. A single order placed before
/// `cutoff_date` marks the customer Dead rather than New.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct BehaviorThresholds {
    pub cutoff_date: NaiveDate,
    pub occasional_max_orders: u32,
    pub frequent_max_orders: u32,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ChurnThresholds {
    /// Recency strictly below this is Low risk.
    pub low_max_days: i64,
    /// Recency strictly below this (and at or above low) is Medium risk.
    pub medium_max_days: i64,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct SpendThresholds {
    pub medium_min: Decimal,
    pub high_min: Decimal,
    pub vip_min: Decimal,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct SegmentationConfig {
    pub cluster_count: usize,
    pub seed: u64,
    /// Cluster index -> label, customer batches. Length must equal
    /// `cluster_count`.
    pub customer_labels: Vec<String>,
    /// Cluster index -> label, product batches.
    pub product_labels: Vec<String>,
    /// Recency substitute when an entity has orders but no usable last date.
    pub missing_recency_days: i64,
    pub max_iterations: usize,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ForecastConfig {
    pub product_horizon_days: u32,
    pub customer_horizon_weeks: u32,
    pub product_min_daily_periods: usize,
    pub customer_min_weekly_periods: usize,
    /// Interval half-width in residual standard deviations.
    pub interval_z: f64,
    /// Point estimates at or below this have an undefined coefficient of
    /// variation.
    pub cv_epsilon: f64,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct CooldownConfig {
    pub loyal_days: i64,
    pub frequent_days: i64,
    pub default_days: i64,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct OfferRuleConfig {
    pub customer: OfferTable,
    pub product: OfferTable,
}

#[derive(Clone, Debug)]
pub struct WhatsAppConfig {
    pub access_token: SecretString,
    pub phone_number_id: String,
    /// Dialing prefix applied by phone normalization.
    pub country_code: String,
    /// Digits in a bare local subscriber number.
    pub local_number_len: usize,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub segmentation_seed: Option<u64>,
    pub behavior_cutoff_date: Option<NaiveDate>,
    pub whatsapp_access_token: Option<String>,
    pub whatsapp_phone_number_id: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://cadence.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            analytics: AnalyticsConfig::default(),
            whatsapp: WhatsAppConfig {
                access_token: String::new().into(),
                phone_number_id: String::new(),
                country_code: "965".to_string(),
                local_number_len: 8,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            behavior: BehaviorThresholds {
                cutoff_date: NaiveDate::from_ymd_opt(2025, 1, 1).expect("valid cutoff date"),
                occasional_max_orders: 5,
                frequent_max_orders: 15,
            },
            churn: ChurnThresholds { low_max_days: 30, medium_max_days: 90 },
            spend: SpendThresholds {
                medium_min: Decimal::from(50),
                high_min: Decimal::from(200),
                vip_min: Decimal::from(1000),
            },
            segmentation: SegmentationConfig {
                cluster_count: 4,
                seed: 42,
                customer_labels: vec![
                    "Loyal At-Risk".to_string(),
                    "Dormant Customers".to_string(),
                    "Cold Leads".to_string(),
                    "Lost One-Timers".to_string(),
                ],
                product_labels: vec![
                    "High Velocity".to_string(),
                    "Seasonal Movers".to_string(),
                    "Slow Stock".to_string(),
                    "Dormant Items".to_string(),
                ],
                missing_recency_days: 999,
                max_iterations: 100,
            },
            forecast: ForecastConfig {
                product_horizon_days: 30,
                customer_horizon_weeks: 8,
                product_min_daily_periods: 10,
                customer_min_weekly_periods: 3,
                interval_z: 1.28,
                cv_epsilon: 1e-9,
            },
            cooldown: CooldownConfig { loyal_days: 14, frequent_days: 10, default_days: 7 },
            offers: OfferRuleConfig {
                customer: OfferTable::customer_default(),
                product: OfferTable::product_default(),
            },
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    analytics: Option<AnalyticsPatch>,
    whatsapp: Option<WhatsAppPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct AnalyticsPatch {
    behavior: Option<BehaviorThresholds>,
    churn: Option<ChurnThresholds>,
    spend: Option<SpendThresholds>,
    segmentation: Option<SegmentationConfig>,
    forecast: Option<ForecastConfig>,
    cooldown: Option<CooldownConfig>,
    offers: Option<OfferRuleConfig>,
}

#[derive(Debug, Default, Deserialize)]
struct WhatsAppPatch {
    access_token: Option<String>,
    phone_number_id: Option<String>,
    country_code: Option<String>,
    local_number_len: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("cadence.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }

        if let Some(analytics) = patch.analytics {
            if let Some(behavior) = analytics.behavior {
                self.analytics.behavior = behavior;
            }
            if let Some(churn) = analytics.churn {
                self.analytics.churn = churn;
            }
            if let Some(spend) = analytics.spend {
                self.analytics.spend = spend;
            }
            if let Some(segmentation) = analytics.segmentation {
                self.analytics.segmentation = segmentation;
            }
            if let Some(forecast) = analytics.forecast {
                self.analytics.forecast = forecast;
            }
            if let Some(cooldown) = analytics.cooldown {
                self.analytics.cooldown = cooldown;
            }
            if let Some(offers) = analytics.offers {
                self.analytics.offers = offers;
            }
        }

        if let Some(whatsapp) = patch.whatsapp {
            if let Some(token) = whatsapp.access_token {
                self.whatsapp.access_token = token.into();
            }
            if let Some(phone_number_id) = whatsapp.phone_number_id {
                self.whatsapp.phone_number_id = phone_number_id;
            }
            if let Some(country_code) = whatsapp.country_code {
                self.whatsapp.country_code = country_code;
            }
            if let Some(local_number_len) = whatsapp.local_number_len {
                self.whatsapp.local_number_len = local_number_len;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("CADENCE_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("CADENCE_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = parse_u32("CADENCE_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("CADENCE_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_u64("CADENCE_DATABASE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("CADENCE_BEHAVIOR_CUTOFF_DATE") {
            self.analytics.behavior.cutoff_date =
                parse_date("CADENCE_BEHAVIOR_CUTOFF_DATE", &value)?;
        }
        if let Some(value) = read_env("CADENCE_SEGMENTATION_SEED") {
            self.analytics.segmentation.seed = parse_u64("CADENCE_SEGMENTATION_SEED", &value)?;
        }

        if let Some(value) = read_env("CADENCE_WHATSAPP_ACCESS_TOKEN") {
            self.whatsapp.access_token = value.into();
        }
        if let Some(value) = read_env("CADENCE_WHATSAPP_PHONE_NUMBER_ID") {
            self.whatsapp.phone_number_id = value;
        }
        if let Some(value) = read_env("CADENCE_WHATSAPP_COUNTRY_CODE") {
            self.whatsapp.country_code = value;
        }

        let log_level = read_env("CADENCE_LOGGING_LEVEL").or_else(|| read_env("CADENCE_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("CADENCE_LOGGING_FORMAT").or_else(|| read_env("CADENCE_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(database_url) = overrides.database_url {
            self.database.url = database_url;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(seed) = overrides.segmentation_seed {
            self.analytics.segmentation.seed = seed;
        }
        if let Some(cutoff) = overrides.behavior_cutoff_date {
            self.analytics.behavior.cutoff_date = cutoff;
        }
        if let Some(token) = overrides.whatsapp_access_token {
            self.whatsapp.access_token = token.into();
        }
        if let Some(phone_number_id) = overrides.whatsapp_phone_number_id {
            self.whatsapp.phone_number_id = phone_number_id;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_analytics(&self.analytics)?;
        validate_whatsapp(&self.whatsapp)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("cadence.toml"), PathBuf::from("config/cadence.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_database(database: &DatabaseConfig) -> Result<(), ConfigError> {
    let url = database.url.trim();
    let sqlite_url =
        url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:";
    if !sqlite_url {
        return Err(ConfigError::Validation(
            "database.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)"
                .to_string(),
        ));
    }

    if database.max_connections == 0 {
        return Err(ConfigError::Validation(
            "database.max_connections must be greater than zero".to_string(),
        ));
    }

    if database.timeout_secs == 0 || database.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "database.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_analytics(analytics: &AnalyticsConfig) -> Result<(), ConfigError> {
    let behavior = &analytics.behavior;
    if behavior.occasional_max_orders < 2 {
        return Err(ConfigError::Validation(
            "analytics.behavior.occasional_max_orders must be at least 2".to_string(),
        ));
    }
    if behavior.frequent_max_orders <= behavior.occasional_max_orders {
        return Err(ConfigError::Validation(
            "analytics.behavior.frequent_max_orders must exceed occasional_max_orders".to_string(),
        ));
    }

    let churn = &analytics.churn;
    if churn.low_max_days <= 0 || churn.medium_max_days <= churn.low_max_days {
        return Err(ConfigError::Validation(
            "analytics.churn thresholds must satisfy 0 < low_max_days < medium_max_days"
                .to_string(),
        ));
    }

    let spend = &analytics.spend;
    if !(spend.medium_min < spend.high_min && spend.high_min < spend.vip_min) {
        return Err(ConfigError::Validation(
            "analytics.spend breakpoints must be strictly increasing".to_string(),
        ));
    }

    let segmentation = &analytics.segmentation;
    if segmentation.cluster_count == 0 {
        return Err(ConfigError::Validation(
            "analytics.segmentation.cluster_count must be greater than zero".to_string(),
        ));
    }
    if segmentation.customer_labels.len() != segmentation.cluster_count
        || segmentation.product_labels.len() != segmentation.cluster_count
    {
        return Err(ConfigError::Validation(format!(
            "analytics.segmentation label tables must have exactly {} entries",
            segmentation.cluster_count
        )));
    }
    if segmentation.max_iterations == 0 {
        return Err(ConfigError::Validation(
            "analytics.segmentation.max_iterations must be greater than zero".to_string(),
        ));
    }

    let forecast = &analytics.forecast;
    if forecast.product_horizon_days == 0 || forecast.customer_horizon_weeks == 0 {
        return Err(ConfigError::Validation(
            "analytics.forecast horizons must be greater than zero".to_string(),
        ));
    }
    if forecast.interval_z <= 0.0 || !forecast.interval_z.is_finite() {
        return Err(ConfigError::Validation(
            "analytics.forecast.interval_z must be a positive finite number".to_string(),
        ));
    }
    if forecast.cv_epsilon < 0.0 || !forecast.cv_epsilon.is_finite() {
        return Err(ConfigError::Validation(
            "analytics.forecast.cv_epsilon must be a non-negative finite number".to_string(),
        ));
    }

    let cooldown = &analytics.cooldown;
    if cooldown.loyal_days <= 0 || cooldown.frequent_days <= 0 || cooldown.default_days <= 0 {
        return Err(ConfigError::Validation(
            "analytics.cooldown day counts must be greater than zero".to_string(),
        ));
    }

    analytics.offers.customer.validate("analytics.offers.customer")?;
    analytics.offers.product.validate("analytics.offers.product")?;

    Ok(())
}

fn validate_whatsapp(whatsapp: &WhatsAppConfig) -> Result<(), ConfigError> {
    if whatsapp.country_code.is_empty() || !whatsapp.country_code.chars().all(|c| c.is_ascii_digit())
    {
        return Err(ConfigError::Validation(
            "whatsapp.country_code must be a non-empty digit string".to_string(),
        ));
    }
    if whatsapp.local_number_len == 0 || whatsapp.local_number_len > 12 {
        return Err(ConfigError::Validation(
            "whatsapp.local_number_len must be in range 1..=12".to_string(),
        ));
    }
    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    const LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];
    let level = logging.level.trim().to_ascii_lowercase();
    if !LEVELS.contains(&level.as_str()) {
        return Err(ConfigError::Validation(format!(
            "logging.level must be one of trace|debug|info|warn|error, got `{}`",
            logging.level
        )));
    }
    Ok(())
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().map(|value| value.trim().to_string()).filter(|value| !value.is_empty())
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_date(key: &str, value: &str) -> Result<NaiveDate, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn defaults_validate() {
        AppConfig::default().validate().expect("default config should be valid");
    }

    #[test]
    fn default_thresholds_match_documented_business_rules() {
        let config = AppConfig::default();
        assert_eq!(config.analytics.churn.low_max_days, 30);
        assert_eq!(config.analytics.churn.medium_max_days, 90);
        assert_eq!(config.analytics.spend.medium_min, Decimal::from(50));
        assert_eq!(config.analytics.spend.vip_min, Decimal::from(1000));
        assert_eq!(config.analytics.segmentation.cluster_count, 4);
        assert_eq!(config.analytics.cooldown.loyal_days, 14);
    }

    #[test]
    fn file_patch_overrides_defaults() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(
            file,
            r#"
[database]
url = "sqlite::memory:"

[analytics.churn]
low_max_days = 14
medium_max_days = 60

[analytics.segmentation]
cluster_count = 2
seed = 7
customer_labels = ["A", "B"]
product_labels = ["C", "D"]
missing_recency_days = 500
max_iterations = 50

[logging]
level = "debug"
format = "json"
"#
        )
        .expect("write config");

        let config = AppConfig::load(LoadOptions {
            config_path: Some(file.path().to_path_buf()),
            require_file: true,
            overrides: ConfigOverrides::default(),
        })
        .expect("load config");

        assert_eq!(config.database.url, "sqlite::memory:");
        assert_eq!(config.analytics.churn.low_max_days, 14);
        assert_eq!(config.analytics.segmentation.cluster_count, 2);
        assert_eq!(config.analytics.segmentation.seed, 7);
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn missing_required_file_is_an_error() {
        let result = AppConfig::load(LoadOptions {
            config_path: Some(PathBuf::from("/definitely/not/here/cadence.toml")),
            require_file: true,
            overrides: ConfigOverrides::default(),
        });
        assert!(matches!(result, Err(ConfigError::MissingConfigFile(_))));
    }

    #[test]
    fn label_table_length_must_match_cluster_count() {
        let mut config = AppConfig::default();
        config.analytics.segmentation.customer_labels.pop();
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn spend_breakpoints_must_increase() {
        let mut config = AppConfig::default();
        config.analytics.spend.high_min = Decimal::from(10);
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn cli_overrides_win_over_defaults() {
        let config = AppConfig::load(LoadOptions {
            config_path: Some(PathBuf::from("/nonexistent/cadence.toml")),
            require_file: false,
            overrides: ConfigOverrides {
                database_url: Some("sqlite://override.db".to_string()),
                segmentation_seed: Some(99),
                ..ConfigOverrides::default()
            },
        })
        .expect("load config");

        assert_eq!(config.database.url, "sqlite://override.db");
        assert_eq!(config.analytics.segmentation.seed, 99);
    }

    #[test]
    fn interpolation_rejects_unterminated_expression() {
        assert!(matches!(
            interpolate_env_vars("value = \"${UNCLOSED"),
            Err(ConfigError::UnterminatedInterpolation)
        ));
    }
}
