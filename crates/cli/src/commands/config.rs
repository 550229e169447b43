use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use cadence_core::config::AppConfig;
use secrecy::ExposeSecret;
use toml::Value;

/// Render the effective configuration with per-field source attribution.
/// Secrets are redacted before printing.
pub fn run(config: &AppConfig) -> String {
    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines = vec!["effective config (source precedence: cli > env > file > default):".to_string()];

    let mut push = |field: &str, value: &str, env_var: Option<&str>| {
        let source =
            field_source(field, env_var, config_file_doc.as_ref(), config_file_path.as_deref());
        lines.push(format!("  {field} = {value}  [{source}]"));
    };

    push("database.url", &config.database.url, Some("CADENCE_DATABASE_URL"));
    push(
        "database.max_connections",
        &config.database.max_connections.to_string(),
        Some("CADENCE_DATABASE_MAX_CONNECTIONS"),
    );
    push(
        "analytics.behavior.cutoff_date",
        &config.analytics.behavior.cutoff_date.to_string(),
        Some("CADENCE_BEHAVIOR_CUTOFF_DATE"),
    );
    push(
        "analytics.segmentation.seed",
        &config.analytics.segmentation.seed.to_string(),
        Some("CADENCE_SEGMENTATION_SEED"),
    );
    push(
        "analytics.segmentation.cluster_count",
        &config.analytics.segmentation.cluster_count.to_string(),
        None,
    );
    push(
        "analytics.cooldown",
        &format!(
            "loyal={} frequent={} default={}",
            config.analytics.cooldown.loyal_days,
            config.analytics.cooldown.frequent_days,
            config.analytics.cooldown.default_days
        ),
        None,
    );
    push(
        "whatsapp.access_token",
        &redact_token(config.whatsapp.access_token.expose_secret()),
        Some("CADENCE_WHATSAPP_ACCESS_TOKEN"),
    );
    push("whatsapp.country_code", &config.whatsapp.country_code, Some("CADENCE_WHATSAPP_COUNTRY_CODE"));
    push("logging.level", &config.logging.level, Some("CADENCE_LOGGING_LEVEL"));

    lines.join("\n")
}

fn detect_config_path() -> Option<PathBuf> {
    [PathBuf::from("cadence.toml"), PathBuf::from("config/cadence.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    field: &str,
    env_var: Option<&str>,
    file_doc: Option<&Value>,
    file_path: Option<&Path>,
) -> String {
    if let Some(var) = env_var {
        if env::var(var).map(|v| !v.trim().is_empty()).unwrap_or(false) {
            return format!("env:{var}");
        }
    }
    if let (Some(doc), Some(path)) = (file_doc, file_path) {
        if file_has_field(doc, field) {
            return format!("file:{}", path.display());
        }
    }
    "default".to_string()
}

fn file_has_field(doc: &Value, field: &str) -> bool {
    let mut cursor = doc;
    for segment in field.split('.') {
        match cursor.get(segment) {
            Some(next) => cursor = next,
            None => return false,
        }
    }
    true
}

fn redact_token(token: &str) -> String {
    if token.is_empty() {
        "(unset)".to_string()
    } else if token.len() <= 8 {
        "****".to_string()
    } else {
        format!("{}****", &token[..4])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redaction_never_echoes_short_tokens() {
        assert_eq!(redact_token(""), "(unset)");
        assert_eq!(redact_token("abcd1234"), "****");
        assert_eq!(redact_token("abcd1234efgh"), "abcd****");
    }

    #[test]
    fn nested_field_lookup_walks_toml_tables() {
        let doc: Value = "[analytics.segmentation]\nseed = 7\n".parse().unwrap();
        assert!(file_has_field(&doc, "analytics.segmentation.seed"));
        assert!(!file_has_field(&doc, "analytics.segmentation.cluster_count"));
    }

    #[test]
    fn output_redacts_the_access_token() {
        let mut config = AppConfig::default();
        config.whatsapp.access_token = "super-secret-token-value".to_string().into();
        let rendered = run(&config);
        assert!(!rendered.contains("super-secret-token-value"));
        assert!(rendered.contains("supe****"));
    }
}
