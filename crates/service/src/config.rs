//! Service configuration
//!
//! Layered as built-in defaults, then an optional TOML file, then
//! `CHURN_*` environment variables (e.g. `CHURN_PORT`, `CHURN_MODEL_PATH`).

use config::{Config, Environment, File as ConfigFile};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::errors::ServiceError;

pub const ENV_PREFIX: &str = "CHURN";

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl LogFormat {
    fn parse(value: &str) -> Result<Self, ServiceError> {
        match value.to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(ServiceError::Config(format!(
                "log_format must be `pretty` or `json`, got `{other}`"
            ))),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogFormat::Pretty => write!(f, "pretty"),
            LogFormat::Json => write!(f, "json"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceConfig {
    pub host: String,
    pub port: u16,
    pub model_path: PathBuf,
    pub log_level: String,
    pub log_format: LogFormat,
    /// Exit at startup when the artifact cannot be loaded
    pub fail_fast: bool,
    /// Answer 400 for categorical values the encoder never saw
    pub reject_unknown_categories: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 9696,
            model_path: PathBuf::from("model.bin"),
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            fail_fast: true,
            reject_unknown_categories: false,
        }
    }
}

impl ServiceConfig {
    /// Load configuration from an optional file plus the environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ServiceError> {
        let mut builder = Config::builder();

        if let Some(path) = path {
            if !path.exists() {
                return Err(ServiceError::Config(format!(
                    "configuration file {} not found",
                    path.display()
                )));
            }
            builder = builder.add_source(ConfigFile::from(path));
        }

        builder = builder.add_source(Environment::with_prefix(ENV_PREFIX));

        Self::from_config(&builder.build()?)
    }

    /// Resolve settings from an already built [`Config`], falling back to
    /// defaults for anything unset.
    pub fn from_config(config: &Config) -> Result<Self, ServiceError> {
        let defaults = Self::default();

        let port = match get_string_value(config, &["port", "server.port"]) {
            Some(raw) => raw
                .parse()
                .map_err(|_| ServiceError::Config(format!("invalid port `{raw}`")))?,
            None => defaults.port,
        };

        let log_format = match get_string_value(config, &["log_format", "logging.format"]) {
            Some(raw) => LogFormat::parse(&raw)?,
            None => defaults.log_format,
        };

        Ok(Self {
            host: get_string_value(config, &["host", "server.host"]).unwrap_or(defaults.host),
            port,
            model_path: get_string_value(config, &["model_path", "model.path"])
                .map(PathBuf::from)
                .unwrap_or(defaults.model_path),
            log_level: get_string_value(config, &["log_level", "logging.level"])
                .unwrap_or(defaults.log_level),
            log_format,
            fail_fast: get_bool_value(config, &["fail_fast", "model.fail_fast"], defaults.fail_fast)?,
            reject_unknown_categories: get_bool_value(
                config,
                &["reject_unknown_categories", "model.reject_unknown_categories"],
                defaults.reject_unknown_categories,
            )?,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn get_string_value(config: &Config, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| {
        config
            .get_string(key)
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    })
}

fn get_bool_value(config: &Config, keys: &[&str], default: bool) -> Result<bool, ServiceError> {
    for key in keys {
        if let Ok(value) = config.get_bool(key) {
            return Ok(value);
        }
        if let Some(raw) = get_string_value(config, &[*key]) {
            return raw
                .parse::<bool>()
                .map_err(|_| ServiceError::Config(format!("{key} must be true or false, got `{raw}`")));
        }
    }
    Ok(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;
    use std::collections::HashMap;

    fn build(toml: &str, env: &[(&str, &str)]) -> Result<ServiceConfig, ServiceError> {
        let vars: HashMap<String, String> = env
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let config = Config::builder()
            .add_source(ConfigFile::from_str(toml, FileFormat::Toml))
            .add_source(Environment::with_prefix(ENV_PREFIX).source(Some(vars)))
            .build()?;
        ServiceConfig::from_config(&config)
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = build("", &[]).unwrap();
        assert_eq!(config, ServiceConfig::default());
        assert_eq!(config.bind_addr(), "0.0.0.0:9696");
    }

    #[test]
    fn file_values_are_read() {
        let config = build(
            r#"
            port = 8080
            model_path = "models/churn.bin"
            log_format = "json"
            fail_fast = false
            "#,
            &[],
        )
        .unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(config.model_path, PathBuf::from("models/churn.bin"));
        assert_eq!(config.log_format, LogFormat::Json);
        assert!(!config.fail_fast);
        assert!(!config.reject_unknown_categories);
    }

    #[test]
    fn environment_overrides_file() {
        let config = build(
            "port = 8080",
            &[("CHURN_PORT", "7000"), ("CHURN_REJECT_UNKNOWN_CATEGORIES", "true")],
        )
        .unwrap();

        assert_eq!(config.port, 7000);
        assert!(config.reject_unknown_categories);
    }

    #[test]
    fn invalid_values_are_errors() {
        assert!(matches!(build("port = \"abc\"", &[]), Err(ServiceError::Config(_))));
        assert!(matches!(build("log_format = \"xml\"", &[]), Err(ServiceError::Config(_))));
        assert!(matches!(build("fail_fast = \"maybe\"", &[]), Err(ServiceError::Config(_))));
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = ServiceConfig::load(Some(Path::new("/nonexistent/churn.toml"))).unwrap_err();
        assert!(matches!(err, ServiceError::Config(_)));
    }
}
