//! Configuration loader and validator for the analysis client.
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::model::Mode;
use crate::session::SessionOptions;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
}

/// Root configuration struct mirroring the YAML schema.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    pub app: App,
    pub gateways: Gateways,
    #[serde(default)]
    pub analysis: Analysis,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct App {
    pub data_dir: String,
}

/// Base URLs of the external services.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Gateways {
    /// Serves `/fetch` and `/generateSummary`.
    pub api_base_url: String,
    /// Serves `/predict`.
    pub classifier_base_url: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

/// Limits that shape one analysis session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Analysis {
    pub page_size: usize,
    pub member_fetch_limit: u32,
    pub guest_fetch_limit: u32,
    pub guest_search_limit: u32,
    pub guest_classify_texts: usize,
    pub visit_window_minutes: u64,
}

impl Default for Analysis {
    fn default() -> Self {
        Self {
            page_size: 10,
            member_fetch_limit: 100,
            guest_fetch_limit: 50,
            guest_search_limit: 3,
            guest_classify_texts: 20,
            visit_window_minutes: 120,
        }
    }
}

fn default_user_agent() -> String {
    "sentiscope/0.1".to_string()
}

impl Config {
    /// Ensure required directories exist (creates `app.data_dir` if missing).
    pub fn ensure_dirs(&self) -> Result<(), std::io::Error> {
        fs::create_dir_all(&self.app.data_dir)
    }

    pub fn api_base_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.gateways.api_base_url)
            .map_err(|_| ConfigError::Invalid("gateways.api_base_url must be an absolute URL"))
    }

    pub fn classifier_base_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.gateways.classifier_base_url).map_err(|_| {
            ConfigError::Invalid("gateways.classifier_base_url must be an absolute URL")
        })
    }

    pub fn visit_window(&self) -> chrono::Duration {
        let minutes = self.analysis.visit_window_minutes.min(MAX_VISIT_WINDOW_MINUTES);
        chrono::Duration::minutes(minutes as i64)
    }

    /// Session limits for the given mode.
    pub fn session_options(&self, mode: &Mode) -> SessionOptions {
        let a = &self.analysis;
        SessionOptions {
            page_size: a.page_size,
            fetch_limit: if mode.is_guest() {
                a.guest_fetch_limit
            } else {
                a.member_fetch_limit
            },
            guest_search_limit: a.guest_search_limit,
            guest_classify_texts: a.guest_classify_texts,
        }
    }
}

/// Load configuration from a YAML file and validate it.
/// - If `path` is None, uses `config.yaml` in the current working directory.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or_else(|| Path::new("config.yaml"));
    let content = fs::read_to_string(path)?;
    let cfg: Config = serde_yaml::from_str(&content)?;
    validate(&cfg)?;
    Ok(cfg)
}

/// One year.
const MAX_VISIT_WINDOW_MINUTES: u64 = 525_600;

fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.app.data_dir.trim().is_empty() {
        return Err(ConfigError::Invalid("app.data_dir must be non-empty"));
    }

    cfg.api_base_url()?;
    cfg.classifier_base_url()?;
    if cfg.gateways.user_agent.trim().is_empty() {
        return Err(ConfigError::Invalid("gateways.user_agent must be non-empty"));
    }

    let a = &cfg.analysis;
    if a.page_size == 0 {
        return Err(ConfigError::Invalid("analysis.page_size must be > 0"));
    }
    if a.member_fetch_limit == 0 || a.member_fetch_limit > 1000 {
        return Err(ConfigError::Invalid(
            "analysis.member_fetch_limit must be between 1 and 1000",
        ));
    }
    if a.guest_fetch_limit == 0 || a.guest_fetch_limit > 1000 {
        return Err(ConfigError::Invalid(
            "analysis.guest_fetch_limit must be between 1 and 1000",
        ));
    }
    if a.guest_search_limit == 0 {
        return Err(ConfigError::Invalid("analysis.guest_search_limit must be > 0"));
    }
    if a.guest_classify_texts == 0 {
        return Err(ConfigError::Invalid("analysis.guest_classify_texts must be > 0"));
    }
    if a.visit_window_minutes > MAX_VISIT_WINDOW_MINUTES {
        return Err(ConfigError::Invalid(
            "analysis.visit_window_minutes must be at most 525600",
        ));
    }

    Ok(())
}

/// Example configuration printed by `sentiscope example-config`.
pub fn example() -> &'static str {
    r#"app:
  data_dir: "./data"

gateways:
  api_base_url: "http://localhost:5000/"
  classifier_base_url: "http://localhost:5001/"
  user_agent: "sentiscope/0.1"

analysis:
  page_size: 10
  member_fetch_limit: 100
  guest_fetch_limit: 50
  guest_search_limit: 3
  guest_classify_texts: 20
  visit_window_minutes: 120
"#
}
