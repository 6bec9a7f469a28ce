use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::db::config::env_bool;
use crate::services::analytics::AnalyticsConfig;
use crate::services::pre_assessment::AssessmentConfig;
use crate::services::schedule::ScheduleConfig;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_LOG_DIR: &str = "./logs";

/// Process settings read once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub log: LogSettings,
    /// JSON file with engine tuning overrides (`ENGINE_CONFIG_PATH`).
    pub engine_config_path: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct LogSettings {
    pub level: String,
    /// Directory for the daily rolling log file; `None` keeps logs on stdout only.
    pub file_dir: Option<PathBuf>,
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|value| value.trim().parse().ok())
}

fn env_path(key: &str) -> Option<PathBuf> {
    std::env::var(key)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .map(PathBuf::from)
}

impl Config {
    pub fn from_env() -> Self {
        let file_dir = env_bool("ENABLE_FILE_LOGS", false)
            .then(|| env_path("LOG_DIR").unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_DIR)));

        Self {
            host: env_parse("HOST").unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED)),
            port: env_parse("PORT").unwrap_or(DEFAULT_PORT),
            log: LogSettings {
                level: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
                file_dir,
            },
            engine_config_path: env_path("ENGINE_CONFIG_PATH"),
        }
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Engine tuning: defaults, then the optional JSON file, then env overrides.
    pub fn load_engine(&self) -> Result<EngineConfig, ConfigError> {
        let mut engine = match &self.engine_config_path {
            Some(path) => EngineConfig::from_file(path)?,
            None => EngineConfig::default(),
        };
        engine.apply_env_overrides();
        Ok(engine)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read engine config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid engine config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Tuning of the scheduling engine, shared by request handlers and background jobs.
///
/// Every section and field is optional in JSON; missing ones keep their defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub assessment: AssessmentConfig,
    pub schedule: ScheduleConfig,
    pub analytics: AnalyticsConfig,
}

impl EngineConfig {
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&raw)
    }

    fn apply_env_overrides(&mut self) {
        if let Some(threshold) = env_parse("MASTERY_THRESHOLD") {
            self.schedule.mastery_threshold = threshold;
        }
        if let Some(days) = env_parse("DEFAULT_DAYS_AVAILABLE") {
            self.schedule.default_days_available = days;
        }
        if let Some(window) = env_parse("ANALYTICS_EVENT_WINDOW") {
            self.analytics.event_window = window;
        }
    }
}
