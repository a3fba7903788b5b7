//! Monitor configuration
//!
//! Loaded from TOML (`CONFIG_PATH`, default `monitor.toml`) with environment
//! overrides. Every section has defaults, so a partial file is enough.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::risk_detection::{
    analyzer::{DisabledAnalyzer, OllamaAnalyzer, SecondaryAnalyzer},
    errors::{MonitorError, Result},
    rules::{PatternMatcher, Signature},
    storage::{DEFAULT_API_CAPACITY, DEFAULT_DASHBOARD_CAPACITY},
};

pub const DEFAULT_CONFIG_PATH: &str = "monitor.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub server: ServerConfig,
    pub analyzer: AnalyzerConfig,
    pub store: StoreConfig,
    pub reports: ReportConfig,
    pub dashboard: DashboardConfig,
    /// Signature table, in priority order
    pub signatures: Vec<Signature>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            analyzer: AnalyzerConfig::default(),
            store: StoreConfig::default(),
            reports: ReportConfig::default(),
            dashboard: DashboardConfig::default(),
            signatures: Signature::default_table(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
        }
    }
}

/// Generative-model analyzer settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    pub enabled: bool,
    /// Ollama server root
    pub endpoint: String,
    pub model: String,
    pub timeout_secs: u64,
    pub temperature: f64,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: "http://localhost:11434".to_string(),
            model: OllamaAnalyzer::DEFAULT_MODEL.to_string(),
            timeout_secs: 10,
            temperature: 0.2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub api_capacity: usize,
    pub dashboard_capacity: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            api_capacity: DEFAULT_API_CAPACITY,
            dashboard_capacity: DEFAULT_DASHBOARD_CAPACITY,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub enabled: bool,
    pub directory: PathBuf,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            directory: PathBuf::from("tx_reports"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub enabled: bool,
    pub refresh_secs: u64,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            refresh_secs: 2,
        }
    }
}

impl MonitorConfig {
    /// Parse a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// `CONFIG_PATH` (or `monitor.toml`) plus environment overrides, validated.
    /// A missing file means defaults; an unreadable or invalid one is an error.
    pub fn load() -> Result<Self> {
        let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from(Path::new(&path))
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            info!("Loading monitor configuration from {}", path.display());
            Self::from_file(path)?
        } else {
            warn!("{} not found, using default configuration", path.display());
            Self::default()
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("RISK_MONITOR_ANALYZER_URL") {
            self.analyzer.endpoint = url;
        }
        if let Ok(model) = std::env::var("RISK_MONITOR_ANALYZER_MODEL") {
            self.analyzer.model = model;
        }
        if let Ok(secs) = std::env::var("RISK_MONITOR_ANALYZER_TIMEOUT_SECS") {
            match secs.parse() {
                Ok(secs) => self.analyzer.timeout_secs = secs,
                Err(_) => warn!("Ignoring invalid RISK_MONITOR_ANALYZER_TIMEOUT_SECS={}", secs),
            }
        }
        if let Ok(dir) = std::env::var("RISK_MONITOR_REPORT_DIR") {
            self.reports.directory = PathBuf::from(dir);
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.store.api_capacity == 0 || self.store.dashboard_capacity == 0 {
            return Err(MonitorError::Configuration(
                "store capacities must be greater than 0".to_string(),
            ));
        }

        if self.analyzer.timeout_secs == 0 {
            return Err(MonitorError::Configuration(
                "analyzer timeout must be greater than 0".to_string(),
            ));
        }

        if self.analyzer.enabled && self.analyzer.endpoint.trim().is_empty() {
            return Err(MonitorError::Configuration(
                "analyzer endpoint is required when the analyzer is enabled".to_string(),
            ));
        }

        if self.dashboard.refresh_secs == 0 {
            return Err(MonitorError::Configuration(
                "dashboard refresh interval must be greater than 0".to_string(),
            ));
        }

        // Signature checks live with the matcher
        PatternMatcher::new(self.signatures.clone())?;
        Ok(())
    }

    pub fn analyzer_timeout(&self) -> Duration {
        Duration::from_secs(self.analyzer.timeout_secs)
    }

    pub fn build_matcher(&self) -> Result<PatternMatcher> {
        PatternMatcher::new(self.signatures.clone())
    }

    pub fn build_analyzer(&self) -> Result<Arc<dyn SecondaryAnalyzer>> {
        if !self.analyzer.enabled {
            info!("Secondary analyzer disabled, pattern results only");
            return Ok(Arc::new(DisabledAnalyzer));
        }
        let analyzer = OllamaAnalyzer::new(
            self.analyzer.endpoint.clone(),
            self.analyzer.model.clone(),
            self.analyzer_timeout(),
        )?
        .with_temperature(self.analyzer.temperature);
        Ok(Arc::new(analyzer))
    }
}
