/// Pipeline configuration loader - parses pm_charts.toml
///
/// Keeps endpoints, output conventions and concurrency limits out of the
/// code. Every field has a default, so running without a configuration file
/// charts both pollutants across all Luchtmeetnet stations into
/// `./PM10_concentratie.png` and `./PM25_concentratie.png`.
///
/// `PM_CHARTS_BASE_URL` and `PM_CHARTS_OUTPUT_DIR` (environment or `.env`)
/// override the file.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;
use crate::ingest::{luchtmeetnet, sensorthings};
use crate::model::{AggregationMode, OutputLayout, Pollutant};

/// Configuration file read when no `--config` is given.
pub const DEFAULT_CONFIG_PATH: &str = "pm_charts.toml";

pub const ENV_BASE_URL: &str = "PM_CHARTS_BASE_URL";
pub const ENV_OUTPUT_DIR: &str = "PM_CHARTS_OUTPUT_DIR";

/// Which upstream API shape to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    /// Station-centric `/stations` + `/measurements` API.
    #[default]
    Luchtmeetnet,
    /// OGC SensorThings `Things` / `Observations` API.
    Sensorthings,
}

impl Provider {
    pub fn default_base_url(self) -> &'static str {
        match self {
            Provider::Luchtmeetnet => luchtmeetnet::DEFAULT_BASE_URL,
            Provider::Sensorthings => sensorthings::DEFAULT_BASE_URL,
        }
    }
}

/// Resolved upstream endpoint handed to the API clients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upstream {
    pub provider: Provider,
    pub base_url: String,
}

/// Chart image settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ChartConfig {
    pub width: u32,
    pub height: u32,
    /// TrueType/OpenType font used for titles, axis labels and legend.
    /// Without one, charts are drawn without text.
    pub font_path: Option<PathBuf>,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            width: 1000,
            height: 600,
            font_path: None,
        }
    }
}

/// Root configuration structure for TOML parsing.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub provider: Provider,
    /// Overrides the provider's default base URL.
    pub base_url: Option<String>,
    /// Root directory all chart paths are joined onto.
    pub output_dir: PathBuf,
    pub layout: OutputLayout,
    pub mode: AggregationMode,
    pub pollutants: Vec<Pollutant>,
    /// Upper bound on concurrent fetch tasks.
    pub max_parallelism: usize,
    pub request_timeout_secs: u64,
    /// Overall deadline for the fetch phase. Tasks still running when it
    /// expires are recorded as timed out.
    pub deadline_secs: Option<u64>,
    /// Substring matched against each station's raw location description.
    pub station_filter: Option<String>,
    pub chart: ChartConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            provider: Provider::default(),
            base_url: None,
            output_dir: PathBuf::from("."),
            layout: OutputLayout::default(),
            mode: AggregationMode::default(),
            pollutants: Pollutant::ALL.to_vec(),
            max_parallelism: 10,
            request_timeout_secs: 30,
            deadline_secs: None,
            station_filter: None,
            chart: ChartConfig::default(),
        }
    }
}

impl PipelineConfig {
    pub fn upstream(&self) -> Upstream {
        Upstream {
            provider: self.provider,
            base_url: self
                .base_url
                .clone()
                .unwrap_or_else(|| self.provider.default_base_url().to_string()),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.deadline_secs.map(Duration::from_secs)
    }

    /// Applies environment overrides. `lookup` is `std::env::var` in
    /// production.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(ENV_BASE_URL).filter(|v| !v.trim().is_empty()) {
            self.base_url = Some(url);
        }
        if let Some(dir) = lookup(ENV_OUTPUT_DIR).filter(|v| !v.trim().is_empty()) {
            self.output_dir = PathBuf::from(dir);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_parallelism == 0 {
            return Err(ConfigError::Invalid("max_parallelism must be at least 1".into()));
        }
        if self.pollutants.is_empty() {
            return Err(ConfigError::Invalid("pollutants must name at least one pollutant".into()));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid("request_timeout_secs must be at least 1".into()));
        }
        if self.chart.width == 0 || self.chart.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "chart dimensions must be non-zero, got {}x{}",
                self.chart.width, self.chart.height
            )));
        }
        if let Some(url) = &self.base_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::Invalid(format!("base_url '{}' is not an http(s) URL", url)));
            }
        }
        Ok(())
    }
}

/// Parses configuration text. Duplicate pollutants are collapsed, keeping
/// first-mention order.
pub fn parse_config(contents: &str, origin: &str) -> Result<PipelineConfig, ConfigError> {
    let mut config: PipelineConfig = toml::from_str(contents).map_err(|source| ConfigError::Parse {
        path: origin.to_string(),
        source,
    })?;

    let mut seen = Vec::with_capacity(config.pollutants.len());
    config.pollutants.retain(|p| {
        if seen.contains(p) {
            false
        } else {
            seen.push(*p);
            true
        }
    });

    Ok(config)
}

/// Loads, overrides and validates the configuration.
///
/// With `path = None` the default file is read if present and defaults are
/// used otherwise; an explicit path must exist.
pub fn load_config(path: Option<&Path>) -> Result<PipelineConfig, ConfigError> {
    let (config_path, required) = match path {
        Some(p) => (p.to_path_buf(), true),
        None => (PathBuf::from(DEFAULT_CONFIG_PATH), false),
    };

    let mut config = match fs::read_to_string(&config_path) {
        Ok(contents) => parse_config(&contents, &config_path.display().to_string())?,
        Err(e) if !required && e.kind() == std::io::ErrorKind::NotFound => {
            tracing::info!(path = %config_path.display(), "no configuration file, using defaults");
            PipelineConfig::default()
        }
        Err(source) => {
            return Err(ConfigError::Read {
                path: config_path.display().to_string(),
                source,
            });
        }
    };

    config.apply_overrides(|key| std::env::var(key).ok());
    config.validate()?;
    Ok(config)
}
