use anyhow::{Context, Result, anyhow, bail};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    fmt, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::provider::ProviderId;

pub const MIN_DAYS: u8 = 1;
pub const MAX_DAYS: u8 = 5;
pub const MIN_POLL_INTERVAL_MINUTES: f64 = 1.0;

/// Unit system requested from every provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    Metric,
    Imperial,
}

impl Unit {
    pub const fn all() -> &'static [Unit] {
        &[Unit::Metric, Unit::Imperial]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Unit::Metric => "metric",
            Unit::Imperial => "imperial",
        }
    }

    pub fn temperature_symbol(&self) -> &'static str {
        match self {
            Unit::Metric => "°C",
            Unit::Imperial => "°F",
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Language for provider-side text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    En,
    Sv,
    Zh,
    Ru,
}

impl Language {
    pub const fn all() -> &'static [Language] {
        &[Language::En, Language::Sv, Language::Zh, Language::Ru]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Sv => "sv",
            Language::Zh => "zh",
            Language::Ru => "ru",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration for a single provider (e.g., API key).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub api_key: String,

    /// Overrides the provider's public endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

/// Top-level configuration stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Forecast horizon in calendar days.
    pub days: u8,
    pub city: String,
    pub country: String,
    pub unit: Unit,
    pub language: Language,
    pub poll_interval_minutes: f64,
    pub request_timeout_secs: u64,

    /// OpenWeather bulk city list used for coordinate lookup.
    pub city_list_path: PathBuf,

    /// Providers polled each cycle, in priority order.
    pub sources: Vec<ProviderId>,

    /// Example TOML:
    /// [providers.openweather]
    /// api_key = "..."
    pub providers: HashMap<String, ProviderConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            days: MAX_DAYS,
            city: "New York".to_string(),
            country: "us".to_string(),
            unit: Unit::Imperial,
            language: Language::En,
            poll_interval_minutes: 10.0,
            request_timeout_secs: 30,
            city_list_path: PathBuf::from("city.list.json"),
            sources: ProviderId::all().to_vec(),
            providers: HashMap::new(),
        }
    }
}

impl Config {
    /// Load config from the platform location, or return defaults if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_file_path()?;
        self.save_to(&path)
    }

    /// Save config, creating parent directories as needed.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "weather-monitor", "weather-monitor")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Check every bound at once so the user sees all problems in one go.
    pub fn validate(&self) -> Result<()> {
        let mut issues = Vec::new();

        if !(MIN_DAYS..=MAX_DAYS).contains(&self.days) {
            issues.push(format!("days must be between {MIN_DAYS} and {MAX_DAYS}"));
        }
        if self.city.trim().is_empty() {
            issues.push("city must not be empty".to_string());
        }
        if self.country.trim().is_empty() {
            issues.push("country must not be empty".to_string());
        }
        if !self.poll_interval_minutes.is_finite()
            || self.poll_interval_minutes < MIN_POLL_INTERVAL_MINUTES
        {
            issues.push(format!(
                "poll_interval_minutes must be a number >= {MIN_POLL_INTERVAL_MINUTES}"
            ));
        }
        if self.request_timeout_secs == 0 {
            issues.push("request_timeout_secs must be > 0".to_string());
        }

        if !issues.is_empty() {
            bail!("Invalid configuration:\n  - {}", issues.join("\n  - "));
        }

        Ok(())
    }

    pub fn poll_interval(&self) -> Result<Duration> {
        Duration::try_from_secs_f64(self.poll_interval_minutes * 60.0)
            .with_context(|| format!("Invalid poll interval: {} minutes", self.poll_interval_minutes))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn provider_config(&self, id: ProviderId) -> Option<&ProviderConfig> {
        self.providers.get(id.as_str())
    }

    /// Set/replace a provider API key and make sure the provider is polled.
    pub fn upsert_provider_api_key(&mut self, provider_id: ProviderId, api_key: String) {
        self.providers
            .entry(provider_id.as_str().to_string())
            .or_default()
            .api_key = api_key;

        if !self.sources.contains(&provider_id) {
            self.sources.push(provider_id);
        }
    }

    pub fn provider_api_key(&self, provider_id: ProviderId) -> Option<&str> {
        self.provider_config(provider_id)
            .map(|cfg| cfg.api_key.as_str())
            .filter(|key| !key.is_empty())
    }

    pub fn is_provider_configured(&self, provider_id: ProviderId) -> bool {
        self.provider_api_key(provider_id).is_some()
    }
}
