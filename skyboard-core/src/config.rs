use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::model::Units;

/// Environment variable that takes precedence over the stored API key.
pub const API_KEY_ENV: &str = "OPENWEATHER_API_KEY";

pub const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org/data/2.5";

const DEFAULT_CITIES: &[&str] = &[
    "New York",
    "London",
    "Tokyo",
    "Paris",
    "Sydney",
    "Berlin",
    "Toronto",
    "Dubai",
    "Singapore",
    "Mumbai",
];

/// Where and how to reach the weather provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: 10,
        }
    }
}

impl ProviderConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Timing windows. The cache TTL and the refresh window are deliberately
/// separate knobs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshConfig {
    pub cache_ttl_secs: u64,
    pub refresh_window_secs: u64,
    pub cadence_secs: u64,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: 5 * 60,
            refresh_window_secs: 60,
            cadence_secs: 60,
        }
    }
}

impl RefreshConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn refresh_window(&self) -> Duration {
        Duration::from_secs(self.refresh_window_secs)
    }

    pub fn cadence(&self) -> Duration {
        Duration::from_secs(self.cadence_secs)
    }
}

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// api_key = "..."
/// units = "imperial"
/// favorites = ["Paris", "Oslo"]
///
/// [refresh]
/// cadence_secs = 60
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_key: Option<String>,
    pub units: Units,
    pub favorites: Vec<String>,
    pub default_cities: Vec<String>,
    pub provider: ProviderConfig,
    pub refresh: RefreshConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            units: Units::default(),
            favorites: Vec::new(),
            default_cities: DEFAULT_CITIES.iter().map(|c| c.to_string()).collect(),
            provider: ProviderConfig::default(),
            refresh: RefreshConfig::default(),
        }
    }
}

impl Config {
    /// Load config from disk, or return an empty default if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            // First run: no config file, return defaults.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_file_path()?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
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

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "skyboard", "skyboard")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// API key from the environment, falling back to the stored one.
    pub fn api_key(&self) -> Result<String> {
        resolve_api_key(std::env::var(API_KEY_ENV).ok(), self.api_key.as_deref())
    }

    pub fn set_api_key(&mut self, api_key: String) {
        self.api_key = Some(api_key);
    }

    pub fn set_units(&mut self, units: Units) {
        self.units = units;
    }

    pub fn is_favorite(&self, city: &str) -> bool {
        let city = city.trim();
        self.favorites.iter().any(|c| c == city)
    }

    /// Returns false if the city was already a favorite.
    pub fn add_favorite(&mut self, city: &str) -> bool {
        let city = city.trim();
        if city.is_empty() || self.is_favorite(city) {
            return false;
        }
        self.favorites.push(city.to_string());
        true
    }

    /// Returns false if the city was not a favorite.
    pub fn remove_favorite(&mut self, city: &str) -> bool {
        let before = self.favorites.len();
        self.favorites.retain(|c| c != city.trim());
        self.favorites.len() != before
    }
}

fn resolve_api_key(from_env: Option<String>, stored: Option<&str>) -> Result<String> {
    from_env
        .filter(|k| !k.trim().is_empty())
        .or_else(|| stored.map(str::to_owned))
        .filter(|k| !k.trim().is_empty())
        .ok_or_else(|| {
            anyhow!(
                "No OpenWeather API key configured.\n\
                 Hint: run `skyboard configure` or set {API_KEY_ENV}."
            )
        })
}
