use anyhow::{Context, Result, anyhow, bail};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fmt, fs, path::Path, path::PathBuf};
use url::Url;

/// Environment variable holding the OpenWeather API key.
pub const API_KEY_ENV: &str = "OPENWEATHER_API_KEY";

pub const DEFAULT_CURRENT_URL: &str = "https://api.openweathermap.org/data/2.5/weather";
pub const DEFAULT_GEOCODE_URL: &str = "https://api.openweathermap.org/geo/1.0/direct";
pub const DEFAULT_FORECAST_URL: &str = "https://api.openweathermap.org/data/2.5/forecast";
pub const DEFAULT_ICON_URL: &str = "https://openweathermap.org/img/wn";

/// Provider API key. Blank keys are never constructed.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(raw: impl Into<String>) -> Option<Self> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() { None } else { Some(Self(trimmed.to_string())) }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

/// Base URLs of the endpoints the pipeline talks to.
///
/// Example TOML:
/// [endpoints]
/// current = "https://api.openweathermap.org/data/2.5/weather"
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoints {
    #[serde(default = "default_current")]
    pub current: Url,
    #[serde(default = "default_geocode")]
    pub geocode: Url,
    #[serde(default = "default_forecast")]
    pub forecast: Url,
    #[serde(default = "default_icon")]
    pub icon: Url,
}

fn static_url(raw: &'static str) -> Url {
    Url::parse(raw).expect("built-in endpoint URL is valid")
}

fn default_current() -> Url {
    static_url(DEFAULT_CURRENT_URL)
}

fn default_geocode() -> Url {
    static_url(DEFAULT_GEOCODE_URL)
}

fn default_forecast() -> Url {
    static_url(DEFAULT_FORECAST_URL)
}

fn default_icon() -> Url {
    static_url(DEFAULT_ICON_URL)
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            current: default_current(),
            geocode: default_geocode(),
            forecast: default_forecast(),
            icon: default_icon(),
        }
    }
}

impl Endpoints {
    /// Every endpoint must be an absolute http(s) URL that can carry a query.
    pub fn validate(&self) -> Result<()> {
        for (name, url) in [
            ("current", &self.current),
            ("geocode", &self.geocode),
            ("forecast", &self.forecast),
            ("icon", &self.icon),
        ] {
            if !matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base() {
                bail!("Endpoint `{name}` must be an http(s) URL, got `{url}`");
            }
        }
        Ok(())
    }
}

/// Pipeline configuration: endpoint URLs from disk, API key from the environment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub endpoints: Endpoints,

    #[serde(skip)]
    api_key: Option<ApiKey>,
}

impl Config {
    pub fn api_key(&self) -> Option<&ApiKey> {
        self.api_key.as_ref()
    }

    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    pub fn with_api_key(mut self, api_key: Option<ApiKey>) -> Self {
        self.api_key = api_key;
        self
    }

    /// Attach the key from `OPENWEATHER_API_KEY`; a missing or blank variable leaves it unset.
    pub fn with_api_key_from_env(self) -> Self {
        self.with_api_key_from(|name| std::env::var(name).ok())
    }

    pub fn with_api_key_from(self, lookup: impl FnOnce(&str) -> Option<String>) -> Self {
        let key = lookup(API_KEY_ENV).and_then(ApiKey::new);
        self.with_api_key(key)
    }

    /// Load config from `path`, or return defaults if it doesn't exist yet.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let cfg: Config = toml::from_str(contents)?;
        cfg.endpoints.validate()?;
        Ok(cfg)
    }

    /// Save config to `path`, creating parent directories as needed.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml = self.to_toml_string()?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "weatherapp", "weatherapp")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }
}
