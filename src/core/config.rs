use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path, path::PathBuf, time::Duration};
use tracing::debug;

use crate::core::sanity::RateBand;
use crate::providers::util::RetryPolicy;
use crate::providers::{chat_completions, exchangerate_api, exchangerate_host, fixer, geodb, open_meteo};

pub const ENV_LLM_API_KEY: &str = "GROQ_API_KEY";
pub const ENV_FIXER_API_KEY: &str = "FIXER_API_KEY";
pub const ENV_GEODB_API_KEY: &str = "GEODB_API_KEY";
pub const ENV_LISTEN_ADDR: &str = "TRIPCRAFT_LISTEN_ADDR";

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: String,
    /// Allowed CORS origins; empty allows any origin.
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:3000".to_string(),
            cors_origins: Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FxProviderKind {
    ExchangerateHost,
    ExchangerateApi,
    Fixer,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct FxProviderConfig {
    pub kind: FxProviderKind,
    /// Tag reported in results; defaults to the provider's own name.
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
}

impl FxProviderConfig {
    fn of(kind: FxProviderKind) -> Self {
        Self {
            kind,
            name: None,
            base_url: None,
            api_key: None,
        }
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(match self.kind {
            FxProviderKind::ExchangerateHost => exchangerate_host::DEFAULT_BASE_URL,
            FxProviderKind::ExchangerateApi => exchangerate_api::DEFAULT_BASE_URL,
            FxProviderKind::Fixer => fixer::DEFAULT_BASE_URL,
        })
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct LastResortRate {
    pub base: String,
    pub quote: String,
    pub rate: f64,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct FxConfig {
    /// Tried in order; the first plausible rate wins.
    pub providers: Vec<FxProviderConfig>,
    pub cache_ttl_minutes: u64,
    pub timeout_secs: u64,
    pub sanity_bands: Vec<RateBand>,
    pub last_resort: Vec<LastResortRate>,
}

impl Default for FxConfig {
    fn default() -> Self {
        Self {
            providers: vec![
                FxProviderConfig::of(FxProviderKind::ExchangerateHost),
                FxProviderConfig::of(FxProviderKind::ExchangerateApi),
                FxProviderConfig::of(FxProviderKind::Fixer),
            ],
            cache_ttl_minutes: 60,
            timeout_secs: 10,
            sanity_bands: Vec::new(),
            last_resort: Vec::new(),
        }
    }
}

impl FxConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_minutes * 60)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct LlmConfig {
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    pub timeout_secs: u64,
    pub max_attempts: usize,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        let retry = RetryPolicy::default();
        Self {
            base_url: chat_completions::DEFAULT_BASE_URL.to_string(),
            model: chat_completions::DEFAULT_MODEL.to_string(),
            api_key: None,
            temperature: 0.7,
            max_tokens: None,
            timeout_secs: 30,
            max_attempts: retry.max_attempts,
            initial_backoff_ms: retry.initial_delay.as_millis() as u64,
            max_backoff_ms: retry.max_delay.as_millis() as u64,
        }
    }
}

impl LlmConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_attempts,
            Duration::from_millis(self.initial_backoff_ms),
            Duration::from_millis(self.max_backoff_ms),
        )
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct WeatherConfig {
    pub enabled: bool,
    pub geocoding_url: String,
    pub forecast_url: String,
    pub timeout_secs: u64,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            geocoding_url: open_meteo::DEFAULT_GEOCODING_URL.to_string(),
            forecast_url: open_meteo::DEFAULT_FORECAST_URL.to_string(),
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct CitiesConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for CitiesConfig {
    fn default() -> Self {
        Self {
            base_url: geodb::DEFAULT_BASE_URL.to_string(),
            api_key: None,
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub fx: FxConfig,
    pub llm: LlmConfig,
    pub weather: WeatherConfig,
    pub cities: CitiesConfig,
    /// Append degraded-request errors as JSON lines to this file.
    pub dev_error_log: Option<PathBuf>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl AppConfig {
    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("app", "tripcraft", "tripcraft")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        // An empty file is a valid, all-defaults config
        if config_str.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    /// Loads the given file, or the default location. A missing default file
    /// yields the built-in defaults; a missing explicit file is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from_path(path),
            None => {
                let default_path = Self::default_config_path()?;
                if default_path.exists() {
                    Self::load_from_path(&default_path)
                } else {
                    debug!("No config at {}, using defaults", default_path.display());
                    Ok(Self::default())
                }
            }
        }
    }

    /// Applies secrets and overrides from the process environment.
    pub fn with_env(self) -> Self {
        self.with_env_from(|key| std::env::var(key).ok())
    }

    /// Environment values win over values from the file.
    pub fn with_env_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(key) = non_empty(lookup(ENV_LLM_API_KEY)) {
            self.llm.api_key = Some(key);
        }
        if let Some(key) = non_empty(lookup(ENV_GEODB_API_KEY)) {
            self.cities.api_key = Some(key);
        }
        if let Some(addr) = non_empty(lookup(ENV_LISTEN_ADDR)) {
            self.server.listen_addr = addr;
        }
        if let Some(key) = non_empty(lookup(ENV_FIXER_API_KEY)) {
            for provider in &mut self.fx.providers {
                if provider.kind == FxProviderKind::Fixer {
                    provider.api_key = Some(key.clone());
                }
            }
        }
        self
    }
}
