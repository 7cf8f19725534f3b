//! Configuration management for Git-Chronicle.
//!
//! Handles personal config (~/.config/git-chronicle/config.toml) and
//! per-project config (.chronicleconfig) with proper layering. The project
//! overlay never contributes API keys.

use crate::errors::ChronicleError;
use crate::llm::{Tier, TierSettings};
use crate::log_debug;
use crate::orchestrator::ConcurrencyLimits;
use crate::providers::{Provider, ProviderConfig};

use anyhow::{Context, Result, anyhow};
use chrono::FixedOffset;
use dirs::config_dir;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// Project configuration filename
pub const PROJECT_CONFIG_FILENAME: &str = ".chronicleconfig";

/// Main configuration structure
#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct Config {
    /// Default LLM provider
    #[serde(default)]
    pub default_provider: String,
    /// Provider-specific configurations (keyed by provider name)
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
    /// Per-tier overrides
    #[serde(default)]
    pub tiers: TiersConfig,
    /// Fan-out bounds per tier
    #[serde(default)]
    pub concurrency: ConcurrencyConfig,
    /// Timezone used for day bucketing, as a fixed offset (`+02:00`) or `UTC`
    #[serde(default = "default_timezone")]
    pub timezone: String,
    /// Cache root override
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,
    /// Artifact output directory override (defaults to the repository root)
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
    /// Runtime-only: flag if loaded from project config
    #[serde(skip)]
    pub is_project_config: bool,
}

fn default_timezone() -> String {
    "UTC".to_string()
}

/// Optional overrides for one tier's settings
#[derive(Deserialize, Serialize, Clone, Debug, Default)]
pub struct TierOverrides {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub max_input_tokens: Option<usize>,
    #[serde(default)]
    pub max_output_tokens: Option<usize>,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub max_attempts: Option<u32>,
    #[serde(default)]
    pub backoff_ms: Option<u64>,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default)]
pub struct TiersConfig {
    #[serde(default)]
    pub fast: TierOverrides,
    #[serde(default)]
    pub balanced: TierOverrides,
    #[serde(default)]
    pub deep: TierOverrides,
}

#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct ConcurrencyConfig {
    #[serde(default = "default_commit_width")]
    pub commit: usize,
    #[serde(default = "default_day_width")]
    pub day: usize,
    #[serde(default = "default_week_width")]
    pub week: usize,
}

fn default_commit_width() -> usize {
    5
}
fn default_day_width() -> usize {
    3
}
fn default_week_width() -> usize {
    2
}

impl Default for ConcurrencyConfig {
    fn default() -> Self {
        Self {
            commit: default_commit_width(),
            day: default_day_width(),
            week: default_week_width(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let mut providers = HashMap::new();
        for provider in Provider::ALL {
            providers.insert(
                provider.name().to_string(),
                ProviderConfig::with_defaults(*provider),
            );
        }

        Self {
            default_provider: Provider::default().name().to_string(),
            providers,
            tiers: TiersConfig::default(),
            concurrency: ConcurrencyConfig::default(),
            timezone: default_timezone(),
            cache_dir: None,
            output_dir: None,
            is_project_config: false,
        }
    }
}

impl Config {
    /// Load configuration (personal + project overlay)
    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;
        let mut config = if config_path.exists() {
            let content = fs::read_to_string(&config_path)?;
            toml::from_str(&content)?
        } else {
            Self::default()
        };

        // Overlay project config if available
        if let Ok(project_config) = Self::load_project_config() {
            config.merge_with_project_config(project_config);
        }

        log_debug!("Configuration loaded: {:?}", config);
        Ok(config)
    }

    /// Load project-specific configuration from the working directory
    pub fn load_project_config() -> Result<Self> {
        let config_path = PathBuf::from(PROJECT_CONFIG_FILENAME);
        if !config_path.exists() {
            return Err(anyhow!("Project configuration file not found"));
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?;

        let mut config: Self = toml::from_str(&content).with_context(|| {
            format!(
                "Invalid {} format. Check for syntax errors.",
                PROJECT_CONFIG_FILENAME
            )
        })?;

        config.is_project_config = true;
        Ok(config)
    }

    /// Merge project config into this config (project takes precedence, but
    /// never API keys)
    pub fn merge_with_project_config(&mut self, project_config: Self) {
        log_debug!("Merging with project configuration");

        if !project_config.default_provider.is_empty()
            && project_config.default_provider != Provider::default().name()
        {
            self.default_provider = project_config.default_provider;
        }

        for (provider_name, proj_config) in project_config.providers {
            let entry = self.providers.entry(provider_name).or_default();

            if !proj_config.model.is_empty() {
                entry.model = proj_config.model;
            }
            if proj_config.fast_model.is_some() {
                entry.fast_model = proj_config.fast_model;
            }
            if proj_config.base_url.is_some() {
                entry.base_url = proj_config.base_url;
            }
            if proj_config.token_limit.is_some() {
                entry.token_limit = proj_config.token_limit;
            }
            entry
                .additional_params
                .extend(proj_config.additional_params);
        }

        self.tiers = project_config.tiers;
        self.concurrency = project_config.concurrency;
        if project_config.timezone != default_timezone() {
            self.timezone = project_config.timezone;
        }
        if project_config.output_dir.is_some() {
            self.output_dir = project_config.output_dir;
        }
    }

    /// Save configuration to personal config file
    pub fn save(&self) -> Result<()> {
        if self.is_project_config {
            return Ok(());
        }

        let config_path = Self::get_config_path()?;
        let content = toml::to_string_pretty(self)?;
        fs::write(config_path, content)?;
        log_debug!("Configuration saved");
        Ok(())
    }

    /// Get path to personal config file
    fn get_config_path() -> Result<PathBuf> {
        let mut path =
            config_dir().ok_or_else(|| anyhow!("Unable to determine config directory"))?;
        path.push("git-chronicle");
        fs::create_dir_all(&path)?;
        path.push("config.toml");
        Ok(path)
    }

    /// Update configuration with new values
    pub fn update(
        &mut self,
        provider: Option<String>,
        api_key: Option<String>,
        model: Option<String>,
        fast_model: Option<String>,
        token_limit: Option<usize>,
        timezone: Option<String>,
    ) -> Result<()> {
        if let Some(ref provider_name) = provider {
            let parsed: Provider = provider_name.parse().with_context(|| {
                format!(
                    "Unknown provider '{}'. Supported: {}",
                    provider_name,
                    Provider::all_names().join(", ")
                )
            })?;

            self.default_provider = parsed.name().to_string();

            if !self.providers.contains_key(parsed.name()) {
                self.providers.insert(
                    parsed.name().to_string(),
                    ProviderConfig::with_defaults(parsed),
                );
            }
        }

        let provider_config = self
            .providers
            .get_mut(&self.default_provider)
            .context("Could not get default provider config")?;

        if let Some(key) = api_key {
            provider_config.api_key = key;
        }
        if let Some(m) = model {
            provider_config.model = m;
        }
        if let Some(fm) = fast_model {
            provider_config.fast_model = Some(fm);
        }
        if let Some(limit) = token_limit {
            provider_config.token_limit = Some(limit);
        }
        if let Some(tz) = timezone {
            parse_timezone(&tz).map_err(anyhow::Error::from)?;
            self.timezone = tz;
        }

        log_debug!("Configuration updated");
        Ok(())
    }

    /// Get the provider configuration for a specific provider
    pub fn get_provider_config(&self, provider: &str) -> Option<&ProviderConfig> {
        let name = if provider.eq_ignore_ascii_case("claude") {
            "anthropic"
        } else {
            provider
        };

        self.providers
            .get(name)
            .or_else(|| self.providers.get(&name.to_lowercase()))
    }

    /// Get the current provider as `Provider` enum
    pub fn provider(&self) -> Option<Provider> {
        self.default_provider.parse().ok()
    }

    /// Validate that the current provider is properly configured
    pub fn validate(&self) -> Result<()> {
        let provider: Provider = self
            .default_provider
            .parse()
            .with_context(|| format!("Invalid provider: {}", self.default_provider))?;

        let config = self
            .get_provider_config(provider.name())
            .ok_or_else(|| anyhow!("No configuration found for provider: {}", provider.name()))?;

        if !config.has_api_key() && std::env::var(provider.api_key_env()).is_err() {
            return Err(anyhow!(
                "API key required for {}. Set {} or configure in ~/.config/git-chronicle/config.toml",
                provider.name(),
                provider.api_key_env()
            ));
        }

        Ok(())
    }

    /// Resolve the API key for the current provider (config, then env)
    pub fn resolve_api_key(&self) -> Result<String> {
        let provider = self
            .provider()
            .ok_or_else(|| anyhow!("Invalid provider: {}", self.default_provider))?;
        if let Some(config) = self.get_provider_config(provider.name()) {
            if config.has_api_key() {
                return Ok(config.api_key.clone());
            }
        }
        std::env::var(provider.api_key_env())
            .map_err(|_| anyhow!("Missing API key for {}", provider.name()))
    }

    /// Resolve the effective settings for one tier
    pub fn tier_settings(&self, tier: Tier) -> TierSettings {
        let mut settings = TierSettings::defaults_for(tier);
        let provider = self.provider().unwrap_or_default();

        if let Some(provider_config) = self.get_provider_config(provider.name()) {
            settings.model = match tier {
                Tier::Fast => provider_config.effective_fast_model(provider).to_string(),
                Tier::Balanced | Tier::Deep => {
                    provider_config.effective_model(provider).to_string()
                }
            };
            settings.max_input_tokens = settings
                .max_input_tokens
                .min(provider_config.effective_token_limit(provider));
        }

        let overrides = match tier {
            Tier::Fast => &self.tiers.fast,
            Tier::Balanced => &self.tiers.balanced,
            Tier::Deep => &self.tiers.deep,
        };
        if let Some(model) = &overrides.model {
            settings.model.clone_from(model);
        }
        if let Some(tokens) = overrides.max_input_tokens {
            settings.max_input_tokens = tokens;
        }
        if let Some(tokens) = overrides.max_output_tokens {
            settings.max_output_tokens = tokens;
        }
        if let Some(temperature) = overrides.temperature {
            settings.temperature = temperature;
        }
        if let Some(secs) = overrides.timeout_secs {
            settings.timeout = Duration::from_secs(secs);
        }
        if let Some(attempts) = overrides.max_attempts {
            settings.max_attempts = attempts;
        }
        if let Some(ms) = overrides.backoff_ms {
            settings.backoff_base = Duration::from_millis(ms);
        }
        settings
    }

    /// Fan-out bounds for the orchestrator
    pub fn concurrency_limits(&self) -> ConcurrencyLimits {
        ConcurrencyLimits {
            commit: self.concurrency.commit,
            day: self.concurrency.day,
            week: self.concurrency.week,
        }
    }

    /// Parse the configured bucketing timezone
    pub fn bucketing_timezone(&self) -> Result<FixedOffset> {
        parse_timezone(&self.timezone).map_err(anyhow::Error::from)
    }

    /// Resolve the cache root (configured or platform default)
    pub fn cache_root(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.cache_dir {
            return Ok(dir.clone());
        }
        let mut path = dirs::cache_dir()
            .ok_or_else(|| anyhow!("Unable to determine cache directory"))?;
        path.push("git-chronicle");
        Ok(path)
    }
}

/// Parse `UTC`, `Z`, or a fixed offset like `+02:00` / `-0530`.
pub fn parse_timezone(value: &str) -> std::result::Result<FixedOffset, ChronicleError> {
    let trimmed = value.trim();
    if trimmed.eq_ignore_ascii_case("utc") || trimmed == "Z" {
        return FixedOffset::east_opt(0)
            .ok_or_else(|| ChronicleError::Configuration("invalid timezone".to_string()));
    }

    let (sign, rest) = match trimmed.split_at_checked(1) {
        Some(("+", rest)) => (1i32, rest),
        Some(("-", rest)) => (-1i32, rest),
        _ => {
            return Err(ChronicleError::Configuration(format!(
                "invalid timezone '{value}': expected UTC or a fixed offset like +02:00"
            )));
        }
    };

    let digits: String = rest.chars().filter(|c| *c != ':').collect();
    if digits.len() != 4 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(ChronicleError::Configuration(format!(
            "invalid timezone '{value}': expected UTC or a fixed offset like +02:00"
        )));
    }
    let hours: i32 = digits[..2].parse().unwrap_or(0);
    let minutes: i32 = digits[2..].parse().unwrap_or(0);

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(|| {
        ChronicleError::Configuration(format!("timezone offset '{value}' out of range"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_timezone() {
        assert_eq!(
            parse_timezone("UTC").expect("utc").local_minus_utc(),
            0
        );
        assert_eq!(
            parse_timezone("+02:00").expect("plus two").local_minus_utc(),
            2 * 3600
        );
        assert_eq!(
            parse_timezone("-0530").expect("minus").local_minus_utc(),
            -(5 * 3600 + 30 * 60)
        );
        assert!(parse_timezone("PST").is_err());
        assert!(parse_timezone("+25:00").is_err());
    }

    #[test]
    fn test_tier_settings_resolution() {
        let mut config = Config::default();
        config.tiers.fast.max_attempts = Some(7);
        config.tiers.deep.model = Some("custom-deep".to_string());

        let fast = config.tier_settings(Tier::Fast);
        assert_eq!(fast.model, "gpt-5.1-mini");
        assert_eq!(fast.max_attempts, 7);

        let deep = config.tier_settings(Tier::Deep);
        assert_eq!(deep.model, "custom-deep");
    }

    #[test]
    fn test_concurrency_defaults() {
        let limits = Config::default().concurrency_limits();
        assert_eq!(limits.commit, 5);
        assert_eq!(limits.day, 3);
        assert_eq!(limits.week, 2);
    }
}
