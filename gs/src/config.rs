//! GearScout configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Main GearScout configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// LLM used for extraction, clarification and reports
    pub llm: LlmConfig,

    /// Product search configuration
    pub search: SearchConfig,

    /// Search result cache
    pub cache: CacheConfig,

    /// Requirement negotiation limits
    pub negotiation: NegotiationConfig,

    /// Report output
    pub reports: ReportsConfig,

    /// Directory holding `.pmt` prompt overrides
    #[serde(rename = "prompts-dir")]
    pub prompts_dir: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[serde(rename = "log-level")]
    pub log_level: Option<String>,
}

impl Config {
    /// Validate configuration before use
    ///
    /// Checks that providers are known and their API key environment variables
    /// are set. Call this before starting a research session to fail fast.
    pub fn validate(&self) -> Result<()> {
        for (section, llm) in [("llm", &self.llm), ("search.backend", &self.search.backend)] {
            let resolved = llm.resolve().context(format!("Invalid {} configuration", section))?;
            resolved
                .get_api_key()
                .context(format!("Invalid {} configuration", section))?;
        }
        if self.negotiation.max_rounds == 0 {
            return Err(eyre::eyre!("negotiation.max-rounds must be at least 1"));
        }
        Ok(())
    }

    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        let mut config = Self::load_file_chain(config_path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Read only the log level, ignoring any errors
    ///
    /// Used before logging is initialised.
    pub fn load_log_level(config_path: Option<&PathBuf>) -> Option<String> {
        Self::load_file_chain(config_path).ok().and_then(|c| c.log_level)
    }

    fn load_file_chain(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .gearscout.yml
        let local_config = PathBuf::from(".gearscout.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/gearscout/gearscout.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("gearscout").join("gearscout.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    /// Environment variables win over file values for the main LLM
    fn apply_env_overrides(&mut self) {
        if let Ok(provider) = std::env::var("GEARSCOUT_LLM_PROVIDER") {
            debug!(%provider, "apply_env_overrides: provider override");
            self.llm.provider = provider;
        }
        if let Ok(model) = std::env::var("GEARSCOUT_LLM_MODEL") {
            debug!(%model, "apply_env_overrides: model override");
            self.llm.model = Some(model);
        }
    }
}

/// Wire protocol spoken by a provider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Anthropic,
    /// OpenAI Chat Completions and compatible endpoints
    OpenAi,
    Gemini,
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Anthropic => "anthropic",
            Self::OpenAi => "openai",
            Self::Gemini => "gemini",
        };
        write!(f, "{}", name)
    }
}

/// Built-in defaults per provider name: (kind, model, api key env, base url)
fn provider_defaults(name: &str) -> Option<(ProviderKind, &'static str, &'static str, &'static str)> {
    match name.to_lowercase().as_str() {
        "anthropic" | "claude" => Some((
            ProviderKind::Anthropic,
            "claude-sonnet-4-5-20250929",
            "ANTHROPIC_API_KEY",
            "https://api.anthropic.com",
        )),
        "openai" => Some((
            ProviderKind::OpenAi,
            "gpt-4o",
            "OPENAI_API_KEY",
            "https://api.openai.com/v1",
        )),
        "perplexity" => Some((
            ProviderKind::OpenAi,
            "sonar",
            "PERPLEXITY_API_KEY",
            "https://api.perplexity.ai",
        )),
        "gemini" | "google" => Some((
            ProviderKind::Gemini,
            "gemini-2.5-pro",
            "GOOGLE_API_KEY",
            "https://generativelanguage.googleapis.com",
        )),
        _ => None,
    }
}

/// Errors resolving a provider configuration
#[derive(Debug, thiserror::Error)]
pub enum ProviderConfigError {
    #[error("Unknown LLM provider: '{0}'. Supported: anthropic, openai, perplexity, gemini")]
    UnknownProvider(String),

    #[error("API key not found. Set the {0} environment variable.")]
    MissingApiKey(String),
}

impl ProviderConfigError {
    /// What to change in the configuration
    pub fn hint(&self) -> &'static str {
        match self {
            Self::MissingApiKey(_) => "Export the API key variable named above, or point api-key-env at the right one.",
            Self::UnknownProvider(_) => "Set llm.provider to anthropic, openai, perplexity or gemini.",
        }
    }
}

/// LLM provider configuration
///
/// Unset model, key variable and base URL fall back to the provider's defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider name: anthropic, openai, perplexity or gemini
    pub provider: String,

    /// Model identifier
    pub model: Option<String>,

    /// Environment variable containing the API key
    #[serde(rename = "api-key-env")]
    pub api_key_env: Option<String>,

    /// API base URL
    #[serde(rename = "base-url")]
    pub base_url: Option<String>,

    /// Maximum tokens per response
    #[serde(rename = "max-tokens")]
    pub max_tokens: u32,

    /// Request timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,

    /// Enable extended thinking where the provider supports it
    pub thinking: bool,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "anthropic".to_string(),
            model: None,
            api_key_env: None,
            base_url: None,
            max_tokens: 8192,
            timeout_ms: 120_000,
            thinking: true,
        }
    }
}

impl LlmConfig {
    /// Fill in provider defaults
    pub fn resolve(&self) -> Result<ResolvedLlmConfig, ProviderConfigError> {
        let (kind, model, key_env, base_url) = provider_defaults(&self.provider)
            .ok_or_else(|| ProviderConfigError::UnknownProvider(self.provider.clone()))?;

        Ok(ResolvedLlmConfig {
            kind,
            model: self.model.clone().unwrap_or_else(|| model.to_string()),
            api_key_env: self.api_key_env.clone().unwrap_or_else(|| key_env.to_string()),
            base_url: self
                .base_url
                .clone()
                .unwrap_or_else(|| base_url.to_string())
                .trim_end_matches('/')
                .to_string(),
            max_tokens: self.max_tokens,
            timeout_ms: self.timeout_ms,
            thinking: self.thinking,
        })
    }
}

/// Provider configuration with every default applied
#[derive(Debug, Clone)]
pub struct ResolvedLlmConfig {
    pub kind: ProviderKind,
    pub model: String,
    pub api_key_env: String,
    pub base_url: String,
    pub max_tokens: u32,
    pub timeout_ms: u64,
    pub thinking: bool,
}

impl ResolvedLlmConfig {
    /// Read the API key from the configured environment variable
    pub fn get_api_key(&self) -> Result<String, ProviderConfigError> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| ProviderConfigError::MissingApiKey(self.api_key_env.clone()))
    }
}

/// Product search configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Search-capable model endpoint
    pub backend: LlmConfig,

    /// Maximum listings requested per search
    #[serde(rename = "max-results")]
    pub max_results: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            backend: LlmConfig {
                provider: "perplexity".to_string(),
                max_tokens: 4096,
                thinking: false,
                ..LlmConfig::default()
            },
            max_results: 20,
        }
    }
}

/// Search result cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,

    /// Directory for cache entries
    pub dir: PathBuf,

    /// Entry lifetime in hours
    #[serde(rename = "ttl-hours")]
    pub ttl_hours: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        // XDG cache directory (~/.cache/gearscout on Linux)
        let dir = dirs::cache_dir()
            .map(|d| d.join("gearscout"))
            .unwrap_or_else(|| PathBuf::from(".gearscout-cache"));

        Self {
            enabled: true,
            dir,
            ttl_hours: 4,
        }
    }
}

/// Requirement negotiation limits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NegotiationConfig {
    /// Clarification rounds before giving up
    #[serde(rename = "max-rounds")]
    pub max_rounds: usize,
}

impl Default for NegotiationConfig {
    fn default() -> Self {
        Self { max_rounds: 5 }
    }
}

/// Report output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportsConfig {
    /// Write each report to disk
    pub save: bool,

    /// Directory for saved reports
    pub dir: PathBuf,
}

impl Default for ReportsConfig {
    fn default() -> Self {
        Self {
            save: true,
            dir: PathBuf::from("reports"),
        }
    }
}
