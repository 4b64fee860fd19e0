//! Configuration for the provider endpoint, conversation caps, output
//! location, and size limits.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Complete workspace configuration.
#[derive(Default, Debug, Clone, Serialize, Deserialize)]
pub struct ScribeConfig {
    /// Text generation endpoint configuration.
    pub provider: ProviderConfig,
    /// Clarification and critique caps.
    pub conversation: ConversationConfig,
    /// Output locations.
    pub output: OutputConfig,
    /// Size limits for inputs and review prefixes.
    pub limits: LimitsConfig,
}

/// Text generation endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Chat-completions endpoint URL.
    pub base_url: String,
    /// Model identifier sent with each request.
    pub model: String,
    /// API key. Falls back to the environment variable when unset.
    pub api_key: Option<String>,
    /// Environment variable consulted when `api_key` is unset.
    pub api_key_env: String,
    /// Maximum completion tokens per request.
    pub max_tokens: usize,
    /// Sampling temperature.
    pub temperature: f32,
    /// Request timeout in seconds.
    pub timeout_seconds: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1/chat/completions".to_owned(),
            model: "gpt-4o-mini".to_owned(),
            api_key: None,
            api_key_env: "OPENAI_API_KEY".to_owned(),
            max_tokens: 4096,
            temperature: 0.7,
            timeout_seconds: 300,
        }
    }
}

/// Caps governing the clarification dialogue and the critique loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationConfig {
    /// Maximum clarification rounds before generation is forced.
    pub max_rounds: u32,
    /// Empty or unhelpful answers tolerated before generation is forced.
    pub max_empty_responses: u32,
    /// Maximum self-critique regenerations.
    pub max_critique_rounds: u32,
    /// Confidence score at which clarification stops (0.0-1.0).
    pub confidence_threshold: f64,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            max_rounds: 3,
            max_empty_responses: 2,
            max_critique_rounds: 2,
            confidence_threshold: 0.7,
        }
    }
}

/// Output locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory that receives generated documents.
    pub dir: PathBuf,
    /// Whether to save the workflow trace next to the document.
    #[serde(default)]
    pub write_workflow_log: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("outputs"),
            write_workflow_log: false,
        }
    }
}

/// Size limits for code input and review prefixes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Maximum bytes read from a single source file.
    pub max_file_bytes: u64,
    /// Maximum total bytes read across a code directory.
    pub max_total_bytes: u64,
    /// Draft prefix length handed to the security reviewer.
    pub review_prefix_chars: usize,
    /// Draft prefix length handed to the critique editor.
    pub critique_prefix_chars: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_file_bytes: 5 * 1024 * 1024,
            max_total_bytes: 100 * 1024 * 1024,
            review_prefix_chars: 2500,
            critique_prefix_chars: 2000,
        }
    }
}

impl ScribeConfig {
    /// Get the default config directory path (`~/.scribe`)
    ///
    /// # Errors
    /// Returns an error if the home directory cannot be determined
    pub fn config_dir() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| Error::Config("Could not determine home directory".to_owned()))?;
        Ok(home.join(".scribe"))
    }

    /// Get the default config file path (`~/.scribe/config.toml`)
    ///
    /// # Errors
    /// Returns an error if the home directory cannot be determined
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load config from the default location (`~/.scribe/config.toml`)
    /// If the config doesn't exist, creates it with default values
    ///
    /// # Errors
    /// Returns an error if the config cannot be read or created
    pub fn load_or_create() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            Self::load_from_file(&config_path)
        } else {
            let config = Self::default();
            config.save_to_file(&config_path)?;
            Ok(config)
        }
    }

    /// Load config from a specific file
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .map_err(|error| Error::Config(format!("Failed to read config: {error}")))?;
        let config: Self = toml::from_str(&contents)
            .map_err(|error| Error::Config(format!("Failed to parse config: {error}")))?;

        tracing::debug!(
            "Loaded config from {:?}: model={}, api_key={}",
            path,
            config.provider.model,
            if config.provider.api_key.is_some() {
                "present"
            } else {
                "from env"
            }
        );

        Ok(config)
    }

    /// Save config to a specific file
    ///
    /// # Errors
    /// Returns an error if the file cannot be written
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|error| {
                Error::Config(format!("Failed to create config directory: {error}"))
            })?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|error| Error::Config(format!("Failed to serialize config: {error}")))?;

        let header = "# Scribe Configuration File\n\
                      # This file is automatically generated on first run\n\
                      # Edit this file to customize your settings\n\n";

        fs::write(path, format!("{header}{contents}"))
            .map_err(|error| Error::Config(format!("Failed to write config: {error}")))?;

        Ok(())
    }

    /// Get the API key, checking config first, then the environment.
    pub fn api_key(&self) -> Option<String> {
        self.provider
            .api_key
            .clone()
            .or_else(|| env::var(&self.provider.api_key_env).ok())
    }

    /// Validate required configuration.
    ///
    /// Missing credentials are the only fatal startup condition; every
    /// other failure mode degrades in-band further down the pipeline.
    ///
    /// # Errors
    /// Returns [`Error::MissingApiKey`] if no API key is configured, or
    /// [`Error::Config`] if the endpoint URL is empty.
    pub fn validate(&self) -> Result<()> {
        if self.provider.base_url.trim().is_empty() {
            return Err(Error::Config(
                "provider.base_url must not be empty".to_owned(),
            ));
        }
        if self.api_key().is_none() {
            return Err(Error::MissingApiKey(self.provider.api_key_env.clone()));
        }
        Ok(())
    }
}
