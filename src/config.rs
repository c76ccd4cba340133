//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.ledgerlens.toml` files.

use crate::agent::LlmConfig;
use crate::cli::{Args, OutputFormat};
use crate::workflow::EngineSettings;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Name of the configuration file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = ".ledgerlens.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Model settings.
    #[serde(default)]
    pub model: ModelConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Directory holding the ledger files.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Ledger file extension, without the dot.
    #[serde(default = "default_extension")]
    pub extension: String,

    /// Number of ledger files analysed at once.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Time limit for one query.
    #[serde(default = "default_deadline")]
    pub deadline_seconds: u64,

    #[serde(default)]
    pub format: OutputFormat,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            extension: default_extension(),
            concurrency: default_concurrency(),
            deadline_seconds: default_deadline(),
            format: OutputFormat::default(),
            verbose: false,
        }
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_extension() -> String {
    "txt".to_string()
}

fn default_concurrency() -> usize {
    1
}

fn default_deadline() -> u64 {
    1800
}

/// LLM model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Default model name.
    #[serde(default = "default_model")]
    pub name: String,

    /// Ollama API URL.
    #[serde(default = "default_ollama_url")]
    pub ollama_url: String,

    /// Temperature for generation.
    #[serde(default)]
    pub temperature: f32,

    /// Timeout for each model call, in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Deepest record level shown to the candidate finder.
    #[serde(default = "default_max_candidate_depth")]
    pub max_candidate_depth: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: default_model(),
            ollama_url: default_ollama_url(),
            temperature: 0.0,
            timeout_seconds: default_timeout(),
            max_candidate_depth: default_max_candidate_depth(),
        }
    }
}

fn default_model() -> String {
    "llama3.2:latest".to_string()
}

fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_timeout() -> u64 {
    300
}

fn default_max_candidate_depth() -> usize {
    4
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(DEFAULT_CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    /// Only values given explicitly on the command line override.
    pub fn merge_with_args(&mut self, args: &Args) {
        if let Some(ref data_dir) = args.data_dir {
            self.general.data_dir = data_dir.clone();
        }
        if let Some(ref extension) = args.extension {
            self.general.extension = extension.trim_start_matches('.').to_string();
        }
        if let Some(concurrency) = args.concurrency {
            self.general.concurrency = concurrency;
        }
        if let Some(deadline) = args.deadline {
            self.general.deadline_seconds = deadline;
        }
        if let Some(format) = args.format {
            self.general.format = format;
        }

        if let Some(ref model) = args.model {
            self.model.name = model.clone();
        }
        if let Some(ref url) = args.ollama_url {
            self.model.ollama_url = url.clone();
        }
        if let Some(timeout) = args.timeout {
            self.model.timeout_seconds = timeout;
        }

        // Flags always override
        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Settings for the query engine. Zero limits are raised to 1.
    pub fn engine_settings(&self, show_progress: bool) -> EngineSettings {
        EngineSettings {
            data_dir: self.general.data_dir.clone(),
            extension: self.general.extension.clone(),
            concurrency: self.general.concurrency.max(1),
            port_timeout: Duration::from_secs(self.model.timeout_seconds.max(1)),
            deadline: Duration::from_secs(self.general.deadline_seconds.max(1)),
            max_candidate_depth: self.model.max_candidate_depth.max(1),
            show_progress,
        }
    }

    /// Connection settings for the model server.
    pub fn llm_config(&self) -> LlmConfig {
        LlmConfig {
            ollama_url: self.model.ollama_url.clone(),
            model_name: self.model.name.clone(),
            temperature: self.model.temperature,
            timeout_seconds: self.model.timeout_seconds.max(1),
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
