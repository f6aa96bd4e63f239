//! Configuration system for the ZenCover crew
//!
//! Supports multiple configuration sources with the following precedence (highest to lowest):
//! 1. CLI arguments
//! 2. Environment variables (ZENCOVER_* prefix, plus the OPENAI_* provider variables)
//! 3. Configuration file (TOML)
//! 4. Default values
//!
//! A `.env` file is loaded into the process environment before any of this
//! runs, so its entries behave like ordinary environment variables.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Endpoint used when no base URL is configured
pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Main crew configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CrewConfig {
    /// Language model provider settings
    pub llm: LlmSettings,

    /// Crew execution settings
    pub crew: CrewSettings,

    /// Web search tool settings
    pub search: SearchSettings,

    /// Logging configuration
    pub logging: LoggingSettings,
}

/// Upper bound for `llm.max_retries`
pub const MAX_RETRIES: u32 = 10;

/// OpenAI-compatible provider settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    /// API base URL (e.g., "https://api.openai.com/v1", "http://localhost:11434/v1")
    pub base_url: String,

    /// API key (empty string for local servers like Ollama)
    #[serde(skip_serializing_if = "String::is_empty")]
    pub api_key: String,

    /// Default model identifier, used by agents without their own
    pub model: String,

    /// Default sampling temperature
    pub temperature: f32,

    /// Upper bound on completion length (None = provider default)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Maximum retries on transient failures
    pub max_retries: u32,
}

/// Crew execution settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CrewSettings {
    /// Crew verbosity: 0 = quiet, 1 = task progress, 2 = every agent step
    pub verbose: u8,

    /// Reasoning steps an agent may take on one task before it must answer
    pub max_iterations: u32,

    /// Crew definition file (None = bundled ZenCover crew)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub definition: Option<String>,
}

/// DuckDuckGo search settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    /// HTML search endpoint
    pub base_url: String,

    /// DuckDuckGo region code (e.g. "wt-wt", "ch-fr")
    pub region: String,

    /// Maximum snippets returned to the agent
    pub max_results: usize,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Log level: trace, debug, info, warn, error
    pub level: String,

    /// Log file path (empty = no file logging)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,

    /// Number of rotated log files to keep
    pub max_files: u32,

    /// Enable JSON formatted logging
    pub json_format: bool,
}

// Default implementations

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            base_url: OPENAI_BASE_URL.to_string(),
            api_key: String::new(),
            model: "gpt-4".to_string(),
            temperature: 0.7,
            max_tokens: None,
            timeout_secs: 120,
            max_retries: 2,
        }
    }
}

impl Default for CrewSettings {
    fn default() -> Self {
        Self {
            verbose: 2,
            max_iterations: 15,
            definition: None,
        }
    }
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            base_url: "https://html.duckduckgo.com/html/".to_string(),
            region: "wt-wt".to_string(),
            max_results: 4,
            timeout_secs: 30,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
            max_files: 5,
            json_format: false,
        }
    }
}

impl CrewConfig {
    /// Load configuration from file with environment variable overrides
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut config = Self::default();

        // 1. Load from config file if it exists
        if let Some(path) = Self::find_config_file(config_path)? {
            debug!(path = %path.display(), "Loading configuration file");
            let content = fs::read_to_string(&path).map_err(|e| Error::IoRead {
                path: path.clone(),
                source: e,
            })?;
            config = toml::from_str(&content)
                .map_err(|e| Error::config_parse(format!("{}", path.display()), e))?;
            info!(path = %path.display(), "Configuration loaded from file");
        }

        // 2. Apply environment variable overrides
        config.apply_env_overrides();

        // 3. Expand paths
        config.expand_paths();

        // 4. Validate
        config.validate()?;

        Ok(config)
    }

    /// Find the configuration file to use
    fn find_config_file(explicit_path: Option<&str>) -> Result<Option<PathBuf>> {
        // If explicit path provided, use it (error if not found)
        if let Some(path) = explicit_path {
            let path = PathBuf::from(expand_path(path));
            if path.exists() {
                return Ok(Some(path));
            }
            return Err(Error::ConfigNotFound { path });
        }

        let search_paths = [
            PathBuf::from("zencover.toml"),
            dirs::config_dir()
                .map(|p| p.join("zencover").join("crew.toml"))
                .unwrap_or_default(),
            dirs::home_dir()
                .map(|p| p.join(".zencover").join("crew.toml"))
                .unwrap_or_default(),
        ];

        for path in &search_paths {
            if path.is_file() {
                debug!(path = %path.display(), "Found configuration file");
                return Ok(Some(path.clone()));
            }
        }

        debug!("No configuration file found, using defaults");
        Ok(None)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        // Provider variables understood by every OpenAI client
        if let Ok(val) = std::env::var("OPENAI_API_KEY") {
            self.llm.api_key = val;
        }
        if let Ok(val) = std::env::var("OPENAI_API_BASE") {
            self.llm.base_url = val;
        }
        if let Ok(val) = std::env::var("OPENAI_MODEL_NAME") {
            self.llm.model = val;
        }

        // LLM settings
        if let Ok(val) = std::env::var("ZENCOVER_LLM_BASE_URL") {
            self.llm.base_url = val;
        }
        if let Ok(val) = std::env::var("ZENCOVER_LLM_API_KEY") {
            self.llm.api_key = val;
        }
        if let Ok(val) = std::env::var("ZENCOVER_LLM_MODEL") {
            self.llm.model = val;
        }
        if let Ok(val) = std::env::var("ZENCOVER_LLM_TEMPERATURE") {
            if let Ok(n) = val.parse() {
                self.llm.temperature = n;
            }
        }
        if let Ok(val) = std::env::var("ZENCOVER_LLM_TIMEOUT_SECS") {
            if let Ok(n) = val.parse() {
                self.llm.timeout_secs = n;
            }
        }
        if let Ok(val) = std::env::var("ZENCOVER_LLM_MAX_RETRIES") {
            if let Ok(n) = val.parse() {
                self.llm.max_retries = n;
            }
        }

        // Crew settings
        if let Ok(val) = std::env::var("ZENCOVER_VERBOSE") {
            if let Ok(n) = val.parse() {
                self.crew.verbose = n;
            }
        }
        if let Ok(val) = std::env::var("ZENCOVER_MAX_ITERATIONS") {
            if let Ok(n) = val.parse() {
                self.crew.max_iterations = n;
            }
        }
        if let Ok(val) = std::env::var("ZENCOVER_CREW") {
            self.crew.definition = Some(val);
        }

        // Search settings
        if let Ok(val) = std::env::var("ZENCOVER_SEARCH_URL") {
            self.search.base_url = val;
        }
        if let Ok(val) = std::env::var("ZENCOVER_SEARCH_REGION") {
            self.search.region = val;
        }

        // Logging settings
        if let Ok(val) = std::env::var("ZENCOVER_LOG_LEVEL") {
            self.logging.level = val;
        }
        if let Ok(val) = std::env::var("ZENCOVER_LOG_FILE") {
            self.logging.file = Some(val);
        }
        if let Ok(val) = std::env::var("ZENCOVER_LOG_JSON") {
            self.logging.json_format = val.to_lowercase() == "true" || val == "1";
        }
    }

    /// Expand ~ and other path variables
    fn expand_paths(&mut self) {
        if let Some(ref file) = self.logging.file {
            self.logging.file = Some(expand_path(file));
        }
        if let Some(ref definition) = self.crew.definition {
            self.crew.definition = Some(expand_path(definition));
        }
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        if !self.llm.base_url.starts_with("http://") && !self.llm.base_url.starts_with("https://") {
            return Err(Error::Config(
                "llm.base_url must start with http:// or https://".to_string(),
            ));
        }

        if self.llm.model.trim().is_empty() {
            return Err(Error::Config("llm.model cannot be empty".to_string()));
        }

        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(Error::Config(
                "llm.temperature must be between 0.0 and 2.0".to_string(),
            ));
        }

        if self.llm.max_retries > MAX_RETRIES {
            return Err(Error::Config(format!(
                "llm.max_retries must be at most {}",
                MAX_RETRIES
            )));
        }

        if self.crew.verbose > 2 {
            return Err(Error::Config("crew.verbose must be 0, 1 or 2".to_string()));
        }

        if self.crew.max_iterations == 0 {
            return Err(Error::Config(
                "crew.max_iterations must be at least 1".to_string(),
            ));
        }

        if url::Url::parse(&self.search.base_url).is_err() {
            return Err(Error::Config(format!(
                "search.base_url is not a valid URL: {}",
                self.search.base_url
            )));
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(Error::Config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_levels.join(", ")
            )));
        }

        Ok(())
    }

    /// Check that the provider can be called at all.
    ///
    /// Only the hosted OpenAI endpoint insists on a key; local
    /// OpenAI-compatible servers accept anonymous requests.
    pub fn require_credentials(&self) -> Result<()> {
        if self.llm.api_key.is_empty() && self.llm.base_url.contains("api.openai.com") {
            return Err(Error::MissingApiKey {
                base_url: self.llm.base_url.clone(),
            });
        }
        Ok(())
    }
}

/// Load a `.env` file into the process environment.
///
/// Variables already set in the environment win over the file. A missing
/// default `.env` is fine; a missing explicit file is an error.
pub fn load_env_file(path: Option<&Path>) -> Result<()> {
    match path {
        Some(path) => {
            dotenv::from_path(path).map_err(|e| Error::Config(format!(
                "Failed to load env file {}: {}",
                path.display(),
                e
            )))?;
            debug!(path = %path.display(), "Loaded env file");
        }
        None => {
            if let Ok(path) = dotenv::dotenv() {
                debug!(path = %path.display(), "Loaded .env file");
            }
        }
    }
    Ok(())
}

/// Expand ~ and environment variables in paths
pub fn expand_path(path: &str) -> String {
    shellexpand::full(path)
        .unwrap_or_else(|_| std::borrow::Cow::Borrowed(path))
        .into_owned()
}

/// Initialize a new configuration file
pub fn init_config(path: Option<&str>, force: bool) -> Result<()> {
    let config_path = path
        .map(|p| PathBuf::from(expand_path(p)))
        .unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".zencover")
                .join("crew.toml")
        });

    write_new_file(&config_path, &generate_default_config(), force)?;

    println!("Configuration file created: {}", config_path.display());
    Ok(())
}

/// Write a freshly generated file, refusing to clobber without `force`
pub fn write_new_file(path: &Path, content: &str, force: bool) -> Result<()> {
    if path.exists() && !force {
        return Err(Error::Config(format!(
            "File already exists: {}. Use --force to overwrite.",
            path.display()
        )));
    }

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| Error::IoWrite {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
    }

    fs::write(path, content).map_err(|e| Error::IoWrite {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Generate default configuration content with comments
fn generate_default_config() -> String {
    r#"# ZenCover Crew Configuration

[llm]
# API base URL (OpenAI, Ollama, vLLM, LM Studio, etc.)
base_url = "https://api.openai.com/v1"

# API key. Prefer OPENAI_API_KEY in the environment or a .env file.
# api_key = ""

# Default model identifier
model = "gpt-4"

# Default sampling temperature
temperature = 0.7

# Request timeout in seconds
timeout_secs = 120

# Maximum retries on transient failures
max_retries = 2

[crew]
# 0 = quiet, 1 = task progress, 2 = every agent step
verbose = 2

# Reasoning steps an agent may take on one task before it must answer
max_iterations = 15

# Custom crew definition (comment out to use the bundled ZenCover crew)
# definition = "~/.zencover/zencover-crew.toml"

[search]
# DuckDuckGo HTML endpoint
base_url = "https://html.duckduckgo.com/html/"

# Region code (wt-wt = no region, ch-fr = Switzerland/French)
region = "wt-wt"

# Maximum snippets handed back to the agent
max_results = 4

# Request timeout in seconds
timeout_secs = 30

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log file path (comment out to disable file logging)
# file = "~/.zencover/logs/crew.log"

# Number of rotated log files to keep
max_files = 5

# Enable JSON formatted logging
json_format = false
"#
    .to_string()
}
