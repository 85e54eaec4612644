use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use crate::error::{Result, LineRunError};

// Default values for evaluator configuration
fn default_timeout_secs() -> u64 {
    30
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_api_key_env() -> String {
    "ZHIPU_API_KEY".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub evaluator: EvaluatorConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluatorConfig {
    /// Chat-completion endpoint URL
    pub endpoint: String,
    /// Model identifier sent with each request
    pub model: String,
    /// Sampling temperature, kept low for consistent grading
    pub temperature: f32,
    /// Token budget for the reply
    pub max_tokens: u32,
    /// Whole-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Connect timeout in seconds
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Environment variable holding the bearer credential
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    /// Skip the remote call and always score locally
    #[serde(default)]
    pub offline: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding practice records, progress and logs
    pub data_dir: PathBuf,
    /// Optional catalog file replacing the built-in shows
    #[serde(default)]
    pub catalog_path: Option<PathBuf>,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://open.bigmodel.cn/api/paas/v4/chat/completions".to_string(),
            model: "glm-4-flash".to_string(),
            temperature: 0.3,
            max_tokens: 500,
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            api_key_env: default_api_key_env(),
            offline: false,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".linerun"),
            catalog_path: None,
        }
    }
}

/// Bearer credential for the scoring endpoint. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Result<Self> {
        let key = key.into();
        if key.trim().is_empty() {
            return Err(LineRunError::Config("API key is empty".to_string()));
        }
        Ok(Self(key.trim().to_string()))
    }

    /// Read the credential from the named environment variable.
    pub fn from_env(var: &str) -> Result<Self> {
        let value = std::env::var(var).map_err(|_| {
            LineRunError::Config(format!(
                "Missing API key: set the {} environment variable or run with --offline",
                var
            ))
        })?;
        Self::new(value)
            .map_err(|_| LineRunError::Config(format!("{} is set but empty", var)))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

impl EvaluatorConfig {
    pub fn api_key(&self) -> Result<ApiKey> {
        ApiKey::from_env(&self.api_key_env)
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| LineRunError::Config(format!("Failed to read config file: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| LineRunError::Config(format!("Failed to parse config file: {}", e)))
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| LineRunError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| LineRunError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }
}
