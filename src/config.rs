use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::constants;
use crate::error::ConfigError;

#[derive(Clone, Debug, Deserialize)]
pub struct LlmConfig {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Fixed sampling seed, for reproducible runs
    #[serde(default)]
    pub seed: Option<i64>,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Ask the endpoint for `response_format: json_object`
    #[serde(default)]
    pub json_mode: bool,
}

#[derive(Clone, Debug, Deserialize)]
pub struct PipelineConfig {
    /// Total attempts per stage on schema-invalid replies
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Independent stages of one stock run at once
    #[serde(default = "default_stage_fanout")]
    pub stage_fanout: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            stage_fanout: default_stage_fanout(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct BatchConfig {
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Later passes over stocks that failed with call errors
    #[serde(default = "default_retry_passes")]
    pub call_failed_retry_passes: usize,
    #[serde(default = "default_true")]
    pub skip_existing: bool,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            call_failed_retry_passes: default_retry_passes(),
            skip_existing: true,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct AppConfig {
    pub llm: LlmConfig,

    #[serde(default = "default_queue_size")]
    pub llm_queue_size: usize,
    #[serde(default = "default_max_concurrent")]
    pub llm_max_concurrent: usize,

    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub batch: BatchConfig,
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

impl AppConfig {
    /// Load `config.yaml` from the working directory, then apply `.env` and
    /// environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("config.yaml")
    }

    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;

        let _ = dotenvy::dotenv();
        let mut config = Self::from_yaml_str(&content)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        // Strip BOM if present
        let content = content.strip_prefix('\u{feff}').unwrap_or(content);
        Ok(serde_yaml::from_str(content)?)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(key) = std::env::var("LLM_API_KEY") {
            self.llm.api_key = Some(key);
        }
        if let Ok(url) = std::env::var("LLM_BASE_URL") {
            self.llm.base_url = Some(url);
        }
        if let Ok(model) = std::env::var("LLM_MODEL") {
            self.llm.model = model;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |field: &str, reason: &str| ConfigError::Invalid {
            field: field.to_string(),
            reason: reason.to_string(),
        };

        if self.llm.model.trim().is_empty() {
            return Err(invalid("llm.model", "must not be empty"));
        }
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(invalid("llm.temperature", "must be within [0, 2]"));
        }
        if self.pipeline.max_attempts == 0 {
            return Err(invalid("pipeline.max_attempts", "must be at least 1"));
        }
        if self.pipeline.stage_fanout == 0 {
            return Err(invalid("pipeline.stage_fanout", "must be at least 1"));
        }
        if self.batch.concurrency == 0 {
            return Err(invalid("batch.concurrency", "must be at least 1"));
        }
        if self.llm_max_concurrent == 0 {
            return Err(invalid("llm_max_concurrent", "must be at least 1"));
        }
        Ok(())
    }
}

fn default_temperature() -> f32 {
    constants::llm::DEFAULT_TEMPERATURE
}

fn default_max_tokens() -> u32 {
    constants::llm::DEFAULT_MAX_TOKENS
}

fn default_max_attempts() -> u32 {
    constants::pipeline::DEFAULT_MAX_ATTEMPTS
}

fn default_stage_fanout() -> usize {
    constants::pipeline::DEFAULT_STAGE_FANOUT
}

fn default_concurrency() -> usize {
    constants::batch::DEFAULT_CONCURRENCY
}

fn default_retry_passes() -> usize {
    constants::batch::DEFAULT_CALL_FAILED_RETRY_PASSES
}

fn default_queue_size() -> usize {
    constants::llm::DEFAULT_QUEUE_SIZE
}

fn default_max_concurrent() -> usize {
    constants::llm::DEFAULT_MAX_CONCURRENT
}

fn default_bind() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./data/analyzed")
}

fn default_true() -> bool {
    true
}
