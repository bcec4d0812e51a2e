use std::env;
use std::path::PathBuf;
use std::sync::OnceLock;
use std::time::Duration;
use thiserror::Error;

use crate::llm::{LlmProvider, LlmSettings};

const DEFAULT_OPENAI_MODEL: &str = "gpt-4o";
const DEFAULT_OLLAMA_MODEL: &str = "gpt-oss:latest";
const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_OLLAMA_URL: &str = "http://127.0.0.1:11434";
const DEFAULT_TIMEOUT_SECS: u64 = 120;
const DEFAULT_UPLOAD_DIR: &str = "data/uploads";

/// Default cap on concurrent section-structuring calls.
pub const DEFAULT_STRUCTURING_CONCURRENCY: usize = 5;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable was not provided.
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Runtime configuration for the SDS Digest binaries.
#[derive(Debug, Clone)]
pub struct Config {
    /// Language-model backend used by every pipeline stage.
    pub llm_provider: LlmProvider,
    /// Model identifier passed to the provider.
    pub llm_model: String,
    /// API key for the OpenAI-compatible backend.
    pub openai_api_key: Option<String>,
    /// Base URL for the OpenAI-compatible backend.
    pub openai_base_url: String,
    /// Base URL of the Ollama runtime.
    pub ollama_url: String,
    /// Sampling temperature applied to every model call.
    pub llm_temperature: f32,
    /// Transport timeout for a single model call.
    pub llm_timeout: Duration,
    /// Maximum number of section-structuring calls in flight at once.
    pub structuring_concurrency: usize,
    /// Directory receiving uploaded documents and extracted markdown.
    pub upload_dir: PathBuf,
    /// Optional override for the HTTP server port.
    pub server_port: Option<u16>,
}

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        let llm_provider = match load_env_optional("LLM_PROVIDER") {
            Some(value) => value
                .parse()
                .map_err(|()| ConfigError::InvalidValue("LLM_PROVIDER".to_string()))?,
            None => LlmProvider::OpenAI,
        };

        let openai_api_key = load_env_optional("OPENAI_API_KEY");
        if matches!(llm_provider, LlmProvider::OpenAI) && openai_api_key.is_none() {
            return Err(ConfigError::MissingVariable("OPENAI_API_KEY".to_string()));
        }

        let llm_model = load_env_optional("LLM_MODEL").unwrap_or_else(|| {
            match llm_provider {
                LlmProvider::OpenAI => DEFAULT_OPENAI_MODEL,
                LlmProvider::Ollama => DEFAULT_OLLAMA_MODEL,
            }
            .to_string()
        });

        let structuring_concurrency = parse_optional::<usize>("STRUCTURING_CONCURRENCY")?
            .unwrap_or(DEFAULT_STRUCTURING_CONCURRENCY);
        if structuring_concurrency == 0 {
            return Err(ConfigError::InvalidValue(
                "STRUCTURING_CONCURRENCY".to_string(),
            ));
        }

        Ok(Self {
            llm_provider,
            llm_model,
            openai_api_key,
            openai_base_url: load_env_optional("OPENAI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
            ollama_url: load_env_optional("OLLAMA_URL")
                .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string()),
            llm_temperature: parse_optional("LLM_TEMPERATURE")?.unwrap_or(0.0),
            llm_timeout: Duration::from_secs(
                parse_optional("LLM_TIMEOUT_SECS")?.unwrap_or(DEFAULT_TIMEOUT_SECS),
            ),
            structuring_concurrency,
            upload_dir: load_env_optional("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_UPLOAD_DIR)),
            server_port: parse_optional("SERVER_PORT")?,
        })
    }

    /// Settings handed to the language-model factory.
    pub fn llm_settings(&self) -> LlmSettings {
        let base_url = match self.llm_provider {
            LlmProvider::OpenAI => self.openai_base_url.clone(),
            LlmProvider::Ollama => self.ollama_url.clone(),
        };
        LlmSettings {
            provider: self.llm_provider,
            model: self.llm_model.clone(),
            base_url,
            api_key: self.openai_api_key.clone(),
            temperature: self.llm_temperature,
            timeout: self.llm_timeout,
        }
    }
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_optional<T: std::str::FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    load_env_optional(key)
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue(key.to_string()))
        })
        .transpose()
}

/// Global configuration cache populated during process start.
pub static CONFIG: OnceLock<Config> = OnceLock::new();

/// Retrieve the loaded configuration, panicking if initialization has not occurred.
pub fn get_config() -> &'static Config {
    CONFIG.get().expect("Config not initialized")
}

/// Load configuration from the environment and install it in the global cache.
pub fn init_config() {
    dotenvy::dotenv().ok();
    let config = Config::from_env().expect("Failed to load config from environment");
    tracing::debug!(
        provider = ?config.llm_provider,
        model = %config.llm_model,
        structuring_concurrency = config.structuring_concurrency,
        upload_dir = %config.upload_dir.display(),
        server_port = ?config.server_port,
        "Loaded configuration"
    );
    CONFIG.set(config).expect("Failed to set config");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_optional_rejects_garbage() {
        // SAFETY: the variable name is unique to this test.
        unsafe { env::set_var("SDS_DIGEST_TEST_BAD_NUMBER", "five") };
        let result = parse_optional::<usize>("SDS_DIGEST_TEST_BAD_NUMBER");
        assert!(matches!(result, Err(ConfigError::InvalidValue(key)) if key == "SDS_DIGEST_TEST_BAD_NUMBER"));
    }

    #[test]
    fn blank_values_count_as_missing() {
        // SAFETY: the variable name is unique to this test.
        unsafe { env::set_var("SDS_DIGEST_TEST_BLANK", "   ") };
        assert!(load_env_optional("SDS_DIGEST_TEST_BLANK").is_none());
        assert!(
            parse_optional::<u16>("SDS_DIGEST_TEST_BLANK")
                .expect("blank is not an error")
                .is_none()
        );
    }
}
