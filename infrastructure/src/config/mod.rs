//! Configuration file structures.
//!
//! [`FileConfig`] is the on-disk shape merged by [`ConfigLoader`] from
//! defaults, config files, and `CHATCAST_*` environment variables.

pub mod loader;

pub use loader::ConfigLoader;

use chatcast_application::CompletionConfigInput;
use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub defaults: CompletionDefaults,
}

/// Connection settings for the completion endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of an OpenAI-compatible API, without a trailing path.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Bearer token; usually supplied via `CHATCAST_API__API_KEY`.
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_connect_timeout_secs() -> u64 {
    10
}

/// Default conversation parameters applied when a caller starts a new
/// conversation without overriding them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionDefaults {
    pub model: String,
    pub model_max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
    pub presence_penalty: f32,
    pub frequency_penalty: f32,
    pub n: u32,
    pub stop: Vec<String>,
    pub max_tokens: u32,
    pub initial_system_message: String,
}

impl Default for CompletionDefaults {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            model_max_tokens: 128_000,
            temperature: 0.7,
            top_p: 1.0,
            presence_penalty: 0.0,
            frequency_penalty: 0.0,
            n: 1,
            stop: Vec::new(),
            max_tokens: 1024,
            initial_system_message: "You are a helpful assistant.".to_string(),
        }
    }
}

impl CompletionDefaults {
    /// Build the use-case config input from these defaults.
    pub fn to_config_input(&self) -> CompletionConfigInput {
        CompletionConfigInput {
            model: self.model.clone(),
            model_max_tokens: self.model_max_tokens,
            temperature: self.temperature,
            top_p: self.top_p,
            presence_penalty: self.presence_penalty,
            frequency_penalty: self.frequency_penalty,
            n: self.n,
            stop: self.stop.clone(),
            max_tokens: self.max_tokens,
            initial_system_message: self.initial_system_message.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_usable() {
        let config = FileConfig::default();
        assert_eq!(config.api.base_url, "https://api.openai.com/v1");
        assert!(config.api.api_key.is_none());
        assert_eq!(config.defaults.n, 1);
        assert!(config.defaults.max_tokens > 0);
    }

    #[test]
    fn test_to_config_input_carries_every_field() {
        let defaults = CompletionDefaults {
            stop: vec!["END".to_string()],
            ..CompletionDefaults::default()
        };
        let input = defaults.to_config_input();
        assert_eq!(input.model, defaults.model);
        assert_eq!(input.model_max_tokens, defaults.model_max_tokens);
        assert_eq!(input.stop, vec!["END".to_string()]);
        assert_eq!(input.initial_system_message, defaults.initial_system_message);
    }
}
