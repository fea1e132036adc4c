//! Configuration management for chatrelay
//!
//! Parses TOML configuration files and provides typed access to settings.
//! Every section has defaults, so an empty file is a valid configuration.

use crate::error::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Upper bound for the outbound request timeout
const MAX_TIMEOUT_SECONDS: u64 = 300;

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub speech: SpeechConfig,
    #[serde(default)]
    pub policy: PolicyConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Bound applied to each outbound call (chat and speech)
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_seconds: default_request_timeout(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_request_timeout() -> u64 {
    30
}

/// Wire contract spoken by the completion service
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum UpstreamApi {
    /// `POST {base_url}/responses`, replies with `output_text` / `output`
    #[default]
    Responses,
    /// `POST {base_url}/chat/completions`, replies with `choices`
    ChatCompletions,
}

/// Completion service configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UpstreamConfig {
    #[serde(default)]
    pub api: UpstreamApi,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
    /// Name of the environment variable holding the bearer credential
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    /// Echo the untouched upstream payload as `_raw` in replies
    #[serde(default = "default_true")]
    pub include_raw: bool,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            api: UpstreamApi::default(),
            base_url: default_base_url(),
            model: default_model(),
            temperature: default_temperature(),
            max_output_tokens: default_max_output_tokens(),
            api_key_env: default_api_key_env(),
            include_raw: true,
        }
    }
}

impl UpstreamConfig {
    /// Full URL of the completion endpoint for the configured API style
    pub fn completion_url(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        match self.api {
            UpstreamApi::Responses => format!("{}/responses", base),
            UpstreamApi::ChatCompletions => format!("{}/chat/completions", base),
        }
    }

    /// Full URL of the speech synthesis endpoint
    pub fn speech_url(&self) -> String {
        format!("{}/audio/speech", self.base_url.trim_end_matches('/'))
    }
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-4.1".to_string()
}

fn default_temperature() -> f64 {
    0.7
}

fn default_max_output_tokens() -> u32 {
    1000
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_true() -> bool {
    true
}

/// Speech synthesis configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SpeechConfig {
    /// When false, `wantTTS` is ignored
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_speech_model")]
    pub model: String,
    #[serde(default = "default_voice")]
    pub voice: String,
    #[serde(default = "default_format")]
    pub format: String,
    /// Longest text (in characters) sent for synthesis
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            model: default_speech_model(),
            voice: default_voice(),
            format: default_format(),
            max_chars: default_max_chars(),
        }
    }
}

fn default_speech_model() -> String {
    "tts-1".to_string()
}

fn default_voice() -> String {
    "alloy".to_string()
}

fn default_format() -> String {
    "mp3".to_string()
}

fn default_max_chars() -> usize {
    800
}

/// Conversation intensification policy
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PolicyConfig {
    /// Stress levels strictly above this value trigger intensification
    #[serde(default = "default_stress_threshold")]
    pub stress_threshold: f64,
    #[serde(default = "default_intensify_suffix")]
    pub intensify_suffix: String,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            stress_threshold: default_stress_threshold(),
            intensify_suffix: default_intensify_suffix(),
        }
    }
}

fn default_stress_threshold() -> f64 {
    80.0
}

fn default_intensify_suffix() -> String {
    " The candidate is panicking. Press them harder.".to_string()
}

/// Observability configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Reading, parsing and validation fail with distinct errors so the
    /// operator can tell a missing file from a typo from a bad value.
    pub fn from_file<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        let path_display = path.as_ref().display().to_string();

        let content =
            std::fs::read_to_string(path.as_ref()).map_err(|source| AppError::ConfigFileRead {
                path: path_display.clone(),
                source,
            })?;

        let config: Self =
            toml::from_str(&content).map_err(|source| AppError::ConfigParseFailed {
                path: path_display.clone(),
                source,
            })?;

        config
            .validate()
            .map_err(|e| AppError::ConfigValidationFailed {
                path: path_display,
                reason: e.to_string(),
            })?;

        Ok(config)
    }

    /// Timeout applied to each outbound call
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_seconds)
    }

    /// Validate field values that serde cannot check on its own
    pub fn validate(&self) -> AppResult<()> {
        let timeout = self.server.request_timeout_seconds;
        if timeout == 0 || timeout > MAX_TIMEOUT_SECONDS {
            return Err(AppError::Config(format!(
                "server.request_timeout_seconds must be between 1 and {}, got {}",
                MAX_TIMEOUT_SECONDS, timeout
            )));
        }

        let base_url = &self.upstream.base_url;
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(AppError::Config(format!(
                "upstream.base_url must start with http:// or https://, got '{}'",
                base_url
            )));
        }

        let temperature = self.upstream.temperature;
        if !temperature.is_finite() || !(0.0..=2.0).contains(&temperature) {
            return Err(AppError::Config(format!(
                "upstream.temperature must be a finite number between 0.0 and 2.0, got {}",
                temperature
            )));
        }

        if self.upstream.max_output_tokens == 0 {
            return Err(AppError::Config(
                "upstream.max_output_tokens must be greater than 0".to_string(),
            ));
        }

        for (field, value) in [
            ("upstream.model", &self.upstream.model),
            ("upstream.api_key_env", &self.upstream.api_key_env),
            ("speech.model", &self.speech.model),
            ("speech.voice", &self.speech.voice),
            ("speech.format", &self.speech.format),
        ] {
            if value.trim().is_empty() {
                return Err(AppError::Config(format!("{} cannot be empty", field)));
            }
        }

        if self.speech.max_chars == 0 {
            return Err(AppError::Config(
                "speech.max_chars must be greater than 0".to_string(),
            ));
        }

        if !self.policy.stress_threshold.is_finite() {
            return Err(AppError::Config(format!(
                "policy.stress_threshold must be a finite number, got {}",
                self.policy.stress_threshold
            )));
        }

        Ok(())
    }
}

impl FromStr for Config {
    type Err = AppError;

    fn from_str(toml_str: &str) -> Result<Self, Self::Err> {
        let config: Config =
            toml::from_str(toml_str).map_err(|source| AppError::ConfigParseFailed {
                path: "<string>".to_string(),
                source,
            })?;

        config.validate()?;
        Ok(config)
    }
}
