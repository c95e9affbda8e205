use crate::error::ConfigError;
use crate::types::SessionSettings;
use regex::Regex;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub audio: AudioConfig,

    #[serde(default)]
    pub recognition: RecognitionConfig,

    #[serde(default)]
    pub sink: Vec<SinkConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GeneralConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AudioConfig {
    #[serde(default = "default_device")]
    pub device: String,

    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    #[serde(default = "default_frame_size")]
    pub frame_size: usize,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            device: default_device(),
            sample_rate: default_sample_rate(),
            frame_size: default_frame_size(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RecognitionConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    #[serde(default)]
    pub auth_token: Option<String>,

    #[serde(default = "default_language")]
    pub language: String,

    #[serde(default = "default_true")]
    pub punctuation: bool,

    #[serde(default)]
    pub single_utterance: bool,

    #[serde(default = "default_keepalive_secs")]
    pub keepalive_interval_secs: u64,

    #[serde(default = "default_keepalive_secs")]
    pub keepalive_timeout_secs: u64,

    #[serde(default = "default_stop_grace_secs")]
    pub stop_grace_secs: u64,
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            auth_token: None,
            language: default_language(),
            punctuation: true,
            single_utterance: false,
            keepalive_interval_secs: default_keepalive_secs(),
            keepalive_timeout_secs: default_keepalive_secs(),
            stop_grace_secs: default_stop_grace_secs(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SinkConfig {
    pub plugin: String,

    #[serde(flatten)]
    pub extra: toml::Value,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_device() -> String {
    "default".to_string()
}

fn default_sample_rate() -> u32 {
    16_000
}

fn default_frame_size() -> usize {
    1024
}

fn default_endpoint() -> String {
    "ws://127.0.0.1:9010/recognize".to_string()
}

fn default_language() -> String {
    "zh-HK".to_string()
}

fn default_true() -> bool {
    true
}

fn default_keepalive_secs() -> u64 {
    20
}

fn default_stop_grace_secs() -> u64 {
    5
}

/// Interpolate `${VAR}` patterns with environment variable values.
fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let re = Regex::new(r"\$\{([^}]+)\}").unwrap();
    let mut result = input.to_string();
    let mut errors = Vec::new();

    for cap in re.captures_iter(input) {
        let var_name = &cap[1];
        match std::env::var(var_name) {
            Ok(val) => {
                result = result.replace(&cap[0], &val);
            }
            Err(_) => {
                errors.push(var_name.to_string());
            }
        }
    }

    if let Some(first_missing) = errors.into_iter().next() {
        return Err(ConfigError::EnvVarNotFound(first_missing));
    }

    Ok(result)
}

impl AppConfig {
    /// Load configuration from a TOML file, with environment variable interpolation.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let interpolated = interpolate_env_vars(&content)?;
        let config: AppConfig = toml::from_str(&interpolated)?;
        Ok(config)
    }

    /// Parse configuration from a TOML string (for testing).
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let interpolated = interpolate_env_vars(s)?;
        let config: AppConfig = toml::from_str(&interpolated)?;
        Ok(config)
    }

    /// Resolve the settings one streaming session runs with.
    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            endpoint: self.recognition.endpoint.clone(),
            auth_token: self.recognition.auth_token.clone(),
            language: self.recognition.language.clone(),
            punctuation: self.recognition.punctuation,
            single_utterance: self.recognition.single_utterance,
            sample_rate: self.audio.sample_rate,
            frame_size: self.audio.frame_size,
            keepalive_interval: Duration::from_secs(self.recognition.keepalive_interval_secs),
            keepalive_timeout: Duration::from_secs(self.recognition.keepalive_timeout_secs),
            stop_grace: Duration::from_secs(self.recognition.stop_grace_secs),
        }
    }
}
