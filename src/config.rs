use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Config files tried in order when `CONFIG_PATH` is not set
const DEFAULT_CONFIG_PATHS: &[&str] = &["relay.yaml", "relay.yml", "relay.json"];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(String),
    #[error("Failed to read configuration file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("Invalid YAML configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Invalid JSON configuration: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid value for {name}: {value}")]
    InvalidEnv { name: &'static str, value: String },
    #[error("Missing required setting: {0}")]
    Missing(&'static str),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub translator: TranslatorConfig,
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub model_service: ModelServiceConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub model: ModelConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslatorConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub folder_id: String,
    #[serde(default = "default_translate_url")]
    pub base_url: String,
    #[serde(default = "default_source_language")]
    pub source_language: String,
    #[serde(default = "default_target_language")]
    pub target_language: String,
    #[serde(default = "default_request_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    #[serde(default)]
    pub bot_token: String,
    #[serde(default = "default_telegram_url")]
    pub api_url: String,
    /// Long-poll duration passed to `getUpdates`
    #[serde(default = "default_poll_timeout_secs")]
    pub poll_timeout_secs: u64,
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelServiceConfig {
    #[serde(default = "default_model_service_url")]
    pub url: String,
    #[serde(default = "default_request_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default = "default_model_id")]
    pub model_id: String,
    /// Local files take precedence over the hub download when all three are set.
    ///
    /// The default hub repo ships PyTorch weights only. Export it once with
    /// `optimum-cli export onnx --model rafalposwiata/deproberta-large-depression --task text-classification deproberta-onnx/`
    /// and point `MODEL_PATH`, `TOKENIZER_PATH` and `MODEL_CONFIG_PATH` at
    /// `model.onnx`, `tokenizer.json` and `config.json` in that directory.
    pub model_path: Option<String>,
    pub tokenizer_path: Option<String>,
    pub config_path: Option<String>,
    #[serde(default = "default_max_sequence_length")]
    pub max_sequence_length: usize,
}

fn default_translate_url() -> String {
    "https://translate.api.cloud.yandex.net/translate/v2".to_string()
}

fn default_source_language() -> String {
    "ru".to_string()
}

fn default_target_language() -> String {
    "en".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_telegram_url() -> String {
    "https://api.telegram.org".to_string()
}

fn default_poll_timeout_secs() -> u64 {
    30
}

fn default_retry_delay_secs() -> u64 {
    5
}

fn default_model_service_url() -> String {
    "http://model:8000/predict".to_string()
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_model_id() -> String {
    "rafalposwiata/deproberta-large-depression".to_string()
}

fn default_max_sequence_length() -> usize {
    512
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            folder_id: String::new(),
            base_url: default_translate_url(),
            source_language: default_source_language(),
            target_language: default_target_language(),
            timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            api_url: default_telegram_url(),
            poll_timeout_secs: default_poll_timeout_secs(),
            retry_delay_secs: default_retry_delay_secs(),
        }
    }
}

impl Default for ModelServiceConfig {
    fn default() -> Self {
        Self {
            url: default_model_service_url(),
            timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model_id: default_model_id(),
            model_path: None,
            tokenizer_path: None,
            config_path: None,
            max_sequence_length: default_max_sequence_length(),
        }
    }
}

impl Config {
    /// Load configuration from a YAML or JSON file, chosen by extension
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        if !Path::new(path).exists() {
            return Err(ConfigError::NotFound(path.to_string()));
        }

        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_string(),
            source,
        })?;
        let content = substitute_env_vars(&content);

        let path_lower = path.to_lowercase();
        if path_lower.ends_with(".json") {
            Ok(serde_json::from_str(&content)?)
        } else {
            Ok(serde_yaml::from_str(&content)?)
        }
    }

    /// Resolve the process configuration: the first config file found (if any)
    /// with environment variables layered on top.
    pub fn from_env() -> Result<Self, ConfigError> {
        let explicit = std::env::var("CONFIG_PATH").ok();

        let mut config = match explicit {
            Some(path) => Self::load(&path)?,
            None => {
                let mut loaded = None;
                for path in DEFAULT_CONFIG_PATHS {
                    match Self::load(path) {
                        Ok(cfg) => {
                            tracing::info!("Loaded configuration from: {}", path);
                            loaded = Some(cfg);
                            break;
                        }
                        Err(ConfigError::NotFound(_)) => continue,
                        Err(e) => return Err(e),
                    }
                }
                loaded.unwrap_or_default()
            }
        };

        config.apply_env(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    /// Override fields from environment-style lookups
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("YANDEX_API_KEY") {
            self.translator.api_key = v;
        }
        if let Some(v) = lookup("YANDEX_FOLDER_ID") {
            self.translator.folder_id = v;
        }
        if let Some(v) = lookup("BOT_TOKEN") {
            self.telegram.bot_token = v;
        }
        if let Some(v) = lookup("MODEL_SERVICE_URL") {
            self.model_service.url = v;
        }
        if let Some(v) = lookup("MODEL_ID") {
            self.model.model_id = v;
        }
        if let Some(v) = lookup("MODEL_PATH") {
            self.model.model_path = Some(v);
        }
        if let Some(v) = lookup("TOKENIZER_PATH") {
            self.model.tokenizer_path = Some(v);
        }
        if let Some(v) = lookup("MODEL_CONFIG_PATH") {
            self.model.config_path = Some(v);
        }
        if let Some(v) = lookup("HOST") {
            self.server.host = v;
        }
        if let Some(v) = lookup("PORT") {
            self.server.port = v
                .parse()
                .map_err(|_| ConfigError::InvalidEnv { name: "PORT", value: v })?;
        }
        Ok(())
    }

    /// The bot cannot start without credentials for both upstream services
    pub fn require_bot(&self) -> Result<(), ConfigError> {
        if self.telegram.bot_token.is_empty() {
            return Err(ConfigError::Missing("BOT_TOKEN"));
        }
        if self.translator.api_key.is_empty() {
            return Err(ConfigError::Missing("YANDEX_API_KEY"));
        }
        if self.translator.folder_id.is_empty() {
            return Err(ConfigError::Missing("YANDEX_FOLDER_ID"));
        }
        Ok(())
    }
}

impl TranslatorConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl ModelServiceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Replace `${VAR_NAME}` with the variable's value; unknown variables are left as-is
fn substitute_env_vars(content: &str) -> String {
    let pattern = Regex::new(r"\$\{(\w+)\}").expect("static pattern");
    pattern
        .replace_all(content, |caps: &regex::Captures| {
            std::env::var(&caps[1]).unwrap_or_else(|_| caps[0].to_string())
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn defaults_match_compose_deployment() {
        let config = Config::default();
        assert_eq!(config.model_service.url, "http://model:8000/predict");
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.translator.source_language, "ru");
        assert_eq!(config.translator.target_language, "en");
        assert_eq!(config.model.model_id, "rafalposwiata/deproberta-large-depression");
    }

    #[test]
    fn loads_partial_yaml_and_fills_defaults() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(
            file,
            "translator:\n  folder_id: b1g-folder\nserver:\n  port: 9100\n"
        )
        .unwrap();

        let config = Config::load(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.translator.folder_id, "b1g-folder");
        assert_eq!(config.translator.source_language, "ru");
        assert_eq!(config.server.port, 9100);
        assert_eq!(config.server.host, "0.0.0.0");
    }

    #[test]
    fn loads_json_by_extension() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, r#"{{"model_service": {{"url": "http://localhost:8000/predict"}}}}"#).unwrap();

        let config = Config::load(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.model_service.url, "http://localhost:8000/predict");
    }

    #[test]
    fn substitutes_environment_placeholders() {
        std::env::set_var("RELAY_TEST_FOLDER", "folder-from-env");
        let out = substitute_env_vars("folder_id: ${RELAY_TEST_FOLDER}\nkey: ${RELAY_TEST_UNSET_VAR}");
        assert_eq!(out, "folder_id: folder-from-env\nkey: ${RELAY_TEST_UNSET_VAR}");
    }

    #[test]
    fn missing_file_is_not_found() {
        let err = Config::load("/nonexistent/relay.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn env_overrides_file_values() {
        let vars: HashMap<&str, &str> = [
            ("YANDEX_API_KEY", "key"),
            ("YANDEX_FOLDER_ID", "folder"),
            ("BOT_TOKEN", "123:abc"),
            ("MODEL_SERVICE_URL", "http://127.0.0.1:8000/predict"),
            ("PORT", "8080"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config
            .apply_env(|name| vars.get(name).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.translator.api_key, "key");
        assert_eq!(config.telegram.bot_token, "123:abc");
        assert_eq!(config.model_service.url, "http://127.0.0.1:8000/predict");
        assert_eq!(config.server.port, 8080);
        assert!(config.require_bot().is_ok());
    }

    #[test]
    fn exported_model_files_come_from_env() {
        let vars: HashMap<&str, &str> = [
            ("MODEL_PATH", "deproberta-onnx/model.onnx"),
            ("TOKENIZER_PATH", "deproberta-onnx/tokenizer.json"),
            ("MODEL_CONFIG_PATH", "deproberta-onnx/config.json"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config
            .apply_env(|name| vars.get(name).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.model.model_path.as_deref(), Some("deproberta-onnx/model.onnx"));
        assert_eq!(config.model.tokenizer_path.as_deref(), Some("deproberta-onnx/tokenizer.json"));
        assert_eq!(config.model.config_path.as_deref(), Some("deproberta-onnx/config.json"));
        assert_eq!(config.model.model_id, "rafalposwiata/deproberta-large-depression");
    }

    #[test]
    fn invalid_port_is_rejected() {
        let mut config = Config::default();
        let err = config
            .apply_env(|name| (name == "PORT").then(|| "eighty".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { name: "PORT", .. }));
    }

    #[test]
    fn bot_requires_token_and_credentials() {
        let mut config = Config::default();
        assert!(matches!(config.require_bot(), Err(ConfigError::Missing("BOT_TOKEN"))));

        config.telegram.bot_token = "123:abc".to_string();
        assert!(matches!(config.require_bot(), Err(ConfigError::Missing("YANDEX_API_KEY"))));
    }
}
