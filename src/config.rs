use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::cli::PlanArgs;
use crate::error::ConfigError;
use crate::llm::DEFAULT_TEMPERATURE;

// Precedence: CLI > env > file > defaults.

const DEFAULT_MODEL: &str = "gemini-2.5-flash";
const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_REQUEST_TIMEOUT_SEC: u64 = 120;
const MAX_TEMPERATURE: f32 = 2.0;

const ENV_PREFIX: &str = "GOALPLAN_";

/// Provider-native credential variable, consulted after `GOALPLAN_API_KEY`.
const GEMINI_API_KEY_VAR: &str = "GEMINI_API_KEY";

/// Resolved configuration for plan generation.
///
/// Built from three layers with precedence CLI > env > file > defaults.
/// The API key is never taken from the command line.
#[derive(Clone, PartialEq)]
pub struct PlannerConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub temperature: f32,
    /// Upper bound on one model call, network round trip included.
    pub request_timeout_sec: u64,
    pub log_level: Option<String>,
    pub log_file: Option<PathBuf>,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_owned(),
            base_url: DEFAULT_BASE_URL.to_owned(),
            temperature: DEFAULT_TEMPERATURE,
            request_timeout_sec: DEFAULT_REQUEST_TIMEOUT_SEC,
            log_level: None,
            log_file: None,
        }
    }
}

// Hand-written so the key never reaches a log line.
impl fmt::Debug for PlannerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlannerConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("temperature", &self.temperature)
            .field("request_timeout_sec", &self.request_timeout_sec)
            .field("log_level", &self.log_level)
            .field("log_file", &self.log_file)
            .finish()
    }
}

/// TOML-deserializable config file representation. All fields optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    api_key: Option<String>,
    model: Option<String>,
    base_url: Option<String>,
    temperature: Option<f32>,
    request_timeout_sec: Option<u64>,
    log_level: Option<String>,
    log_file: Option<PathBuf>,
}

/// Intermediate layer where every field is optional, used to merge sources.
#[derive(Debug, Default)]
struct ConfigLayer {
    api_key: Option<String>,
    model: Option<String>,
    base_url: Option<String>,
    temperature: Option<f32>,
    request_timeout_sec: Option<u64>,
    log_level: Option<String>,
    log_file: Option<PathBuf>,
}

impl PlannerConfig {
    /// Check value ranges. A missing API key is not checked here: it is
    /// reported when the model client is acquired.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.model.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "model",
                detail: "must not be empty".to_owned(),
            });
        }
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(ConfigError::Invalid {
                field: "base_url",
                detail: format!("'{}' is not an http(s) URL", self.base_url),
            });
        }
        if !(0.0..=MAX_TEMPERATURE).contains(&self.temperature) {
            return Err(ConfigError::Invalid {
                field: "temperature",
                detail: format!("{} is outside 0.0..={MAX_TEMPERATURE}", self.temperature),
            });
        }
        if self.request_timeout_sec == 0 {
            return Err(ConfigError::Invalid {
                field: "request_timeout_sec",
                detail: "must be greater than 0".to_owned(),
            });
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_sec)
    }

    /// Load configuration from an optional TOML file, the environment as
    /// seen through `env_fn` and the `plan` arguments.
    ///
    /// Pass [`process_env`] in production; tests pass a fixed lookup.
    pub fn load_with_env(
        config_path: Option<&Path>,
        cli_args: &PlanArgs,
        env_fn: fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let file_layer = match config_path {
            Some(path) => load_file_layer(path)?,
            None => ConfigLayer::default(),
        };
        let env_layer = load_env_layer(env_fn)?;
        let cli_layer = cli_layer_from(cli_args);

        let merged = merge_layers(file_layer, env_layer, cli_layer);
        let defaults = PlannerConfig::default();

        Ok(PlannerConfig {
            api_key: merged.api_key,
            model: merged.model.unwrap_or(defaults.model),
            base_url: merged.base_url.unwrap_or(defaults.base_url),
            temperature: merged.temperature.unwrap_or(defaults.temperature),
            request_timeout_sec: merged
                .request_timeout_sec
                .unwrap_or(defaults.request_timeout_sec),
            log_level: merged.log_level,
            log_file: merged.log_file,
        })
    }
}

fn load_file_layer(path: &Path) -> Result<ConfigLayer, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })?;
    let fc: FileConfig = toml::from_str(&contents).map_err(|e| ConfigError::FileParse {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })?;
    Ok(ConfigLayer {
        api_key: fc.api_key,
        model: fc.model,
        base_url: fc.base_url,
        temperature: fc.temperature,
        request_timeout_sec: fc.request_timeout_sec,
        log_level: fc.log_level,
        log_file: fc.log_file,
    })
}

/// Environment lookup backed by the process environment. Empty values
/// count as unset.
pub fn process_env(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.is_empty())
}

fn load_env_layer(env_fn: fn(&str) -> Option<String>) -> Result<ConfigLayer, ConfigError> {
    let prefixed = |suffix: &str| env_fn(&format!("{ENV_PREFIX}{suffix}"));

    Ok(ConfigLayer {
        api_key: prefixed("API_KEY").or_else(|| env_fn(GEMINI_API_KEY_VAR)),
        model: prefixed("MODEL"),
        base_url: prefixed("BASE_URL"),
        temperature: parse_env(env_fn, "TEMPERATURE")?,
        request_timeout_sec: parse_env(env_fn, "REQUEST_TIMEOUT_SEC")?,
        log_level: prefixed("LOG_LEVEL"),
        log_file: prefixed("LOG_FILE").map(PathBuf::from),
    })
}

fn parse_env<T>(env_fn: fn(&str) -> Option<String>, suffix: &str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: fmt::Display,
{
    let var = format!("{ENV_PREFIX}{suffix}");
    match env_fn(&var) {
        Some(s) => s
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError::EnvParse {
                var,
                detail: e.to_string(),
            }),
        None => Ok(None),
    }
}

fn cli_layer_from(args: &PlanArgs) -> ConfigLayer {
    ConfigLayer {
        api_key: None,
        model: args.model.clone(),
        base_url: args.base_url.clone(),
        temperature: args.temperature,
        request_timeout_sec: args.timeout_sec,
        log_level: args.log_level.clone(),
        log_file: args.log_file.clone(),
    }
}

/// Merge three layers. For each field, pick CLI first, then env, then file.
fn merge_layers(file: ConfigLayer, env: ConfigLayer, cli: ConfigLayer) -> ConfigLayer {
    ConfigLayer {
        api_key: cli.api_key.or(env.api_key).or(file.api_key),
        model: cli.model.or(env.model).or(file.model),
        base_url: cli.base_url.or(env.base_url).or(file.base_url),
        temperature: cli.temperature.or(env.temperature).or(file.temperature),
        request_timeout_sec: cli
            .request_timeout_sec
            .or(env.request_timeout_sec)
            .or(file.request_timeout_sec),
        log_level: cli.log_level.or(env.log_level).or(file.log_level),
        log_file: cli.log_file.or(env.log_file).or(file.log_file),
    }
}
