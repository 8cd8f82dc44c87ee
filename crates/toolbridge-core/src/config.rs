//! Configuration management for toolbridge.
//!
//! Configuration is loaded from multiple sources, later ones winning:
//! 1. Built-in defaults
//! 2. Config file: `--config <path>`, or `toolbridge.json` in the workspace root
//! 3. Environment: `GEMINI_API_KEY` / `GOOGLE_API_KEY`, `TOOLBRIDGE_WORKSPACE_ROOT`,
//!    `TOOLBRIDGE_MODEL`
//! 4. Command-line overrides
//!
//! String values in the config file may use `{env:VAR_NAME}` substitution.
//! The result is immutable once loaded and is shared behind an `Arc`.

use crate::error::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;
use toolbridge_provider::google::{DEFAULT_API_BASE, DEFAULT_MODEL};
use toolbridge_tools::ToolLimits;
use toolbridge_util::path::find_project_root;

/// Config file looked up in the workspace root.
pub const CONFIG_FILE_NAME: &str = "toolbridge.json";

pub const ENV_API_KEY: &str = "GEMINI_API_KEY";
pub const ENV_API_KEY_FALLBACK: &str = "GOOGLE_API_KEY";
pub const ENV_WORKSPACE_ROOT: &str = "TOOLBRIDGE_WORKSPACE_ROOT";
pub const ENV_MODEL: &str = "TOOLBRIDGE_MODEL";

/// Static regex for variable substitution, compiled once.
static VAR_REGEX: OnceLock<regex::Regex> = OnceLock::new();

/// Get the variable substitution regex, compiling it on first use.
fn var_regex() -> ConfigResult<&'static regex::Regex> {
    if let Some(re) = VAR_REGEX.get() {
        return Ok(re);
    }
    let re = regex::Regex::new(r"\{env:([^}]+)\}")
        .map_err(|e| ConfigError::validation(e.to_string()))?;
    Ok(VAR_REGEX.get_or_init(|| re))
}

/// Main configuration structure.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory all tool access is confined to.
    pub workspace_root: Option<PathBuf>,

    /// Gemini API key. Never serialized or logged.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    /// Model ID.
    pub model: String,

    /// Generative Language API base URL.
    pub api_base: String,

    /// Sampling temperature.
    pub temperature: f32,

    /// Output length cap per provider call.
    pub max_output_tokens: u32,

    /// Provider round-trips per request.
    pub max_iterations: usize,

    /// Largest accepted request body.
    pub max_body_bytes: usize,

    /// Largest file `read_file` returns.
    pub max_file_bytes: u64,

    /// Match cap for `search_files`.
    pub search_result_limit: usize,

    /// Entry cap for `list_directory`.
    pub list_limit: usize,

    /// Pause between streamed words, in milliseconds.
    pub word_delay_ms: u64,

    /// Offer tools to the model. When off, text is streamed straight through.
    pub enable_tools: bool,

    /// Listen address.
    pub address: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workspace_root: None,
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
            temperature: 0.4,
            max_output_tokens: 2048,
            max_iterations: 3,
            max_body_bytes: 1024 * 1024,
            max_file_bytes: 100 * 1024,
            search_result_limit: 20,
            list_limit: 200,
            word_delay_ms: 15,
            enable_tools: true,
            address: "127.0.0.1:8080".to_string(),
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("workspace_root", &self.workspace_root)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("api_base", &self.api_base)
            .field("temperature", &self.temperature)
            .field("max_output_tokens", &self.max_output_tokens)
            .field("max_iterations", &self.max_iterations)
            .field("max_body_bytes", &self.max_body_bytes)
            .field("max_file_bytes", &self.max_file_bytes)
            .field("search_result_limit", &self.search_result_limit)
            .field("list_limit", &self.list_limit)
            .field("word_delay_ms", &self.word_delay_ms)
            .field("enable_tools", &self.enable_tools)
            .field("address", &self.address)
            .finish()
    }
}

/// Values supplied on the command line.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub config_path: Option<PathBuf>,
    pub workspace_root: Option<PathBuf>,
    pub model: Option<String>,
    pub address: Option<String>,
}

impl Config {
    /// Load configuration from all sources using the process environment.
    pub fn load(overrides: &ConfigOverrides) -> ConfigResult<Self> {
        Self::load_with_env(overrides, |name| std::env::var(name).ok())
    }

    /// Load configuration with an explicit environment lookup.
    ///
    /// The workspace root is resolved and canonicalized. The API key is not
    /// required here; call [`Config::validate`] before serving.
    pub fn load_with_env<F>(overrides: &ConfigOverrides, env: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env_root = non_empty(env(ENV_WORKSPACE_ROOT)).map(PathBuf::from);
        let search_root = overrides
            .workspace_root
            .clone()
            .or_else(|| env_root.clone())
            .unwrap_or_else(default_workspace_root);

        let mut config = match &overrides.config_path {
            Some(path) => Self::load_file(path, &env)?,
            None => {
                let path = search_root.join(CONFIG_FILE_NAME);
                if path.is_file() {
                    Self::load_file(&path, &env)?
                } else {
                    Config::default()
                }
            }
        };

        if let Some(key) = non_empty(env(ENV_API_KEY)).or_else(|| non_empty(env(ENV_API_KEY_FALLBACK)))
        {
            config.api_key = Some(key);
        }
        if let Some(root) = env_root {
            config.workspace_root = Some(root);
        }
        if let Some(model) = non_empty(env(ENV_MODEL)) {
            config.model = model;
        }

        if let Some(root) = &overrides.workspace_root {
            config.workspace_root = Some(root.clone());
        }
        if let Some(model) = &overrides.model {
            config.model = model.clone();
        }
        if let Some(address) = &overrides.address {
            config.address = address.clone();
        }

        let root = config.workspace_root.take().unwrap_or(search_root);
        config.workspace_root = Some(canonical_root(&root)?);

        tracing::debug!(config = ?config, "Loaded configuration");
        Ok(config)
    }

    /// Load configuration from a file.
    pub fn load_file<F>(path: &Path, env: &F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let content = Self::substitute_variables(&content, env)?;

        serde_json::from_str(&content).map_err(|e| ConfigError::InvalidJson {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Substitute `{env:VAR_NAME}` references.
    fn substitute_variables<F>(content: &str, env: &F) -> ConfigResult<String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let re = var_regex()?;
        let mut result = content.to_string();

        for cap in re.captures_iter(content) {
            let (Some(full_match), Some(name)) = (cap.get(0), cap.get(1)) else {
                continue;
            };
            let value = env(name.as_str()).ok_or_else(|| ConfigError::EnvVarNotFound {
                name: name.as_str().to_string(),
            })?;
            result = result.replace(full_match.as_str(), &value);
        }

        Ok(result)
    }

    /// Check that the configuration can serve requests.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.api_key().is_none() {
            return Err(ConfigError::MissingApiKey);
        }
        if self.max_iterations == 0 {
            return Err(ConfigError::validation("max_iterations must be at least 1"));
        }
        if self.max_body_bytes == 0 {
            return Err(ConfigError::validation("max_body_bytes must be positive"));
        }
        Ok(())
    }

    /// The API key, if one is set and non-empty.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|k| !k.trim().is_empty())
    }

    /// The resolved workspace root.
    pub fn workspace_root(&self) -> &Path {
        self.workspace_root.as_deref().unwrap_or(Path::new("."))
    }

    /// Limits handed to the tools.
    pub fn tool_limits(&self) -> ToolLimits {
        ToolLimits {
            max_file_bytes: self.max_file_bytes,
            search_result_limit: self.search_result_limit,
            list_limit: self.list_limit,
        }
    }

    /// Delay between streamed words.
    pub fn word_delay(&self) -> Duration {
        Duration::from_millis(self.word_delay_ms)
    }
}

/// Default workspace root: the project containing the executable, else the
/// current directory.
pub fn default_workspace_root() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().and_then(find_project_root))
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."))
}

fn canonical_root(root: &Path) -> ConfigResult<PathBuf> {
    let canonical = root
        .canonicalize()
        .map_err(|e| ConfigError::InvalidWorkspaceRoot {
            path: root.to_path_buf(),
            message: e.to_string(),
        })?;
    if !canonical.is_dir() {
        return Err(ConfigError::InvalidWorkspaceRoot {
            path: root.to_path_buf(),
            message: "not a directory".to_string(),
        });
    }
    Ok(canonical)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
