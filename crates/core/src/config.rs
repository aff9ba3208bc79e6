//! Configuration management for Gridsage.
//!
//! Configuration is layered, later sources winning:
//! - Built-in defaults
//! - Config file (`.gridsage/config.yaml` or `GRIDSAGE_CONFIG`)
//! - Environment variables
//! - Command-line flags
//!
//! The workspace holds the corpus and all state under `.gridsage/`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

/// Default Ollama endpoint.
pub const DEFAULT_OLLAMA_ENDPOINT: &str = "http://127.0.0.1:11434";

/// Name of the per-workspace state directory.
pub const STATE_DIR: &str = ".gridsage";

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .gridsage/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Chat model provider (only "ollama" is supported)
    pub provider: String,

    /// Chat model identifier
    pub model: String,

    /// Provider endpoint
    pub endpoint: String,

    /// Per-request deadline for chat calls, in seconds
    pub timeout_secs: u64,

    /// Log level override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,
}

/// Full configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ConfigFile {
    llm: Option<LlmSection>,
    workspace: Option<WorkspaceSection>,
    logging: Option<LoggingSection>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LlmSection {
    provider: Option<String>,
    endpoint: Option<String>,
    model: Option<String>,
    #[serde(rename = "timeoutSecs")]
    timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WorkspaceSection {
    path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingSection {
    level: Option<String>,
    color: Option<bool>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            provider: "ollama".to_string(),
            model: "llama3:instruct".to_string(),
            endpoint: DEFAULT_OLLAMA_ENDPOINT.to_string(),
            timeout_secs: 60,
            log_level: None,
            verbose: false,
            no_color: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, the config file and the environment.
    ///
    /// Environment variables:
    /// - `GRIDSAGE_WORKSPACE`: Workspace path (when `workspace` is `None`)
    /// - `GRIDSAGE_CONFIG`: Config file path (when `config_file` is `None`)
    /// - `GRIDSAGE_PROVIDER`: Chat provider
    /// - `GRIDSAGE_MODEL`: Chat model
    /// - `OLLAMA_HOST`: Ollama endpoint
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    ///
    /// # Example
    /// ```no_run
    /// use gridsage_core::config::AppConfig;
    ///
    /// let config = AppConfig::load(None, None).expect("Failed to load config");
    /// println!("Workspace: {:?}", config.workspace);
    /// ```
    pub fn load(workspace: Option<PathBuf>, config_file: Option<PathBuf>) -> AppResult<Self> {
        let mut config = Self::default();

        if let Some(workspace) =
            workspace.or_else(|| std::env::var("GRIDSAGE_WORKSPACE").ok().map(PathBuf::from))
        {
            config.workspace = workspace;
        }

        config.config_file =
            config_file.or_else(|| std::env::var("GRIDSAGE_CONFIG").ok().map(PathBuf::from));

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        let config_path = config
            .config_file
            .clone()
            .unwrap_or_else(|| config.state_dir().join("config.yaml"));

        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        } else if config.config_file.is_some() {
            return Err(AppError::Config(format!(
                "Config file not found: {:?}",
                config_path
            )));
        }

        if let Ok(provider) = std::env::var("GRIDSAGE_PROVIDER") {
            config.provider = provider;
        }

        if let Ok(model) = std::env::var("GRIDSAGE_MODEL") {
            config.model = model;
        }

        if let Ok(host) = std::env::var("OLLAMA_HOST") {
            config.endpoint = normalize_endpoint(&host);
        }

        if let Ok(level) = std::env::var("RUST_LOG") {
            config.log_level = Some(level);
        }

        if std::env::var("NO_COLOR").is_ok() {
            config.no_color = true;
        }

        Ok(config)
    }

    fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        self.merge_yaml_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })
    }

    fn merge_yaml_str(&self, contents: &str) -> AppResult<Self> {
        let config_file: ConfigFile = if contents.trim().is_empty() {
            ConfigFile::default()
        } else {
            serde_yaml::from_str(contents)?
        };

        let mut result = self.clone();

        if let Some(path) = config_file.workspace.and_then(|ws| ws.path) {
            result.workspace = PathBuf::from(path);
        }

        if let Some(logging) = config_file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
        }

        if let Some(llm) = config_file.llm {
            if let Some(provider) = llm.provider {
                result.provider = provider;
            }
            if let Some(endpoint) = llm.endpoint {
                result.endpoint = normalize_endpoint(&endpoint);
            }
            if let Some(model) = llm.model {
                result.model = model;
            }
            if let Some(timeout) = llm.timeout_secs {
                result.timeout_secs = timeout;
            }
        }

        Ok(result)
    }

    /// Apply CLI overrides to the configuration.
    pub fn with_overrides(
        mut self,
        provider: Option<String>,
        model: Option<String>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(provider) = provider {
            self.provider = provider;
        }

        if let Some(model) = model {
            self.model = model;
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// Get the path to the .gridsage directory.
    pub fn state_dir(&self) -> PathBuf {
        self.workspace.join(STATE_DIR)
    }

    /// Ensure the .gridsage directory exists.
    pub fn ensure_state_dir(&self) -> AppResult<()> {
        let state_dir = self.state_dir();
        if !state_dir.exists() {
            std::fs::create_dir_all(&state_dir).map_err(|e| {
                AppError::Config(format!("Failed to create {} directory: {}", STATE_DIR, e))
            })?;
        }
        Ok(())
    }

    /// Validate configuration for the active provider.
    pub fn validate(&self) -> AppResult<()> {
        if self.provider != "ollama" {
            return Err(AppError::Config(format!(
                "Unknown provider: {}. Supported: ollama",
                self.provider
            )));
        }

        if !self.endpoint.starts_with("http://") && !self.endpoint.starts_with("https://") {
            return Err(AppError::Config(format!(
                "Endpoint must be an http(s) URL: {}",
                self.endpoint
            )));
        }

        if self.timeout_secs == 0 {
            return Err(AppError::Config("timeoutSecs must be positive".to_string()));
        }

        Ok(())
    }
}

/// Accept `host:port` as well as full URLs, the way `OLLAMA_HOST` is commonly set.
pub fn normalize_endpoint(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("http://{}", trimmed)
    }
}
