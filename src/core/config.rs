//! Configuration management for Waypoint
//!
//! Supports environment variables, config files, and runtime overrides.
//!
//! Config file location: ~/.config/waypoint/config.toml

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;

use crate::core::error::{Result, WaypointError};

/// Main configuration for Waypoint
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Planning model configuration
    #[serde(default)]
    pub model: ModelConfig,
    /// Remote browser configuration
    #[serde(default)]
    pub browser: BrowserConfig,
    /// Agent loop configuration
    #[serde(default)]
    pub agent: AgentConfig,
    /// HTTP endpoint configuration
    #[serde(default)]
    pub server: ServerConfig,
}

/// Structured-output model service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Base URL of an OpenAI-compatible API
    pub api_base: String,
    /// API key (default: $OPENAI_API_KEY)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Model used for planning and starting-URL selection
    /// Default: gpt-4o
    pub model: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Sampling temperature, provider default when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

/// Remote browser service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Base URL of the remote browser command API
    pub api_base: String,
    /// Base URL of the session provisioning API
    pub sessions_api_base: String,
    /// API key (default: $BROWSERBASE_API_KEY)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Project id (default: $BROWSERBASE_PROJECT_ID)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    /// Upper bound on a GOTO acknowledgment in ms
    pub navigation_timeout_ms: u64,
    /// Timeout for any other remote browser request in seconds
    pub request_timeout_secs: u64,
}

/// Agent loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Maximum planned steps before the loop gives up, 0 for unbounded
    /// Default: 50
    pub max_steps: usize,
    /// Whether to show debug output
    pub debug: bool,
}

/// HTTP endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (default: 127.0.0.1)
    pub host: String,
    /// Port number (default: 3000)
    pub port: u16,
}

fn env_flag(name: &str) -> bool {
    env::var(name)
        .map(|v| v == "true" || v == "1")
        .unwrap_or(false)
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            api_base: env::var("WAYPOINT_MODEL_API_BASE")
                .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
            api_key: env::var("OPENAI_API_KEY").ok(),
            model: env::var("WAYPOINT_MODEL").unwrap_or_else(|_| "gpt-4o".to_string()),
            timeout_secs: 120,
            temperature: None,
        }
    }
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            api_base: env::var("WAYPOINT_BROWSER_API_BASE")
                .unwrap_or_else(|_| "https://api.stagehand.browserbase.com/v1".to_string()),
            sessions_api_base: env::var("WAYPOINT_SESSIONS_API_BASE")
                .unwrap_or_else(|_| "https://api.browserbase.com/v1".to_string()),
            api_key: env::var("BROWSERBASE_API_KEY").ok(),
            project_id: env::var("BROWSERBASE_PROJECT_ID").ok(),
            navigation_timeout_ms: 60_000,
            request_timeout_secs: 120,
        }
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_steps: env::var("WAYPOINT_MAX_STEPS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(50),
            debug: env_flag("WAYPOINT_DEBUG"),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: env::var("WAYPOINT_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: env::var("WAYPOINT_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
        }
    }
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("waypoint")
    }

    /// Get the config file path
    pub fn config_file() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Load configuration from file, environment, and defaults
    /// Priority: CLI args > config file > env vars > defaults
    pub fn load() -> Self {
        let _ = dotenvy::dotenv();

        if !Self::config_exists() {
            tracing::debug!("No config file, using defaults");
            return Self::default();
        }

        match Self::load_from_file() {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Ignoring {}: {}", Self::config_file().display(), e);
                Self::default()
            }
        }
    }

    /// Load configuration from file only
    pub fn load_from_file() -> Result<Self> {
        let config_path = Self::config_file();

        if !config_path.exists() {
            return Err(WaypointError::config("Config file not found"));
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|e| WaypointError::config(format!("Failed to read config: {}", e)))?;

        Self::from_toml(&content)
    }

    /// Parse configuration from TOML text; missing sections and fields take defaults
    pub fn from_toml(content: &str) -> Result<Self> {
        let mut config: Config = toml::from_str(content)
            .map_err(|e| WaypointError::config(format!("Failed to parse config: {}", e)))?;

        // Secrets are usually kept out of the file
        if config.model.api_key.is_none() {
            config.model.api_key = env::var("OPENAI_API_KEY").ok();
        }
        if config.browser.api_key.is_none() {
            config.browser.api_key = env::var("BROWSERBASE_API_KEY").ok();
        }
        if config.browser.project_id.is_none() {
            config.browser.project_id = env::var("BROWSERBASE_PROJECT_ID").ok();
        }

        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<PathBuf> {
        let config_dir = Self::config_dir();
        let config_path = Self::config_file();

        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)
                .map_err(|e| WaypointError::config(format!("Failed to create config dir: {}", e)))?;
        }

        let content = self.to_file_toml()?;

        fs::write(&config_path, content)
            .map_err(|e| WaypointError::config(format!("Failed to write config: {}", e)))?;

        Ok(config_path)
    }

    /// Check if a config file exists
    pub fn config_exists() -> bool {
        Self::config_file().exists()
    }

    /// Step limit as an option, `None` meaning unbounded
    pub fn step_limit(&self) -> Option<usize> {
        match self.agent.max_steps {
            0 => None,
            n => Some(n),
        }
    }

    /// Socket address the HTTP endpoint binds to
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Render the configuration as it is written to disk. API keys are
    /// never persisted; they come back from the environment on load.
    pub fn to_file_toml(&self) -> Result<String> {
        let mut stripped = self.clone();
        stripped.model.api_key = None;
        stripped.browser.api_key = None;
        toml::to_string_pretty(&stripped)
            .map_err(|e| WaypointError::config(format!("Failed to serialize config: {}", e)))
    }

    /// Render the configuration as TOML for display, without secrets
    pub fn to_display_toml(&self) -> String {
        let mut redacted = self.clone();
        redacted.model.api_key = redacted.model.api_key.map(|_| "<set>".to_string());
        redacted.browser.api_key = redacted.browser.api_key.map(|_| "<set>".to_string());
        toml::to_string_pretty(&redacted)
            .unwrap_or_else(|_| String::from("# Error generating config"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.browser.navigation_timeout_ms, 60_000);
        assert_eq!(config.model.timeout_secs, 120);
        assert!(config.server.port > 0);
    }

    #[test]
    fn test_step_limit() {
        let mut config = Config::default();
        config.agent.max_steps = 0;
        assert_eq!(config.step_limit(), None);

        config.agent.max_steps = 12;
        assert_eq!(config.step_limit(), Some(12));
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config = Config::from_toml(
            r#"
            [agent]
            max_steps = 7
            debug = true
            "#,
        )
        .unwrap();
        assert_eq!(config.agent.max_steps, 7);
        assert!(config.agent.debug);
        assert_eq!(config.browser.navigation_timeout_ms, 60_000);
    }

    #[test]
    fn test_partial_section_fills_defaults() {
        let config = Config::from_toml("[agent]\nmax_steps = 5\n").unwrap();
        assert_eq!(config.agent.max_steps, 5);
        assert_eq!(config.step_limit(), Some(5));

        let config = Config::from_toml("[server]\nport = 8080\n").unwrap();
        assert_eq!(config.server.port, 8080);
        assert!(!config.server.host.is_empty());
    }

    #[test]
    fn test_file_toml_omits_keys() {
        let mut config = Config::default();
        config.model.api_key = Some("sk-model-secret".into());
        config.browser.api_key = Some("bb-secret".into());
        config.browser.project_id = Some("proj-123".into());

        let content = config.to_file_toml().unwrap();
        assert!(!content.contains("sk-model-secret"));
        assert!(!content.contains("bb-secret"));
        assert!(!content.contains("api_key"));
        assert!(content.contains("proj-123"));

        let reloaded = Config::from_toml(&content).unwrap();
        assert_eq!(reloaded.agent.max_steps, config.agent.max_steps);
    }

    #[test]
    fn test_invalid_toml() {
        let err = Config::from_toml("[agent\nmax_steps = ").unwrap_err();
        assert!(matches!(err, WaypointError::Config(_)));
    }

    #[test]
    fn test_display_redacts_keys() {
        let mut config = Config::default();
        config.model.api_key = Some("sk-secret".into());
        let rendered = config.to_display_toml();
        assert!(!rendered.contains("sk-secret"));
        assert!(rendered.contains("navigation_timeout_ms"));
    }

    #[test]
    fn test_config_dir() {
        let dir = Config::config_dir();
        assert!(dir.to_string_lossy().contains("waypoint"));
    }
}
