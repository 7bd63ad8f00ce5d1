//! Application configuration, read from `parley.toml`.
//!
//! Every field has a serde default so a partial file (or none at all)
//! still yields a usable configuration. Secrets are never part of this
//! file; the binary reads API keys from the environment.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Public base URL used when minting follow-up links.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub vault: VaultConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub weather: WeatherConfig,

    #[serde(default)]
    pub login: LoginConfig,

    #[serde(default)]
    pub tools: ToolsConfig,
}

fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            llm: LlmConfig::default(),
            vault: VaultConfig::default(),
            storage: StorageConfig::default(),
            weather: WeatherConfig::default(),
            login: LoginConfig::default(),
            tools: ToolsConfig::default(),
        }
    }
}

/// Longest accepted token TTL, in seconds.
pub const MAX_VAULT_TTL_SECS: u64 = 24 * 60 * 60;

/// Longest accepted vault sweep period, in seconds.
pub const MAX_SWEEP_INTERVAL_SECS: u64 = 24 * 60 * 60;

impl AppConfig {
    /// Replace out-of-range values with their defaults.
    ///
    /// Returns one message per replaced value, for the caller to log.
    pub fn sanitize(&mut self) -> Vec<String> {
        let mut fixes = Vec::new();

        if self.llm.max_rounds == 0 {
            fixes.push(format!(
                "llm.max_rounds must be at least 1, using {}",
                default_max_rounds()
            ));
            self.llm.max_rounds = default_max_rounds();
        }

        if !(1..=MAX_VAULT_TTL_SECS).contains(&self.vault.ttl_secs) {
            fixes.push(format!(
                "vault.ttl_secs = {} is outside 1..={MAX_VAULT_TTL_SECS}, using {}",
                self.vault.ttl_secs,
                default_ttl_secs()
            ));
            self.vault.ttl_secs = default_ttl_secs();
        }

        if !(1..=MAX_SWEEP_INTERVAL_SECS).contains(&self.vault.sweep_interval_secs) {
            fixes.push(format!(
                "vault.sweep_interval_secs = {} is outside 1..={MAX_SWEEP_INTERVAL_SECS}, using {}",
                self.vault.sweep_interval_secs,
                default_sweep_interval_secs()
            ));
            self.vault.sweep_interval_secs = default_sweep_interval_secs();
        }

        if self.weather.timeout_secs == 0 {
            fixes.push(format!(
                "weather.timeout_secs must be at least 1, using {}",
                default_weather_timeout_secs()
            ));
            self.weather.timeout_secs = default_weather_timeout_secs();
        }

        for server in &mut self.tools.remote_servers {
            if server.timeout_secs == 0 {
                fixes.push(format!(
                    "tools.remote_servers '{}' timeout_secs must be at least 1, using {}",
                    server.name,
                    default_remote_timeout_secs()
                ));
                server.timeout_secs = default_remote_timeout_secs();
            }
        }

        fixes
    }
}

/// How the tool calls of one assistant message are executed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolExecution {
    #[default]
    Sequential,
    /// Run concurrently; results are still appended in call order.
    Concurrent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Model gateway accepting the invocation contract as JSON.
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,

    /// Model for the content stage.
    #[serde(default = "default_model")]
    pub model: String,

    /// Override for the content-stage system prompt.
    #[serde(default)]
    pub prompt: Option<String>,

    #[serde(default = "default_max_rounds")]
    pub max_rounds: usize,

    #[serde(default)]
    pub tool_execution: ToolExecution,

    /// Number of past question/answer pairs replayed into each prompt.
    #[serde(default = "default_history_window")]
    pub history_window: usize,

    #[serde(default)]
    pub format: FormatStageConfig,

    #[serde(default)]
    pub summary: SummaryConfig,
}

fn default_llm_base_url() -> String {
    "http://localhost:4000".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_max_rounds() -> usize {
    10
}

fn default_history_window() -> usize {
    5
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_llm_base_url(),
            model: default_model(),
            prompt: None,
            max_rounds: default_max_rounds(),
            tool_execution: ToolExecution::default(),
            history_window: default_history_window(),
            format: FormatStageConfig::default(),
            summary: SummaryConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormatStageConfig {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default)]
    pub prompt: Option<String>,
}

impl Default for FormatStageConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            prompt: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryConfig {
    #[serde(default = "default_model")]
    pub model: String,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultConfig {
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

fn default_ttl_secs() -> u64 {
    180
}

fn default_sweep_interval_secs() -> u64 {
    300
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Memory,
    Sqlite,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
    #[serde(default = "default_sqlite_path")]
    pub path: PathBuf,
}

fn default_sqlite_path() -> PathBuf {
    PathBuf::from("parley.db")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            path: default_sqlite_path(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeatherConfig {
    #[serde(default = "default_weather_base_url")]
    pub base_url: String,
    #[serde(default = "default_weather_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_weather_base_url() -> String {
    "https://api.openweathermap.org".to_string()
}

fn default_weather_timeout_secs() -> u64 {
    10
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            base_url: default_weather_base_url(),
            timeout_secs: default_weather_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginConfig {
    /// Account-binding page linked from the login card.
    #[serde(default)]
    pub auth_url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// MCP servers whose tools are offered next to the local ones.
    #[serde(default)]
    pub remote_servers: Vec<RemoteServerConfig>,
}

/// One MCP server reached over streamable HTTP.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteServerConfig {
    pub name: String,
    pub url: String,
    #[serde(default = "default_remote_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_remote_timeout_secs() -> u64 {
    30
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = AppConfig::default();
        assert_eq!(config.llm.max_rounds, 10);
        assert_eq!(config.llm.history_window, 5);
        assert_eq!(config.llm.tool_execution, ToolExecution::Sequential);
        assert_eq!(config.vault.ttl_secs, 180);
        assert_eq!(config.vault.sweep_interval_secs, 300);
        assert_eq!(config.storage.backend, StorageBackend::Memory);
        assert_eq!(config.weather.timeout_secs, 10);
    }

    #[test]
    fn empty_toml_is_default() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn partial_toml_keeps_other_defaults() {
        let toml_str = r#"
            base_url = "https://bot.example.com"

            [llm]
            model = "gpt-4.1"
            tool_execution = "concurrent"

            [llm.format]
            model = "gpt-4.1-mini"

            [storage]
            backend = "sqlite"
            path = "/var/lib/parley/parley.db"
        "#;
        let config: AppConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.base_url, "https://bot.example.com");
        assert_eq!(config.llm.model, "gpt-4.1");
        assert_eq!(config.llm.tool_execution, ToolExecution::Concurrent);
        assert_eq!(config.llm.format.model, "gpt-4.1-mini");
        assert_eq!(config.llm.summary.model, "gpt-4o-mini");
        assert_eq!(config.llm.max_rounds, 10);
        assert_eq!(config.storage.backend, StorageBackend::Sqlite);
        assert_eq!(config.vault.ttl_secs, 180);
        assert!(config.tools.remote_servers.is_empty());
    }

    #[test]
    fn remote_servers_parse() {
        let toml_str = r#"
            [[tools.remote_servers]]
            name = "maps"
            url = "http://localhost:3001/mcp"

            [[tools.remote_servers]]
            name = "calendar"
            url = "http://localhost:3002/mcp"
            timeout_secs = 5
        "#;
        let config: AppConfig = toml::from_str(toml_str).unwrap();
        let servers = &config.tools.remote_servers;
        assert_eq!(servers.len(), 2);
        assert_eq!(servers[0].name, "maps");
        assert_eq!(servers[0].timeout_secs, 30);
        assert_eq!(servers[1].url, "http://localhost:3002/mcp");
        assert_eq!(servers[1].timeout_secs, 5);
    }

    #[test]
    fn sanitize_keeps_valid_config() {
        let mut config = AppConfig::default();
        assert!(config.sanitize().is_empty());
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn sanitize_replaces_zero_and_oversized_values() {
        let toml_str = r#"
            [llm]
            max_rounds = 0

            [vault]
            ttl_secs = 9223372036854775807
            sweep_interval_secs = 0

            [weather]
            timeout_secs = 0

            [[tools.remote_servers]]
            name = "maps"
            url = "http://localhost:3001/mcp"
            timeout_secs = 0
        "#;
        let mut config: AppConfig = toml::from_str(toml_str).unwrap();
        let fixes = config.sanitize();

        assert_eq!(fixes.len(), 5);
        assert!(fixes[0].contains("llm.max_rounds"));
        assert!(fixes[1].contains("vault.ttl_secs"));
        assert!(fixes[2].contains("vault.sweep_interval_secs"));
        assert_eq!(config.llm.max_rounds, 10);
        assert_eq!(config.vault.ttl_secs, 180);
        assert_eq!(config.vault.sweep_interval_secs, 300);
        assert_eq!(config.weather.timeout_secs, 10);
        assert_eq!(config.tools.remote_servers[0].timeout_secs, 30);
    }
}
