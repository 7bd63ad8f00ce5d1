//! Configuration loader.
//!
//! Reads `parley.toml` and deserializes it into [`AppConfig`]. Falls back to
//! defaults when the file is missing or malformed. API keys never live in
//! the file; they are read from the environment with [`env_secret`].

use std::path::Path;

use parley_types::config::AppConfig;
use secrecy::SecretString;

/// Environment variable holding the model gateway's bearer token.
pub const LLM_API_KEY_VAR: &str = "PARLEY_LLM_API_KEY";

/// Environment variable holding the OpenWeather API key.
pub const WEATHER_API_KEY_VAR: &str = "PARLEY_WEATHER_API_KEY";

/// Load configuration from `path`.
///
/// - Missing file: [`AppConfig::default()`].
/// - Unreadable or unparsable file: a warning is logged and the default is used.
/// - Out-of-range values: a warning is logged per value and its default is used.
pub async fn load_config(path: &Path) -> AppConfig {
    let mut config = read_config(path).await;
    for fix in config.sanitize() {
        tracing::warn!("{}: {fix}", path.display());
    }
    config
}

async fn read_config(path: &Path) -> AppConfig {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config found at {}, using defaults", path.display());
            return AppConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", path.display());
            return AppConfig::default();
        }
    };

    match toml::from_str::<AppConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!("Failed to parse {}: {err}, using defaults", path.display());
            AppConfig::default()
        }
    }
}

/// Read a secret from the environment. Empty and non-Unicode values count
/// as absent.
pub fn env_secret(var: &str) -> Option<SecretString> {
    match std::env::var(var) {
        Ok(val) if !val.trim().is_empty() => Some(SecretString::from(val)),
        _ => None,
    }
}
