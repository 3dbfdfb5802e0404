//! Client configuration loader.
//!
//! Reads `config.toml` from the data directory (`~/.freelance/` in production)
//! and deserializes it into [`ClientConfig`]. Falls back to defaults when the
//! file is missing or malformed.

use std::path::{Path, PathBuf};

use freelance_types::config::ClientConfig;

/// Overrides `api_base_url` from the config file.
pub const API_BASE_URL_ENV: &str = "FREELANCE_API_BASE_URL";

/// Overrides the data directory.
pub const DATA_DIR_ENV: &str = "FREELANCE_DATA_DIR";

/// Load client configuration from `{data_dir}/config.toml`.
///
/// - Missing file: [`ClientConfig::default()`].
/// - Unreadable or unparsable file: logs a warning and returns the default.
/// - `FREELANCE_API_BASE_URL`, when set and non-empty, replaces the base URL.
pub async fn load_client_config(data_dir: &Path) -> ClientConfig {
    let mut config = read_config_file(data_dir).await;
    if let Ok(base_url) = std::env::var(API_BASE_URL_ENV) {
        if !base_url.trim().is_empty() {
            config.api_base_url = base_url.trim().to_string();
        }
    }
    config
}

async fn read_config_file(data_dir: &Path) -> ClientConfig {
    let config_path = data_dir.join("config.toml");

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config.toml found at {}, using defaults", config_path.display());
            return ClientConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", config_path.display());
            return ClientConfig::default();
        }
    };

    match toml::from_str::<ClientConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(
                "Failed to parse {}: {err}, using defaults",
                config_path.display()
            );
            ClientConfig::default()
        }
    }
}

/// Resolve the data directory: `FREELANCE_DATA_DIR`, else `~/.freelance`,
/// else `./.freelance`.
pub fn resolve_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        return PathBuf::from(dir);
    }

    if let Some(home) = dirs::home_dir() {
        return home.join(".freelance");
    }

    PathBuf::from(".freelance")
}
