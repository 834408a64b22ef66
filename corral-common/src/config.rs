//! Configuration loading and root folder resolution
//!
//! The root folder holds everything Corral persists:
//! - `corral.db`: SQLite database
//! - `files/`: finalized catalogue artifacts, served statically
//! - `uploads/`: per-upload chunk staging directories

use crate::{Error, Result};
use std::path::{Path, PathBuf};

/// Root folder resolution priority order:
/// 1. Command-line argument (highest priority)
/// 2. Environment variable
/// 3. TOML config file
/// 4. OS-dependent compiled default (fallback)
pub fn resolve_root_folder(cli_arg: Option<&str>, env_var_name: &str) -> Result<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Ok(PathBuf::from(path));
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        if !path.is_empty() {
            return Ok(PathBuf::from(path));
        }
    }

    // Priority 3: TOML config file
    if let Ok(config_path) = find_config_file() {
        if let Ok(toml_content) = std::fs::read_to_string(&config_path) {
            if let Ok(config) = toml::from_str::<toml::Value>(&toml_content) {
                if let Some(root_folder) = config.get("root_folder").and_then(|v| v.as_str()) {
                    return Ok(PathBuf::from(root_folder));
                }
            }
        }
    }

    // Priority 4: OS-dependent compiled default
    Ok(default_root_folder())
}

/// Get default configuration file path for the platform
fn find_config_file() -> Result<PathBuf> {
    if cfg!(target_os = "linux") {
        // Try ~/.config/corral/config.toml first, then /etc/corral/config.toml
        if let Some(path) = dirs::config_dir().map(|d| d.join("corral").join("config.toml")) {
            if path.exists() {
                return Ok(path);
            }
        }
        let system_config = PathBuf::from("/etc/corral/config.toml");
        if system_config.exists() {
            return Ok(system_config);
        }
        return Err(Error::Config("No config file found".to_string()));
    }

    let path = dirs::config_dir()
        .map(|d| d.join("corral").join("config.toml"))
        .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))?;

    if path.exists() {
        Ok(path)
    } else {
        Err(Error::Config(format!("Config file not found: {:?}", path)))
    }
}

/// Get OS-dependent default root folder path
fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("corral"))
        .unwrap_or_else(|| PathBuf::from("./corral_data"))
}

/// SQLite database path under the root folder
pub fn database_path(root: &Path) -> PathBuf {
    root.join("corral.db")
}

/// Directory for finalized catalogue artifacts (served at /api/files)
pub fn files_dir(root: &Path) -> PathBuf {
    root.join("files")
}

/// Directory for in-flight chunk staging, one subdirectory per upload id
pub fn staging_dir(root: &Path) -> PathBuf {
    root.join("uploads")
}

/// Parse the CORS_ORIGINS environment value.
///
/// Comma-separated origin allowlist. `None` (unset, empty, or `*`) means
/// permissive CORS, matching the development default.
pub fn parse_cors_origins(value: Option<&str>) -> Option<Vec<String>> {
    let value = value?.trim();
    if value.is_empty() || value == "*" {
        return None;
    }
    Some(
        value
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
    )
}
