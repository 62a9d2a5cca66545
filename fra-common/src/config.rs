//! Configuration loading and root folder resolution

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Root folder resolution priority order:
/// 1. Command-line argument (highest priority)
/// 2. Environment variable
/// 3. TOML config file
/// 4. OS-dependent compiled default (fallback)
pub fn resolve_root_folder(
    cli_arg: Option<&str>,
    env_var_name: &str,
    config_file_key: Option<&str>,
) -> Result<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Ok(PathBuf::from(path));
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        return Ok(PathBuf::from(path));
    }

    // Priority 3: TOML config file
    if let Some(key) = config_file_key {
        if let Ok(config_path) = locate_config_file() {
            if let Ok(toml_content) = std::fs::read_to_string(&config_path) {
                if let Ok(config) = toml::from_str::<toml::Value>(&toml_content) {
                    if let Some(root_folder) = config.get(key).and_then(|v| v.as_str()) {
                        return Ok(PathBuf::from(root_folder));
                    }
                }
            }
        }
    }

    // Priority 4: OS-dependent compiled default
    Ok(get_default_root_folder())
}

/// Get default configuration file path for the platform
fn locate_config_file() -> Result<PathBuf> {
    let config_path = if cfg!(target_os = "linux") {
        // Try ~/.config/fra/config.toml first, then /etc/fra/config.toml
        let user_config = dirs::config_dir().map(|d| d.join("fra").join("config.toml"));
        let system_config = PathBuf::from("/etc/fra/config.toml");

        if let Some(path) = user_config {
            if path.exists() {
                return Ok(path);
            }
        }
        if system_config.exists() {
            return Ok(system_config);
        }
        return Err(Error::Config("No config file found".to_string()));
    } else if cfg!(target_os = "macos") || cfg!(target_os = "windows") {
        dirs::config_dir()
            .map(|d| d.join("fra").join("config.toml"))
            .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))?
    } else {
        return Err(Error::Config("Unsupported platform".to_string()));
    };

    if config_path.exists() {
        Ok(config_path)
    } else {
        Err(Error::Config(format!("Config file not found: {:?}", config_path)))
    }
}

/// Get OS-dependent default root folder path
fn get_default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        // ~/.local/share/fra (or /var/lib/fra for system-wide)
        dirs::data_local_dir()
            .map(|d| d.join("fra"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/fra"))
    } else if cfg!(target_os = "macos") {
        // ~/Library/Application Support/fra
        dirs::data_dir()
            .map(|d| d.join("fra"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/fra"))
    } else if cfg!(target_os = "windows") {
        // %LOCALAPPDATA%\fra
        dirs::data_local_dir()
            .map(|d| d.join("fra"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\fra"))
    } else {
        PathBuf::from("./fra_data")
    }
}

/// Optional settings read from the TOML config file
///
/// Anything absent here falls back to paths derived from the root folder,
/// so a config file is never required.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub root_folder: Option<String>,
    pub snapshot_path: Option<String>,
    pub scorer: ScorerFileConfig,
}

/// `[scorer]` section of the config file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ScorerFileConfig {
    pub command: Option<String>,
    pub args: Option<Vec<String>>,
    pub working_dir: Option<String>,
}

/// Load the TOML config file if one exists, defaulting on any failure
pub fn load_file_config() -> FileConfig {
    match locate_config_file() {
        Ok(path) => match std::fs::read_to_string(&path) {
            Ok(content) => parse_file_config(&content),
            Err(e) => {
                tracing::warn!(path = ?path, error = %e, "Failed to read config file, using defaults");
                FileConfig::default()
            }
        },
        Err(_) => FileConfig::default(),
    }
}

fn parse_file_config(content: &str) -> FileConfig {
    match toml::from_str::<FileConfig>(content) {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to parse config file, using defaults");
            FileConfig::default()
        }
    }
}

/// Invocation of the external batch scorer
#[derive(Debug, Clone)]
pub struct ScorerCommand {
    pub command: String,
    pub args: Vec<String>,
    pub working_dir: PathBuf,
}

/// Claims database file inside the root folder
pub fn database_path(root_folder: &Path) -> PathBuf {
    root_folder.join("fra.db")
}

/// Create the root folder if it does not exist yet
pub fn ensure_root_folder(root_folder: &Path) -> Result<()> {
    std::fs::create_dir_all(root_folder)?;
    Ok(())
}

/// Score snapshot CSV path: configured value, or `<root>/dss/dss_definitive_master_db_new.csv`
pub fn snapshot_path(root_folder: &Path, config: &FileConfig) -> PathBuf {
    match &config.snapshot_path {
        Some(path) => PathBuf::from(path),
        None => root_folder.join("dss").join("dss_definitive_master_db_new.csv"),
    }
}

/// Scorer invocation: configured values, or `python3 dss_engine.py` run in `<root>/dss`
pub fn scorer_command(root_folder: &Path, config: &FileConfig) -> ScorerCommand {
    ScorerCommand {
        command: config
            .scorer
            .command
            .clone()
            .unwrap_or_else(|| "python3".to_string()),
        args: config
            .scorer
            .args
            .clone()
            .unwrap_or_else(|| vec!["dss_engine.py".to_string()]),
        working_dir: config
            .scorer
            .working_dir
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| root_folder.join("dss")),
    }
}
