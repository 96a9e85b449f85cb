// Configuration loading and parsing (config/teamdraw.toml).

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// Config structs
// ---------------------------------------------------------------------------

pub const CONFIG_FILE: &str = "teamdraw.toml";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub draw: DrawConfig,
    pub storage: StorageConfig,
    pub remote: RemoteConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DrawConfig {
    #[serde(default = "default_team_size")]
    pub default_team_size: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// SQLite file for local data. Empty means the platform data directory.
    #[serde(default)]
    pub path: String,
    #[serde(default = "default_roster_key")]
    pub roster_key: String,
    #[serde(default = "default_session_key")]
    pub session_key: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemoteConfig {
    pub base_url: String,
}

fn default_team_size() -> usize {
    5
}

fn default_roster_key() -> String {
    "roster".into()
}

fn default_session_key() -> String {
    "session".into()
}

impl StorageConfig {
    /// Resolve the database location. `":memory:"` and explicit paths are
    /// used as given; an empty path falls back to the platform data dir.
    pub fn resolve_db_path(&self) -> PathBuf {
        if !self.path.is_empty() {
            return PathBuf::from(&self.path);
        }
        match directories::ProjectDirs::from("", "", "teamdraw") {
            Some(dirs) => dirs.data_dir().join("teamdraw.db"),
            None => PathBuf::from("teamdraw.db"),
        }
    }
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate `config/teamdraw.toml` relative to `base_dir`.
///
/// Does not copy defaults; prefer `load_config()` for that.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let path = base_dir.join("config").join(CONFIG_FILE);
    let text = read_file(&path)?;
    let config: Config = toml::from_str(&text).map_err(|e| ConfigError::ParseError {
        path: path.clone(),
        source: e,
    })?;

    validate(&config)?;

    Ok(config)
}

/// Seed `config/teamdraw.toml` from `defaults/teamdraw.toml` on first run.
///
/// Returns the path written, or `None` when the config already exists. An
/// existing config is never overwritten.
pub fn ensure_config_file(base_dir: &Path) -> Result<Option<PathBuf>, ConfigError> {
    let target = base_dir.join("config").join(CONFIG_FILE);
    if target.is_file() {
        return Ok(None);
    }
    let source = base_dir.join("defaults").join(CONFIG_FILE);
    let copy_err = |what: &str, path: &Path, e: std::io::Error| ConfigError::DefaultsCopyError {
        message: format!("failed to {what} {}: {e}", path.display()),
    };

    let mut defaults = match std::fs::File::open(&source) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ConfigError::DefaultsCopyError {
                message: format!(
                    "no config/{CONFIG_FILE} or defaults/{CONFIG_FILE} in {}; \
                     run from the project root",
                    base_dir.display()
                ),
            });
        }
        Err(e) => return Err(copy_err("open", &source, e)),
    };

    let config_dir = base_dir.join("config");
    std::fs::create_dir_all(&config_dir).map_err(|e| copy_err("create", &config_dir, e))?;

    let mut dest = match std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&target)
    {
        Ok(dest) => dest,
        // Created by someone else in the meantime.
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => return Ok(None),
        Err(e) => return Err(copy_err("create", &target, e)),
    };
    std::io::copy(&mut defaults, &mut dest).map_err(|e| copy_err("write", &target, e))?;

    Ok(Some(target))
}

/// Load config relative to the current working directory, copying defaults
/// first.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    ensure_config_file(&cwd)?;
    load_config_from(&cwd)
}

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.draw.default_team_size == 0 {
        return Err(ConfigError::ValidationError {
            field: "draw.default_team_size".into(),
            message: "must be greater than 0".into(),
        });
    }

    let storage = &config.storage;
    let key_fields: &[(&str, &str)] = &[
        ("storage.roster_key", &storage.roster_key),
        ("storage.session_key", &storage.session_key),
    ];
    for (name, val) in key_fields {
        if val.trim().is_empty() {
            return Err(ConfigError::ValidationError {
                field: name.to_string(),
                message: "must not be empty".into(),
            });
        }
    }
    if storage.roster_key == storage.session_key {
        return Err(ConfigError::ValidationError {
            field: "storage.session_key".into(),
            message: format!("must differ from roster_key, both are `{}`", storage.roster_key),
        });
    }

    if config.remote.base_url.trim().is_empty() {
        return Err(ConfigError::ValidationError {
            field: "remote.base_url".into(),
            message: "must not be empty".into(),
        });
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
