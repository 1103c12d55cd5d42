//! User settings read from `~/.setlist-metronome/config.toml`.
//!
//! The file is optional and every key has a default, so a missing file, an
//! empty file and a partial file all produce a usable [`Settings`].

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use directories::BaseDirs;
use serde::Deserialize;

use crate::controller::DEFAULT_COARSE_STEP;

/// Folder name used beneath the user's home directory for application data.
const APP_DIR_NAME: &str = ".setlist-metronome";
/// Settings file name inside the application directory.
const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// BPM added or removed by the coarse tempo keys.
    pub coarse_step: i64,
    /// Where the database and logs live. Defaults to the application
    /// directory.
    pub data_dir: Option<PathBuf>,
    /// `tracing` filter directive, used when `RUST_LOG` is not set.
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            coarse_step: DEFAULT_COARSE_STEP,
            data_dir: None,
            log_filter: "info".to_string(),
        }
    }
}

impl Settings {
    /// Read settings from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        Self::from_toml(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parse settings from TOML text, clamping the coarse step to at least 1.
    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        let mut settings: Settings = toml::from_str(text)?;
        settings.coarse_step = settings.coarse_step.max(1);
        Ok(settings)
    }

    /// Directory holding the database and logs.
    pub fn resolve_data_dir(&self, app_dir: &Path) -> PathBuf {
        self.data_dir
            .clone()
            .unwrap_or_else(|| app_dir.to_path_buf())
    }
}

/// Resolve the application directory inside the user's home.
pub fn app_dir() -> Result<PathBuf> {
    let base_dirs = BaseDirs::new().ok_or_else(|| anyhow!("could not locate home directory"))?;
    Ok(base_dirs.home_dir().join(APP_DIR_NAME))
}

/// Location of the settings file inside `app_dir`.
pub fn config_path(app_dir: &Path) -> PathBuf {
    app_dir.join(CONFIG_FILE_NAME)
}
