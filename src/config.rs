use crate::dump::{ConvoIds, DEFAULT_MAX_YEARS};
use eyre::{Result, WrapErr, bail};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Settings for the conversation list export.
/// This decouples the logic from how the arguments were parsed.
#[derive(Debug, Clone)]
pub struct ListConfig {
    pub db_path: PathBuf,
    pub output: PathBuf,
    pub overwrite: bool,
    pub snapshot: bool,
    pub quiet: bool,
}

/// Settings for the per-year message dump.
#[derive(Debug, Clone)]
pub struct DumpConfig {
    pub db_path: PathBuf,
    pub convo_ids: ConvoIds,
    /// `None` prints the most recent year to stdout.
    pub output: Option<PathBuf>,
    pub overwrite: bool,
    pub max_years: u32,
    pub parallel: bool,
    pub snapshot: bool,
    pub quiet: bool,
}

/// Contents of `config.toml`. Every key is optional.
#[derive(Debug, Deserialize, Default)]
pub struct FileConfig {
    pub db_path: Option<PathBuf>,
    pub convo_ids: Option<ConvoIds>,
    pub output: Option<PathBuf>,
    pub overwrite: Option<bool>,
    pub max_years: Option<u32>,
}

impl FileConfig {
    pub fn max_years_or_default(&self) -> u32 {
        self.max_years.unwrap_or(DEFAULT_MAX_YEARS)
    }

    /// Parse a TOML settings file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .wrap_err_with(|| format!("Cannot read settings file {}", path.display()))?;
        toml::from_str(&raw).wrap_err_with(|| format!("Invalid settings in {}", path.display()))
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("skypescape/config.toml"))
}

/// Pick the settings file to use. An explicit path must exist; the default one is optional.
fn resolve_config_path(explicit_path: Option<&Path>) -> Result<Option<PathBuf>> {
    match explicit_path {
        Some(path) if path.is_file() => Ok(Some(path.to_path_buf())),
        Some(path) => bail!("No settings file at {}", path.display()),
        None => Ok(default_config_path().filter(|path| path.is_file())),
    }
}

/// Settings from `--config`, else from the per-user default file, else all defaults.
pub fn load_file_config(explicit_path: Option<&Path>) -> Result<FileConfig> {
    resolve_config_path(explicit_path)?
        .map_or_else(|| Ok(FileConfig::default()), |path| FileConfig::from_path(&path))
}
