use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{FarmaciaError, Result};
use crate::pipeline::RunConfig;

pub const DEFAULT_INPUT: &str = "./Data/20250506_datos_proyecto_farmacia.xlsx";
pub const DEFAULT_DB_NAME: &str = "datos.db";

/// Persisted defaults. Every field may be overridden on the command line.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub input_path: Option<String>,
    #[serde(default)]
    pub db_path: Option<String>,
    #[serde(default)]
    pub sheet: Option<String>,
}

fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("farmacia")
}

pub fn settings_path() -> PathBuf {
    config_dir().join("settings.json")
}

/// Missing file means defaults; a file that exists but does not parse is an error.
pub fn load_settings(path: &Path) -> Result<Settings> {
    if !path.exists() {
        return Ok(Settings::default());
    }
    let content = std::fs::read_to_string(path)?;
    serde_json::from_str(&content)
        .map_err(|e| FarmaciaError::Settings(format!("{}: {e}", path.display())))
}

pub fn save_settings(path: &Path, settings: &Settings) -> Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let json = serde_json::to_string_pretty(settings)
        .map_err(|e| FarmaciaError::Settings(e.to_string()))?;
    std::fs::write(path, format!("{json}\n"))?;
    Ok(())
}

/// The store lives next to the executable unless configured otherwise.
pub fn default_db_path() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
        .join(DEFAULT_DB_NAME)
}

pub fn expand_path(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix('~') {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest.trim_start_matches('/'));
        }
    }
    PathBuf::from(path)
}

impl Settings {
    /// Resolve the paths for a run: command-line value, then settings, then
    /// built-in default.
    pub fn resolve(
        &self,
        input: Option<&str>,
        db: Option<&str>,
        sheet: Option<&str>,
    ) -> RunConfig {
        RunConfig {
            input: expand_path(input.or(self.input_path.as_deref()).unwrap_or(DEFAULT_INPUT)),
            db: db
                .or(self.db_path.as_deref())
                .map(expand_path)
                .unwrap_or_else(default_db_path),
            sheet: sheet.or(self.sheet.as_deref()).map(str::to_string),
        }
    }
}
