//! Application configuration for certledger.
//!
//! User config lives at `~/.certledger/certledger.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CertLedgerError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "certledger.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".certledger";

// ---------------------------------------------------------------------------
// Config structs (matching certledger.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Ledger export settings.
    #[serde(default)]
    pub export: ExportSettings,

    /// Database settings.
    #[serde(default)]
    pub storage: StorageConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Roster CSV used when no `--roster` flag is given.
    #[serde(default = "default_roster_path")]
    pub roster_path: String,

    /// Ledger CSV written when no `--out` flag is given.
    #[serde(default = "default_output_path")]
    pub output_path: String,

    /// Maximum documents read in parallel.
    #[serde(default = "default_concurrency")]
    pub concurrency: u32,

    /// File extension collected when a directory is passed as input.
    #[serde(default = "default_document_extension")]
    pub document_extension: String,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            roster_path: default_roster_path(),
            output_path: default_output_path(),
            concurrency: default_concurrency(),
            document_extension: default_document_extension(),
        }
    }
}

fn default_roster_path() -> String {
    "clients.csv".into()
}
fn default_output_path() -> String {
    "compiled_data.csv".into()
}
fn default_concurrency() -> u32 {
    4
}
fn default_document_extension() -> String {
    "txt".into()
}

/// `[export]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportSettings {
    /// Field delimiter; must be a single ASCII character.
    #[serde(default = "default_delimiter")]
    pub delimiter: String,

    /// Rewrite `05-Jan-24` style issue dates as `2024-01-05`.
    #[serde(default)]
    pub normalize_dates: bool,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            delimiter: default_delimiter(),
            normalize_dates: false,
        }
    }
}

fn default_delimiter() -> String {
    ",".into()
}

/// `[storage]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Path to the libSQL database holding the roster and ledger runs.
    #[serde(default = "default_db_path")]
    pub db_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
        }
    }
}

fn default_db_path() -> String {
    "certledger.db".into()
}

// ---------------------------------------------------------------------------
// Runtime configs (merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime batch extraction configuration.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Maximum documents read concurrently. Zero is treated as one.
    pub concurrency: u32,
    /// Extension (without dot) matched when expanding directories.
    pub document_extension: String,
}

impl From<&AppConfig> for BatchConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            concurrency: config.defaults.concurrency,
            document_extension: config.defaults.document_extension.clone(),
        }
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

/// Runtime ledger export configuration.
#[derive(Debug, Clone)]
pub struct ExportConfig {
    /// Field delimiter byte.
    pub delimiter: u8,
    /// Rewrite parseable issue dates as ISO-8601.
    pub normalize_dates: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            delimiter: b',',
            normalize_dates: false,
        }
    }
}

impl TryFrom<&AppConfig> for ExportConfig {
    type Error = CertLedgerError;

    fn try_from(config: &AppConfig) -> Result<Self> {
        let delimiter = match config.export.delimiter.as_bytes() {
            [b] if b.is_ascii() => *b,
            _ => {
                return Err(CertLedgerError::config(format!(
                    "export delimiter must be a single ASCII character, got {:?}",
                    config.export.delimiter
                )));
            }
        };

        Ok(Self {
            delimiter,
            normalize_dates: config.export.normalize_dates,
        })
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.certledger/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| CertLedgerError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.certledger/certledger.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| CertLedgerError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        CertLedgerError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| CertLedgerError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| CertLedgerError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| CertLedgerError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
