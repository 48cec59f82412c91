//! Configuration loading and root folder resolution
//!
//! Bootstrap configuration comes from a small TOML file. Every field is optional:
//! a missing file, or a file that only sets a few keys, falls back to compiled defaults.
//!
//! Root folder priority order:
//! 1. Command-line argument (highest priority)
//! 2. `PICTA_ROOT_FOLDER` environment variable
//! 3. `PICTA_ROOT` environment variable (legacy name)
//! 4. TOML config file `root_folder`
//! 5. OS-dependent compiled default (fallback)

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Database file name inside the root folder
pub const DATABASE_FILE_NAME: &str = "picta.db";

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV: &str = "PICTA_ROOT_FOLDER";

/// Legacy environment variable overriding the root folder
pub const ROOT_FOLDER_ENV_LEGACY: &str = "PICTA_ROOT";

/// Bootstrap configuration loaded from TOML file
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TomlConfig {
    /// Root folder holding the database (optional)
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    /// Interface to bind the HTTP server to
    #[serde(default)]
    pub host: Option<String>,

    /// HTTP server port
    #[serde(default)]
    pub port: Option<u16>,

    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Remote recognition service settings
    #[serde(default)]
    pub recognition: RecognitionSection,

    /// Analysis pipeline tuning
    #[serde(default)]
    pub analysis: AnalysisSection,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// `[recognition]` table
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RecognitionSection {
    /// API key for the recognition service
    #[serde(default)]
    pub api_key: Option<String>,
    /// Base URL of the recognition service
    #[serde(default)]
    pub base_url: Option<String>,
    /// Model selector
    #[serde(default)]
    pub model_id: Option<String>,
    /// Bounded wait for one recognition call, in milliseconds
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

/// `[analysis]` table
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AnalysisSection {
    /// Minimum confidence for a recognized label to be kept (0.0-1.0)
    #[serde(default)]
    pub confidence_threshold: Option<f32>,
    /// What to do when the palette extractor fails
    #[serde(default)]
    pub palette_failure: Option<StagePolicy>,
    /// What to do when the recognition call fails
    #[serde(default)]
    pub recognition_failure: Option<StagePolicy>,
    /// Maximum accepted upload size in bytes
    #[serde(default)]
    pub max_upload_bytes: Option<usize>,
    /// Palette extractor samples every Nth pixel
    #[serde(default)]
    pub palette_sample_stride: Option<usize>,
}

/// Failure handling for a non-critical analysis stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StagePolicy {
    /// Substitute an empty result and keep going
    #[default]
    Degrade,
    /// Fail the whole analysis
    Escalate,
}

/// Compiled-in defaults used when nothing else is configured
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub root_folder: PathBuf,
    pub host: String,
    pub port: u16,
}

impl CompiledDefaults {
    /// Defaults for the platform this binary was built for
    pub fn for_current_platform() -> Self {
        Self {
            root_folder: default_root_folder(),
            host: "127.0.0.1".to_string(),
            port: 5000,
        }
    }
}

/// Get OS-dependent default root folder path
fn default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        // ~/.local/share/picta (or /var/lib/picta for system-wide)
        dirs::data_local_dir()
            .map(|d| d.join("picta"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/picta"))
    } else if cfg!(target_os = "macos") {
        // ~/Library/Application Support/picta
        dirs::data_dir()
            .map(|d| d.join("picta"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/picta"))
    } else if cfg!(target_os = "windows") {
        // %LOCALAPPDATA%\picta
        dirs::data_local_dir()
            .map(|d| d.join("picta"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\picta"))
    } else {
        PathBuf::from("./picta_data")
    }
}

/// Default TOML location for a module: `<config dir>/picta/<module>.toml`
pub fn default_config_path(module_name: &str) -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("picta").join(format!("{}.toml", module_name)))
}

/// Load TOML bootstrap configuration
///
/// A missing file is not an error: a warning is logged and defaults are returned.
/// A file that exists but cannot be read or parsed is a configuration error.
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    if !path.exists() {
        warn!(
            "Config file not found at {}, using compiled defaults",
            path.display()
        );
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read TOML failed ({}): {}", path.display(), e)))?;

    let config: TomlConfig = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse TOML failed ({}): {}", path.display(), e)))?;

    info!("Loaded configuration from {}", path.display());
    Ok(config)
}

/// Resolves the root folder following the documented priority order
pub struct RootFolderResolver {
    module_name: String,
    cli_arg: Option<PathBuf>,
    toml_root: Option<PathBuf>,
}

impl RootFolderResolver {
    pub fn new(module_name: &str) -> Self {
        Self {
            module_name: module_name.to_string(),
            cli_arg: None,
            toml_root: None,
        }
    }

    /// Command-line override (highest priority)
    pub fn with_cli_arg(mut self, path: Option<PathBuf>) -> Self {
        self.cli_arg = path;
        self
    }

    /// Root folder from an already-loaded TOML config
    pub fn with_toml(mut self, config: &TomlConfig) -> Self {
        self.toml_root = config.root_folder.clone();
        self
    }

    /// Resolve root folder. Never fails; falls back to the compiled default.
    pub fn resolve(&self) -> PathBuf {
        if let Some(path) = &self.cli_arg {
            debug!(module = %self.module_name, "Root folder from command line");
            return path.clone();
        }

        for var in [ROOT_FOLDER_ENV, ROOT_FOLDER_ENV_LEGACY] {
            if let Ok(path) = std::env::var(var) {
                if !path.trim().is_empty() {
                    debug!(module = %self.module_name, env = var, "Root folder from environment");
                    return PathBuf::from(path);
                }
            }
        }

        if let Some(path) = &self.toml_root {
            debug!(module = %self.module_name, "Root folder from TOML config");
            return path.clone();
        }

        CompiledDefaults::for_current_platform().root_folder
    }
}

/// Creates the root folder and derives file locations inside it
pub struct RootFolderInitializer {
    root_folder: PathBuf,
}

impl RootFolderInitializer {
    pub fn new(root_folder: PathBuf) -> Self {
        Self { root_folder }
    }

    /// Create root folder directory if missing
    pub fn ensure_directory_exists(&self) -> Result<()> {
        if !self.root_folder.exists() {
            std::fs::create_dir_all(&self.root_folder)?;
            info!("Created root folder: {}", self.root_folder.display());
        }
        Ok(())
    }

    /// Path to the SQLite database inside the root folder
    pub fn database_path(&self) -> PathBuf {
        self.root_folder.join(DATABASE_FILE_NAME)
    }
}
