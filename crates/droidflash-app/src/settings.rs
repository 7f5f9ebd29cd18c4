//! User settings from config.toml

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use droidflash_core::prelude::*;

const SETTINGS_FILENAME: &str = "config.toml";
const SETTINGS_DIR: &str = "droidflash";

/// User-tunable settings
///
/// Loaded from `<config_dir>/droidflash/config.toml`. A missing or malformed
/// file never stops the application; defaults are used and the problem is
/// logged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Directory holding the bundled adb/fastboot/heimdall binaries
    pub binaries_dir: PathBuf,

    /// Directory holding the bundled device definition documents
    pub configs_dir: PathBuf,

    /// Whether the advanced raw-output view starts enabled
    pub advanced_output: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            binaries_dir: PathBuf::from("bin"),
            configs_dir: PathBuf::from("assets/configs"),
            advanced_output: false,
        }
    }
}

impl Settings {
    /// Load settings from the default location
    pub fn load() -> Self {
        match Self::default_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    /// Load settings from an explicit path, falling back to defaults
    pub fn load_from(path: &Path) -> Self {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(_) => {
                debug!("No settings file at {}, using defaults", path.display());
                return Self::default();
            }
        };
        match toml::from_str(&text) {
            Ok(settings) => {
                info!("Loaded settings from {}", path.display());
                settings
            }
            Err(e) => {
                warn!(
                    "Malformed settings file at {}: {e}; using defaults",
                    path.display()
                );
                Self::default()
            }
        }
    }

    /// The default settings file location for this platform
    pub fn default_path() -> Option<PathBuf> {
        Some(dirs::config_dir()?.join(SETTINGS_DIR).join(SETTINGS_FILENAME))
    }
}
