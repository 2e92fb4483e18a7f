//! Archive configuration.
//!
//! A config file is TOML:
//!
//! ```toml
//! game_save_dir = "www/save"
//! working_dir = "www/save_manager"
//! game_save_template = "file{slot}.rpgsave"
//! payload_template = "{id}_{memo}.save.sm"
//! marker_template = "slot_{slot}-id_{id}.mapping.sm"
//! ```
//!
//! Relative directories in a file are resolved against the file's own
//! directory. Only the two directories are mandatory. Without a file the
//! RPG Maker MV layout below the current directory is assumed.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::archive::CoreError;

pub const DEFAULT_GAME_SAVE_DIR: &str = "www/save";
pub const DEFAULT_WORKING_DIR: &str = "www/save_manager";
pub const DEFAULT_GAME_SAVE_TEMPLATE: &str = "file{slot}.rpgsave";
pub const DEFAULT_PAYLOAD_TEMPLATE: &str = "{id}_{memo}.save.sm";
pub const DEFAULT_MARKER_TEMPLATE: &str = "slot_{slot}-id_{id}.mapping.sm";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ArchiveConfig {
    pub game_save_dir: PathBuf,
    pub working_dir: PathBuf,
    #[serde(default = "default_game_save_template")]
    pub game_save_template: String,
    #[serde(default = "default_payload_template")]
    pub payload_template: String,
    #[serde(default = "default_marker_template")]
    pub marker_template: String,
}

fn default_game_save_template() -> String {
    DEFAULT_GAME_SAVE_TEMPLATE.to_string()
}

fn default_payload_template() -> String {
    DEFAULT_PAYLOAD_TEMPLATE.to_string()
}

fn default_marker_template() -> String {
    DEFAULT_MARKER_TEMPLATE.to_string()
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self::new(DEFAULT_GAME_SAVE_DIR, DEFAULT_WORKING_DIR)
    }
}

impl ArchiveConfig {
    /// Config with the default templates.
    pub fn new(game_save_dir: impl Into<PathBuf>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            game_save_dir: game_save_dir.into(),
            working_dir: working_dir.into(),
            game_save_template: default_game_save_template(),
            payload_template: default_payload_template(),
            marker_template: default_marker_template(),
        }
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, CoreError> {
        toml::from_str(contents)
            .map_err(|e| CoreError::configuration(format!("invalid config: {e}")))
    }

    pub fn load(path: &Path) -> Result<Self, CoreError> {
        let contents = fs::read_to_string(path).map_err(|e| {
            CoreError::configuration(format!("failed to read config {}: {e}", path.display()))
        })?;
        let mut config = Self::from_toml_str(&contents).map_err(|e| {
            CoreError::configuration(format!("{}: {}", path.display(), e.message))
        })?;

        if let Some(base) = path.parent() {
            config.game_save_dir = resolve_against(base, &config.game_save_dir);
            config.working_dir = resolve_against(base, &config.working_dir);
        }
        Ok(config)
    }
}

fn resolve_against(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}
