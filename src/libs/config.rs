use std::path::PathBuf;

use home_config::HomeConfig;
use serde::{Deserialize, Serialize};

use crate::libs::constants::APP_NAME;
use crate::libs::error::{AnyResult, ShufflistError};

/**
 * User settings the core consumes as plain configuration values: where
 * playlists are saved, where directory selection starts, and whether
 * playlist entries use absolute paths.
 */
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub save_directory: Option<PathBuf>,
    pub start_directory: PathBuf,
    pub use_absolute_path: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            save_directory: None,
            start_directory: dirs::audio_dir()
                .or_else(dirs::home_dir)
                .unwrap_or_else(|| PathBuf::from("/")),
            use_absolute_path: false,
        }
    }
}

fn config_file() -> HomeConfig {
    HomeConfig::with_config_dir(APP_NAME, "config.toml")
}

/// Load settings, falling back to defaults when no file exists yet
pub fn load_settings() -> Settings {
    config_file().toml::<Settings>().unwrap_or_default()
}

/// Persist settings. Failures surface to the caller, no retry.
pub fn save_settings(settings: &Settings) -> AnyResult<()> {
    config_file()
        .save_toml(settings)
        .map_err(|err| ShufflistError::Config(format!("{err:?}")))
}
