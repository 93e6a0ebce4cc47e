//! Code for loading program settings.
use crate::get_redap_config_dir;
use crate::input::read_toml;
use crate::log::DEFAULT_LOG_LEVEL;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The name of the program settings file
const SETTINGS_FILE_NAME: &str = "settings.toml";

/// Header written above the commented-out defaults when a settings file is generated
const DEFAULT_SETTINGS_FILE_HEADER: &str = concat!(
    "# This file contains the program settings for redap.
#
# The default options for redap v",
    env!("CARGO_PKG_VERSION"),
    " are shown below, commented out. To change an option, uncomment it and set the value
# appropriately.
#
# To show the default options for the current version of redap, run:
# \tredap settings show-default
"
);

/// Get the path to where the settings file will be read from
pub fn get_settings_file_path() -> PathBuf {
    let mut path = get_redap_config_dir();
    path.push(SETTINGS_FILE_NAME);

    path
}

/// Program settings from config file
#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// The default program log level
    pub log_level: String,
    /// Whether to recompute cached artifacts by default
    pub overwrite: bool,
    /// Root path for the on-disk artifact cache. Defaults to `redap_cache`.
    pub cache_root: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            overwrite: false,
            cache_root: "redap_cache".into(),
        }
    }
}

impl Settings {
    /// Read the settings from the default file path, if present.
    ///
    /// If the file does not exist, default settings are returned. Setting the
    /// `REDAP_USE_DEFAULT_SETTINGS` environment variable skips the file entirely, which is
    /// useful for tests.
    pub fn load() -> Result<Self> {
        if std::env::var_os("REDAP_USE_DEFAULT_SETTINGS").is_some() {
            return Ok(Self::default());
        }

        Self::from_path(&get_settings_file_path())
    }

    /// Read the settings from the given path, returning defaults if the file is missing
    pub fn from_path(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Ok(Self::default());
        }

        read_toml(path)
    }

    /// The default contents of the settings file, with every option commented out
    pub fn default_file_contents() -> String {
        let defaults =
            toml::to_string(&Self::default()).expect("Default settings must be serialisable");
        let mut out = String::from(DEFAULT_SETTINGS_FILE_HEADER);
        for line in defaults.lines() {
            out.push_str("\n# ");
            out.push_str(line);
        }
        out.push('\n');

        out
    }
}
