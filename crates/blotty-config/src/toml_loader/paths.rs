//! Where the config file lives, and writing the first one.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use blotty_common::ConfigError;

use super::template::default_config_toml;

const APP_DIR: &str = "blotty";
const FILE_NAME: &str = "config.toml";

/// Config file path under a platform config directory.
pub fn config_path_in(config_dir: &Path) -> PathBuf {
    config_dir.join(APP_DIR).join(FILE_NAME)
}

/// `<platform config dir>/blotty/config.toml`.
pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    dirs::config_dir()
        .map(|dir| config_path_in(&dir))
        .ok_or_else(|| ConfigError::ParseError("no platform config directory".into()))
}

/// Write the commented template to `path`, creating parent directories.
///
/// An existing file is left untouched, so two servers starting at once
/// cannot clobber a config one of them just wrote.
pub fn create_default_config(path: &Path) -> Result<(), ConfigError> {
    let write_failed = |e: io::Error| {
        ConfigError::ParseError(format!("cannot write {}: {e}", path.display()))
    };

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(write_failed)?;
    }

    let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            tracing::debug!(path = %path.display(), "config already exists");
            return Ok(());
        }
        Err(e) => return Err(write_failed(e)),
    };
    file.write_all(default_config_toml().as_bytes())
        .map_err(write_failed)?;

    tracing::info!(path = %path.display(), "wrote default config");
    Ok(())
}
