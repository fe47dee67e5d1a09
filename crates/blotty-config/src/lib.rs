//! blotty configuration.
//!
//! A TOML file with a single `[server]` table. Every field has a default,
//! so a partial file (or none at all) works out of the box. Command-line
//! flags are applied on top by the binary.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! let config = blotty_config::load_config(None, |config| config).expect("failed to load config");
//! println!("listening on {}", config.server.listen_addr());
//! ```

pub mod schema;
pub mod toml_loader;
pub mod validation;

use std::path::Path;

pub use schema::{BlottyConfig, ServerConfig};

use blotty_common::ConfigError;

/// Load config from `path`, or from the platform default path when `None`,
/// pass it through `overlay`, then validate the result.
///
/// An explicit path must exist and parse. The default file is created from
/// a commented template if missing; any other problem with it is logged and
/// the defaults are used instead. `overlay` is where command-line flags go,
/// so a flag can fix a value the file gets wrong.
pub fn load_config(
    path: Option<&Path>,
    overlay: impl FnOnce(BlottyConfig) -> BlottyConfig,
) -> Result<BlottyConfig, ConfigError> {
    let config = match path {
        Some(path) => {
            tracing::info!("using config override: {}", path.display());
            toml_loader::load_from_path(path)?
        }
        None => toml_loader::load_default().unwrap_or_else(|e| {
            tracing::warn!("config load failed, using defaults: {e}");
            BlottyConfig::default()
        }),
    };
    let config = overlay(config);
    validation::validate(&config)?;
    Ok(config)
}
