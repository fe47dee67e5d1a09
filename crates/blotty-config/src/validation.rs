//! Config validation.

use blotty_common::ConfigError;

use crate::schema::BlottyConfig;

/// Check values serde cannot reject on its own.
pub fn validate(config: &BlottyConfig) -> Result<(), ConfigError> {
    let server = &config.server;
    let mut errors = Vec::new();

    if server.port == 0 {
        errors.push("server.port must be nonzero".to_string());
    }
    if server.address.trim().is_empty() {
        errors.push("server.address must not be empty".to_string());
    }
    if server.reconnect && server.reconnect_time == 0 {
        errors.push("server.reconnect_time must be positive when reconnect is on".to_string());
    }
    if server.title_format.is_empty() {
        errors.push("server.title_format must not be empty".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError(errors.join("; ")))
    }
}
