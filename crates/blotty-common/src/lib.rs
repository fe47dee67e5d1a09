//! Error types shared by the blotty crates.

pub mod errors;

pub use errors::{BlottyError, ConfigError};
