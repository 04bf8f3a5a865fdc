//! Tunables loaded from the configuration file.
//!
//! Credentials are not part of the configuration; they come from the command line or the
//! environment.

#[expect(clippy::module_inception, reason = "Keeps the loader next to its embedded defaults")]
mod config;

pub use config::{CONFIG_FILE_NAME, Config, DEFAULT_CONFIG_TOML};
