//! Configuration system for the guildgate login bridge.
//!
//! Provides TOML-based configuration with:
//! - Config file layering (XDG user config + project-local overrides)
//! - Environment overrides using the deployment's variable names
//! - Secret resolution (env var → config file, with a plaintext warning)
//! - Validation of required provider fields and the token signing key

pub mod discovery;
pub mod error;
pub mod secrets;
pub mod types;

pub use discovery::{
    LoadedConfig, load_config, load_config_file, load_config_with_options, xdg_config_dir,
    xdg_config_path,
};
pub use error::{ConfigError, Result};
pub use secrets::{ResolvedSecret, SecretSource, process_env, resolve_secret};
pub use types::*;
