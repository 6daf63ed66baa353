//! Configuration error types.

/// Result type alias for config operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors that can occur during configuration loading and resolution.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read a config file.
    #[error("failed to read config file '{path}': {source}")]
    ReadFile {
        path: String,
        source: std::io::Error,
    },

    /// Failed to parse TOML.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Missing required field.
    #[error("missing required field '{field}' in {context} (or set {env_var})")]
    MissingField {
        field: String,
        context: String,
        env_var: String,
    },

    /// No way to sign custom tokens was configured.
    #[error(
        "no token signing key configured. Set [identity] service_account_file, FIREBASE_SERVICE_ACCOUNT, or GUILDGATE_SIGNING_SECRET"
    )]
    NoSigningKey,

    /// A field was present but unusable.
    #[error("invalid value for '{field}': {message}")]
    Invalid { field: String, message: String },
}
