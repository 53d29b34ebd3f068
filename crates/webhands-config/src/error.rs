//! Configuration errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    /// `--config` names a file that does not exist.
    #[error("Config file not found: {0}")]
    NotFound(String),

    /// Text that is not valid before TOML parsing, e.g. a broken `${VAR}`.
    #[error("Invalid config format: {0}")]
    InvalidFormat(String),

    /// Rejected by validation; `field` is the dotted TOML path.
    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("Environment variable not set: {0}")]
    EnvVarNotSet(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}
