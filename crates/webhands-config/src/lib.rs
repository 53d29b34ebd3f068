//! # WebHands Config
//!
//! TOML configuration for the WebHands browser agent: driver connection,
//! snapshot options, resolver retries, action pacing, telemetry and logging.

mod error;
mod loader;
mod schema;
mod validator;

pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use schema::*;
pub use validator::{ConfigValidator, ValidationError, ValidationResult, ValidationWarning};
