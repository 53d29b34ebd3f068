//! Configuration validation.

use crate::error::ConfigError;
use crate::schema::Config;

/// Validation result.
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: ValidationWarning) {
        self.warnings.push(warning);
    }

    /// First error as [`ConfigError::InvalidValue`].
    pub fn into_result(self) -> Result<Vec<ValidationWarning>, ConfigError> {
        match self.errors.into_iter().next() {
            Some(error) => Err(ConfigError::InvalidValue {
                field: error.path,
                message: error.message,
            }),
            None => Ok(self.warnings),
        }
    }
}

/// A validation error.
#[derive(Debug)]
pub struct ValidationError {
    pub path: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// A validation warning.
#[derive(Debug)]
pub struct ValidationWarning {
    pub path: String,
    pub message: String,
}

impl ValidationWarning {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Configuration validator.
pub struct ConfigValidator;

impl ConfigValidator {
    pub fn validate(config: &Config) -> ValidationResult {
        let mut result = ValidationResult::default();
        Self::validate_browser(config, &mut result);
        Self::validate_dom(config, &mut result);
        Self::validate_resolver(config, &mut result);
        result
    }

    fn validate_browser(config: &Config, result: &mut ValidationResult) {
        if config.browser.debug_port == 0 {
            result.add_error(ValidationError::new(
                "browser.debug_port",
                "Port cannot be 0",
            ));
        }
        if config.browser.viewport_width == 0 || config.browser.viewport_height == 0 {
            result.add_error(ValidationError::new(
                "browser.viewport_width",
                "Viewport dimensions must be positive",
            ));
        }
    }

    fn validate_dom(config: &Config, result: &mut ValidationResult) {
        if config.dom.poll_interval_ms == 0 {
            result.add_error(ValidationError::new(
                "dom.poll_interval_ms",
                "poll_interval_ms must be greater than 0",
            ));
        }
        if config.dom.viewport_expansion < -1 {
            result.add_error(ValidationError::new(
                "dom.viewport_expansion",
                "viewport_expansion must be -1 (whole page) or non-negative",
            ));
        }
        if config.dom.poll_interval_ms > 5000 {
            result.add_warning(ValidationWarning::new(
                "dom.poll_interval_ms",
                "poll_interval_ms is very high, mutation waits will react slowly",
            ));
        }
    }

    fn validate_resolver(config: &Config, result: &mut ValidationResult) {
        if config.resolver.max_attempts == 0 {
            result.add_error(ValidationError::new(
                "resolver.max_attempts",
                "max_attempts must be at least 1",
            ));
        }
        if config.resolver.max_attempts > 10 {
            result.add_warning(ValidationWarning::new(
                "resolver.max_attempts",
                "max_attempts is very high, stale indices will take long to fail",
            ));
        }
    }
}

#[cfg(test)]
#[path = "validator_tests.rs"]
mod tests;
