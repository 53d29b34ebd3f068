//! Error types for the DOM core.

use thiserror::Error;
use webhands_protocols::DriverError;

/// Errors raised by snapshotting, observation and lookup.
#[derive(Debug, Error)]
pub enum DomError {
    /// The container a snapshot was requested for does not exist.
    #[error("Snapshot root element not found")]
    ElementNotFound,

    #[error("Timed out after {timeout_ms}ms waiting for {operation}")]
    Timeout { operation: String, timeout_ms: u64 },

    /// The mutation observer was torn down and cannot be restarted.
    #[error("Mutation observer has been destroyed")]
    ObserverDestroyed,

    /// The service released its page reference during cleanup.
    #[error("DOM service has been released")]
    Released,

    #[error("Invalid snapshot: {0}")]
    InvalidSnapshot(String),

    #[error(transparent)]
    Driver(#[from] DriverError),
}

impl DomError {
    pub fn timeout(operation: impl Into<String>, timeout_ms: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            timeout_ms,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

pub type DomResult<T> = Result<T, DomError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_display() {
        let err = DomError::timeout("element #never-appears", 200);
        assert_eq!(
            err.to_string(),
            "Timed out after 200ms waiting for element #never-appears"
        );
        assert!(err.is_timeout());
    }

    #[test]
    fn test_driver_error_is_transparent() {
        let err: DomError = DriverError::PageClosed.into();
        assert_eq!(err.to_string(), DriverError::PageClosed.to_string());
        assert!(!err.is_timeout());
    }
}
