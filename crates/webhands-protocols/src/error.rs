//! Browser driver errors.

use thiserror::Error;

/// Errors surfaced by a [`PageDriver`](crate::PageDriver) or
/// [`BrowserDriver`](crate::BrowserDriver) implementation.
#[derive(Debug, Error)]
pub enum DriverError {
    /// The engine rejected a command.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// In-page script threw.
    #[error("JavaScript error: {0}")]
    JavaScript(String),

    /// CSS selector or XPath expression could not be parsed.
    #[error("Invalid selector '{selector}': {message}")]
    InvalidSelector { selector: String, message: String },

    /// The element handle was released or its document went away.
    #[error("Stale element handle: {0}")]
    StaleHandle(String),

    /// A driver call did not complete in time.
    #[error("Timeout: {0}")]
    Timeout(String),

    /// The page (or tab) backing this driver is gone.
    #[error("Page closed")]
    PageClosed,

    /// No browser connection.
    #[error("Browser not connected")]
    NotConnected,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DriverError {
    /// Build an [`DriverError::InvalidSelector`].
    pub fn invalid_selector(selector: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidSelector {
            selector: selector.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_selector_display() {
        let err = DriverError::invalid_selector("div[", "unterminated attribute");
        let display = err.to_string();
        assert!(display.contains("div["));
        assert!(display.contains("unterminated attribute"));
    }

    #[test]
    fn test_page_closed_display() {
        assert_eq!(DriverError::PageClosed.to_string(), "Page closed");
    }

    #[test]
    fn test_from_serde_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: DriverError = json_err.into();
        assert!(err.to_string().starts_with("Serialization error"));
    }
}
