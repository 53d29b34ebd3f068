//! Browser context type definitions and configuration.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use webhands_dom::{BuildOptions, DomError, DomState};
use webhands_protocols::DriverError;

/// Browser context errors.
#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("Browser context not initialized")]
    NotInitialized,

    #[error("No element found at index {0}")]
    NoElementAtIndex(usize),

    #[error("Failed to resolve element at index {index} after {attempts} attempts: {last_error}")]
    ResolutionExhausted {
        index: usize,
        attempts: u32,
        last_error: String,
    },

    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("Element is no longer attached to the document")]
    Detached,

    #[error("Tab not found: {0}")]
    TabNotFound(usize),

    #[error(transparent)]
    Dom(#[from] DomError),

    #[error(transparent)]
    Driver(#[from] DriverError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type BrowserResult<T> = Result<T, BrowserError>;

/// Browser context configuration.
#[derive(Debug, Clone)]
pub struct BrowserContextConfig {
    /// JSON cookie jar loaded on init and written on close.
    pub cookies_file: Option<PathBuf>,
    /// Minimum time to wait after navigation before snapshotting.
    pub minimum_wait_page_load: Duration,
    /// Upper bound for the document load wait.
    pub maximum_wait_page_load: Duration,
    pub highlight_elements: bool,
    pub viewport_expansion: i64,
    pub include_shadow_roots: bool,
    /// Mutation observer poll interval.
    pub poll_interval: Duration,
    /// Attempts of the index lookup before giving up.
    pub max_attempts: u32,
    pub retry_delay: Duration,
}

impl Default for BrowserContextConfig {
    fn default() -> Self {
        Self {
            cookies_file: None,
            minimum_wait_page_load: Duration::from_millis(250),
            maximum_wait_page_load: Duration::from_secs(5),
            highlight_elements: true,
            viewport_expansion: 500,
            include_shadow_roots: false,
            poll_interval: Duration::from_millis(100),
            max_attempts: 3,
            retry_delay: Duration::from_millis(500),
        }
    }
}

impl BrowserContextConfig {
    pub fn build_options(&self) -> BuildOptions {
        BuildOptions {
            highlight_elements: self.highlight_elements,
            focus_element: None,
            viewport_expansion: self.viewport_expansion,
            include_shadow_roots: self.include_shadow_roots,
        }
    }
}

/// One open tab.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TabInfo {
    pub page_id: usize,
    pub url: String,
    pub title: String,
}

/// Snapshot of the current tab as seen by the controller.
#[derive(Debug, Clone)]
pub struct BrowserState {
    pub url: String,
    pub title: String,
    pub tabs: Vec<TabInfo>,
    pub dom: Arc<DomState>,
    /// Base64 screenshot, when requested.
    pub screenshot: Option<String>,
}

impl BrowserState {
    /// `[index]<tag>text</tag>` listing of the indexed elements.
    pub fn clickable_elements_to_string(&self, include_attributes: &[&str]) -> String {
        self.dom.clickable_elements_to_string(include_attributes)
    }
}
