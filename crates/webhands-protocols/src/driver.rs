//! Browser driver traits.
//!
//! The DOM core never talks to a browser engine directly. It consumes the
//! minimal surface below: page-level script evaluation and queries,
//! element-handle introspection, and context-level page/cookie management.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::cookie::Cookie;
use crate::error::DriverError;

/// Opaque reference to a live element inside a page.
///
/// For CDP backends this is a `Runtime.RemoteObjectId`. Handles are only
/// valid for the page that produced them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementHandle(pub String);

impl ElementHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ElementHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Scope a selector or XPath is evaluated in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum SearchContext {
    /// The top-level document of the page.
    #[default]
    Document,
    /// A document-like root reached through a handle: the content document of
    /// a same-origin iframe, or an open shadow root.
    Root(ElementHandle),
}

/// Page, frame and element-handle primitives.
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Evaluate a JavaScript function declaration with JSON arguments and
    /// return its JSON-serialized result.
    async fn evaluate(&self, function: &str, args: Vec<Value>) -> Result<Value, DriverError>;

    /// Call a function declaration with `this` bound to `handle`.
    async fn evaluate_on(
        &self,
        handle: &ElementHandle,
        function: &str,
        args: Vec<Value>,
    ) -> Result<Value, DriverError>;

    /// First element matching a CSS selector in `context`.
    async fn query_selector(
        &self,
        context: &SearchContext,
        selector: &str,
    ) -> Result<Option<ElementHandle>, DriverError>;

    /// All elements matching a CSS selector in `context`, in document order.
    async fn query_selector_all(
        &self,
        context: &SearchContext,
        selector: &str,
    ) -> Result<Vec<ElementHandle>, DriverError>;

    /// First element matching an XPath expression in `context`.
    async fn query_xpath(
        &self,
        context: &SearchContext,
        xpath: &str,
    ) -> Result<Option<ElementHandle>, DriverError>;

    /// All elements matching an XPath expression in `context`, in document
    /// order.
    async fn query_xpath_all(
        &self,
        context: &SearchContext,
        xpath: &str,
    ) -> Result<Vec<ElementHandle>, DriverError>;

    /// Content document of an `<iframe>` handle. `None` when the frame is
    /// cross-origin or not loaded.
    async fn content_frame(
        &self,
        handle: &ElementHandle,
    ) -> Result<Option<SearchContext>, DriverError>;

    /// Open shadow root hosted by `handle`. Closed roots yield `None`.
    async fn shadow_root(&self, handle: &ElementHandle)
        -> Result<Option<SearchContext>, DriverError>;

    async fn scroll_into_view_if_needed(&self, handle: &ElementHandle) -> Result<(), DriverError>;

    /// Click the element with a real pointer event.
    async fn click(&self, handle: &ElementHandle) -> Result<(), DriverError>;

    /// Replace the element's value with `text`.
    async fn fill(&self, handle: &ElementHandle, text: &str) -> Result<(), DriverError>;

    async fn goto(&self, url: &str) -> Result<(), DriverError>;

    async fn go_back(&self) -> Result<(), DriverError>;

    /// Wait until the document reports it has loaded.
    async fn wait_for_load_state(&self, timeout: Duration) -> Result<(), DriverError>;

    async fn url(&self) -> Result<String, DriverError>;

    async fn title(&self) -> Result<String, DriverError>;

    /// Serialized HTML of the whole document.
    async fn content(&self) -> Result<String, DriverError>;

    /// Base64-encoded screenshot.
    async fn screenshot(&self, full_page: bool) -> Result<String, DriverError>;

    /// Press a key or a `+`-joined combination such as `Control+a`.
    async fn press_key(&self, key: &str) -> Result<(), DriverError>;

    /// Drop one handle. Using it afterwards fails with
    /// [`DriverError::StaleHandle`].
    async fn release(&self, handle: &ElementHandle) -> Result<(), DriverError>;

    /// Drop every handle this page has returned so far, including search
    /// roots from [`PageDriver::content_frame`] and [`PageDriver::shadow_root`].
    async fn release_handles(&self) -> Result<(), DriverError>;

    async fn close(&self) -> Result<(), DriverError>;
}

/// Context-level primitives.
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    /// Open a new page, optionally navigating it.
    async fn new_page(&self, url: Option<&str>) -> Result<Arc<dyn PageDriver>, DriverError>;

    /// Pages currently open in this context, oldest first.
    async fn pages(&self) -> Result<Vec<Arc<dyn PageDriver>>, DriverError>;

    async fn cookies(&self) -> Result<Vec<Cookie>, DriverError>;

    async fn add_cookies(&self, cookies: &[Cookie]) -> Result<(), DriverError>;

    async fn clear_cookies(&self) -> Result<(), DriverError>;

    async fn close(&self) -> Result<(), DriverError>;
}
