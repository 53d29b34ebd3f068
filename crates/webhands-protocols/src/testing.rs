//! In-memory fakes of the browser driver traits.
//!
//! `FakePage` answers queries from tables the test registers up front:
//! selector and XPath matches per search context, iframe/shadow-root links,
//! and handlers keyed by the exact script text passed to `evaluate` /
//! `evaluate_on`. Unregistered scripts evaluate to `null`. Every query and
//! interaction is appended to a call log tests can assert on.
//!
//! Handles behave like remote objects: once released, singly or through
//! `release_handles`, using them fails with `StaleHandle` until a query
//! hands them out again.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use crate::cookie::Cookie;
use crate::driver::{BrowserDriver, ElementHandle, PageDriver, SearchContext};
use crate::error::DriverError;
use crate::telemetry::{Telemetry, TelemetryEvent};

/// Handler for page-level scripts.
pub type ScriptHandler = Arc<dyn Fn(&[Value]) -> Result<Value, DriverError> + Send + Sync>;

/// Handler for scripts evaluated against an element.
pub type ElementScriptHandler =
    Arc<dyn Fn(&ElementHandle, &[Value]) -> Result<Value, DriverError> + Send + Sync>;

/// Side effect run after an element is clicked.
pub type ClickHook = Arc<dyn Fn() + Send + Sync>;

#[derive(Default)]
struct FakePageState {
    url: String,
    title: String,
    html: String,
    selectors: HashMap<(SearchContext, String), Vec<ElementHandle>>,
    invalid_selectors: Vec<String>,
    xpaths: HashMap<(SearchContext, String), Vec<ElementHandle>>,
    frames: HashMap<ElementHandle, SearchContext>,
    shadow_roots: HashMap<ElementHandle, SearchContext>,
    click_navigations: HashMap<ElementHandle, String>,
    click_hooks: HashMap<ElementHandle, ClickHook>,
    scripts: HashMap<String, ScriptHandler>,
    element_scripts: HashMap<String, ElementScriptHandler>,
    fail_scroll: bool,
    handed_out: HashSet<ElementHandle>,
    released: HashSet<ElementHandle>,
    group_releases: usize,
    closed: bool,
    log: Vec<String>,
    clicks: Vec<ElementHandle>,
    fills: Vec<(ElementHandle, String)>,
    keys: Vec<String>,
}

impl FakePageState {
    fn hand_out(&mut self, handles: &[ElementHandle]) {
        for handle in handles {
            self.released.remove(handle);
            self.handed_out.insert(handle.clone());
        }
    }
}

/// Scriptable in-memory page.
#[derive(Default)]
pub struct FakePage {
    state: Mutex<FakePageState>,
}

impl FakePage {
    pub fn new(url: impl Into<String>) -> Self {
        let page = Self::default();
        page.state.lock().url = url.into();
        page
    }

    pub fn set_url(&self, url: impl Into<String>) {
        self.state.lock().url = url.into();
    }

    pub fn set_title(&self, title: impl Into<String>) {
        self.state.lock().title = title.into();
    }

    pub fn set_html(&self, html: impl Into<String>) {
        self.state.lock().html = html.into();
    }

    /// Make `selector` match `handles` inside `context`.
    pub fn register_selector(
        &self,
        context: SearchContext,
        selector: impl Into<String>,
        handles: Vec<ElementHandle>,
    ) {
        self.state
            .lock()
            .selectors
            .insert((context, selector.into()), handles);
    }

    pub fn unregister_selector(&self, context: &SearchContext, selector: &str) {
        self.state
            .lock()
            .selectors
            .remove(&(context.clone(), selector.to_string()));
    }

    /// Make queries for `selector` fail as a syntax error.
    pub fn register_invalid_selector(&self, selector: impl Into<String>) {
        self.state.lock().invalid_selectors.push(selector.into());
    }

    pub fn register_xpath(
        &self,
        context: SearchContext,
        xpath: impl Into<String>,
        handle: ElementHandle,
    ) {
        self.register_xpath_all(context, xpath, vec![handle]);
    }

    /// Make `xpath` match every one of `handles`, in order.
    pub fn register_xpath_all(
        &self,
        context: SearchContext,
        xpath: impl Into<String>,
        handles: Vec<ElementHandle>,
    ) {
        self.state
            .lock()
            .xpaths
            .insert((context, xpath.into()), handles);
    }

    pub fn set_content_frame(&self, iframe: ElementHandle, context: SearchContext) {
        self.state.lock().frames.insert(iframe, context);
    }

    pub fn set_shadow_root(&self, host: ElementHandle, context: SearchContext) {
        self.state.lock().shadow_roots.insert(host, context);
    }

    /// Navigate to `url` when `handle` is clicked.
    pub fn navigate_on_click(&self, handle: ElementHandle, url: impl Into<String>) {
        self.state
            .lock()
            .click_navigations
            .insert(handle, url.into());
    }

    /// Run `hook` after `handle` is clicked, e.g. to open a popup page.
    pub fn on_click<F>(&self, handle: ElementHandle, hook: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.state.lock().click_hooks.insert(handle, Arc::new(hook));
    }

    pub fn fail_scroll(&self, fail: bool) {
        self.state.lock().fail_scroll = fail;
    }

    /// Answer `evaluate(function, ..)` with `handler`.
    pub fn on_script<F>(&self, function: &str, handler: F)
    where
        F: Fn(&[Value]) -> Result<Value, DriverError> + Send + Sync + 'static,
    {
        self.state
            .lock()
            .scripts
            .insert(function.to_string(), Arc::new(handler));
    }

    /// Answer `evaluate_on(handle, function, ..)` with `handler`.
    pub fn on_element_script<F>(&self, function: &str, handler: F)
    where
        F: Fn(&ElementHandle, &[Value]) -> Result<Value, DriverError> + Send + Sync + 'static,
    {
        self.state
            .lock()
            .element_scripts
            .insert(function.to_string(), Arc::new(handler));
    }

    /// Queries, evaluations and interactions in call order.
    pub fn call_log(&self) -> Vec<String> {
        self.state.lock().log.clone()
    }

    pub fn clicks(&self) -> Vec<ElementHandle> {
        self.state.lock().clicks.clone()
    }

    pub fn fills(&self) -> Vec<(ElementHandle, String)> {
        self.state.lock().fills.clone()
    }

    pub fn pressed_keys(&self) -> Vec<String> {
        self.state.lock().keys.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    pub fn is_released(&self, handle: &ElementHandle) -> bool {
        self.state.lock().released.contains(handle)
    }

    /// Number of `release_handles` calls.
    pub fn group_releases(&self) -> usize {
        self.state.lock().group_releases
    }

    fn check_live(&self, handle: &ElementHandle) -> Result<(), DriverError> {
        if self.state.lock().released.contains(handle) {
            return Err(DriverError::StaleHandle(format!("{} was released", handle)));
        }
        Ok(())
    }

    fn check_context(&self, context: &SearchContext) -> Result<(), DriverError> {
        match context {
            SearchContext::Root(handle) => self.check_live(handle),
            SearchContext::Document => Ok(()),
        }
    }

    fn check_selector(&self, selector: &str) -> Result<(), DriverError> {
        if self
            .state
            .lock()
            .invalid_selectors
            .iter()
            .any(|s| s == selector)
        {
            return Err(DriverError::invalid_selector(selector, "rejected by fake page"));
        }
        Ok(())
    }
}

#[async_trait]
impl PageDriver for FakePage {
    async fn evaluate(&self, function: &str, args: Vec<Value>) -> Result<Value, DriverError> {
        let handler = {
            let mut state = self.state.lock();
            state.log.push(format!("evaluate:{}", function.len()));
            state.scripts.get(function).cloned()
        };
        match handler {
            Some(handler) => handler(&args),
            None => Ok(Value::Null),
        }
    }

    async fn evaluate_on(
        &self,
        handle: &ElementHandle,
        function: &str,
        args: Vec<Value>,
    ) -> Result<Value, DriverError> {
        self.check_live(handle)?;
        let handler = {
            let mut state = self.state.lock();
            state.log.push(format!("evaluate_on:{}", handle));
            state.element_scripts.get(function).cloned()
        };
        match handler {
            Some(handler) => handler(handle, &args),
            None => Ok(Value::Null),
        }
    }

    async fn query_selector(
        &self,
        context: &SearchContext,
        selector: &str,
    ) -> Result<Option<ElementHandle>, DriverError> {
        self.check_selector(selector)?;
        self.check_context(context)?;
        let mut state = self.state.lock();
        state.log.push(format!("css:{}", selector));
        let found = state
            .selectors
            .get(&(context.clone(), selector.to_string()))
            .and_then(|handles| handles.first().cloned());
        state.hand_out(found.as_slice());
        Ok(found)
    }

    async fn query_selector_all(
        &self,
        context: &SearchContext,
        selector: &str,
    ) -> Result<Vec<ElementHandle>, DriverError> {
        self.check_selector(selector)?;
        self.check_context(context)?;
        let mut state = self.state.lock();
        state.log.push(format!("css_all:{}", selector));
        let found = state
            .selectors
            .get(&(context.clone(), selector.to_string()))
            .cloned()
            .unwrap_or_default();
        state.hand_out(&found);
        Ok(found)
    }

    async fn query_xpath(
        &self,
        context: &SearchContext,
        xpath: &str,
    ) -> Result<Option<ElementHandle>, DriverError> {
        self.check_context(context)?;
        let mut state = self.state.lock();
        state.log.push(format!("xpath:{}", xpath));
        let found = state
            .xpaths
            .get(&(context.clone(), xpath.to_string()))
            .and_then(|handles| handles.first().cloned());
        state.hand_out(found.as_slice());
        Ok(found)
    }

    async fn query_xpath_all(
        &self,
        context: &SearchContext,
        xpath: &str,
    ) -> Result<Vec<ElementHandle>, DriverError> {
        self.check_context(context)?;
        let mut state = self.state.lock();
        state.log.push(format!("xpath_all:{}", xpath));
        let found = state
            .xpaths
            .get(&(context.clone(), xpath.to_string()))
            .cloned()
            .unwrap_or_default();
        state.hand_out(&found);
        Ok(found)
    }

    async fn content_frame(
        &self,
        handle: &ElementHandle,
    ) -> Result<Option<SearchContext>, DriverError> {
        self.check_live(handle)?;
        let mut state = self.state.lock();
        let frame = state.frames.get(handle).cloned();
        if let Some(SearchContext::Root(root)) = &frame {
            state.hand_out(std::slice::from_ref(root));
        }
        Ok(frame)
    }

    async fn shadow_root(
        &self,
        handle: &ElementHandle,
    ) -> Result<Option<SearchContext>, DriverError> {
        self.check_live(handle)?;
        let mut state = self.state.lock();
        let root = state.shadow_roots.get(handle).cloned();
        if let Some(SearchContext::Root(inner)) = &root {
            state.hand_out(std::slice::from_ref(inner));
        }
        Ok(root)
    }

    async fn scroll_into_view_if_needed(&self, handle: &ElementHandle) -> Result<(), DriverError> {
        self.check_live(handle)?;
        let mut state = self.state.lock();
        state.log.push(format!("scroll:{}", handle));
        if state.fail_scroll {
            return Err(DriverError::JavaScript("element is not scrollable".to_string()));
        }
        Ok(())
    }

    async fn click(&self, handle: &ElementHandle) -> Result<(), DriverError> {
        self.check_live(handle)?;
        let hook = {
            let mut state = self.state.lock();
            state.log.push(format!("click:{}", handle));
            state.clicks.push(handle.clone());
            if let Some(url) = state.click_navigations.get(handle).cloned() {
                state.url = url;
            }
            state.click_hooks.get(handle).cloned()
        };
        if let Some(hook) = hook {
            hook();
        }
        Ok(())
    }

    async fn fill(&self, handle: &ElementHandle, text: &str) -> Result<(), DriverError> {
        self.check_live(handle)?;
        let mut state = self.state.lock();
        state.log.push(format!("fill:{}", handle));
        state.fills.push((handle.clone(), text.to_string()));
        Ok(())
    }

    async fn goto(&self, url: &str) -> Result<(), DriverError> {
        let mut state = self.state.lock();
        state.log.push(format!("goto:{}", url));
        state.url = url.to_string();
        Ok(())
    }

    async fn go_back(&self) -> Result<(), DriverError> {
        self.state.lock().log.push("go_back".to_string());
        Ok(())
    }

    async fn wait_for_load_state(&self, _timeout: Duration) -> Result<(), DriverError> {
        Ok(())
    }

    async fn url(&self) -> Result<String, DriverError> {
        Ok(self.state.lock().url.clone())
    }

    async fn title(&self) -> Result<String, DriverError> {
        Ok(self.state.lock().title.clone())
    }

    async fn content(&self) -> Result<String, DriverError> {
        Ok(self.state.lock().html.clone())
    }

    async fn screenshot(&self, _full_page: bool) -> Result<String, DriverError> {
        Ok("iVBORw0KGgo=".to_string())
    }

    async fn press_key(&self, key: &str) -> Result<(), DriverError> {
        let mut state = self.state.lock();
        state.log.push(format!("key:{}", key));
        state.keys.push(key.to_string());
        Ok(())
    }

    async fn release(&self, handle: &ElementHandle) -> Result<(), DriverError> {
        let mut state = self.state.lock();
        state.log.push(format!("release:{}", handle));
        state.handed_out.remove(handle);
        state.released.insert(handle.clone());
        Ok(())
    }

    async fn release_handles(&self) -> Result<(), DriverError> {
        let mut state = self.state.lock();
        state.log.push("release_handles".to_string());
        state.group_releases += 1;
        let handed_out: Vec<ElementHandle> = state.handed_out.drain().collect();
        state.released.extend(handed_out);
        Ok(())
    }

    async fn close(&self) -> Result<(), DriverError> {
        self.state.lock().closed = true;
        Ok(())
    }
}

/// In-memory browser context holding [`FakePage`]s and a cookie list.
#[derive(Default)]
pub struct FakeBrowser {
    pages: Mutex<Vec<Arc<FakePage>>>,
    cookies: Mutex<Vec<Cookie>>,
    closed: Mutex<bool>,
}

impl FakeBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Browser that already has `page` open.
    pub fn with_page(page: Arc<FakePage>) -> Self {
        let browser = Self::default();
        browser.pages.lock().push(page);
        browser
    }

    /// Simulate a page opened by the site itself (e.g. `target=_blank`).
    pub fn push_page(&self, page: Arc<FakePage>) {
        self.pages.lock().push(page);
    }

    pub fn fake_pages(&self) -> Vec<Arc<FakePage>> {
        self.pages.lock().clone()
    }

    pub fn stored_cookies(&self) -> Vec<Cookie> {
        self.cookies.lock().clone()
    }

    pub fn is_closed(&self) -> bool {
        *self.closed.lock()
    }
}

#[async_trait]
impl BrowserDriver for FakeBrowser {
    async fn new_page(&self, url: Option<&str>) -> Result<Arc<dyn PageDriver>, DriverError> {
        let page = Arc::new(FakePage::new(url.unwrap_or("about:blank")));
        self.pages.lock().push(page.clone());
        Ok(page)
    }

    async fn pages(&self) -> Result<Vec<Arc<dyn PageDriver>>, DriverError> {
        Ok(self
            .pages
            .lock()
            .iter()
            .filter(|p| !p.is_closed())
            .map(|p| p.clone() as Arc<dyn PageDriver>)
            .collect())
    }

    async fn cookies(&self) -> Result<Vec<Cookie>, DriverError> {
        Ok(self.cookies.lock().clone())
    }

    async fn add_cookies(&self, cookies: &[Cookie]) -> Result<(), DriverError> {
        self.cookies.lock().extend_from_slice(cookies);
        Ok(())
    }

    async fn clear_cookies(&self) -> Result<(), DriverError> {
        self.cookies.lock().clear();
        Ok(())
    }

    async fn close(&self) -> Result<(), DriverError> {
        *self.closed.lock() = true;
        Ok(())
    }
}

/// Telemetry sink that keeps every event for assertions.
#[derive(Default)]
pub struct RecordingTelemetry {
    events: Mutex<Vec<TelemetryEvent>>,
}

impl RecordingTelemetry {
    pub fn events(&self) -> Vec<TelemetryEvent> {
        self.events.lock().clone()
    }
}

impl Telemetry for RecordingTelemetry {
    fn capture(&self, event: TelemetryEvent) {
        self.events.lock().push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_registered_selector_matches_only_in_its_context() {
        let page = FakePage::new("https://example.com");
        let handle = ElementHandle::new("btn");
        page.register_selector(SearchContext::Document, "#go", vec![handle.clone()]);

        let found = page
            .query_selector(&SearchContext::Document, "#go")
            .await
            .unwrap();
        assert_eq!(found, Some(handle));

        let frame = SearchContext::Root(ElementHandle::new("frame-doc"));
        assert!(page.query_selector(&frame, "#go").await.unwrap().is_none());
        assert_eq!(page.call_log(), vec!["css:#go", "css:#go"]);
    }

    #[tokio::test]
    async fn test_click_navigation() {
        let page = FakePage::new("https://example.com");
        let handle = ElementHandle::new("link");
        page.navigate_on_click(handle.clone(), "https://example.com/next");
        page.click(&handle).await.unwrap();
        assert_eq!(page.url().await.unwrap(), "https://example.com/next");
        assert_eq!(page.clicks(), vec![handle]);
    }

    #[tokio::test]
    async fn test_browser_pages_skip_closed() {
        let browser = FakeBrowser::new();
        let first = browser.new_page(Some("https://a.test")).await.unwrap();
        browser.new_page(None).await.unwrap();
        first.close().await.unwrap();
        assert_eq!(browser.pages().await.unwrap().len(), 1);
    }
}
