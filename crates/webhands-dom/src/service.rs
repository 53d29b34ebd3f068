//! DOM service: composition root of the DOM core for one page.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::Value;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use webhands_protocols::{ElementHandle, PageDriver};

use crate::error::{DomError, DomResult};
use crate::locate::query_all;
use crate::node::{DomTree, NodeId};
use crate::observer::{
    DEFAULT_POLL_INTERVAL, HandlerId, MutationEvent, MutationObserverBridge, MutationSubscription,
};
use crate::resolver::{ElementResolver, ResolvedElement};
use crate::snapshot::{BuildOptions, DomState, SnapshotBuilder};

/// Depth `is_file_uploader` descends to by default.
pub const DEFAULT_FILE_UPLOADER_DEPTH: usize = 3;

const FIND_POLL_INTERVAL: Duration = Duration::from_millis(100);

pub const IS_VISIBLE_JS: &str = r#"function () {
    const style = window.getComputedStyle(this);
    if (style.display === 'none' || style.visibility === 'hidden' || parseFloat(style.opacity) === 0) {
        return false;
    }
    const rect = this.getBoundingClientRect();
    return rect.width > 0 && rect.height > 0;
}"#;

pub const IS_ENABLED_JS: &str = r#"function () {
    if (this.disabled || this.getAttribute('aria-disabled') === 'true') {
        return false;
    }
    return window.getComputedStyle(this).pointerEvents !== 'none';
}"#;

/// Options for [`DomService::find_element`].
#[derive(Debug, Clone)]
pub struct FindOptions {
    pub wait_for_visible: bool,
    pub wait_for_enabled: bool,
    pub timeout: Duration,
    /// Accept hidden elements, overriding `wait_for_visible`.
    pub include_hidden: bool,
}

impl Default for FindOptions {
    fn default() -> Self {
        Self {
            wait_for_visible: true,
            wait_for_enabled: true,
            timeout: Duration::from_secs(5),
            include_hidden: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DomServiceConfig {
    pub poll_interval: Duration,
}

impl Default for DomServiceConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

pub struct DomService {
    page: Mutex<Option<Arc<dyn PageDriver>>>,
    observer: MutationObserverBridge,
    last_state: Mutex<Option<Arc<DomState>>>,
}

impl DomService {
    pub fn new(page: Arc<dyn PageDriver>) -> Self {
        Self::with_config(page, DomServiceConfig::default())
    }

    pub fn with_config(page: Arc<dyn PageDriver>, config: DomServiceConfig) -> Self {
        Self {
            observer: MutationObserverBridge::with_poll_interval(page.clone(), config.poll_interval),
            page: Mutex::new(Some(page)),
            last_state: Mutex::new(None),
        }
    }

    fn page(&self) -> DomResult<Arc<dyn PageDriver>> {
        self.page.lock().clone().ok_or(DomError::Released)
    }

    pub fn observer(&self) -> &MutationObserverBridge {
        &self.observer
    }

    /// Snapshot the page, replacing the previous state. Handles returned
    /// before the snapshot are released and must not be used afterwards.
    pub async fn get_state(&self, options: &BuildOptions) -> DomResult<Arc<DomState>> {
        let page = self.page()?;
        release_handles(page.as_ref()).await;
        let builder = SnapshotBuilder::new(page);
        builder.remove_highlights().await;
        let state = Arc::new(builder.build(None, options).await?);
        *self.last_state.lock() = Some(state.clone());
        Ok(state)
    }

    pub fn last_state(&self) -> Option<Arc<DomState>> {
        self.last_state.lock().clone()
    }

    /// First element matching a CSS selector or XPath that satisfies the
    /// options, polling until the timeout. `Ok(None)` when nothing qualifies
    /// in time; malformed selectors are errors.
    pub async fn find_element(
        &self,
        selector: &str,
        options: &FindOptions,
    ) -> DomResult<Option<ElementHandle>> {
        Ok(self
            .find_matching(selector, options, true)
            .await?
            .into_iter()
            .next())
    }

    /// Every qualifying element, polling until at least one qualifies or the
    /// timeout elapses.
    pub async fn find_elements(
        &self,
        selector: &str,
        options: &FindOptions,
    ) -> DomResult<Vec<ElementHandle>> {
        self.find_matching(selector, options, false).await
    }

    async fn find_matching(
        &self,
        selector: &str,
        options: &FindOptions,
        first_only: bool,
    ) -> DomResult<Vec<ElementHandle>> {
        let page = self.page()?;
        let require_visible = options.wait_for_visible && !options.include_hidden;
        let deadline = Instant::now() + options.timeout;

        loop {
            let mut matches = Vec::new();
            let mut rejected = Vec::new();
            for handle in query_all(page.as_ref(), selector).await? {
                let wanted = !(first_only && !matches.is_empty())
                    && self
                        .qualifies(page.as_ref(), &handle, require_visible, options.wait_for_enabled)
                        .await?;
                if wanted {
                    matches.push(handle);
                } else {
                    rejected.push(handle);
                }
            }
            for handle in &rejected {
                if let Err(e) = page.release(handle).await {
                    debug!("Failed to release unmatched handle: {}", e);
                }
            }
            if !matches.is_empty() {
                return Ok(matches);
            }

            let now = Instant::now();
            if now >= deadline {
                debug!(selector, "No qualifying element before timeout");
                return Ok(Vec::new());
            }
            tokio::time::sleep(FIND_POLL_INTERVAL.min(deadline - now)).await;
        }
    }

    async fn qualifies(
        &self,
        page: &dyn PageDriver,
        handle: &ElementHandle,
        require_visible: bool,
        require_enabled: bool,
    ) -> DomResult<bool> {
        if require_visible && !self.check(page, handle, IS_VISIBLE_JS).await? {
            return Ok(false);
        }
        if require_enabled && !self.check(page, handle, IS_ENABLED_JS).await? {
            return Ok(false);
        }
        Ok(true)
    }

    async fn check(
        &self,
        page: &dyn PageDriver,
        handle: &ElementHandle,
        function: &str,
    ) -> DomResult<bool> {
        let value = page.evaluate_on(handle, function, vec![]).await?;
        Ok(matches!(value, Value::Bool(true)))
    }

    pub async fn is_visible(&self, handle: &ElementHandle) -> DomResult<bool> {
        let page = self.page()?;
        self.check(page.as_ref(), handle, IS_VISIBLE_JS).await
    }

    pub async fn is_enabled(&self, handle: &ElementHandle) -> DomResult<bool> {
        let page = self.page()?;
        self.check(page.as_ref(), handle, IS_ENABLED_JS).await
    }

    /// Resolve index `index` of the last snapshot to a live handle.
    pub async fn get_element_by_index(&self, index: usize) -> DomResult<Option<ElementHandle>> {
        let Some(state) = self.last_state() else {
            return Ok(None);
        };
        let Some(id) = state.selector_map.get(&index).copied() else {
            return Ok(None);
        };
        Ok(self
            .resolve(&state.tree, id)
            .await?
            .map(|resolved| resolved.handle))
    }

    /// Resolve any node of a snapshot to a live handle.
    pub async fn resolve(&self, tree: &DomTree, id: NodeId) -> DomResult<Option<ResolvedElement>> {
        ElementResolver::new(self.page()?).resolve(tree, id).await
    }

    pub fn is_file_uploader(tree: &DomTree, id: NodeId) -> bool {
        tree.is_file_uploader(id, DEFAULT_FILE_UPLOADER_DEPTH)
    }

    /// Remove snapshot overlays. Never fails.
    pub async fn remove_highlights(&self) {
        if let Ok(page) = self.page() {
            SnapshotBuilder::new(page).remove_highlights().await;
        }
    }

    pub async fn start_observing(&self) -> DomResult<()> {
        self.observer.start_observing().await
    }

    pub async fn stop_observing(&self) {
        self.observer.stop_observing().await
    }

    pub fn subscribe(&self) -> DomResult<MutationSubscription> {
        self.observer.subscribe()
    }

    pub fn add_mutation_handler<F>(&self, handler: F) -> HandlerId
    where
        F: Fn(&MutationEvent) + Send + Sync + 'static,
    {
        self.observer.add_handler(handler)
    }

    pub fn remove_mutation_handler(&self, id: HandlerId) -> bool {
        self.observer.remove_handler(id)
    }

    pub async fn wait_for_element(
        &self,
        selector: &str,
        timeout: Duration,
    ) -> DomResult<ElementHandle> {
        self.page()?;
        self.observer.wait_for_element(selector, timeout).await
    }

    pub async fn wait_for_element_removal(&self, selector: &str, timeout: Duration) -> DomResult<()> {
        self.page()?;
        self.observer
            .wait_for_element_removal(selector, timeout)
            .await
    }

    pub async fn wait_for_attribute_change(
        &self,
        selector: &str,
        attribute: &str,
        timeout: Duration,
    ) -> DomResult<Option<String>> {
        self.page()?;
        self.observer
            .wait_for_attribute_change(selector, attribute, timeout)
            .await
    }

    /// Stop observing, drop handlers, remove overlays and release the page.
    /// Idempotent.
    pub async fn cleanup(&self) {
        if self.page.lock().is_none() {
            return;
        }
        self.observer.cleanup().await;
        self.remove_highlights().await;
        if let Ok(page) = self.page() {
            release_handles(page.as_ref()).await;
        }
        self.page.lock().take();
        self.last_state.lock().take();
        info!("DOM service released");
    }
}

async fn release_handles(page: &dyn PageDriver) {
    if let Err(e) = page.release_handles().await {
        warn!("Failed to release element handles: {}", e);
    }
}

#[cfg(test)]
#[path = "service_tests.rs"]
mod tests;
