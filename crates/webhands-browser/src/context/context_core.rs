//! BrowserContext core: session lifecycle, snapshots and index lookup.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use webhands_dom::{
    DomHistoryElement, DomService, DomServiceConfig, DomState, DomTree, ElementNode,
    HistoryTreeProcessor, NodeId,
};
use webhands_protocols::{
    BrowserDriver, ElementHandle, PageDriver, Telemetry, TelemetryEvent,
};

use super::{BrowserContextConfig, BrowserError, BrowserResult, BrowserState};
use crate::cookies;

pub(super) const IS_CONNECTED_JS: &str = "function () { return this.isConnected; }";

pub(super) const JS_CLICK: &str = "function () { this.click(); }";

/// Live session of a ready context.
pub(super) struct BrowserSession {
    pub(super) page: Arc<dyn PageDriver>,
    pub(super) dom: Arc<DomService>,
    pub(super) cached_state: Option<BrowserState>,
    /// Index entries re-matched against a fresh snapshot during retries.
    pub(super) refreshed: HashMap<usize, (Arc<DomState>, NodeId)>,
}

/// Owns the browser session and the cached selector map across actions.
pub struct BrowserContext {
    pub(super) browser: Arc<dyn BrowserDriver>,
    pub(super) config: BrowserContextConfig,
    pub(super) telemetry: Arc<dyn Telemetry>,
    pub(super) session: RwLock<Option<BrowserSession>>,
}

impl BrowserContext {
    pub fn new(
        browser: Arc<dyn BrowserDriver>,
        config: BrowserContextConfig,
        telemetry: Arc<dyn Telemetry>,
    ) -> Self {
        Self {
            browser,
            config,
            telemetry,
            session: RwLock::new(None),
        }
    }

    pub fn config(&self) -> &BrowserContextConfig {
        &self.config
    }

    pub async fn is_initialized(&self) -> bool {
        self.session.read().await.is_some()
    }

    pub(super) fn dom_service(&self, page: Arc<dyn PageDriver>) -> Arc<DomService> {
        Arc::new(DomService::with_config(
            page,
            DomServiceConfig {
                poll_interval: self.config.poll_interval,
            },
        ))
    }

    /// Attach to the most recent page (or open one) and load the cookie jar.
    pub async fn init(&self) -> BrowserResult<()> {
        if self.session.read().await.is_some() {
            return Ok(());
        }

        if let Some(path) = &self.config.cookies_file {
            match cookies::load(path).await {
                Ok(jar) if !jar.is_empty() => {
                    self.browser.add_cookies(&jar).await?;
                    info!("Loaded {} cookies from {}", jar.len(), path.display());
                }
                Ok(_) => {}
                Err(e) => warn!("Failed to load cookies from {}: {}", path.display(), e),
            }
        }

        let page = match self.browser.pages().await?.pop() {
            Some(page) => page,
            None => self.browser.new_page(None).await?,
        };

        let mut session = self.session.write().await;
        if session.is_none() {
            *session = Some(BrowserSession {
                dom: self.dom_service(page.clone()),
                page,
                cached_state: None,
                refreshed: HashMap::new(),
            });
            debug!("Browser context initialized");
        }
        Ok(())
    }

    /// Current page and DOM service, initializing the context if needed.
    pub(super) async fn session_parts(&self) -> BrowserResult<(Arc<dyn PageDriver>, Arc<DomService>)> {
        self.init().await?;
        let session = self.session.read().await;
        let session = session.as_ref().ok_or(BrowserError::NotInitialized)?;
        Ok((session.page.clone(), session.dom.clone()))
    }

    /// Current page without initializing.
    pub async fn current_page(&self) -> BrowserResult<Arc<dyn PageDriver>> {
        let session = self.session.read().await;
        session
            .as_ref()
            .map(|s| s.page.clone())
            .ok_or(BrowserError::NotInitialized)
    }

    /// Wait for the document to load, then at least the configured minimum.
    pub(super) async fn wait_for_page_load(&self, page: &dyn PageDriver) {
        let started = Instant::now();
        if let Err(e) = page
            .wait_for_load_state(self.config.maximum_wait_page_load)
            .await
        {
            debug!("Page load wait ended early: {}", e);
        }
        let elapsed = started.elapsed();
        if elapsed < self.config.minimum_wait_page_load {
            tokio::time::sleep(self.config.minimum_wait_page_load - elapsed).await;
        }
    }

    /// Snapshot the current tab and replace the cached state.
    pub async fn get_state(&self, use_vision: bool) -> BrowserResult<BrowserState> {
        let (page, dom) = self.session_parts().await?;
        self.wait_for_page_load(page.as_ref()).await;

        let dom_state = dom.get_state(&self.config.build_options()).await?;
        let url = page.url().await?;
        let title = page.title().await?;
        let tabs = self.tabs_info().await?;
        let screenshot = if use_vision {
            Some(page.screenshot(false).await?)
        } else {
            None
        };

        let state = BrowserState {
            url: url.clone(),
            title,
            tabs,
            dom: dom_state,
            screenshot,
        };

        self.telemetry.capture(TelemetryEvent::SnapshotTaken {
            url,
            interactive_elements: state.dom.selector_map.len(),
        });

        if let Some(session) = self.session.write().await.as_mut() {
            session.cached_state = Some(state.clone());
            session.refreshed.clear();
        }
        Ok(state)
    }

    pub async fn cached_state(&self) -> Option<BrowserState> {
        self.session
            .read()
            .await
            .as_ref()
            .and_then(|s| s.cached_state.clone())
    }

    /// Snapshot and node for `index` in the cached map, honoring entries
    /// refreshed during retries.
    pub async fn cached_node(&self, index: usize) -> Option<(Arc<DomState>, NodeId)> {
        let session = self.session.read().await;
        let session = session.as_ref()?;
        if let Some((state, id)) = session.refreshed.get(&index) {
            return Some((state.clone(), *id));
        }
        let state = &session.cached_state.as_ref()?.dom;
        let id = state.selector_map.get(&index)?;
        Some((state.clone(), *id))
    }

    /// Node behind `index` in the cached map.
    pub async fn get_dom_element_by_index(&self, index: usize) -> Option<ElementNode> {
        let (state, id) = self.cached_node(index).await?;
        state.tree.element(id).cloned()
    }

    /// Branch-path hashes over the cached selector map.
    pub async fn cached_path_hashes(&self) -> HashSet<String> {
        self.session
            .read()
            .await
            .as_ref()
            .and_then(|s| s.cached_state.as_ref())
            .map(|state| state.dom.path_hashes())
            .unwrap_or_default()
    }

    async fn is_connected(&self, page: &dyn PageDriver, handle: &ElementHandle) -> BrowserResult<bool> {
        let value = page.evaluate_on(handle, IS_CONNECTED_JS, vec![]).await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    /// Live handle for `index` of the cached map.
    ///
    /// Resolution is retried up to `max_attempts` times. A handle that is no
    /// longer attached to the document counts as a failure. Between attempts,
    /// if the URL has not changed, the entry is re-matched by content hash
    /// against a fresh snapshot.
    pub async fn get_element_by_index(&self, index: usize) -> BrowserResult<ElementHandle> {
        let (mut state, mut id) = self
            .cached_node(index)
            .await
            .ok_or(BrowserError::NoElementAtIndex(index))?;
        let (page, dom) = self.session_parts().await?;
        let cached_url = self.cached_state().await.map(|s| s.url);

        let attempts = self.config.max_attempts.max(1);
        let mut last_error = String::new();
        for attempt in 1..=attempts {
            match dom.resolve(&state.tree, id).await {
                Ok(Some(resolved)) => match self.is_connected(page.as_ref(), &resolved.handle).await {
                    Ok(true) => return Ok(resolved.handle),
                    Ok(false) => last_error = BrowserError::Detached.to_string(),
                    Err(e) => last_error = e.to_string(),
                },
                Ok(None) => {
                    last_error = BrowserError::ElementNotFound(describe(&state.tree, id)).to_string()
                }
                Err(e) => last_error = e.to_string(),
            }
            warn!(index, attempt, "Element lookup failed: {}", last_error);

            if attempt == attempts {
                break;
            }
            tokio::time::sleep(self.config.retry_delay).await;

            let url_unchanged = match page.url().await {
                Ok(url) => cached_url.as_deref() == Some(url.as_str()),
                Err(_) => false,
            };
            if url_unchanged {
                if let Some(refreshed) = self.refresh_entry(index, &state, id, &dom).await {
                    (state, id) = refreshed;
                }
            }
        }

        Err(BrowserError::ResolutionExhausted {
            index,
            attempts,
            last_error,
        })
    }

    /// Re-match one entry against a fresh snapshot without replacing the
    /// cached map.
    async fn refresh_entry(
        &self,
        index: usize,
        state: &DomState,
        id: NodeId,
        dom: &DomService,
    ) -> Option<(Arc<DomState>, NodeId)> {
        let history = DomHistoryElement::from_node(&state.tree, id)?;
        let fresh = match dom.get_state(&self.config.build_options()).await {
            Ok(fresh) => fresh,
            Err(e) => {
                debug!("Refresh snapshot failed: {}", e);
                return None;
            }
        };
        let found = HistoryTreeProcessor::find_history_element_in_tree(&history, &fresh.tree)?;
        debug!(index, "Refreshed cache entry from fresh snapshot");
        if let Some(session) = self.session.write().await.as_mut() {
            session.refreshed.insert(index, (fresh.clone(), found));
        }
        Some((fresh, found))
    }

    /// Click with a pointer event, falling back to a DOM `click()`. Returns
    /// the id of a tab the click opened, after switching to it.
    pub(super) async fn click_handle(&self, page: &dyn PageDriver, handle: &ElementHandle) -> BrowserResult<Option<usize>> {
        let tabs_before = self.browser.pages().await?.len();
        if let Err(e) = page.click(handle).await {
            debug!("Pointer click failed, using DOM click: {}", e);
            page.evaluate_on(handle, JS_CLICK, vec![]).await?;
        }
        self.wait_for_page_load(page).await;

        let pages = self.browser.pages().await?;
        if pages.len() > tabs_before {
            let new_tab = pages.len() - 1;
            info!("Click opened a new tab, switching to it");
            self.switch_to_tab(new_tab).await?;
            return Ok(Some(new_tab));
        }
        Ok(None)
    }

    /// Resolve `id` of `tree` and click it.
    pub async fn click_element_node(&self, tree: &DomTree, id: NodeId) -> BrowserResult<Option<usize>> {
        let (page, dom) = self.session_parts().await?;
        let resolved = dom
            .resolve(tree, id)
            .await?
            .ok_or_else(|| BrowserError::ElementNotFound(describe(tree, id)))?;
        self.click_handle(page.as_ref(), &resolved.handle).await
    }

    /// Resolve `id` of `tree` and replace its value with `text`.
    pub async fn input_text_element_node(&self, tree: &DomTree, id: NodeId, text: &str) -> BrowserResult<()> {
        let (page, dom) = self.session_parts().await?;
        let resolved = dom
            .resolve(tree, id)
            .await?
            .ok_or_else(|| BrowserError::ElementNotFound(describe(tree, id)))?;
        page.fill(&resolved.handle, text).await?;
        Ok(())
    }

    /// Click the element at `index` of the cached map.
    pub async fn click_element_by_index(&self, index: usize) -> BrowserResult<Option<usize>> {
        let handle = self.get_element_by_index(index).await?;
        let (page, _) = self.session_parts().await?;
        self.click_handle(page.as_ref(), &handle).await
    }

    /// Type into the element at `index` of the cached map.
    pub async fn input_text_by_index(&self, index: usize, text: &str) -> BrowserResult<()> {
        let handle = self.get_element_by_index(index).await?;
        let (page, _) = self.session_parts().await?;
        page.fill(&handle, text).await?;
        Ok(())
    }

    /// Persist cookies, release the DOM service and drop the session.
    pub async fn close(&self) -> BrowserResult<()> {
        let Some(session) = self.session.write().await.take() else {
            return Ok(());
        };

        if let Some(path) = &self.config.cookies_file {
            match self.browser.cookies().await {
                Ok(jar) => {
                    if let Err(e) = cookies::save(path, &jar).await {
                        warn!("Failed to save cookies to {}: {}", path.display(), e);
                    }
                }
                Err(e) => warn!("Failed to read cookies: {}", e),
            }
        }

        session.dom.cleanup().await;
        if let Err(e) = self.browser.close().await {
            warn!("Failed to close browser: {}", e);
        }
        info!("Browser context closed");
        Ok(())
    }
}

fn describe(tree: &DomTree, id: NodeId) -> String {
    match tree.element(id) {
        Some(element) => format!("<{}> at {}", element.tag_name, element.xpath),
        None => format!("node {}", id.0),
    }
}
