//! BrowserContext tab management and navigation.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info};
use webhands_protocols::PageDriver;

use super::context_core::{BrowserContext, BrowserSession};
use super::{BrowserError, BrowserResult, TabInfo};

fn same_page(a: &Arc<dyn PageDriver>, b: &Arc<dyn PageDriver>) -> bool {
    std::ptr::eq(
        Arc::as_ptr(a) as *const (),
        Arc::as_ptr(b) as *const (),
    )
}

impl BrowserContext {
    /// Open tabs in creation order; `page_id` is the position.
    pub async fn tabs_info(&self) -> BrowserResult<Vec<TabInfo>> {
        let pages = self.browser.pages().await?;
        let mut tabs = Vec::with_capacity(pages.len());
        for (page_id, page) in pages.iter().enumerate() {
            tabs.push(TabInfo {
                page_id,
                url: page.url().await.unwrap_or_default(),
                title: page.title().await.unwrap_or_default(),
            });
        }
        Ok(tabs)
    }

    /// Position of the current page among the open tabs.
    pub async fn current_tab(&self) -> BrowserResult<usize> {
        let current = self.current_page().await?;
        let pages = self.browser.pages().await?;
        pages
            .iter()
            .position(|page| same_page(page, &current))
            .ok_or(BrowserError::NotInitialized)
    }

    /// Make `page` the current page with a fresh DOM service. The cached
    /// selector map belongs to the old page and is dropped.
    async fn attach(&self, page: Arc<dyn PageDriver>) {
        let previous = {
            let mut session = self.session.write().await;
            session.replace(BrowserSession {
                dom: self.dom_service(page.clone()),
                page,
                cached_state: None,
                refreshed: HashMap::new(),
            })
        };
        if let Some(previous) = previous {
            previous.dom.cleanup().await;
        }
    }

    pub async fn switch_to_tab(&self, page_id: usize) -> BrowserResult<()> {
        self.init().await?;
        let page = self
            .browser
            .pages()
            .await?
            .into_iter()
            .nth(page_id)
            .ok_or(BrowserError::TabNotFound(page_id))?;
        self.attach(page.clone()).await;
        self.wait_for_page_load(page.as_ref()).await;
        info!(page_id, "Switched tab");
        Ok(())
    }

    /// Open `url` in a new tab and switch to it. Returns the tab id.
    pub async fn create_new_tab(&self, url: Option<&str>) -> BrowserResult<usize> {
        self.init().await?;
        let page = self.browser.new_page(url).await?;
        self.attach(page.clone()).await;
        self.wait_for_page_load(page.as_ref()).await;
        let page_id = self.current_tab().await?;
        debug!(page_id, url = url.unwrap_or("about:blank"), "Opened new tab");
        Ok(page_id)
    }

    /// Close the current tab and switch to the most recent remaining one,
    /// opening a blank tab if none is left.
    pub async fn close_current_tab(&self) -> BrowserResult<()> {
        let page = self.current_page().await?;
        page.close().await?;
        let next = match self.browser.pages().await?.pop() {
            Some(next) => next,
            None => self.browser.new_page(None).await?,
        };
        self.attach(next).await;
        Ok(())
    }

    pub async fn navigate_to(&self, url: &str) -> BrowserResult<()> {
        let (page, _) = self.session_parts().await?;
        page.goto(url).await?;
        self.wait_for_page_load(page.as_ref()).await;
        Ok(())
    }

    pub async fn go_back(&self) -> BrowserResult<()> {
        let (page, _) = self.session_parts().await?;
        page.go_back().await?;
        self.wait_for_page_load(page.as_ref()).await;
        Ok(())
    }

    /// Base64 screenshot of the current tab.
    pub async fn take_screenshot(&self, full_page: bool) -> BrowserResult<String> {
        let (page, _) = self.session_parts().await?;
        Ok(page.screenshot(full_page).await?)
    }

    pub async fn page_html(&self) -> BrowserResult<String> {
        let (page, _) = self.session_parts().await?;
        Ok(page.content().await?)
    }

    pub async fn remove_highlights(&self) {
        if let Ok((_, dom)) = self.session_parts().await {
            dom.remove_highlights().await;
        }
    }
}
