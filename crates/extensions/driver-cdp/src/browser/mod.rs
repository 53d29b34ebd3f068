//! [`BrowserDriver`] over a CDP browser connection.
//!
//! Connects to Chrome on its debug port, launching it with a persistent
//! profile when nothing is listening yet.

mod launcher;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::process::Child;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use webhands_protocols::{BrowserDriver, Cookie, DriverError, PageDriver};

use crate::cdp::{CdpClient, CdpError};
use crate::page::CdpPage;

pub use launcher::find_chrome;

/// Connection and launch settings.
#[derive(Debug, Clone)]
pub struct CdpBrowserConfig {
    pub debug_port: u16,
    pub headless: bool,
    /// Profile directory for persistent login state.
    /// Default: ~/.webhands/browser-profile
    pub profile_dir: Option<PathBuf>,
    /// Chrome executable; discovered when unset.
    pub chrome_path: Option<PathBuf>,
    pub viewport_width: u32,
    pub viewport_height: u32,
    /// Deadline for navigations issued through a page.
    pub load_timeout: Duration,
}

impl Default for CdpBrowserConfig {
    fn default() -> Self {
        Self {
            debug_port: 9222,
            headless: false,
            profile_dir: None,
            chrome_path: None,
            viewport_width: 1280,
            viewport_height: 720,
            load_timeout: Duration::from_secs(30),
        }
    }
}

impl CdpBrowserConfig {
    pub fn profile_dir(&self) -> PathBuf {
        self.profile_dir.clone().unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".webhands")
                .join("browser-profile")
        })
    }

    pub fn endpoint(&self) -> String {
        format!("http://localhost:{}", self.debug_port)
    }
}

/// Cookie list in the shape `Storage.setCookies` accepts.
pub(crate) fn cookie_params(cookies: &[Cookie]) -> Result<Value, CdpError> {
    let mut params = Vec::with_capacity(cookies.len());
    for cookie in cookies {
        let mut value = serde_json::to_value(cookie)?;
        // negative expiry marks a session cookie; CDP wants the field absent
        if cookie.expires < 0.0 {
            if let Some(map) = value.as_object_mut() {
                map.remove("expires");
            }
        }
        params.push(value);
    }
    Ok(json!({ "cookies": params }))
}

/// A Chrome instance reached over CDP.
pub struct CdpBrowser {
    config: CdpBrowserConfig,
    client: Arc<CdpClient>,
    /// Attached pages, oldest first.
    pages: Mutex<Vec<Arc<CdpPage>>>,
    /// Chrome process, if this driver launched it.
    chrome_process: Mutex<Option<Child>>,
}

impl CdpBrowser {
    /// Connect to Chrome, launching it if necessary, and attach to the
    /// pages it already has open.
    pub async fn connect(config: CdpBrowserConfig) -> Result<Self, CdpError> {
        let endpoint = config.endpoint();
        let chrome_process = if launcher::is_chrome_running(&endpoint).await {
            info!("Chrome already running on port {}", config.debug_port);
            None
        } else {
            info!("Chrome not running on port {}, launching...", config.debug_port);
            Some(launcher::launch_chrome(&config).await?)
        };

        let client = Arc::new(CdpClient::connect(&endpoint).await?);
        info!("Connected to Chrome at {}", endpoint);

        let browser = Self {
            config,
            client,
            pages: Mutex::new(Vec::new()),
            chrome_process: Mutex::new(chrome_process),
        };
        browser.sync_pages().await?;
        Ok(browser)
    }

    pub fn config(&self) -> &CdpBrowserConfig {
        &self.config
    }

    pub fn client(&self) -> &Arc<CdpClient> {
        &self.client
    }

    async fn attach(&self, target_id: &str) -> Result<Arc<CdpPage>, CdpError> {
        let session = self.client.attach_page(target_id).await?;
        if let Err(e) = session
            .set_viewport(self.config.viewport_width, self.config.viewport_height)
            .await
        {
            warn!("Failed to set viewport for {}: {}", target_id, e);
        }
        Ok(Arc::new(CdpPage::new(
            session,
            self.client.clone(),
            self.config.load_timeout,
        )))
    }

    /// Reconcile attached pages with the browser's page targets: drop the
    /// closed ones and attach to new ones (popups, user-opened tabs).
    async fn sync_pages(&self) -> Result<Vec<Arc<CdpPage>>, CdpError> {
        let targets = self.client.get_targets().await?;
        let live: Vec<&str> = targets
            .iter()
            .filter(|t| t.is_page())
            .map(|t| t.target_id.as_str())
            .collect();

        let mut pages = self.pages.lock().await;
        pages.retain(|p| live.contains(&p.target_id()));

        for target_id in live {
            if pages.iter().any(|p| p.target_id() == target_id) {
                continue;
            }
            match self.attach(target_id).await {
                Ok(page) => {
                    debug!("Attached to page {}", target_id);
                    pages.push(page);
                }
                // the target may have closed between listing and attaching
                Err(e) => warn!("Failed to attach to page {}: {}", target_id, e),
            }
        }
        Ok(pages.clone())
    }
}

#[async_trait]
impl BrowserDriver for CdpBrowser {
    async fn new_page(&self, url: Option<&str>) -> Result<Arc<dyn PageDriver>, DriverError> {
        let page = {
            // held across creation so a concurrent sync does not attach twice
            let mut pages = self.pages.lock().await;
            let session = self.client.new_page(None).await?;
            if let Err(e) = session
                .set_viewport(self.config.viewport_width, self.config.viewport_height)
                .await
            {
                warn!("Failed to set viewport: {}", e);
            }
            let page = Arc::new(CdpPage::new(
                session,
                self.client.clone(),
                self.config.load_timeout,
            ));
            pages.push(page.clone());
            page
        };

        if let Some(url) = url {
            page.goto(url).await?;
        }
        Ok(page)
    }

    async fn pages(&self) -> Result<Vec<Arc<dyn PageDriver>>, DriverError> {
        let pages = self.sync_pages().await?;
        Ok(pages
            .into_iter()
            .map(|p| p as Arc<dyn PageDriver>)
            .collect())
    }

    async fn cookies(&self) -> Result<Vec<Cookie>, DriverError> {
        let result = self.client.call("Storage.getCookies", None).await?;
        let cookies: Vec<Cookie> = serde_json::from_value(result["cookies"].clone())?;
        Ok(cookies)
    }

    async fn add_cookies(&self, cookies: &[Cookie]) -> Result<(), DriverError> {
        if cookies.is_empty() {
            return Ok(());
        }
        self.client
            .call("Storage.setCookies", Some(cookie_params(cookies)?))
            .await?;
        Ok(())
    }

    async fn clear_cookies(&self) -> Result<(), DriverError> {
        self.client.call("Storage.clearCookies", None).await?;
        Ok(())
    }

    async fn close(&self) -> Result<(), DriverError> {
        self.pages.lock().await.clear();
        if let Some(mut child) = self.chrome_process.lock().await.take() {
            info!("Shutting down Chrome...");
            if let Err(e) = self.client.call("Browser.close", None).await {
                debug!("Browser.close failed: {}", e);
            }
            let _ = child.kill().await;
        }
        info!("Browser connection closed");
        Ok(())
    }
}

#[cfg(test)]
#[path = "browser_tests.rs"]
mod tests;
