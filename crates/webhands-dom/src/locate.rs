//! Selector dispatch shared by lookups and waits.

use webhands_protocols::{DriverError, ElementHandle, PageDriver, SearchContext};

/// Whether `selector` should be evaluated as XPath rather than CSS.
pub fn is_xpath(selector: &str) -> bool {
    let trimmed = selector.trim_start();
    trimmed.starts_with('/') || trimmed.starts_with('(') || trimmed.starts_with("xpath=")
}

fn strip_xpath_prefix(selector: &str) -> &str {
    let trimmed = selector.trim_start();
    trimmed.strip_prefix("xpath=").unwrap_or(trimmed)
}

/// First element matching a CSS selector or XPath in the top document.
pub async fn query_one(
    page: &dyn PageDriver,
    selector: &str,
) -> Result<Option<ElementHandle>, DriverError> {
    if is_xpath(selector) {
        page.query_xpath(&SearchContext::Document, strip_xpath_prefix(selector))
            .await
    } else {
        page.query_selector(&SearchContext::Document, selector).await
    }
}

/// Every element matching a CSS selector or XPath, in document order.
pub async fn query_all(
    page: &dyn PageDriver,
    selector: &str,
) -> Result<Vec<ElementHandle>, DriverError> {
    if is_xpath(selector) {
        page.query_xpath_all(&SearchContext::Document, strip_xpath_prefix(selector))
            .await
    } else {
        page.query_selector_all(&SearchContext::Document, selector)
            .await
    }
}
