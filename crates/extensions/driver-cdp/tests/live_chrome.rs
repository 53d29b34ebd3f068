//! End-to-end tests against a real Chrome.
//!
//! These tests require Chrome to be installed on the system.
//! Run with: cargo test -p webhands-driver-cdp --test live_chrome -- --ignored --nocapture

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use webhands_dom::{BuildOptions, DomService};
use webhands_driver_cdp::{CdpBrowser, CdpBrowserConfig, find_chrome};
use webhands_protocols::{BrowserDriver, DriverError, PageDriver, SearchContext};

const FORM_PAGE: &str = "data:text/html,<html><body>\
<button id=\"go\" onclick=\"document.title='clicked'\">Go</button>\
<input name=\"q\">\
<a href=\"/next\">Next</a>\
</body></html>";

fn test_config() -> CdpBrowserConfig {
    CdpBrowserConfig {
        debug_port: 9333, // away from a developer's own browser
        profile_dir: Some(PathBuf::from("/tmp/webhands-test-profile")),
        headless: true,
        ..Default::default()
    }
}

async fn open(url: &str) -> (CdpBrowser, Arc<dyn PageDriver>) {
    let browser = CdpBrowser::connect(test_config())
        .await
        .expect("Chrome should start");
    let page = browser.new_page(Some(url)).await.expect("page should open");
    (browser, page)
}

#[tokio::test]
#[ignore = "requires Chrome"]
async fn test_chrome_detection() {
    let path = find_chrome(None).expect("Chrome should be installed on the system");
    println!("Found Chrome at: {}", path.display());
}

#[tokio::test]
#[ignore = "requires Chrome"]
async fn test_snapshot_indexes_interactive_elements() {
    let (browser, page) = open(FORM_PAGE).await;

    let dom = DomService::new(page.clone());
    let state = dom
        .get_state(&BuildOptions {
            highlight_elements: false,
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(state.selector_map.len(), 3);
    let listing = state.clickable_elements_to_string(&["id", "name"]);
    assert!(listing.contains("[0]<button id=\"go\">Go</button>"), "{}", listing);

    let resolved = dom
        .get_element_by_index(0)
        .await
        .unwrap()
        .expect("index 0 resolves");
    page.click(&resolved).await.unwrap();
    assert_eq!(page.title().await.unwrap(), "clicked");

    dom.cleanup().await;
    browser.close().await.unwrap();
}

#[tokio::test]
#[ignore = "requires Chrome"]
async fn test_queries_and_fill() {
    let (browser, page) = open(FORM_PAGE).await;

    let input = page
        .query_xpath(&SearchContext::Document, "/html/body/input")
        .await
        .unwrap()
        .expect("input found by xpath");
    page.fill(&input, "hello").await.unwrap();
    let value = page
        .evaluate_on(&input, "function () { return this.value; }", vec![])
        .await
        .unwrap();
    assert_eq!(value, "hello");

    let all = page
        .query_selector_all(&SearchContext::Document, "button, input, a")
        .await
        .unwrap();
    assert_eq!(all.len(), 3);

    let err = page
        .query_selector(&SearchContext::Document, "div[")
        .await
        .unwrap_err();
    assert!(matches!(err, DriverError::InvalidSelector { .. }), "{:?}", err);

    browser.close().await.unwrap();
}

#[tokio::test]
#[ignore = "requires Chrome"]
async fn test_xpath_lists_and_handle_release() {
    let (browser, page) = open(FORM_PAGE).await;

    let all = page
        .query_xpath_all(&SearchContext::Document, "//body/*")
        .await
        .unwrap();
    assert_eq!(all.len(), 3);

    let button = all[0].clone();
    page.release(&all[1]).await.unwrap();
    let err = page
        .evaluate_on(&all[1], "function () { return this.tagName; }", vec![])
        .await
        .unwrap_err();
    assert!(matches!(err, DriverError::StaleHandle(_)), "{:?}", err);
    let tag = page
        .evaluate_on(&button, "function () { return this.tagName; }", vec![])
        .await
        .unwrap();
    assert_eq!(tag, "BUTTON");

    page.release_handles().await.unwrap();
    let err = page
        .evaluate_on(&button, "function () { return this.tagName; }", vec![])
        .await
        .unwrap_err();
    assert!(matches!(err, DriverError::StaleHandle(_)), "{:?}", err);

    browser.close().await.unwrap();
}

#[tokio::test]
#[ignore = "requires Chrome"]
async fn test_cookies_round_trip() {
    let (browser, page) = open("https://example.com").await;
    page.wait_for_load_state(Duration::from_secs(10)).await.unwrap();

    browser.clear_cookies().await.unwrap();
    page.evaluate("function () { document.cookie = 'sid=abc; path=/'; }", vec![])
        .await
        .unwrap();
    let cookies = browser.cookies().await.unwrap();
    assert!(cookies.iter().any(|c| c.name == "sid" && c.value == "abc"));

    browser.clear_cookies().await.unwrap();
    assert!(browser.cookies().await.unwrap().is_empty());
    browser.close().await.unwrap();
}
