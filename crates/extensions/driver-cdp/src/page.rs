//! [`PageDriver`] over a CDP page session.
//!
//! Element handles are `Runtime.RemoteObjectId`s. Queries run as functions
//! bound to the search root, so the same code serves the top document,
//! same-origin iframe documents and open shadow roots. Every object a query
//! returns lives in [`HANDLE_GROUP`], which `release_handles` frees at once.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::debug;
use webhands_protocols::{DriverError, ElementHandle, PageDriver, SearchContext};

use crate::cdp::{CdpClient, CdpError, PageSession, PropertyDescriptor, RemoteObject};

/// Object group of every handle this driver returns.
pub const HANDLE_GROUP: &str = "webhands-handles";

const QUERY_SELECTOR_JS: &str = "function (selector) { return this.querySelector(selector); }";

const QUERY_SELECTOR_ALL_JS: &str =
    "function (selector) { return Array.from(this.querySelectorAll(selector)); }";

const QUERY_XPATH_JS: &str = r#"function (xpath) {
    const doc = this.ownerDocument || this;
    return doc.evaluate(xpath, this, null, XPathResult.FIRST_ORDERED_NODE_TYPE, null)
        .singleNodeValue;
}"#;

const QUERY_XPATH_ALL_JS: &str = r#"function (xpath) {
    const doc = this.ownerDocument || this;
    const snapshot = doc.evaluate(xpath, this, null, XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null);
    const nodes = [];
    for (let i = 0; i < snapshot.snapshotLength; i++) {
        const node = snapshot.snapshotItem(i);
        if (node.nodeType === Node.ELEMENT_NODE) {
            nodes.push(node);
        }
    }
    return nodes;
}"#;

const CONTENT_DOCUMENT_JS: &str =
    "function () { try { return this.contentDocument; } catch (e) { return null; } }";

const SHADOW_ROOT_JS: &str = "function () { return this.shadowRoot; }";

const SCROLL_INTO_VIEW_JS: &str = r#"function () {
    if (typeof this.scrollIntoViewIfNeeded === 'function') {
        this.scrollIntoViewIfNeeded(true);
    } else {
        this.scrollIntoView({ block: 'center', inline: 'center' });
    }
}"#;

const CLEAR_VALUE_JS: &str = r#"function () {
    if ('value' in this) {
        this.value = '';
        this.dispatchEvent(new Event('input', { bubbles: true }));
    } else if (this.isContentEditable) {
        this.textContent = '';
    }
}"#;

/// Whether a script error came from an unparsable selector or XPath.
fn is_selector_syntax_error(message: &str) -> bool {
    message.contains("SyntaxError") || message.contains("is not a valid")
}

fn query_error(selector: &str, err: CdpError) -> DriverError {
    match err {
        CdpError::JavaScript(message) if is_selector_syntax_error(&message) => {
            DriverError::invalid_selector(selector, message)
        }
        other => other.into(),
    }
}

fn handle_of(object: &RemoteObject) -> Option<ElementHandle> {
    object.node_id().map(ElementHandle::new)
}

/// Entries of an array's `Runtime.getProperties`, in index order.
fn array_handles(properties: &[PropertyDescriptor]) -> Vec<ElementHandle> {
    let mut indexed: Vec<(usize, ElementHandle)> = properties
        .iter()
        .filter_map(|p| {
            let index = p.name.parse::<usize>().ok()?;
            let handle = p.value.as_ref().and_then(handle_of)?;
            Some((index, handle))
        })
        .collect();
    indexed.sort_by_key(|(index, _)| *index);
    indexed.into_iter().map(|(_, handle)| handle).collect()
}

/// Object a query runs against. `temporary` roots are created for the query
/// and released right after it.
struct QueryRoot {
    object_id: String,
    temporary: bool,
}

/// A browser tab driven over CDP.
pub struct CdpPage {
    session: Arc<PageSession>,
    client: Arc<CdpClient>,
    load_timeout: Duration,
}

impl CdpPage {
    pub(crate) fn new(session: PageSession, client: Arc<CdpClient>, load_timeout: Duration) -> Self {
        Self {
            session: Arc::new(session),
            client,
            load_timeout,
        }
    }

    pub fn target_id(&self) -> &str {
        self.session.target_id()
    }

    pub fn session(&self) -> &PageSession {
        &self.session
    }

    async fn root_object(&self, context: &SearchContext) -> Result<QueryRoot, DriverError> {
        match context {
            SearchContext::Root(handle) => Ok(QueryRoot {
                object_id: handle.as_str().to_string(),
                temporary: false,
            }),
            SearchContext::Document => {
                let document = self.session.evaluate_handle("document", HANDLE_GROUP).await?;
                let object_id = document
                    .object_id
                    .ok_or_else(|| DriverError::Protocol("document has no object id".to_string()))?;
                Ok(QueryRoot {
                    object_id,
                    temporary: true,
                })
            }
        }
    }

    async fn release_object(&self, object_id: &str) {
        if let Err(e) = self.session.release_object(object_id).await {
            debug!("Failed to release remote object: {}", e);
        }
    }

    /// Run a query function against `context`, keeping the result remote.
    async fn query(
        &self,
        context: &SearchContext,
        function: &str,
        query: &str,
    ) -> Result<RemoteObject, DriverError> {
        let root = self.root_object(context).await?;
        let result = self
            .session
            .call_function_on_handle(&root.object_id, function, vec![json!(query)], HANDLE_GROUP)
            .await;
        if root.temporary {
            self.release_object(&root.object_id).await;
        }
        result.map_err(|e| query_error(query, e))
    }

    /// Run a query function that returns an array and unpack its elements.
    async fn query_array(
        &self,
        context: &SearchContext,
        function: &str,
        query: &str,
    ) -> Result<Vec<ElementHandle>, DriverError> {
        let array = self.query(context, function, query).await?;
        let Some(array_id) = array.object_id else {
            return Ok(Vec::new());
        };
        let properties = self.session.get_properties(&array_id).await;
        self.release_object(&array_id).await;
        Ok(array_handles(&properties?))
    }

    async fn call_handle(
        &self,
        handle: &ElementHandle,
        function: &str,
    ) -> Result<Option<ElementHandle>, DriverError> {
        let object = self
            .session
            .call_function_on_handle(handle.as_str(), function, Vec::new(), HANDLE_GROUP)
            .await?;
        Ok(handle_of(&object))
    }
}

#[async_trait]
impl PageDriver for CdpPage {
    async fn evaluate(&self, function: &str, args: Vec<Value>) -> Result<Value, DriverError> {
        Ok(self.session.evaluate_function(function, args).await?)
    }

    async fn evaluate_on(
        &self,
        handle: &ElementHandle,
        function: &str,
        args: Vec<Value>,
    ) -> Result<Value, DriverError> {
        Ok(self
            .session
            .call_function_on(handle.as_str(), function, args)
            .await?)
    }

    async fn query_selector(
        &self,
        context: &SearchContext,
        selector: &str,
    ) -> Result<Option<ElementHandle>, DriverError> {
        let object = self.query(context, QUERY_SELECTOR_JS, selector).await?;
        Ok(handle_of(&object))
    }

    async fn query_selector_all(
        &self,
        context: &SearchContext,
        selector: &str,
    ) -> Result<Vec<ElementHandle>, DriverError> {
        self.query_array(context, QUERY_SELECTOR_ALL_JS, selector).await
    }

    async fn query_xpath(
        &self,
        context: &SearchContext,
        xpath: &str,
    ) -> Result<Option<ElementHandle>, DriverError> {
        let object = self.query(context, QUERY_XPATH_JS, xpath).await?;
        Ok(handle_of(&object))
    }

    async fn query_xpath_all(
        &self,
        context: &SearchContext,
        xpath: &str,
    ) -> Result<Vec<ElementHandle>, DriverError> {
        self.query_array(context, QUERY_XPATH_ALL_JS, xpath).await
    }

    async fn content_frame(
        &self,
        handle: &ElementHandle,
    ) -> Result<Option<SearchContext>, DriverError> {
        Ok(self
            .call_handle(handle, CONTENT_DOCUMENT_JS)
            .await?
            .map(SearchContext::Root))
    }

    async fn shadow_root(
        &self,
        handle: &ElementHandle,
    ) -> Result<Option<SearchContext>, DriverError> {
        Ok(self
            .call_handle(handle, SHADOW_ROOT_JS)
            .await?
            .map(SearchContext::Root))
    }

    async fn scroll_into_view_if_needed(&self, handle: &ElementHandle) -> Result<(), DriverError> {
        self.session
            .call_function_on(handle.as_str(), SCROLL_INTO_VIEW_JS, Vec::new())
            .await?;
        Ok(())
    }

    async fn click(&self, handle: &ElementHandle) -> Result<(), DriverError> {
        self.scroll_into_view_if_needed(handle).await?;
        self.session.click_object(handle.as_str()).await?;
        Ok(())
    }

    async fn fill(&self, handle: &ElementHandle, text: &str) -> Result<(), DriverError> {
        self.scroll_into_view_if_needed(handle).await?;
        self.session.focus(handle.as_str()).await?;
        self.session
            .call_function_on(handle.as_str(), CLEAR_VALUE_JS, Vec::new())
            .await?;
        self.session.type_text(text).await?;
        Ok(())
    }

    async fn goto(&self, url: &str) -> Result<(), DriverError> {
        Ok(self.session.navigate(url, self.load_timeout).await?)
    }

    async fn go_back(&self) -> Result<(), DriverError> {
        Ok(self.session.go_back(self.load_timeout).await?)
    }

    async fn wait_for_load_state(&self, timeout: Duration) -> Result<(), DriverError> {
        Ok(self.session.wait_for_load(timeout).await?)
    }

    async fn url(&self) -> Result<String, DriverError> {
        Ok(self.session.get_url().await?)
    }

    async fn title(&self) -> Result<String, DriverError> {
        Ok(self.session.get_title().await?)
    }

    async fn content(&self) -> Result<String, DriverError> {
        Ok(self.session.get_content().await?)
    }

    async fn screenshot(&self, full_page: bool) -> Result<String, DriverError> {
        Ok(self.session.screenshot(full_page).await?)
    }

    async fn press_key(&self, key: &str) -> Result<(), DriverError> {
        Ok(self.session.press_key(key).await?)
    }

    async fn release(&self, handle: &ElementHandle) -> Result<(), DriverError> {
        Ok(self.session.release_object(handle.as_str()).await?)
    }

    async fn release_handles(&self) -> Result<(), DriverError> {
        Ok(self.session.release_object_group(HANDLE_GROUP).await?)
    }

    async fn close(&self) -> Result<(), DriverError> {
        self.client.close_page(self.session.target_id()).await?;
        self.client.forget_session(self.session.session_id()).await;
        debug!("Closed page {}", self.session.target_id());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selector_syntax_errors_become_invalid_selector() {
        let err = query_error(
            "div[",
            CdpError::JavaScript(
                "SyntaxError: Failed to execute 'querySelector' on 'Document': 'div[' is not a valid selector."
                    .to_string(),
            ),
        );
        assert!(matches!(err, DriverError::InvalidSelector { ref selector, .. } if selector == "div["));
    }

    #[test]
    fn test_other_script_errors_pass_through() {
        let err = query_error("#a", CdpError::JavaScript("TypeError: x is null".to_string()));
        assert!(matches!(err, DriverError::JavaScript(_)));

        let err = query_error("#a", CdpError::SessionClosed);
        assert!(matches!(err, DriverError::PageClosed));
    }

    #[test]
    fn test_array_handles_in_index_order() {
        let properties: Vec<PropertyDescriptor> = serde_json::from_value(json!([
            {"name": "1", "value": {"type": "object", "subtype": "node", "objectId": "second"}},
            {"name": "length", "value": {"type": "number", "value": 2}},
            {"name": "0", "value": {"type": "object", "subtype": "node", "objectId": "first"}},
            {"name": "__proto__", "value": {"type": "object", "objectId": "proto"}}
        ]))
        .unwrap();
        assert_eq!(
            array_handles(&properties),
            vec![ElementHandle::new("first"), ElementHandle::new("second")]
        );
    }

    #[test]
    fn test_null_remote_object_has_no_handle() {
        let null: RemoteObject =
            serde_json::from_value(json!({"type": "object", "subtype": "null", "value": null}))
                .unwrap();
        assert!(handle_of(&null).is_none());

        let node: RemoteObject = serde_json::from_value(json!({
            "type": "object",
            "subtype": "node",
            "className": "HTMLButtonElement",
            "objectId": "obj-1"
        }))
        .unwrap();
        assert_eq!(handle_of(&node), Some(ElementHandle::new("obj-1")));
    }
}
