//! Element resolver: snapshot node to live handle.
//!
//! Strategies, first success wins:
//! 1. the node's XPath reduced to a simple CSS selector,
//! 2. the raw XPath,
//! 3. an enhanced CSS plan walked hop by hop through iframes and shadow roots.
//!
//! Steps 1 and 2 address the top document only, so they are skipped for nodes
//! inside an iframe or shadow tree. A miss is `Ok(None)`, not an error.

mod css;
mod xpath;

use std::sync::Arc;

use tracing::{debug, warn};
use webhands_protocols::{DriverError, ElementHandle, PageDriver, SearchContext};

use crate::error::DomResult;
use crate::node::{DomTree, NodeId};

pub use css::{
    ATTRIBUTE_SPECIFICITY, Boundary, CLASS_SPECIFICITY, Hop, NTH_OF_TYPE_THRESHOLD,
    SAFE_ATTRIBUTES, SPECIFICITY_CEILING, SelectorPlan, build_selector_plan,
};
pub use xpath::{is_css_identifier, simplify_xpath_to_css};

/// Which strategy produced a handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveStrategy {
    SimplifiedCss(String),
    XPath(String),
    EnhancedCss(SelectorPlan),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedElement {
    pub handle: ElementHandle,
    pub strategy: ResolveStrategy,
}

/// Errors that end resolution instead of degrading to the next strategy.
fn is_fatal(error: &DriverError) -> bool {
    matches!(error, DriverError::PageClosed | DriverError::NotConnected)
}

pub struct ElementResolver {
    page: Arc<dyn PageDriver>,
}

impl ElementResolver {
    pub fn new(page: Arc<dyn PageDriver>) -> Self {
        Self { page }
    }

    /// Resolve `id` of `tree` against the current page and scroll it into
    /// view.
    pub async fn resolve(&self, tree: &DomTree, id: NodeId) -> DomResult<Option<ResolvedElement>> {
        let Some(element) = tree.element(id) else {
            return Ok(None);
        };

        let mut resolved = None;
        if !element.xpath.is_empty() && !tree.crosses_boundary(id) {
            resolved = self.try_xpath_strategies(&element.xpath).await?;
        }
        if resolved.is_none() {
            resolved = self.try_enhanced_css(tree, id).await?;
        }

        let Some(resolved) = resolved else {
            debug!(tag = %element.tag_name, xpath = %element.xpath, "Element not resolved");
            return Ok(None);
        };

        if let Err(e) = self.page.scroll_into_view_if_needed(&resolved.handle).await {
            warn!("Failed to scroll element into view: {}", e);
        }
        Ok(Some(resolved))
    }

    async fn try_xpath_strategies(&self, xpath: &str) -> DomResult<Option<ResolvedElement>> {
        if let Some(css) = simplify_xpath_to_css(xpath) {
            match self.page.query_selector(&SearchContext::Document, &css).await {
                Ok(Some(handle)) => {
                    return Ok(Some(ResolvedElement {
                        handle,
                        strategy: ResolveStrategy::SimplifiedCss(css),
                    }));
                }
                Ok(None) => {}
                Err(e) if is_fatal(&e) => return Err(e.into()),
                Err(e) => debug!("Simplified selector {} failed: {}", css, e),
            }
        }

        match self.page.query_xpath(&SearchContext::Document, xpath).await {
            Ok(Some(handle)) => Ok(Some(ResolvedElement {
                handle,
                strategy: ResolveStrategy::XPath(xpath.to_string()),
            })),
            Ok(None) => Ok(None),
            Err(e) if is_fatal(&e) => Err(e.into()),
            Err(e) => {
                debug!("XPath {} failed: {}", xpath, e);
                Ok(None)
            }
        }
    }

    async fn try_enhanced_css(&self, tree: &DomTree, id: NodeId) -> DomResult<Option<ResolvedElement>> {
        let Some(plan) = build_selector_plan(tree, id) else {
            return Ok(None);
        };

        let mut context = SearchContext::Document;
        let mut handle = None;
        for hop in &plan.hops {
            let found = match self.page.query_selector(&context, &hop.selector).await {
                Ok(found) => found,
                Err(e) if is_fatal(&e) => return Err(e.into()),
                Err(e) => {
                    debug!("Enhanced selector {} failed: {}", hop.selector, e);
                    return Ok(None);
                }
            };
            let Some(found) = found else {
                return Ok(None);
            };

            match hop.enter {
                None => handle = Some(found),
                Some(boundary) => {
                    let entered = match boundary {
                        Boundary::Frame => self.page.content_frame(&found).await,
                        Boundary::Shadow => self.page.shadow_root(&found).await,
                    };
                    match entered {
                        Ok(Some(next)) => context = next,
                        Ok(None) => {
                            debug!(selector = %hop.selector, ?boundary, "Boundary not accessible");
                            return Ok(None);
                        }
                        Err(e) if is_fatal(&e) => return Err(e.into()),
                        Err(e) => {
                            debug!("Entering {:?} at {} failed: {}", boundary, hop.selector, e);
                            return Ok(None);
                        }
                    }
                }
            }
        }

        Ok(handle.map(|handle| ResolvedElement {
            handle,
            strategy: ResolveStrategy::EnhancedCss(plan),
        }))
    }
}

#[cfg(test)]
#[path = "resolver_tests.rs"]
mod tests;
