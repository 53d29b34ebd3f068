//! Tree snapshot builder.
//!
//! The page serializes its live DOM in one `evaluate` round trip; the tree is
//! then rebuilt into a [`DomTree`] arena here, where highlight indices are
//! assigned in depth-first pre-order.

mod script;

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, warn};
use webhands_protocols::{DriverError, ElementHandle, PageDriver};

use crate::error::{DomError, DomResult};
use crate::node::{DomNode, DomTree, ElementNode, NodeId, SelectorMap, TextNode};

pub use script::{BUILD_DOM_TREE_JS, HIGHLIGHT_JS, REMOVE_HIGHLIGHTS_JS};

/// Options for one snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildOptions {
    /// Draw `[index]` overlays after building.
    pub highlight_elements: bool,
    /// Only draw the overlay of this index.
    pub focus_element: Option<usize>,
    /// Pixels beyond the viewport that still count as on screen; `-1`
    /// indexes the whole page.
    pub viewport_expansion: i64,
    /// Descend into open shadow roots.
    pub include_shadow_roots: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            highlight_elements: true,
            focus_element: None,
            viewport_expansion: 500,
            include_shadow_roots: false,
        }
    }
}

/// Result of a snapshot: the tree and the selector map built alongside it.
#[derive(Debug, Clone, PartialEq)]
pub struct DomState {
    pub tree: DomTree,
    pub selector_map: SelectorMap,
}

impl DomState {
    /// Indexed elements in highlight-index order.
    pub fn clickable_elements(&self) -> Vec<NodeId> {
        self.selector_map.values().copied().collect()
    }

    pub fn node(&self, index: usize) -> Option<&ElementNode> {
        self.selector_map
            .get(&index)
            .and_then(|id| self.tree.element(*id))
    }

    pub fn clickable_elements_to_string(&self, include_attributes: &[&str]) -> String {
        self.tree
            .clickable_elements_to_string(&self.selector_map, include_attributes)
    }

    /// Branch-path hashes of every indexed element.
    pub fn path_hashes(&self) -> std::collections::HashSet<String> {
        self.selector_map
            .values()
            .filter_map(|id| self.tree.element_hash(*id))
            .map(|hash| hash.branch_path_hash)
            .collect()
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum RawNode {
    Element(RawElement),
    Text(RawText),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawElement {
    tag_name: String,
    #[serde(default)]
    xpath: String,
    #[serde(default)]
    attributes: BTreeMap<String, String>,
    #[serde(default)]
    is_visible: bool,
    #[serde(default)]
    is_interactive: bool,
    #[serde(default)]
    is_top_element: bool,
    #[serde(default)]
    is_clickable: bool,
    #[serde(default)]
    is_iframe: bool,
    #[serde(default)]
    shadow_root: bool,
    #[serde(default)]
    shadow_child: bool,
    #[serde(default)]
    candidate_id: Option<usize>,
    #[serde(default)]
    children: Vec<RawNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawText {
    text: String,
    #[serde(default)]
    is_visible: bool,
}

impl RawElement {
    fn into_parts(self) -> (ElementNode, Option<usize>, Vec<RawNode>) {
        let node = ElementNode {
            tag_name: self.tag_name.to_lowercase(),
            xpath: self.xpath,
            attributes: self.attributes,
            children: Vec::new(),
            parent: None,
            is_visible: self.is_visible,
            is_interactive: self.is_interactive,
            is_top_element: self.is_top_element,
            is_clickable: self.is_clickable,
            is_iframe: self.is_iframe,
            shadow_root: self.shadow_root,
            shadow_child: self.shadow_child,
            highlight_index: None,
        };
        (node, self.candidate_id, self.children)
    }
}

/// Output of [`build_from_value`]: the state plus the overlay targets
/// (`[index, candidate]` pairs) for highlighting.
struct Built {
    state: DomState,
    overlays: Vec<(usize, usize)>,
}

fn should_index(node: &ElementNode) -> bool {
    node.is_interactive && node.is_visible && node.is_top_element
}

/// Rebuild a serialized snapshot into an arena, assigning highlight indices
/// in pre-order.
fn build_from_value(value: Value) -> DomResult<Built> {
    if value.is_null() {
        return Err(DomError::ElementNotFound);
    }
    let raw: RawNode = serde_json::from_value(value)
        .map_err(|e| DomError::InvalidSnapshot(e.to_string()))?;
    let RawNode::Element(root) = raw else {
        return Err(DomError::InvalidSnapshot(
            "snapshot root is not an element".to_string(),
        ));
    };

    let mut selector_map = SelectorMap::new();
    let mut overlays = Vec::new();
    let mut next_index = 0usize;

    let (root_node, root_candidate, root_children) = root.into_parts();
    let mut tree = DomTree::new(root_node);
    let root_id = tree.root();
    assign_index(
        &mut tree,
        root_id,
        root_candidate,
        &mut next_index,
        &mut selector_map,
        &mut overlays,
    );

    let mut stack: Vec<(NodeId, RawNode)> = root_children
        .into_iter()
        .rev()
        .map(|child| (root_id, child))
        .collect();

    while let Some((parent, raw)) = stack.pop() {
        match raw {
            RawNode::Text(text) => {
                tree.push(
                    parent,
                    DomNode::Text(TextNode {
                        text: text.text,
                        is_visible: text.is_visible,
                        parent: None,
                    }),
                );
            }
            RawNode::Element(element) => {
                let (node, candidate, children) = element.into_parts();
                let id = tree.push(parent, DomNode::Element(node));
                assign_index(
                    &mut tree,
                    id,
                    candidate,
                    &mut next_index,
                    &mut selector_map,
                    &mut overlays,
                );
                stack.extend(children.into_iter().rev().map(|child| (id, child)));
            }
        }
    }

    Ok(Built {
        state: DomState { tree, selector_map },
        overlays,
    })
}

fn assign_index(
    tree: &mut DomTree,
    id: NodeId,
    candidate: Option<usize>,
    next_index: &mut usize,
    selector_map: &mut SelectorMap,
    overlays: &mut Vec<(usize, usize)>,
) {
    let Some(node) = tree.element_mut(id) else {
        return;
    };
    if !should_index(node) {
        return;
    }
    let index = *next_index;
    *next_index += 1;
    node.highlight_index = Some(index);
    selector_map.insert(index, id);
    if let Some(candidate) = candidate {
        overlays.push((index, candidate));
    }
}

/// Builds [`DomState`] snapshots of a page.
pub struct SnapshotBuilder {
    page: Arc<dyn PageDriver>,
}

impl SnapshotBuilder {
    pub fn new(page: Arc<dyn PageDriver>) -> Self {
        Self { page }
    }

    /// Snapshot the subtree under `root`, or `document.body` when `None`.
    pub async fn build(
        &self,
        root: Option<&ElementHandle>,
        options: &BuildOptions,
    ) -> DomResult<DomState> {
        let args = vec![json!({
            "viewportExpansion": options.viewport_expansion,
            "includeShadowRoots": options.include_shadow_roots,
        })];
        let value = match root {
            Some(handle) => match self.page.evaluate_on(handle, BUILD_DOM_TREE_JS, args).await {
                Err(DriverError::StaleHandle(reason)) => {
                    debug!("Snapshot root is gone: {}", reason);
                    return Err(DomError::ElementNotFound);
                }
                other => other?,
            },
            None => self.page.evaluate(BUILD_DOM_TREE_JS, args).await?,
        };

        let built = build_from_value(value)?;
        debug!(
            nodes = built.state.tree.len(),
            interactive = built.state.selector_map.len(),
            "Built DOM snapshot"
        );

        if options.highlight_elements {
            self.highlight(&built.overlays, options.focus_element).await;
        }
        Ok(built.state)
    }

    async fn highlight(&self, overlays: &[(usize, usize)], focus: Option<usize>) {
        let targets: Vec<Value> = overlays
            .iter()
            .filter(|(index, _)| focus.is_none_or(|f| f == *index))
            .map(|(index, candidate)| json!([index, candidate]))
            .collect();
        if targets.is_empty() {
            return;
        }
        if let Err(e) = self
            .page
            .evaluate(HIGHLIGHT_JS, vec![Value::Array(targets)])
            .await
        {
            warn!("Failed to draw highlight overlays: {}", e);
        }
    }

    /// Remove overlays drawn by previous snapshots. Never fails.
    pub async fn remove_highlights(&self) {
        if let Err(e) = self.page.evaluate(REMOVE_HIGHLIGHTS_JS, vec![]).await {
            warn!("Failed to remove highlight overlays: {}", e);
        }
    }
}

#[cfg(test)]
#[path = "snapshot_tests.rs"]
mod tests;
