//! Element node model.
//!
//! A snapshot is an arena: every node lives in `DomTree::nodes` and edges are
//! `NodeId` indices. Children own nothing and parents are plain indices, so
//! ancestor walks are O(depth) without reference cycles.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::hashing::ElementHash;

/// Index of a node inside its [`DomTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub usize);

/// Highlight index to node, rebuilt on every snapshot.
pub type SelectorMap = BTreeMap<usize, NodeId>;

/// One observed DOM element.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ElementNode {
    /// Lower-cased tag name.
    pub tag_name: String,
    /// Path relative to the owning document or shadow root.
    pub xpath: String,
    pub attributes: BTreeMap<String, String>,
    pub children: Vec<NodeId>,
    pub parent: Option<NodeId>,
    pub is_visible: bool,
    pub is_interactive: bool,
    pub is_top_element: bool,
    pub is_clickable: bool,
    /// `<iframe>`/`<frame>` element. Inaccessible frames have no children.
    pub is_iframe: bool,
    /// Hosts an open shadow root.
    pub shadow_root: bool,
    /// Direct child of the parent's shadow root rather than its light DOM.
    pub shadow_child: bool,
    /// Position in the selector map of the snapshot that produced the node.
    pub highlight_index: Option<usize>,
}

impl ElementNode {
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextNode {
    pub text: String,
    pub is_visible: bool,
    pub parent: Option<NodeId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DomNode {
    Element(ElementNode),
    Text(TextNode),
}

impl DomNode {
    pub fn as_element(&self) -> Option<&ElementNode> {
        match self {
            DomNode::Element(element) => Some(element),
            DomNode::Text(_) => None,
        }
    }

    pub fn parent(&self) -> Option<NodeId> {
        match self {
            DomNode::Element(element) => element.parent,
            DomNode::Text(text) => text.parent,
        }
    }
}

/// Arena holding one snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomTree {
    nodes: Vec<DomNode>,
    root: NodeId,
}

impl DomTree {
    /// Empty tree whose root is `root`.
    pub fn new(root: ElementNode) -> Self {
        Self {
            nodes: vec![DomNode::Element(root)],
            root: NodeId(0),
        }
    }

    /// Append `node` under `parent`, returning its id.
    pub fn push(&mut self, parent: NodeId, mut node: DomNode) -> NodeId {
        let id = NodeId(self.nodes.len());
        match &mut node {
            DomNode::Element(element) => element.parent = Some(parent),
            DomNode::Text(text) => text.parent = Some(parent),
        }
        self.nodes.push(node);
        if let Some(DomNode::Element(owner)) = self.nodes.get_mut(parent.0) {
            owner.children.push(id);
        }
        id
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: NodeId) -> Option<&DomNode> {
        self.nodes.get(id.0)
    }

    pub fn element(&self, id: NodeId) -> Option<&ElementNode> {
        self.get(id).and_then(DomNode::as_element)
    }

    pub(crate) fn element_mut(&mut self, id: NodeId) -> Option<&mut ElementNode> {
        match self.nodes.get_mut(id.0) {
            Some(DomNode::Element(element)) => Some(element),
            _ => None,
        }
    }

    /// Element ids in depth-first pre-order, root first.
    pub fn elements(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            if let Some(element) = self.element(id) {
                out.push(id);
                stack.extend(element.children.iter().rev().copied());
            }
        }
        out
    }

    /// Ancestors of `id`, nearest first, root last.
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut current = self.get(id).and_then(DomNode::parent);
        while let Some(parent) = current {
            out.push(parent);
            current = self.get(parent).and_then(DomNode::parent);
        }
        out
    }

    /// Element ids from the first element below the root down to `id`.
    pub fn chain(&self, id: NodeId) -> Vec<NodeId> {
        if id == self.root {
            return vec![id];
        }
        let mut chain: Vec<NodeId> = self
            .ancestors(id)
            .into_iter()
            .filter(|ancestor| *ancestor != self.root)
            .collect();
        chain.reverse();
        chain.push(id);
        chain
    }

    /// Tag names from the first element below the root down to `id`.
    pub fn branch_path(&self, id: NodeId) -> Vec<String> {
        self.chain(id)
            .into_iter()
            .filter_map(|node| self.element(node))
            .map(|element| element.tag_name.clone())
            .collect()
    }

    pub fn element_hash(&self, id: NodeId) -> Option<ElementHash> {
        let element = self.element(id)?;
        Some(ElementHash::new(&self.branch_path(id), &element.attributes))
    }

    /// 1-based position among same-tag element siblings, `None` when the
    /// element has no same-tag siblings.
    pub fn nth_of_type(&self, id: NodeId) -> Option<usize> {
        let element = self.element(id)?;
        let parent = self.element(element.parent?)?;
        let same_tag: Vec<NodeId> = parent
            .children
            .iter()
            .copied()
            .filter(|sibling| {
                self.element(*sibling).is_some_and(|s| {
                    s.tag_name == element.tag_name && s.shadow_child == element.shadow_child
                })
            })
            .collect();
        if same_tag.len() < 2 {
            return None;
        }
        same_tag.iter().position(|s| *s == id).map(|p| p + 1)
    }

    /// Whether reaching `id` from the top document passes through an iframe
    /// or a shadow root.
    pub fn crosses_boundary(&self, id: NodeId) -> bool {
        if self.element(id).is_some_and(|e| e.shadow_child) {
            return true;
        }
        self.ancestors(id).into_iter().any(|ancestor| {
            self.element(ancestor)
                .is_some_and(|e| e.is_iframe || e.shadow_child)
        })
    }

    /// Visible text under `id`, stopping at nested indexed elements.
    pub fn text_until_next_clickable(&self, id: NodeId) -> String {
        let mut parts = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            match self.get(current) {
                Some(DomNode::Text(text)) => {
                    let trimmed = text.text.trim();
                    if !trimmed.is_empty() {
                        parts.push(trimmed.to_string());
                    }
                }
                Some(DomNode::Element(element)) => {
                    if current != id && element.highlight_index.is_some() {
                        continue;
                    }
                    stack.extend(element.children.iter().rev().copied());
                }
                None => {}
            }
        }
        parts.join(" ")
    }

    /// `[index]<tag attr="v">text</tag>` line per indexed element, in
    /// highlight-index order.
    pub fn clickable_elements_to_string(
        &self,
        selector_map: &SelectorMap,
        include_attributes: &[&str],
    ) -> String {
        let mut lines = Vec::with_capacity(selector_map.len());
        for (index, id) in selector_map {
            let Some(element) = self.element(*id) else {
                continue;
            };
            let mut line = format!("[{}]<{}", index, element.tag_name);
            for name in include_attributes {
                if let Some(value) = element.attribute(name) {
                    if !value.is_empty() {
                        line.push_str(&format!(" {}=\"{}\"", name, value));
                    }
                }
            }
            line.push('>');
            line.push_str(&self.text_until_next_clickable(*id));
            line.push_str(&format!("</{}>", element.tag_name));
            lines.push(line);
        }
        lines.join("\n")
    }

    /// `input[type=file]` or an element with `accept`, checked down to
    /// `max_depth` levels of descendants.
    pub fn is_file_uploader(&self, id: NodeId, max_depth: usize) -> bool {
        let Some(element) = self.element(id) else {
            return false;
        };
        if element.tag_name == "input"
            && element
                .attribute("type")
                .is_some_and(|t| t.eq_ignore_ascii_case("file"))
        {
            return true;
        }
        if element.attributes.contains_key("accept") {
            return true;
        }
        if max_depth == 0 {
            return false;
        }
        element
            .children
            .iter()
            .any(|child| self.is_file_uploader(*child, max_depth - 1))
    }
}

#[cfg(test)]
#[path = "node_tests.rs"]
mod tests;
