//! Index-independent element identities.
//!
//! A [`DomHistoryElement`] is captured when an action runs against an indexed
//! element and can be matched against a later snapshot by content hash, even
//! when highlight indices have been reassigned.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::hashing::ElementHash;
use crate::node::{DomTree, NodeId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomHistoryElement {
    pub tag_name: String,
    pub xpath: String,
    pub highlight_index: Option<usize>,
    pub entire_parent_branch_path: Vec<String>,
    pub attributes: BTreeMap<String, String>,
    pub shadow_root: bool,
}

impl DomHistoryElement {
    /// Capture the identity of `id` in `tree`.
    pub fn from_node(tree: &DomTree, id: NodeId) -> Option<Self> {
        let element = tree.element(id)?;
        Some(Self {
            tag_name: element.tag_name.clone(),
            xpath: element.xpath.clone(),
            highlight_index: element.highlight_index,
            entire_parent_branch_path: tree.branch_path(id),
            attributes: element.attributes.clone(),
            shadow_root: element.shadow_root,
        })
    }

    pub fn hash(&self) -> ElementHash {
        ElementHash::new(&self.entire_parent_branch_path, &self.attributes)
    }
}

/// Matching of history elements against snapshots.
pub struct HistoryTreeProcessor;

impl HistoryTreeProcessor {
    /// First indexed element of `tree` whose hash equals the history
    /// element's, in pre-order.
    pub fn find_history_element_in_tree(
        history: &DomHistoryElement,
        tree: &DomTree,
    ) -> Option<NodeId> {
        let wanted = history.hash();
        tree.elements().into_iter().find(|id| {
            tree.element(*id)
                .is_some_and(|element| element.highlight_index.is_some())
                && tree.element_hash(*id).as_ref() == Some(&wanted)
        })
    }

    pub fn compare_history_element_and_dom_element(
        history: &DomHistoryElement,
        tree: &DomTree,
        id: NodeId,
    ) -> bool {
        tree.element_hash(id)
            .is_some_and(|hash| hash == history.hash())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{DomNode, ElementNode};

    fn indexed(tag: &str, attrs: &[(&str, &str)], index: usize) -> DomNode {
        DomNode::Element(ElementNode {
            tag_name: tag.to_string(),
            attributes: attrs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            highlight_index: Some(index),
            is_visible: true,
            is_interactive: true,
            is_top_element: true,
            ..Default::default()
        })
    }

    fn page(leading_buttons: usize) -> (DomTree, NodeId) {
        let mut tree = DomTree::new(ElementNode {
            tag_name: "body".into(),
            ..Default::default()
        });
        let root = tree.root();
        for i in 0..leading_buttons {
            let id = format!("extra-{}", i);
            tree.push(root, indexed("button", &[("id", id.as_str())], i));
        }
        let target = tree.push(
            root,
            indexed("button", &[("id", "go"), ("type", "submit")], leading_buttons),
        );
        (tree, target)
    }

    #[test]
    fn test_identity_survives_index_churn() {
        let (first, target) = page(5);
        let history = DomHistoryElement::from_node(&first, target).unwrap();
        assert_eq!(history.highlight_index, Some(5));

        let (second, moved) = page(7);
        let found = HistoryTreeProcessor::find_history_element_in_tree(&history, &second).unwrap();
        assert_eq!(found, moved);
        assert_eq!(second.element(found).unwrap().highlight_index, Some(7));
        assert_eq!(second.element_hash(found).unwrap(), history.hash());
    }

    #[test]
    fn test_changed_attributes_do_not_match() {
        let (first, target) = page(0);
        let history = DomHistoryElement::from_node(&first, target).unwrap();

        let mut tree = DomTree::new(ElementNode {
            tag_name: "body".into(),
            ..Default::default()
        });
        let root = tree.root();
        let other = tree.push(root, indexed("button", &[("id", "go")], 0));

        assert!(HistoryTreeProcessor::find_history_element_in_tree(&history, &tree).is_none());
        assert!(!HistoryTreeProcessor::compare_history_element_and_dom_element(
            &history, &tree, other
        ));
        assert!(HistoryTreeProcessor::compare_history_element_and_dom_element(
            &history, &first, target
        ));
    }
}
