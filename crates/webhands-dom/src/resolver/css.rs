//! Enhanced CSS selectors built from a node's ancestor chain.
//!
//! Each level contributes one compound selector scored by specificity. An
//! `id` resets the chain to `#id`. Iframes and shadow hosts split the chain
//! into hops, each evaluated inside the context the previous hop entered.

use crate::node::{DomTree, ElementNode, NodeId};

use super::xpath::is_css_identifier;

/// Points per class name.
pub const CLASS_SPECIFICITY: u32 = 10;
/// Points per safe attribute.
pub const ATTRIBUTE_SPECIFICITY: u32 = 1;
/// Stop adding qualifiers once a level reaches this score.
pub const SPECIFICITY_CEILING: u32 = 20;
/// Below this score, same-tag siblings are told apart with `:nth-of-type`.
pub const NTH_OF_TYPE_THRESHOLD: u32 = 10;

/// Attributes stable enough to select on. `class` is handled separately.
pub const SAFE_ATTRIBUTES: &[&str] = &[
    "name",
    "type",
    "value",
    "title",
    "alt",
    "role",
    "data-testid",
    "aria-label",
    "part",
];

/// Context switch performed after matching a hop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Boundary {
    /// Continue inside the iframe's content document.
    Frame,
    /// Continue inside the element's shadow root.
    Shadow,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hop {
    pub selector: String,
    /// `None` on the last hop.
    pub enter: Option<Boundary>,
}

/// Ordered hops from the top document down to the element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorPlan {
    pub hops: Vec<Hop>,
}

impl SelectorPlan {
    /// Selector of the final hop.
    pub fn target_selector(&self) -> Option<&str> {
        self.hops.last().map(|hop| hop.selector.as_str())
    }
}

enum Segment {
    Id(String),
    Compound(String),
}

/// Serialize `value` as a double-quoted CSS string. Backslashes and quotes
/// are escaped; control characters become hex escapes (`\a ` for a newline)
/// and NUL becomes U+FFFD.
pub(crate) fn css_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '\0' => out.push('\u{FFFD}'),
            '\u{1}'..='\u{1f}' | '\u{7f}' => out.push_str(&format!("\\{:x} ", c as u32)),
            '"' | '\\' => {
                out.push('\\');
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}

fn is_unsafe_char(c: char) -> bool {
    matches!(c, '"' | '\'' | '<' | '>' | '`')
}

/// Attribute qualifier. Values with quote or angle characters degrade to a
/// substring match on their longest clean run.
fn attribute_selector(name: &str, value: &str) -> Option<String> {
    if value.chars().any(is_unsafe_char) {
        let run = value
            .split(is_unsafe_char)
            .max_by_key(|part| part.len())
            .unwrap_or("");
        if run.is_empty() {
            return None;
        }
        return Some(format!("[{}*={}]", name, css_string(run)));
    }
    Some(format!("[{}={}]", name, css_string(value)))
}

fn segment(tree: &DomTree, id: NodeId, element: &ElementNode) -> Segment {
    let id_value = element.attribute("id").filter(|v| !v.trim().is_empty());
    if let Some(value) = id_value {
        if is_css_identifier(value) {
            return Segment::Id(format!("#{}", value));
        }
        if !value.chars().any(is_unsafe_char) {
            return Segment::Id(format!("{}[id={}]", element.tag_name, css_string(value)));
        }
    }

    let mut selector = element.tag_name.clone();
    let mut specificity = 0u32;

    // an id with quote or angle characters only narrows the level
    if let Some(qualifier) = id_value.and_then(|value| attribute_selector("id", value)) {
        selector.push_str(&qualifier);
        specificity += ATTRIBUTE_SPECIFICITY;
    }

    if let Some(classes) = element.attribute("class") {
        for class in classes.split_whitespace() {
            if specificity >= SPECIFICITY_CEILING {
                break;
            }
            if is_css_identifier(class) {
                selector.push('.');
                selector.push_str(class);
                specificity += CLASS_SPECIFICITY;
            }
        }
    }

    for name in SAFE_ATTRIBUTES {
        if specificity >= SPECIFICITY_CEILING {
            break;
        }
        let Some(value) = element.attribute(name) else {
            continue;
        };
        if let Some(qualifier) = attribute_selector(name, value) {
            selector.push_str(&qualifier);
            specificity += ATTRIBUTE_SPECIFICITY;
        }
    }

    if specificity < NTH_OF_TYPE_THRESHOLD {
        if let Some(position) = tree.nth_of_type(id) {
            selector.push_str(&format!(":nth-of-type({})", position));
        }
    }

    Segment::Compound(selector)
}

/// Build the hop plan for `target`, or `None` if it is not an element.
pub fn build_selector_plan(tree: &DomTree, target: NodeId) -> Option<SelectorPlan> {
    tree.element(target)?;
    let chain = tree.chain(target);
    let mut hops = Vec::new();
    let mut parts: Vec<String> = Vec::new();

    for (position, id) in chain.iter().enumerate() {
        let element = tree.element(*id)?;
        match segment(tree, *id, element) {
            Segment::Id(selector) => {
                parts.clear();
                parts.push(selector);
            }
            Segment::Compound(selector) => parts.push(selector),
        }

        let Some(next) = chain.get(position + 1) else {
            break;
        };
        let enter = if element.is_iframe {
            Some(Boundary::Frame)
        } else if tree.element(*next).is_some_and(|n| n.shadow_child) {
            Some(Boundary::Shadow)
        } else {
            None
        };
        if let Some(boundary) = enter {
            hops.push(Hop {
                selector: parts.join(" > "),
                enter: Some(boundary),
            });
            parts.clear();
        }
    }

    hops.push(Hop {
        selector: parts.join(" > "),
        enter: None,
    });
    Some(SelectorPlan { hops })
}
