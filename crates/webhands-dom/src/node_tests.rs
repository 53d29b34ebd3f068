use super::*;
use crate::hashing::hash_parent_branch_path;

fn element(tag: &str, attrs: &[(&str, &str)]) -> ElementNode {
    ElementNode {
        tag_name: tag.to_string(),
        attributes: attrs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
        is_visible: true,
        ..Default::default()
    }
}

fn text(content: &str) -> DomNode {
    DomNode::Text(TextNode {
        text: content.to_string(),
        is_visible: true,
        parent: None,
    })
}

/// body > div > (button#go "Go", ul > li, li > a "Next")
fn sample() -> (DomTree, NodeId, NodeId, NodeId) {
    let mut tree = DomTree::new(element("body", &[]));
    let div = tree.push(tree.root(), DomNode::Element(element("div", &[("class", "main")])));
    let mut go = element("button", &[("id", "go")]);
    go.highlight_index = Some(0);
    let button = tree.push(div, DomNode::Element(go));
    tree.push(button, text("Go"));
    let ul = tree.push(div, DomNode::Element(element("ul", &[])));
    tree.push(ul, DomNode::Element(element("li", &[])));
    let li = tree.push(ul, DomNode::Element(element("li", &[])));
    let mut next = element("a", &[("href", "/next")]);
    next.highlight_index = Some(1);
    let link = tree.push(li, DomNode::Element(next));
    tree.push(link, text("  Next "));
    (tree, button, li, link)
}

#[test]
fn test_push_links_parent_and_children() {
    let (tree, button, _, _) = sample();
    let div = tree.element(button).and_then(|b| b.parent).unwrap();
    assert!(tree.element(div).unwrap().children.contains(&button));
    assert_eq!(tree.element(div).unwrap().parent, Some(tree.root()));
}

#[test]
fn test_branch_path_excludes_root() {
    let (tree, button, _, link) = sample();
    assert_eq!(tree.branch_path(button), vec!["div", "button"]);
    assert_eq!(tree.branch_path(link), vec!["div", "ul", "li", "a"]);
    assert_eq!(tree.branch_path(tree.root()), vec!["body"]);
}

#[test]
fn test_element_hash_uses_branch_path() {
    let (tree, button, _, _) = sample();
    let hash = tree.element_hash(button).unwrap();
    assert_eq!(hash.branch_path_hash, hash_parent_branch_path(&["div", "button"]));
}

#[test]
fn test_ancestors_nearest_first() {
    let (tree, _, li, link) = sample();
    let ancestors = tree.ancestors(link);
    assert_eq!(ancestors[0], li);
    assert_eq!(*ancestors.last().unwrap(), tree.root());
}

#[test]
fn test_nth_of_type() {
    let (tree, button, li, _) = sample();
    assert_eq!(tree.nth_of_type(li), Some(2));
    assert_eq!(tree.nth_of_type(button), None);
    assert_eq!(tree.nth_of_type(tree.root()), None);
}

#[test]
fn test_elements_pre_order() {
    let (tree, _, _, _) = sample();
    let tags: Vec<&str> = tree
        .elements()
        .into_iter()
        .map(|id| tree.element(id).unwrap().tag_name.as_str())
        .collect();
    assert_eq!(tags, vec!["body", "div", "button", "ul", "li", "li", "a"]);
}

#[test]
fn test_clickable_elements_to_string() {
    let (tree, button, _, link) = sample();
    let mut map = SelectorMap::new();
    map.insert(0, button);
    map.insert(1, link);
    let listing = tree.clickable_elements_to_string(&map, &["id", "href"]);
    assert_eq!(
        listing,
        "[0]<button id=\"go\">Go</button>\n[1]<a href=\"/next\">Next</a>"
    );
}

#[test]
fn test_text_stops_at_nested_clickable() {
    let (tree, _, _, _) = sample();
    let div = NodeId(1);
    assert_eq!(tree.text_until_next_clickable(div), "");
}

#[test]
fn test_crosses_boundary() {
    let mut tree = DomTree::new(element("body", &[]));
    let mut frame = element("iframe", &[]);
    frame.is_iframe = true;
    let frame = tree.push(tree.root(), DomNode::Element(frame));
    let html = tree.push(frame, DomNode::Element(element("html", &[])));
    let mut host = element("my-widget", &[]);
    host.shadow_root = true;
    let host = tree.push(tree.root(), DomNode::Element(host));
    let mut inner = element("button", &[]);
    inner.shadow_child = true;
    let inner = tree.push(host, DomNode::Element(inner));
    let plain = tree.push(tree.root(), DomNode::Element(element("p", &[])));

    assert!(tree.crosses_boundary(html));
    assert!(tree.crosses_boundary(inner));
    assert!(!tree.crosses_boundary(frame));
    assert!(!tree.crosses_boundary(host));
    assert!(!tree.crosses_boundary(plain));
}

#[test]
fn test_is_file_uploader_depth() {
    let mut tree = DomTree::new(element("body", &[]));
    let label = tree.push(tree.root(), DomNode::Element(element("label", &[])));
    let span = tree.push(label, DomNode::Element(element("span", &[])));
    let div = tree.push(span, DomNode::Element(element("div", &[])));
    tree.push(div, DomNode::Element(element("input", &[("type", "file")])));

    assert!(tree.is_file_uploader(label, 3));
    assert!(!tree.is_file_uploader(label, 2));
    assert!(tree.is_file_uploader(span, 2));

    let accept = tree.push(tree.root(), DomNode::Element(element("div", &[("accept", "image/*")])));
    assert!(tree.is_file_uploader(accept, 0));
}
