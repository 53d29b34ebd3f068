//! Content hashes for element identity.
//!
//! Both digests are SHA-256 rendered as lowercase hex. Attribute maps are
//! `BTreeMap`s, so `key=value` pairs are concatenated in ascending key order.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

fn digest(input: &str) -> String {
    hex::encode(Sha256::digest(input.as_bytes()))
}

/// Hash of every `key=value` pair concatenated without separators.
pub fn hash_attributes(attributes: &BTreeMap<String, String>) -> String {
    let mut serialized = String::new();
    for (key, value) in attributes {
        serialized.push_str(key);
        serialized.push('=');
        serialized.push_str(value);
    }
    digest(&serialized)
}

/// Hash of the ancestor tag names joined with `/`.
pub fn hash_parent_branch_path<S: AsRef<str>>(path: &[S]) -> String {
    let joined = path
        .iter()
        .map(|segment| segment.as_ref())
        .collect::<Vec<_>>()
        .join("/");
    digest(&joined)
}

/// Index-independent identity of an element.
///
/// Two elements are the same logical element when both components match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementHash {
    pub branch_path_hash: String,
    pub attributes_hash: String,
}

impl ElementHash {
    pub fn new<S: AsRef<str>>(branch_path: &[S], attributes: &BTreeMap<String, String>) -> Self {
        Self {
            branch_path_hash: hash_parent_branch_path(branch_path),
            attributes_hash: hash_attributes(attributes),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EMPTY_SHA256: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

    fn attrs(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_empty_inputs_hash_empty_string() {
        assert_eq!(hash_attributes(&BTreeMap::new()), EMPTY_SHA256);
        assert_eq!(hash_parent_branch_path::<&str>(&[]), EMPTY_SHA256);
    }

    #[test]
    fn test_attribute_hash_ignores_insertion_order() {
        let mut first = BTreeMap::new();
        first.insert("id".to_string(), "go".to_string());
        first.insert("class".to_string(), "btn".to_string());
        let mut second = BTreeMap::new();
        second.insert("class".to_string(), "btn".to_string());
        second.insert("id".to_string(), "go".to_string());
        assert_eq!(hash_attributes(&first), hash_attributes(&second));
    }

    #[test]
    fn test_attribute_hash_concatenates_in_key_order() {
        // "class=btnid=go"
        let expected = digest("class=btnid=go");
        assert_eq!(
            hash_attributes(&attrs(&[("id", "go"), ("class", "btn")])),
            expected
        );
    }

    #[test]
    fn test_attribute_hash_is_value_sensitive() {
        assert_ne!(
            hash_attributes(&attrs(&[("id", "go")])),
            hash_attributes(&attrs(&[("id", "stop")]))
        );
    }

    #[test]
    fn test_branch_path_hash_is_order_sensitive() {
        let a = hash_parent_branch_path(&["div", "ul", "li"]);
        let b = hash_parent_branch_path(&["ul", "div", "li"]);
        assert_ne!(a, b);
        assert_eq!(a, digest("div/ul/li"));
        assert_eq!(a, hash_parent_branch_path(&vec!["div".to_string(), "ul".into(), "li".into()]));
    }

    #[test]
    fn test_hash_is_lowercase_hex() {
        let hash = hash_parent_branch_path(&["BODY"]);
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));
    }

    #[test]
    fn test_element_hash_components() {
        let hash = ElementHash::new(&["div", "button"], &attrs(&[("id", "go")]));
        assert_eq!(hash.branch_path_hash, hash_parent_branch_path(&["div", "button"]));
        assert_eq!(hash.attributes_hash, hash_attributes(&attrs(&[("id", "go")])));
    }
}
