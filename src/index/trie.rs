//! Character trie over the lower-cased trailing names of dotted paths
//!
//! Serialized as nested JSON objects keyed by single characters, where the
//! `_link` key of a node lists every path whose trailing name spells out the
//! characters leading to that node.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

const LINK_KEY: &str = "_link";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrieNode {
    children: BTreeMap<char, TrieNode>,
    links: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SearchTrie {
    root: TrieNode,
}

fn trailing_name(path: &str) -> &str {
    path.rsplit('.').next().unwrap_or(path)
}

/// Whether `path` ends with `query` at a segment boundary.
fn matches_suffix(path: &str, query: &str, case_sensitive: bool) -> bool {
    if path.len() < query.len() || !path.is_char_boundary(path.len() - query.len()) {
        return false;
    }

    let (head, tail) = path.split_at(path.len() - query.len());
    let equal = if case_sensitive {
        tail == query
    } else {
        tail.to_lowercase() == query.to_lowercase()
    };

    equal && (head.is_empty() || head.ends_with('.'))
}

impl SearchTrie {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.root.children.is_empty() && self.root.links.is_empty()
    }

    pub fn insert(&mut self, path: &str) {
        let mut node = &mut self.root;
        for c in trailing_name(path).to_lowercase().chars() {
            node = node.children.entry(c).or_default();
        }

        if !node.links.iter().any(|link| link == path) {
            node.links.push(path.to_string());
        }
    }

    fn node(&self, query: &str) -> Option<&TrieNode> {
        let name = trailing_name(query);
        if name.is_empty() {
            return None;
        }

        let mut node = &self.root;
        for c in name.to_lowercase().chars() {
            node = node.children.get(&c)?;
        }

        Some(node)
    }

    /// Every stored path sharing the query's trailing name, in insertion order.
    pub fn candidates(&self, query: &str) -> Vec<&str> {
        self.node(query)
            .map(|node| node.links.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Stored paths ending with `query`.
    ///
    /// Exact-case matches are returned if there are any, otherwise the
    /// case-insensitive ones. `None` when nothing matches.
    pub fn find(&self, query: &str) -> Option<Vec<&str>> {
        let node = self.node(query)?;

        let exact: Vec<&str> = node
            .links
            .iter()
            .filter(|link| matches_suffix(link, query, true))
            .map(String::as_str)
            .collect();
        if !exact.is_empty() {
            return Some(exact);
        }

        let folded: Vec<&str> = node
            .links
            .iter()
            .filter(|link| matches_suffix(link, query, false))
            .map(String::as_str)
            .collect();
        if folded.is_empty() {
            None
        } else {
            Some(folded)
        }
    }
}

impl Serialize for TrieNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let has_links = !self.links.is_empty();
        let mut map = serializer.serialize_map(Some(self.children.len() + usize::from(has_links)))?;

        let mut key = [0u8; 4];
        for (c, child) in &self.children {
            map.serialize_entry(c.encode_utf8(&mut key), child)?;
        }

        if has_links {
            map.serialize_entry(LINK_KEY, &self.links)?;
        }

        map.end()
    }
}

impl<'de> Deserialize<'de> for TrieNode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(TrieNodeVisitor)
    }
}

struct TrieNodeVisitor;

impl<'de> Visitor<'de> for TrieNodeVisitor {
    type Value = TrieNode;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a search trie node")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut node = TrieNode::default();

        while let Some(key) = access.next_key::<String>()? {
            if key == LINK_KEY {
                node.links = access.next_value()?;
                continue;
            }

            let mut chars = key.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => {
                    node.children.insert(c, access.next_value()?);
                }
                _ => {
                    return Err(de::Error::invalid_value(
                        de::Unexpected::Str(&key),
                        &"a single character or \"_link\"",
                    ))
                }
            }
        }

        Ok(node)
    }
}
