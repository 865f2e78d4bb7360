use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::index::trie::SearchTrie;

pub const UNKNOWN_VERSION: &str = "unknown";

fn unknown_version() -> String {
    UNKNOWN_VERSION.to_string()
}

/// Reverse index from a type's canonical path to the places referencing it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceIndex {
    aliases: BTreeMap<String, String>,
    alias_search_tree: SearchTrie,
    object_paths_to_uses: BTreeMap<String, Vec<String>>,
    object_search_tree: SearchTrie,
    #[serde(default = "unknown_version")]
    version: String,
}

impl Default for ReferenceIndex {
    fn default() -> Self {
        Self::new(unknown_version())
    }
}

impl ReferenceIndex {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            aliases: BTreeMap::new(),
            alias_search_tree: SearchTrie::new(),
            object_paths_to_uses: BTreeMap::new(),
            object_search_tree: SearchTrie::new(),
            version: version.into(),
        }
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn aliases(&self) -> &BTreeMap<String, String> {
        &self.aliases
    }

    pub fn object_paths_to_uses(&self) -> &BTreeMap<String, Vec<String>> {
        &self.object_paths_to_uses
    }

    /// Records `alias` as another name for `target`; later calls overwrite.
    pub fn record_alias(&mut self, alias: &str, target: &str) {
        if !self.aliases.contains_key(alias) {
            self.alias_search_tree.insert(alias);
        }

        self.aliases.insert(alias.to_string(), target.to_string());
    }

    /// Records that `using_path` references `target`.
    pub fn add_use(&mut self, target: &str, using_path: &str) {
        match self.object_paths_to_uses.get_mut(target) {
            Some(uses) => {
                if !uses.iter().any(|u| u == using_path) {
                    uses.push(using_path.to_string());
                }
            }
            None => {
                self.object_paths_to_uses
                    .insert(target.to_string(), vec![using_path.to_string()]);
                self.object_search_tree.insert(target);
            }
        }
    }

    /// References to an absolute path, matched case-sensitively.
    pub fn get_references(&self, path: &str) -> Option<&[String]> {
        if let Some(uses) = self.object_paths_to_uses.get(path) {
            return Some(uses.as_slice());
        }

        let target = self.aliases.get(path)?;
        self.object_paths_to_uses.get(target).map(Vec::as_slice)
    }

    /// Finds a type by partial path, case-insensitively.
    ///
    /// Canonical paths are searched before aliases; a matching alias is
    /// reported as the path it points to.
    pub fn search(&self, query: &str) -> Option<(&str, &[String])> {
        if let Some(path) = self.object_search_tree.find(query).and_then(|m| m.first().copied()) {
            if let Some((path, uses)) = self.object_paths_to_uses.get_key_value(path) {
                return Some((path.as_str(), uses.as_slice()));
            }
        }

        let alias = self.alias_search_tree.find(query)?.into_iter().next()?;
        let target = self.aliases.get(alias)?;
        self.object_paths_to_uses
            .get_key_value(target)
            .map(|(path, uses)| (path.as_str(), uses.as_slice()))
    }

    /// Every indexed path or alias whose trailing name matches the query's.
    pub fn search_paths(&self, query: &str) -> Vec<&str> {
        let mut paths = self.object_search_tree.candidates(query);
        paths.extend(self.alias_search_tree.candidates(query));
        paths
    }

    pub fn object_count(&self) -> usize {
        self.object_paths_to_uses.len()
    }

    pub fn alias_count(&self) -> usize {
        self.aliases.len()
    }
}
