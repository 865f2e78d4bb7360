//! C3 linearization over statically resolved class hierarchies

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use thiserror::Error;

use crate::indexer::symbols::ClassDecl;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MroError {
    #[error("inconsistent hierarchy for class '{0}': cannot compute MRO")]
    InconsistentHierarchy(String),

    #[error("circular inheritance through class '{0}'")]
    CircularInheritance(String),
}

pub type Mro = Arc<Vec<Arc<ClassDecl>>>;

/// Linearizations computed during one indexing run, keyed by canonical path.
#[derive(Default)]
pub struct MroCache {
    results: HashMap<String, Result<Mro, MroError>>,
    in_progress: HashSet<String>,
}

impl MroCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, class_path: &str) -> Option<&Result<Mro, MroError>> {
        self.results.get(class_path)
    }

    /// Marks a class as being linearized. Returns false if it already was.
    pub fn enter(&mut self, class_path: &str) -> bool {
        self.in_progress.insert(class_path.to_string())
    }

    pub fn finish(&mut self, class_path: &str, result: Result<Mro, MroError>) -> Result<Mro, MroError> {
        self.in_progress.remove(class_path);
        self.results.insert(class_path.to_string(), result.clone());
        result
    }
}

/// Linearizes `class` given the MROs of its resolved bases, in base order.
pub fn linearize(class: &Arc<ClassDecl>, bases: &[Mro]) -> Result<Mro, MroError> {
    let mut by_path: HashMap<String, Arc<ClassDecl>> = HashMap::new();
    let mut seqs: Vec<Vec<String>> = Vec::new();

    for base in bases {
        let mut seq = Vec::with_capacity(base.len());
        for entry in base.iter() {
            let path = entry.canonical_path();
            by_path.entry(path.clone()).or_insert_with(|| entry.clone());
            seq.push(path);
        }
        seqs.push(seq);
    }

    seqs.push(
        bases
            .iter()
            .filter_map(|base| base.first().map(|b| b.canonical_path()))
            .collect(),
    );

    let merged = c3_merge(seqs)
        .ok_or_else(|| MroError::InconsistentHierarchy(class.canonical_path()))?;

    let mut mro = Vec::with_capacity(merged.len() + 1);
    mro.push(class.clone());
    for path in merged {
        if let Some(entry) = by_path.remove(&path) {
            mro.push(entry);
        }
    }

    Ok(Arc::new(mro))
}

/// C3 merge of linearizations; `None` if no consistent order exists.
pub fn c3_merge(mut seqs: Vec<Vec<String>>) -> Option<Vec<String>> {
    let mut result = Vec::new();

    loop {
        seqs.retain(|seq| !seq.is_empty());
        if seqs.is_empty() {
            return Some(result);
        }

        let candidate = seqs
            .iter()
            .map(|seq| &seq[0])
            .find(|head| !seqs.iter().any(|s| s[1..].contains(*head)))?
            .clone();

        for seq in seqs.iter_mut() {
            if seq.first() == Some(&candidate) {
                seq.remove(0);
            }
        }
        result.push(candidate);
    }
}
