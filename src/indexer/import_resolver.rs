//! Import resolution for Python modules
//!
//! Reads `import` / `from ... import` statements into [`ImportedName`]s and
//! assembles the per-module [`ImportTable`] mapping a locally used name to the
//! fully-qualified path it was imported from.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use tree_sitter::Node;

use crate::error::{IndexerError, Result};
use crate::indexer::modules::{ModuleCache, ModuleSource};
use crate::indexer::parser::ParsedFile;
use crate::indexer::scope::ModuleScope;

const TYPING_MODULES: &[&str] = &["typing", "typing_extensions"];
const TYPE_CHECKING: &str = "TYPE_CHECKING";

/// One name introduced by an import statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedName {
    /// Name as it is used in annotations (`a.b` for `import a.b`).
    pub alias: String,
    /// Fully-qualified path the alias stands for.
    pub target: String,
    /// Name bound in the module namespace (`a` for `import a.b`).
    pub bound: String,
    /// Path bound to `bound`.
    pub bound_target: String,
}

impl ImportedName {
    fn direct(alias: &str, target: String) -> Self {
        Self {
            alias: alias.to_string(),
            target: target.clone(),
            bound: alias.to_string(),
            bound_target: target,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportStatement {
    pub names: Vec<ImportedName>,
    /// Module of a `from x import *` statement.
    pub star_from: Option<String>,
}

/// Reads an import statement node; other nodes give `None`.
pub fn read_import(
    node: &Node,
    parsed: &ParsedFile,
    module: &ModuleSource,
) -> Result<Option<ImportStatement>> {
    match node.kind() {
        "import_statement" => {
            let mut statement = ImportStatement::default();
            let mut cursor = node.walk();
            for child in node.children_by_field_name("name", &mut cursor) {
                if let Some(name) = read_module_import(&child, parsed) {
                    statement.names.push(name);
                }
            }
            Ok(Some(statement))
        }
        "import_from_statement" => {
            let Some(module_node) = node.child_by_field_name("module_name") else {
                return Ok(None);
            };

            let from = match module_node.kind() {
                "relative_import" => read_relative_module(&module_node, parsed, module)?,
                _ => parsed.node_text(&module_node).to_string(),
            };

            let mut statement = ImportStatement::default();
            let mut cursor = node.walk();
            for child in node.named_children(&mut cursor) {
                if child.kind() == "wildcard_import" {
                    statement.star_from = Some(from.clone());
                }
            }

            let mut cursor = node.walk();
            for child in node.children_by_field_name("name", &mut cursor) {
                let (name, alias) = match child.kind() {
                    "aliased_import" => {
                        let name = child
                            .child_by_field_name("name")
                            .map(|n| parsed.node_text(&n));
                        let alias = child
                            .child_by_field_name("alias")
                            .map(|n| parsed.node_text(&n));
                        match (name, alias) {
                            (Some(name), Some(alias)) => (name, alias),
                            _ => continue,
                        }
                    }
                    _ => {
                        let name = parsed.node_text(&child);
                        (name, name)
                    }
                };

                statement
                    .names
                    .push(ImportedName::direct(alias, format!("{}.{}", from, name)));
            }

            Ok(Some(statement))
        }
        _ => Ok(None),
    }
}

fn read_module_import(node: &Node, parsed: &ParsedFile) -> Option<ImportedName> {
    match node.kind() {
        "aliased_import" => {
            let target = parsed.node_text(&node.child_by_field_name("name")?);
            let alias = parsed.node_text(&node.child_by_field_name("alias")?);
            Some(ImportedName::direct(alias, target.to_string()))
        }
        "dotted_name" => {
            let target = parsed.node_text(node);
            let head = target.split('.').next().unwrap_or(target);
            Some(ImportedName {
                alias: target.to_string(),
                target: target.to_string(),
                bound: head.to_string(),
                bound_target: head.to_string(),
            })
        }
        _ => None,
    }
}

fn read_relative_module(node: &Node, parsed: &ParsedFile, module: &ModuleSource) -> Result<String> {
    let mut depth = 0;
    let mut imported = None;

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        match child.kind() {
            "import_prefix" => depth += parsed.node_text(&child).matches('.').count(),
            "dotted_name" => imported = Some(parsed.node_text(&child)),
            _ => {}
        }
    }

    resolve_relative(&module.name, module.is_package, depth, imported)
}

/// Resolves the module named by a relative import.
///
/// The anchor is the importing module's package: the module itself for a
/// package `__init__`, otherwise its parent. Each dot past the first climbs
/// one more package.
pub fn resolve_relative(
    module: &str,
    is_package: bool,
    depth: usize,
    imported: Option<&str>,
) -> Result<String> {
    let segments: Vec<&str> = module.split('.').collect();
    let anchor_len = if is_package {
        segments.len()
    } else {
        segments.len() - 1
    };

    if depth == 0 || anchor_len < depth {
        return Err(IndexerError::InvalidRelativeImport {
            module: module.to_string(),
            depth,
        });
    }

    let mut base = segments[..anchor_len - (depth - 1)].join(".");
    if let Some(imported) = imported {
        base.push('.');
        base.push_str(imported);
    }

    Ok(base)
}

/// Recognizes `if TYPE_CHECKING:` guards and their aliased spellings.
#[derive(Debug, Clone)]
pub struct TypeCheckingGuard {
    typing_modules: BTreeSet<String>,
    flags: BTreeSet<String>,
}

impl Default for TypeCheckingGuard {
    fn default() -> Self {
        Self {
            typing_modules: TYPING_MODULES.iter().map(|m| m.to_string()).collect(),
            flags: [TYPE_CHECKING.to_string()].into_iter().collect(),
        }
    }
}

impl TypeCheckingGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Picks up `import typing as t` and `from typing import TYPE_CHECKING as TC`.
    pub fn observe(&mut self, name: &ImportedName) {
        if TYPING_MODULES.contains(&name.target.as_str()) {
            self.typing_modules.insert(name.alias.clone());
            return;
        }

        if let Some((module, flag)) = name.target.rsplit_once('.') {
            if flag == TYPE_CHECKING && TYPING_MODULES.contains(&module) {
                self.flags.insert(name.alias.clone());
            }
        }
    }

    pub fn is_guard(&self, condition: &str) -> bool {
        let condition = condition.trim();
        if self.flags.contains(condition) {
            return true;
        }

        condition
            .rsplit_once('.')
            .is_some_and(|(module, flag)| {
                flag == TYPE_CHECKING && self.typing_modules.contains(module)
            })
    }
}

/// Locally used name → fully-qualified path for one module.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportTable {
    entries: BTreeMap<String, String>,
}

impl ImportTable {
    pub fn insert(&mut self, alias: String, target: String) {
        self.entries.insert(alias, target);
    }

    pub fn get(&self, alias: &str) -> Option<&str> {
        self.entries.get(alias).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Expands a dotted annotation through its longest imported prefix.
    pub fn resolve_dotted(&self, annotation: &str) -> Option<String> {
        if let Some(target) = self.get(annotation) {
            return Some(target.to_string());
        }

        let mut end = annotation.len();
        while let Some(index) = annotation[..end].rfind('.') {
            let (key, rest) = annotation.split_at(index);
            if let Some(target) = self.get(key) {
                return Some(format!("{}{}", target, rest));
            }
            end = index;
        }

        None
    }
}

/// Builds and caches import tables for the modules of one indexing run.
#[derive(Default)]
pub struct ImportResolver {
    tables: HashMap<String, Arc<ImportTable>>,
}

impl ImportResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resolve_imports(
        &mut self,
        module: &str,
        modules: &mut ModuleCache,
        scope: &ModuleScope,
    ) -> Result<Arc<ImportTable>> {
        if let Some(table) = self.tables.get(module) {
            return Ok(table.clone());
        }

        let symbols = modules.require(module)?;
        let mut table = ImportTable::default();
        for name in &symbols.imports {
            if scope.is_tracked(&name.target) {
                table.insert(name.alias.clone(), name.target.clone());
            }
        }

        let table = Arc::new(table);
        self.tables.insert(module.to_string(), table.clone());
        Ok(table)
    }

    pub fn clear(&mut self) {
        self.tables.clear();
    }
}
