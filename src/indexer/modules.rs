//! Module location and the per-run symbol table cache
//!
//! A [`ModuleLocator`] plays the part of `sys.path`: it maps dotted module
//! names onto source files below a list of source roots. The [`ModuleCache`]
//! parses each located module at most once per indexing run and keeps the
//! resulting [`ModuleSymbols`] for the lifetime of the run.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{IndexerError, Result};
use crate::indexer::annotation::is_dotted_name;
use crate::indexer::parser::Parser;
use crate::indexer::symbols::{ModuleSymbols, SymbolTableBuilder};

const PACKAGE_INIT: &str = "__init__";

/// A module's dotted name and the file it is declared in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleSource {
    pub name: String,
    pub path: PathBuf,
    /// Whether `path` is a package's `__init__` file.
    pub is_package: bool,
}

impl ModuleSource {
    /// Directory holding the package's submodules.
    pub fn package_dir(&self) -> Option<&Path> {
        if self.is_package {
            self.path.parent()
        } else {
            None
        }
    }
}

pub struct ModuleLocator {
    roots: Vec<PathBuf>,
    extensions: Vec<&'static str>,
}

impl ModuleLocator {
    pub fn new(roots: Vec<PathBuf>, extensions: &[&'static str]) -> Self {
        Self {
            roots,
            extensions: extensions.to_vec(),
        }
    }

    pub fn extensions(&self) -> &[&'static str] {
        &self.extensions
    }

    /// Finds the source file for a module; packages win over plain modules.
    pub fn locate(&self, name: &str) -> Option<ModuleSource> {
        if !is_dotted_name(name) {
            return None;
        }

        let relative: PathBuf = name.split('.').collect();
        for root in &self.roots {
            let package_dir = root.join(&relative);
            for ext in &self.extensions {
                let init = package_dir.join(format!("{}.{}", PACKAGE_INIT, ext));
                if init.is_file() {
                    return Some(ModuleSource {
                        name: name.to_string(),
                        path: init,
                        is_package: true,
                    });
                }
            }

            for ext in &self.extensions {
                let file = package_dir.with_extension(ext);
                if file.is_file() {
                    return Some(ModuleSource {
                        name: name.to_string(),
                        path: file,
                        is_package: false,
                    });
                }
            }
        }

        None
    }
}

/// Symbol tables for every module touched during one indexing run.
pub struct ModuleCache {
    locator: ModuleLocator,
    parser: Parser,
    sources: HashMap<String, Option<ModuleSource>>,
    loaded: HashMap<String, Arc<ModuleSymbols>>,
    broken: HashSet<String>,
}

impl ModuleCache {
    pub fn new(roots: Vec<PathBuf>) -> Self {
        let parser = Parser::python();
        let locator = ModuleLocator::new(roots, parser.grammar().file_extensions());
        Self {
            locator,
            parser,
            sources: HashMap::new(),
            loaded: HashMap::new(),
            broken: HashSet::new(),
        }
    }

    pub fn locator(&self) -> &ModuleLocator {
        &self.locator
    }

    pub fn source(&mut self, name: &str) -> Option<ModuleSource> {
        if let Some(source) = self.sources.get(name) {
            return source.clone();
        }

        let source = self.locator.locate(name);
        self.sources.insert(name.to_string(), source.clone());
        source
    }

    pub fn is_module(&mut self, name: &str) -> bool {
        self.source(name).is_some()
    }

    /// Loads a module's symbol table, failing if it has no source file.
    pub fn require(&mut self, name: &str) -> Result<Arc<ModuleSymbols>> {
        if let Some(symbols) = self.loaded.get(name) {
            return Ok(symbols.clone());
        }

        let source = self.source(name).ok_or_else(|| IndexerError::MissingSource {
            module: name.to_string(),
        })?;

        let parsed = self.parser.parse_file(&source.path)?;
        let symbols = Arc::new(SymbolTableBuilder::new(&parsed, &source).build()?);
        self.broken.remove(name);
        self.loaded.insert(name.to_string(), symbols.clone());
        Ok(symbols)
    }

    /// Loads a module's symbol table for lookups that may miss.
    ///
    /// Modules which are not locatable give `None`; modules which fail to
    /// parse are logged once and then treated as missing.
    pub fn lookup(&mut self, name: &str) -> Option<Arc<ModuleSymbols>> {
        if let Some(symbols) = self.loaded.get(name) {
            return Some(symbols.clone());
        }

        if self.broken.contains(name) || !self.is_module(name) {
            return None;
        }

        match self.require(name) {
            Ok(symbols) => Some(symbols),
            Err(e) => {
                tracing::warn!("Failed to load module {}: {}", name, e);
                self.broken.insert(name.to_string());
                None
            }
        }
    }
}
