use std::collections::HashSet;
use std::path::PathBuf;

use crate::error::{IndexerError, Result};
use crate::index::{IndexArtifact, ReferenceIndex, UNKNOWN_VERSION};
use crate::indexer::import_resolver::ImportResolver;
use crate::indexer::modules::ModuleCache;
use crate::indexer::mro::MroCache;
use crate::indexer::scope::ModuleScope;
use crate::indexer::walker::ModuleWalker;

/// Inputs for one index generation run.
#[derive(Debug, Clone)]
pub struct GenerateOptions {
    /// Directories modules are looked up in, in priority order.
    pub source_roots: Vec<PathBuf>,
    /// Modules whose declarations have their references tracked, with all
    /// their submodules.
    pub index_modules: Vec<String>,
    /// Modules whose declarations are walked for references, with all their
    /// submodules.
    pub scan_modules: Vec<String>,
    pub track_builtins: bool,
    pub track_3rd_party: bool,
    pub package_version: Option<String>,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            source_roots: vec![PathBuf::from(".")],
            index_modules: Vec::new(),
            scan_modules: Vec::new(),
            track_builtins: true,
            track_3rd_party: true,
            package_version: None,
        }
    }
}

/// Run context of one index generation.
///
/// Owns the per-run caches (symbol tables, import tables, MROs) next to the
/// index being built.
pub struct IndexBuilder {
    pub(crate) scope: ModuleScope,
    pub(crate) modules: ModuleCache,
    pub(crate) imports: ImportResolver,
    pub(crate) mros: MroCache,
    pub(crate) index: ReferenceIndex,
    pub(crate) track_builtins: bool,
    /// Classes currently being walked.
    pub(crate) walking: HashSet<String>,
    indexed_modules: Vec<String>,
    walker: ModuleWalker,
}

impl IndexBuilder {
    pub fn new(source_roots: Vec<PathBuf>, track_builtins: bool, track_3rd_party: bool, version: impl Into<String>) -> Self {
        let modules = ModuleCache::new(source_roots);
        let walker = ModuleWalker::new(modules.locator().extensions());

        Self {
            scope: ModuleScope::new(track_3rd_party),
            modules,
            imports: ImportResolver::new(),
            mros: MroCache::new(),
            index: ReferenceIndex::new(version),
            track_builtins,
            walking: HashSet::new(),
            indexed_modules: Vec::new(),
            walker,
        }
    }

    pub fn index(&self) -> &ReferenceIndex {
        &self.index
    }

    pub fn scope(&self) -> &ModuleScope {
        &self.scope
    }

    pub fn indexed_modules(&self) -> &[String] {
        &self.indexed_modules
    }

    /// Adds a module to the set whose declarations have their uses tracked.
    pub fn index_module(&mut self, name: &str, recursive: bool) -> Result<&mut Self> {
        let source = self
            .modules
            .source(name)
            .ok_or_else(|| IndexerError::ModuleNotFound(name.to_string()))?;

        tracing::info!("Indexing {}", name);
        if !self.indexed_modules.iter().any(|m| m == name) {
            self.indexed_modules.push(name.to_string());
        }

        if self.scope.register(name) {
            // Import tables only hold imports from tracked libraries
            self.imports.clear();
        }

        if recursive {
            for submodule in self.walker.walk(&source)? {
                self.index_module(&submodule, false)?;
            }
        }

        Ok(self)
    }

    /// Scans every module added through [`IndexBuilder::index_module`].
    pub fn scan_indexed_modules(&mut self) -> Result<&mut Self> {
        let modules = self.indexed_modules.clone();
        for module in modules {
            self.scan_module(&module, false)?;
        }

        Ok(self)
    }

    pub(crate) fn submodules(&mut self, name: &str) -> Result<Vec<String>> {
        let source = self
            .modules
            .source(name)
            .ok_or_else(|| IndexerError::ModuleNotFound(name.to_string()))?;
        self.walker.walk(&source)
    }

    pub fn into_index(self) -> ReferenceIndex {
        self.index
    }
}

/// Builds a reference index for `options`.
pub fn generate(options: &GenerateOptions) -> Result<IndexArtifact> {
    let version = options
        .package_version
        .clone()
        .unwrap_or_else(|| UNKNOWN_VERSION.to_string());

    let mut builder = IndexBuilder::new(
        options.source_roots.clone(),
        options.track_builtins,
        options.track_3rd_party,
        version,
    );

    for module in &options.index_modules {
        builder.index_module(module, true)?;
    }

    for module in &options.scan_modules {
        builder.scan_module(module, true)?;
    }

    let index = builder.into_index();
    tracing::info!(
        "Indexed {} types and {} aliases",
        index.object_count(),
        index.alias_count()
    );
    Ok(index)
}
