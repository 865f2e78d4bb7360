use std::collections::BTreeSet;
use std::path::Path;

use ignore::WalkBuilder;

use crate::error::Result;
use crate::indexer::annotation::is_dotted_name;
use crate::indexer::modules::ModuleSource;
use crate::indexer::scope::is_public;

const PACKAGE_INIT: &str = "__init__";

/// Enumerates the submodules of a package from its directory tree.
pub struct ModuleWalker {
    extensions: Vec<&'static str>,
}

impl ModuleWalker {
    pub fn new(extensions: &[&'static str]) -> Self {
        Self {
            extensions: extensions.to_vec(),
        }
    }

    /// Every public submodule below `package`, in lexicographic order.
    ///
    /// Only directories holding an `__init__` file count as packages, and a
    /// module under a private package or with a private name is skipped.
    pub fn walk(&self, package: &ModuleSource) -> Result<Vec<String>> {
        let Some(package_dir) = package.package_dir() else {
            return Ok(Vec::new());
        };

        let mut found = BTreeSet::new();
        let walker = WalkBuilder::new(package_dir)
            .hidden(true)
            .parents(false)
            .git_ignore(false)
            .git_global(false)
            .git_exclude(false)
            .ignore(false)
            .sort_by_file_name(|a, b| a.cmp(b))
            .build();

        for entry in walker.flatten() {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }

            if let Some(name) = self.module_name(package_dir, &package.name, path) {
                found.insert(name);
            }
        }

        Ok(found.into_iter().collect())
    }

    fn module_name(&self, package_dir: &Path, package: &str, path: &Path) -> Option<String> {
        let extension = path.extension()?.to_str()?;
        if !self.extensions.contains(&extension) {
            return None;
        }

        let relative = path.strip_prefix(package_dir).ok()?;
        let mut segments = Vec::new();
        let mut dir = package_dir.to_path_buf();
        let components: Vec<&str> = relative
            .components()
            .map(|c| c.as_os_str().to_str())
            .collect::<Option<_>>()?;

        let (file, parents) = components.split_last()?;
        for parent in parents {
            dir.push(parent);
            if !is_module_segment(parent) || !self.is_package_dir(&dir) {
                return None;
            }
            segments.push(*parent);
        }

        let stem = Path::new(file).file_stem()?.to_str()?;
        if stem != PACKAGE_INIT {
            if !is_module_segment(stem) {
                return None;
            }
            segments.push(stem);
        }

        if segments.is_empty() {
            return None;
        }

        Some(format!("{}.{}", package, segments.join(".")))
    }

    fn is_package_dir(&self, dir: &Path) -> bool {
        self.extensions
            .iter()
            .any(|ext| dir.join(format!("{}.{}", PACKAGE_INIT, ext)).is_file())
    }
}

/// A public name that can appear in an import statement.
fn is_module_segment(segment: &str) -> bool {
    is_public(segment) && !segment.contains('.') && is_dotted_name(segment)
}
