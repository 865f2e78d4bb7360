//! Static attribute resolution across module symbol tables
//!
//! Stands in for importing a module and walking it with `getattr`: a dotted
//! path is split at its longest locatable module prefix and the remaining
//! segments are looked up in symbol tables, following imports, simple
//! assignments and star imports, and class members through the MRO.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::indexer::modules::ModuleCache;
use crate::indexer::mro::{linearize, Mro, MroCache, MroError};
use crate::indexer::scope::is_public;
use crate::indexer::symbols::{Binding, ClassDecl, FunctionDecl};

const MAX_RESOLUTION_DEPTH: usize = 32;

/// What a dotted path ends up pointing at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Module(String),
    Class(Arc<ClassDecl>),
    Function(Arc<FunctionDecl>),
}

impl Target {
    pub fn canonical_path(&self) -> String {
        match self {
            Target::Module(name) => name.clone(),
            Target::Class(class) => class.canonical_path(),
            Target::Function(function) => function.canonical_path(),
        }
    }

    /// Whether this is a declaration which can be referenced.
    pub fn is_declaration(&self) -> bool {
        !matches!(self, Target::Module(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub target: Target,
    /// Re-exports followed on the way, as `(module.name, canonical path)`.
    pub hops: Vec<(String, String)>,
}

pub struct PathResolver<'r> {
    modules: &'r mut ModuleCache,
    mros: &'r mut MroCache,
}

impl<'r> PathResolver<'r> {
    pub fn new(modules: &'r mut ModuleCache, mros: &'r mut MroCache) -> Self {
        Self { modules, mros }
    }

    /// Resolves an absolute dotted path.
    pub fn resolve(&mut self, path: &str) -> Option<Resolution> {
        let mut hops = Vec::new();
        let target = self.resolve_path(path, &mut hops, 0)?;
        Some(Resolution { target, hops })
    }

    /// Resolves a dotted name as it would be evaluated inside `module`.
    pub fn resolve_in_module(&mut self, module: &str, name: &str) -> Option<Resolution> {
        let mut hops = Vec::new();
        let target = self.walk_attributes(Target::Module(module.to_string()), name, &mut hops, 0)?;
        Some(Resolution { target, hops })
    }

    fn resolve_path(&mut self, path: &str, hops: &mut Vec<(String, String)>, depth: usize) -> Option<Target> {
        let mut split = path.len();
        loop {
            let prefix = &path[..split];
            if self.modules.is_module(prefix) {
                let rest = path.get(split + 1..).unwrap_or("");
                let owner = Target::Module(prefix.to_string());
                return if rest.is_empty() {
                    Some(owner)
                } else {
                    self.walk_attributes(owner, rest, hops, depth)
                };
            }

            split = prefix.rfind('.')?;
        }
    }

    fn walk_attributes(
        &mut self,
        mut owner: Target,
        attributes: &str,
        hops: &mut Vec<(String, String)>,
        depth: usize,
    ) -> Option<Target> {
        for attribute in attributes.split('.') {
            owner = self.attribute(&owner, attribute, hops, depth)?;
        }

        Some(owner)
    }

    fn attribute(
        &mut self,
        owner: &Target,
        name: &str,
        hops: &mut Vec<(String, String)>,
        depth: usize,
    ) -> Option<Target> {
        if depth > MAX_RESOLUTION_DEPTH {
            tracing::debug!("Giving up resolving {}.{}: too many hops", owner.canonical_path(), name);
            return None;
        }

        match owner {
            Target::Module(module) => self.module_attribute(module, name, hops, depth),
            Target::Class(class) => {
                let mro = self.mro(class).unwrap_or_else(|_| Arc::new(vec![class.clone()]));
                mro.iter().find_map(|entry| match entry.members.get(name) {
                    Some(Binding::Class(class)) => Some(Target::Class(class.clone())),
                    Some(Binding::Function(function)) => Some(Target::Function(function.clone())),
                    _ => None,
                })
            }
            Target::Function(_) => None,
        }
    }

    fn module_attribute(
        &mut self,
        module: &str,
        name: &str,
        hops: &mut Vec<(String, String)>,
        depth: usize,
    ) -> Option<Target> {
        let symbols = self.modules.lookup(module);

        if let Some(binding) = symbols.as_ref().and_then(|s| s.get(name)) {
            let target = match binding {
                Binding::Class(class) => Some(Target::Class(class.clone())),
                Binding::Function(function) => Some(Target::Function(function.clone())),
                Binding::Import(path) => self.resolve_path(path, hops, depth + 1),
                Binding::Alias(expression) => {
                    let owner = Target::Module(module.to_string());
                    self.walk_attributes(owner, expression, hops, depth + 1)
                }
                Binding::Value => None,
            };

            if let Some(target) = &target {
                if matches!(binding, Binding::Import(_) | Binding::Alias(_)) && target.is_declaration() {
                    hops.push((format!("{}.{}", module, name), target.canonical_path()));
                }
            }

            // A bound name shadows submodules and star imports
            return target;
        }

        let submodule = format!("{}.{}", module, name);
        if self.modules.is_module(&submodule) {
            return Some(Target::Module(submodule));
        }

        if !is_public(name) {
            return None;
        }

        let star_imports = symbols.map(|s| s.star_imports.clone()).unwrap_or_default();
        for star in star_imports {
            let owner = Target::Module(star);
            if let Some(target) = self.attribute(&owner, name, hops, depth + 1) {
                return Some(target);
            }
        }

        None
    }

    /// C3 linearization of `class`, most-derived first.
    ///
    /// Bases which cannot be resolved to a class declaration are left out.
    pub fn mro(&mut self, class: &Arc<ClassDecl>) -> Result<Mro, MroError> {
        let key = class.canonical_path();
        if let Some(result) = self.mros.get(&key) {
            return result.clone();
        }

        if !self.mros.enter(&key) {
            return Err(MroError::CircularInheritance(key));
        }

        let mut bases = Vec::new();
        let mut failure = None;
        for base in &class.bases {
            let (head, rest) = match base.split_once('.') {
                Some((head, rest)) => (head, Some(rest)),
                None => (base.as_str(), None),
            };
            let resolved = match (class.base_imports.get(head), rest) {
                (Some(target), Some(rest)) => self.resolve(&format!("{}.{}", target, rest)),
                (Some(target), None) => self.resolve(target),
                (None, _) => self.resolve_in_module(&class.module, base),
            };
            let Some(Resolution {
                target: Target::Class(base_class),
                ..
            }) = resolved
            else {
                continue;
            };

            match self.mro(&base_class) {
                Ok(mro) => bases.push(mro),
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            }
        }

        let result = match failure {
            Some(e) => Err(e),
            None => linearize(class, &bases),
        };
        self.mros.finish(&key, result)
    }

    /// Members visible on `class`, each paired with the class declaring it.
    ///
    /// Earlier classes in the MRO shadow later ones. A class whose MRO cannot
    /// be computed only exposes its own members.
    pub fn class_members(&mut self, class: &Arc<ClassDecl>) -> BTreeMap<String, (Arc<ClassDecl>, Binding)> {
        let mro = self.mro(class).unwrap_or_else(|_| Arc::new(vec![class.clone()]));

        let mut members = BTreeMap::new();
        for entry in mro.iter() {
            for (name, binding) in &entry.members {
                members
                    .entry(name.clone())
                    .or_insert_with(|| (entry.clone(), binding.clone()));
            }
        }

        members
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn create_file(dir: &Path, name: &str, content: &str) {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    fn create_package() -> TempDir {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        create_file(
            root,
            "pkg/__init__.py",
            "from .api import *\nfrom .impl.rest import RESTClient as Client\nDefault = Client\n",
        );
        create_file(root, "pkg/api.py", "class RESTClient:\n    def fetch(self) -> str: ...\n");
        create_file(root, "pkg/impl/__init__.py", "");
        create_file(
            root,
            "pkg/impl/rest.py",
            "from pkg import api\n\nclass RESTClient(api.RESTClient):\n    def close(self) -> None: ...\n",
        );
        temp_dir
    }

    fn canonical(resolution: Option<Resolution>) -> Option<String> {
        resolution.map(|r| r.target.canonical_path())
    }

    #[test]
    fn test_resolve_module_and_submodule() {
        let temp_dir = create_package();
        let mut modules = ModuleCache::new(vec![temp_dir.path().to_path_buf()]);
        let mut mros = MroCache::new();
        let mut resolver = PathResolver::new(&mut modules, &mut mros);

        assert_eq!(
            resolver.resolve("pkg.impl").map(|r| r.target),
            Some(Target::Module("pkg.impl".to_string()))
        );
        assert_eq!(canonical(resolver.resolve("pkg.impl.rest.RESTClient")).as_deref(), Some("pkg.impl.rest.RESTClient"));
        assert!(resolver.resolve("elsewhere.Thing").is_none());
        assert!(resolver.resolve("pkg.Missing").is_none());
    }

    #[test]
    fn test_resolve_reexport_records_hops() {
        let temp_dir = create_package();
        let mut modules = ModuleCache::new(vec![temp_dir.path().to_path_buf()]);
        let mut mros = MroCache::new();
        let mut resolver = PathResolver::new(&mut modules, &mut mros);

        let resolution = resolver.resolve("pkg.Default").unwrap();
        assert_eq!(resolution.target.canonical_path(), "pkg.impl.rest.RESTClient");
        assert_eq!(
            resolution.hops,
            vec![
                ("pkg.Client".to_string(), "pkg.impl.rest.RESTClient".to_string()),
                ("pkg.Default".to_string(), "pkg.impl.rest.RESTClient".to_string()),
            ]
        );
    }

    #[test]
    fn test_resolve_through_star_import() {
        let temp_dir = TempDir::new().unwrap();
        create_file(temp_dir.path(), "pkg/__init__.py", "from .api import *\n");
        create_file(temp_dir.path(), "pkg/api.py", "class RESTClient:\n    pass\n");
        let mut modules = ModuleCache::new(vec![temp_dir.path().to_path_buf()]);
        let mut mros = MroCache::new();
        let mut resolver = PathResolver::new(&mut modules, &mut mros);

        let resolution = resolver.resolve("pkg.RESTClient").unwrap();
        assert_eq!(resolution.target.canonical_path(), "pkg.api.RESTClient");
        assert!(resolution.hops.is_empty());
    }

    #[test]
    fn test_resolve_inherited_method() {
        let temp_dir = create_package();
        let mut modules = ModuleCache::new(vec![temp_dir.path().to_path_buf()]);
        let mut mros = MroCache::new();
        let mut resolver = PathResolver::new(&mut modules, &mut mros);

        assert_eq!(
            canonical(resolver.resolve("pkg.impl.rest.RESTClient.fetch")).as_deref(),
            Some("pkg.api.RESTClient.fetch")
        );
    }

    #[test]
    fn test_class_members_through_mro() {
        let temp_dir = create_package();
        let mut modules = ModuleCache::new(vec![temp_dir.path().to_path_buf()]);
        let mut mros = MroCache::new();
        let mut resolver = PathResolver::new(&mut modules, &mut mros);

        let Some(Resolution {
            target: Target::Class(class),
            ..
        }) = resolver.resolve("pkg.impl.rest.RESTClient")
        else {
            panic!("expected class");
        };

        let members = resolver.class_members(&class);
        let owners: Vec<_> = members
            .iter()
            .map(|(name, (owner, _))| (name.as_str(), owner.canonical_path()))
            .collect();
        assert_eq!(
            owners,
            vec![
                ("close", "pkg.impl.rest.RESTClient".to_string()),
                ("fetch", "pkg.api.RESTClient".to_string()),
            ]
        );
    }

    #[test]
    fn test_mro_cycle_is_reported() {
        let temp_dir = TempDir::new().unwrap();
        create_file(
            temp_dir.path(),
            "cyclic.py",
            "class A(B):\n    pass\n\nclass B(A):\n    pass\n",
        );
        let mut modules = ModuleCache::new(vec![temp_dir.path().to_path_buf()]);
        let mut mros = MroCache::new();
        let mut resolver = PathResolver::new(&mut modules, &mut mros);

        let Some(Resolution {
            target: Target::Class(class),
            ..
        }) = resolver.resolve("cyclic.A")
        else {
            panic!("expected class");
        };

        assert!(matches!(
            resolver.mro(&class),
            Err(MroError::CircularInheritance(_))
        ));
        assert_eq!(resolver.class_members(&class).len(), 0);
    }

    #[test]
    fn test_mro_of_class_shadowing_its_base() {
        let temp_dir = TempDir::new().unwrap();
        create_file(temp_dir.path(), "pkg/__init__.py", "");
        create_file(temp_dir.path(), "pkg/base.py", "class Foo:\n    def fetch(self) -> str: ...\n");
        create_file(
            temp_dir.path(),
            "pkg/ext.py",
            "from pkg.base import Foo\n\nclass Foo(Foo):\n    pass\n",
        );
        let mut modules = ModuleCache::new(vec![temp_dir.path().to_path_buf()]);
        let mut mros = MroCache::new();
        let mut resolver = PathResolver::new(&mut modules, &mut mros);

        let Some(Resolution {
            target: Target::Class(class),
            ..
        }) = resolver.resolve("pkg.ext.Foo")
        else {
            panic!("expected class");
        };

        let mro = resolver.mro(&class).unwrap();
        let paths: Vec<_> = mro.iter().map(|c| c.canonical_path()).collect();
        assert_eq!(paths, vec!["pkg.ext.Foo", "pkg.base.Foo"]);
        assert_eq!(
            canonical(resolver.resolve("pkg.ext.Foo.fetch")).as_deref(),
            Some("pkg.base.Foo.fetch")
        );
    }

    #[test]
    fn test_unresolved_bases_are_skipped() {
        let temp_dir = TempDir::new().unwrap();
        create_file(
            temp_dir.path(),
            "models.py",
            "import abc\n\nclass Base(abc.ABC):\n    pass\n\nclass Child(Base, object):\n    pass\n",
        );
        let mut modules = ModuleCache::new(vec![temp_dir.path().to_path_buf()]);
        let mut mros = MroCache::new();
        let mut resolver = PathResolver::new(&mut modules, &mut mros);

        let Some(Resolution {
            target: Target::Class(class),
            ..
        }) = resolver.resolve("models.Child")
        else {
            panic!("expected class");
        };

        let mro = resolver.mro(&class).unwrap();
        let paths: Vec<_> = mro.iter().map(|c| c.canonical_path()).collect();
        assert_eq!(paths, vec!["models.Child", "models.Base"]);
    }
}
