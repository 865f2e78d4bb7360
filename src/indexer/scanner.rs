//! Walks declarations and records the types their annotations reference

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use crate::error::{IndexerError, Result};
use crate::indexer::annotation::{decompose, normalize_annotation, Annotation};
use crate::indexer::builder::IndexBuilder;
use crate::indexer::builtins::{builtin_path, is_builtin, typing_container_builtin};
use crate::indexer::resolve::{PathResolver, Target};
use crate::indexer::scope::is_public;
use crate::indexer::symbols::{Binding, ClassDecl, FunctionDecl, ModuleSymbols};

impl IndexBuilder {
    /// Scans a module's public declarations for type references.
    pub fn scan_module(&mut self, name: &str, recursive: bool) -> Result<&mut Self> {
        if !self.modules.is_module(name) {
            return Err(IndexerError::ModuleNotFound(name.to_string()));
        }

        tracing::info!("Scanning {}", name);
        let symbols = self.modules.require(name)?;

        for binding_name in self.module_members(name, &symbols) {
            let resolution =
                PathResolver::new(&mut self.modules, &mut self.mros).resolve_in_module(name, &binding_name);
            let Some(resolution) = resolution else {
                continue;
            };

            if !resolution.target.is_declaration() {
                continue;
            }

            for (alias, canonical) in &resolution.hops {
                self.add_alias(alias, canonical);
            }
            let canonical = resolution.target.canonical_path();
            self.add_alias(&format!("{}.{}", name, binding_name), &canonical);

            match resolution.target {
                Target::Class(class) => self.walk_class(&class, None)?,
                Target::Function(function) => {
                    self.walk_function(&function, None)?;
                }
                Target::Module(_) => {}
            }
        }

        if recursive {
            for submodule in self.submodules(name)? {
                self.scan_module(&submodule, false)?;
            }
        }

        Ok(self)
    }

    /// Public names a module exposes, including those pulled in by star
    /// imports.
    fn module_members(&mut self, name: &str, symbols: &ModuleSymbols) -> BTreeSet<String> {
        let mut members: BTreeSet<String> = symbols.bindings.keys().filter(|n| is_public(n)).cloned().collect();

        let mut visited = HashSet::from([name.to_string()]);
        let mut pending = symbols.star_imports.clone();
        while let Some(star) = pending.pop() {
            if !visited.insert(star.clone()) {
                continue;
            }

            let Some(exported) = self.modules.lookup(&star) else {
                continue;
            };
            members.extend(exported.bindings.keys().filter(|n| is_public(n)).cloned());
            pending.extend(exported.star_imports.iter().cloned());
        }

        members
    }

    /// Records the return annotation of a function, method or property.
    ///
    /// Returns whether the function had an annotation to record.
    fn walk_function(&mut self, function: &FunctionDecl, path: Option<String>) -> Result<bool> {
        let Some(annotation) = &function.return_annotation else {
            return Ok(false);
        };

        let base = path.unwrap_or_else(|| function.canonical_path());
        let path = if function.is_property() {
            base
        } else {
            format!("{}()", base)
        };

        self.handle_annotation(&function.module, &path, annotation)?;
        Ok(true)
    }

    fn walk_class(&mut self, class: &Arc<ClassDecl>, path: Option<String>) -> Result<()> {
        let canonical = class.canonical_path();
        if !self.walking.insert(canonical.clone()) {
            return Ok(());
        }

        let result = self.walk_class_inner(class, path.unwrap_or(canonical.clone()));
        self.walking.remove(&canonical);
        result
    }

    fn walk_class_inner(&mut self, class: &Arc<ClassDecl>, path: String) -> Result<()> {
        let mut resolver = PathResolver::new(&mut self.modules, &mut self.mros);
        let members = resolver.class_members(class);
        let mro = resolver.mro(class);

        let mut found: HashSet<String> = HashSet::new();
        for (name, (_, binding)) in members.iter().filter(|(name, _)| is_public(name)) {
            let member_path = format!("{}.{}", path, name);
            let captured = match binding {
                Binding::Function(function) => self.walk_function(function, Some(member_path))?,
                Binding::Class(nested) => {
                    self.walk_class(nested, Some(member_path))?;
                    true
                }
                _ => false,
            };

            if captured {
                found.insert(name.clone());
            }
        }

        let mro = match mro {
            Ok(mro) => mro,
            Err(e) => {
                tracing::debug!("Skipping inherited attributes of {}: {}", path, e);
                return Ok(());
            }
        };

        for entry in mro.iter() {
            for (name, annotation) in &entry.annotations {
                if !is_public(name) || found.contains(name) {
                    continue;
                }

                self.handle_annotation(&entry.module, &format!("{}.{}", path, name), annotation)?;
                found.insert(name.clone());
            }
        }

        Ok(())
    }

    /// Records every type `annotation` references as used at `path`.
    ///
    /// `module` is the module the annotation was written in.
    pub fn handle_annotation(&mut self, module: &str, path: &str, annotation: &str) -> Result<()> {
        let annotation = normalize_annotation(annotation);

        match decompose(&annotation) {
            Annotation::Generic { outer, args } => {
                self.handle_name(module, path, outer)?;
                for arg in args {
                    self.handle_annotation(module, path, arg)?;
                }
            }
            Annotation::Union(members) => {
                for member in members {
                    self.handle_annotation(module, path, member)?;
                }
            }
            Annotation::Name(name) => self.handle_name(module, path, name)?,
            Annotation::Unparseable => {
                tracing::debug!("Skipping unparseable annotation {:?} at {}", annotation, path);
            }
        }

        Ok(())
    }

    fn handle_name(&mut self, module: &str, path: &str, name: &str) -> Result<()> {
        if !is_public(name) {
            return Ok(());
        }

        let table = self.imports.resolve_imports(module, &mut self.modules, &self.scope)?;
        let symbols = self.modules.require(module)?;

        let Some((head, rest)) = name.split_once('.') else {
            let local = format!("{}.{}", module, name);
            match symbols.get(name) {
                // The module's own binding shadows anything imported under the same name
                Some(Binding::Class(_) | Binding::Function(_)) => {
                    let resolved = self.try_find_path_source(&local);
                    self.index.add_use(&resolved, path);
                }
                Some(binding) => {
                    let target = match (table.get(name), binding) {
                        (Some(target), _) => Some(target.to_string()),
                        (None, Binding::Import(target)) => Some(target.clone()),
                        (None, _) => None,
                    };

                    match target {
                        Some(target) => self.add_import_use(&local, &target, path),
                        None => {
                            let resolved = self.try_find_path_source(&local);
                            self.index.add_use(&resolved, path);
                        }
                    }
                }
                None => {
                    let star_imported = PathResolver::new(&mut self.modules, &mut self.mros)
                        .resolve_in_module(module, name)
                        .is_some_and(|r| r.target.is_declaration());

                    if star_imported {
                        let resolved = self.try_find_path_source(&local);
                        self.index.add_use(&resolved, path);
                    } else if is_builtin(name) {
                        self.add_builtin_use(name, path);
                    } else {
                        tracing::debug!("Ignoring unbound annotation {:?} at {}", name, path);
                    }
                }
            }

            return Ok(());
        };

        if matches!(symbols.get(head), Some(Binding::Class(_))) {
            let resolved = self.try_find_path_source(&format!("{}.{}", module, name));
            self.index.add_use(&resolved, path);
            return Ok(());
        }

        let expanded = match symbols.get(head) {
            Some(Binding::Import(target)) => Some(format!("{}.{}", target, rest)),
            _ => table.resolve_dotted(name),
        };
        if let Some(builtin) = expanded.as_deref().and_then(typing_container_builtin) {
            self.add_builtin_use(builtin, path);
            return Ok(());
        }

        let full = table
            .resolve_dotted(name)
            .or_else(|| expanded.filter(|full| self.scope.is_tracked(full)));
        if let Some(full) = full {
            let resolved = self.try_find_path_source(&full);
            self.index.add_use(&resolved, path);
            return Ok(());
        }

        tracing::debug!(
            "Ignoring {:?} annotation from out-of-scope library at {}",
            name,
            path
        );
        Ok(())
    }

    /// Records a use of an imported name, aliasing the importing module's
    /// binding to the declaration it reaches.
    fn add_import_use(&mut self, local: &str, target: &str, path: &str) {
        if let Some(builtin) = typing_container_builtin(target) {
            self.add_builtin_use(builtin, path);
            return;
        }

        if !self.scope.is_tracked(target) {
            tracing::debug!(
                "Ignoring {:?} annotation from out-of-scope library at {}",
                local,
                path
            );
            return;
        }

        let resolved = self.try_find_path_source(target);
        self.add_alias(local, &resolved);
        self.index.add_use(&resolved, path);
    }

    fn add_builtin_use(&mut self, name: &str, path: &str) {
        if self.track_builtins {
            self.index.add_use(&builtin_path(name), path);
        }
    }
}
