//! Alias bookkeeping and path normalization
//!
//! Re-exports give the same declaration many names (`pkg.RESTClient`,
//! `pkg.api.RESTClient`, `pkg.api.rest.RESTClient`). References are always
//! recorded against the name the declaration was made under, and every other
//! name seen on the way is kept as an alias of it.

use crate::indexer::builder::IndexBuilder;
use crate::indexer::resolve::PathResolver;
use crate::indexer::scope::{is_public_path, top_level, ModuleScope};

/// Whether `alias` may be recorded as another name for `target`.
pub fn is_aliasable(alias: &str, target: &str, scope: &ModuleScope) -> bool {
    if alias == target || !is_public_path(target) {
        return false;
    }

    // Generics and type variables from other libraries never point back at
    // the module that used them.
    scope.contains(target) || (scope.tracks_3rd_party() && top_level(alias) == top_level(target))
}

impl IndexBuilder {
    /// Records an alias if it is valid, returning whether it was.
    pub fn add_alias(&mut self, alias: &str, target: &str) -> bool {
        if !is_aliasable(alias, target, &self.scope) {
            return false;
        }

        self.index.record_alias(alias, target);
        true
    }

    /// Normalizes `path` to where the declaration it names was made.
    ///
    /// Falls back to `path` itself when it does not lead to a class or
    /// function, or when the result could not be recorded as an alias.
    pub fn try_find_path_source(&mut self, path: &str) -> String {
        let resolution = PathResolver::new(&mut self.modules, &mut self.mros).resolve(path);
        let Some(resolution) = resolution.filter(|r| r.target.is_declaration()) else {
            return path.to_string();
        };

        for (alias, canonical) in &resolution.hops {
            self.add_alias(alias, canonical);
        }

        let canonical = resolution.target.canonical_path();
        if self.add_alias(path, &canonical) {
            canonical
        } else {
            path.to_string()
        }
    }
}
