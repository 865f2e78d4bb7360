use std::collections::BTreeSet;

/// Returns the first segment of a dotted path.
pub fn top_level(path: &str) -> &str {
    path.split('.').next().unwrap_or(path)
}

pub fn is_public(name: &str) -> bool {
    !name.starts_with('_')
}

/// Whether every segment of a dotted path is public.
pub fn is_public_path(path: &str) -> bool {
    path.split('.').all(is_public)
}

/// The set of top-level packages whose declarations are tracked.
#[derive(Debug, Clone, Default)]
pub struct ModuleScope {
    top_level_modules: BTreeSet<String>,
    track_3rd_party: bool,
}

impl ModuleScope {
    pub fn new(track_3rd_party: bool) -> Self {
        Self {
            top_level_modules: BTreeSet::new(),
            track_3rd_party,
        }
    }

    /// Registers the top-level package of `module`. Returns whether it was new.
    pub fn register(&mut self, module: &str) -> bool {
        self.top_level_modules.insert(top_level(module).to_string())
    }

    pub fn tracks_3rd_party(&self) -> bool {
        self.track_3rd_party
    }

    pub fn contains(&self, path: &str) -> bool {
        self.top_level_modules.contains(top_level(path))
    }

    /// Whether an import of `path` should be recorded.
    pub fn is_tracked(&self, path: &str) -> bool {
        self.track_3rd_party || self.contains(path)
    }

    pub fn top_level_modules(&self) -> impl Iterator<Item = &str> {
        self.top_level_modules.iter().map(String::as_str)
    }
}
