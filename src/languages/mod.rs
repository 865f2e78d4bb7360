pub mod python;

pub use python::PythonGrammar;

use std::path::Path;

pub trait LanguageGrammar: Send + Sync {
    fn name(&self) -> &'static str;

    /// Extensions in lookup priority order.
    fn file_extensions(&self) -> &[&'static str];

    fn language(&self) -> tree_sitter::Language;

    fn handles(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.file_extensions().contains(&ext))
    }
}
