use std::path::Path;
use std::sync::Arc;

use crate::error::{IndexerError, Result};
use crate::languages::{LanguageGrammar, PythonGrammar};

pub struct Parser {
    grammar: Arc<dyn LanguageGrammar>,
}

impl Parser {
    pub fn new(grammar: Arc<dyn LanguageGrammar>) -> Self {
        Self { grammar }
    }

    pub fn python() -> Self {
        Self::new(Arc::new(PythonGrammar))
    }

    pub fn grammar(&self) -> &Arc<dyn LanguageGrammar> {
        &self.grammar
    }

    pub fn parse_file(&self, path: &Path) -> Result<ParsedFile> {
        if !self.grammar.handles(path) {
            return Err(IndexerError::Parse(format!(
                "{} is not a {} source file",
                path.display(),
                self.grammar.name()
            )));
        }

        let source = std::fs::read_to_string(path)?;
        self.parse_source(&source)
    }

    pub fn parse_source(&self, source: &str) -> Result<ParsedFile> {
        let mut parser = tree_sitter::Parser::new();
        parser
            .set_language(&self.grammar.language())
            .map_err(|e| IndexerError::Parse(e.to_string()))?;

        let tree = parser
            .parse(source, None)
            .ok_or_else(|| IndexerError::Parse("Failed to parse source".to_string()))?;

        Ok(ParsedFile {
            tree,
            source: source.to_string(),
        })
    }
}

#[derive(Debug)]
pub struct ParsedFile {
    pub tree: tree_sitter::Tree,
    pub source: String,
}

impl ParsedFile {
    pub fn root_node(&self) -> tree_sitter::Node<'_> {
        self.tree.root_node()
    }

    pub fn source_bytes(&self) -> &[u8] {
        self.source.as_bytes()
    }

    pub fn node_text(&self, node: &tree_sitter::Node) -> &str {
        node.utf8_text(self.source_bytes()).unwrap_or("")
    }
}
