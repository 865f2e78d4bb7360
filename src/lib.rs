pub mod config;
pub mod dist;
pub mod error;
pub mod index;
pub mod indexer;
pub mod languages;

pub use config::{IndexerConfig, TargetConfig};
pub use dist::package_version;
pub use error::{IndexerError, Result};
pub use index::{IndexArtifact, ReferenceIndex, SearchTrie, UNKNOWN_VERSION};
pub use indexer::{generate, GenerateOptions, IndexBuilder, ModuleCache, ModuleScope, Parser};
pub use languages::{LanguageGrammar, PythonGrammar};
