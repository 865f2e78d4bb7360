pub mod artifact;
pub mod reference;
pub mod trie;

pub use artifact::IndexArtifact;
pub use reference::{ReferenceIndex, UNKNOWN_VERSION};
pub use trie::SearchTrie;
