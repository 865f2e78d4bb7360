pub mod alias;
pub mod annotation;
pub mod builder;
pub mod builtins;
pub mod import_resolver;
pub mod modules;
pub mod mro;
pub mod parser;
pub mod resolve;
pub mod scanner;
pub mod scope;
pub mod symbols;
pub mod walker;

pub use alias::is_aliasable;
pub use annotation::{decompose, normalize_annotation, Annotation};
pub use builder::{generate, GenerateOptions, IndexBuilder};
pub use import_resolver::{ImportResolver, ImportTable, ImportedName};
pub use modules::{ModuleCache, ModuleLocator, ModuleSource};
pub use mro::{MroCache, MroError};
pub use parser::{ParsedFile, Parser};
pub use resolve::{PathResolver, Resolution, Target};
pub use scope::ModuleScope;
pub use symbols::{Binding, ClassDecl, FunctionDecl, FunctionKind, ModuleSymbols};
pub use walker::ModuleWalker;
