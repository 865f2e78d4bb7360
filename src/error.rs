use thiserror::Error;

#[derive(Error, Debug)]
pub enum IndexerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Module not found: {0}")]
    ModuleNotFound(String),

    #[error("No source file could be found for module {module}")]
    MissingSource { module: String },

    #[error("Relative import of depth {depth} in {module} goes beyond the top-level package")]
    InvalidRelativeImport { module: String, depth: usize },
}

pub type Result<T> = std::result::Result<T, IndexerError>;
