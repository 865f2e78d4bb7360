//! Generation presets
//!
//! `gen default` reads its targets from an optional `pyref-index.toml`:
//!
//! ```toml
//! source_roots = [".venv/lib/python3.12/site-packages"]
//!
//! [[targets]]
//! name = "tanjun"
//! package = "hikari-tanjun"
//! index = ["tanjun", "hikari"]
//! scan = ["tanjun"]
//! ```
//!
//! When the file does not exist the built-in hikari presets are used.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{IndexerError, Result};

/// Default config file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "pyref-index.toml";

/// Libraries built on top of hikari that get a preset of their own.
const HIKARI_EXTENSIONS: &[&str] = &["sake", "tanjun", "yuyo", "lightbulb", "arc", "crescent", "miru"];

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct IndexerConfig {
    /// Directories modules are looked up in; empty means "use the CLI roots".
    #[serde(default)]
    pub source_roots: Vec<PathBuf>,

    #[serde(default = "default_targets")]
    pub targets: Vec<TargetConfig>,
}

/// One index produced by `gen default`.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct TargetConfig {
    pub name: String,

    /// Distribution the version is read from, defaults to `name`.
    #[serde(default)]
    pub package: Option<String>,

    pub index: Vec<String>,

    pub scan: Vec<String>,

    #[serde(default = "default_true")]
    pub track_builtins: bool,

    #[serde(default = "default_true")]
    pub track_3rd_party: bool,

    /// Output file, relative to the output directory.
    #[serde(default)]
    pub output: Option<PathBuf>,
}

fn default_true() -> bool {
    true
}

fn default_targets() -> Vec<TargetConfig> {
    let mut targets = vec![TargetConfig::preset("hikari", "hikari", &["hikari"])];

    for &lib in HIKARI_EXTENSIONS {
        targets.push(TargetConfig::preset(lib, &format!("hikari-{}", lib), &[lib, "hikari"]));
    }

    targets
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            source_roots: Vec::new(),
            targets: default_targets(),
        }
    }
}

impl IndexerConfig {
    /// Parses a config file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| IndexerError::Config(format!("Failed to read {}: {}", path.display(), e)))?;

        Self::parse(&content).map_err(|e| match e {
            IndexerError::Config(msg) => IndexerError::Config(format!("{}: {}", path.display(), msg)),
            other => other,
        })
    }

    /// Parses a config file, falling back to the built-in presets when it
    /// does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No config at {}, using default presets", path.display());
            return Ok(Self::default());
        }

        Self::load(path)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(|e| IndexerError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        for target in &self.targets {
            if target.name.is_empty() {
                return Err(IndexerError::Config("Target name must not be empty".to_string()));
            }
            if target.index.is_empty() {
                return Err(IndexerError::Config(format!(
                    "Target '{}' does not index any module",
                    target.name
                )));
            }
        }

        Ok(())
    }
}

impl TargetConfig {
    fn preset(name: &str, package: &str, index: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            package: Some(package.to_string()),
            index: index.iter().map(|m| m.to_string()).collect(),
            scan: vec![name.to_string()],
            track_builtins: true,
            track_3rd_party: true,
            output: None,
        }
    }

    /// Distribution name used for the version lookup.
    pub fn package_name(&self) -> &str {
        self.package.as_deref().unwrap_or(&self.name)
    }

    /// Where the index is written, `<name>_index.json` unless configured.
    pub fn output_path(&self, out_dir: &Path) -> PathBuf {
        match &self.output {
            Some(output) => out_dir.join(output),
            None => out_dir.join(format!("{}_index.json", self.name)),
        }
    }
}
