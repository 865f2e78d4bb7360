use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};

use crate::config::{IndexerConfig, DEFAULT_CONFIG_FILE};
use crate::dist::package_version;
use crate::error::Result;
use crate::index::{IndexArtifact, UNKNOWN_VERSION};
use crate::indexer::{generate, GenerateOptions};

#[derive(Parser)]
#[command(name = "pyref-index")]
#[command(about = "Static type-reference indexer for Python packages")]
#[command(version)]
#[command(after_long_help = r#"
EXAMPLES:
    # Generate the preset indexes into ./indexes
    pyref-index -r .venv/lib/python3.12/site-packages gen default -o indexes

    # Generate a single index
    pyref-index gen override tanjun_index.json -i tanjun -i hikari -s tanjun --package hikari-tanjun

    # Find a type by its trailing name
    pyref-index search tanjun_index.json Component

    # List every path and alias sharing that trailing name
    pyref-index search tanjun_index.json Component --all

    # List everything that references a type
    pyref-index references tanjun_index.json hikari.users.User
"#)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Directory Python modules are looked up in (repeatable)
    #[arg(short, long = "root", global = true, default_value = ".")]
    pub roots: Vec<PathBuf>,

    /// Path to the preset config file
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate reference indexes
    Gen {
        #[command(subcommand)]
        command: GenCommands,
    },

    /// Search a saved index by trailing type name
    Search {
        /// Path to the index file
        index_file: PathBuf,

        /// Type name or dotted path suffix
        query: String,

        /// List every matching path and alias instead of the best match
        #[arg(long)]
        all: bool,
    },

    /// List the references to a type in a saved index
    References {
        /// Path to the index file
        index_file: PathBuf,

        /// Full path of the type, or one of its aliases
        path: String,
    },
}

#[derive(Subcommand)]
pub enum GenCommands {
    /// Generate one index per configured preset
    Default {
        /// Directory the indexes are written to
        #[arg(short, long, default_value = ".")]
        out_dir: PathBuf,
    },

    /// Generate a single index from explicit module lists
    Override {
        /// Output file
        out: PathBuf,

        /// Module whose types are tracked (repeatable)
        #[arg(short, long = "index", required = true)]
        index: Vec<String>,

        /// Module scanned for references (repeatable)
        #[arg(short, long = "scan", required = true)]
        scan: Vec<String>,

        /// Distribution the index version is read from
        #[arg(long)]
        package: Option<String>,

        /// Do not record references to builtin types
        #[arg(long)]
        skip_builtins: bool,

        /// Do not record aliases inside 3rd-party libraries
        #[arg(long = "skip-3rd-party")]
        skip_3rd_party: bool,
    },
}

/// Source roots from the config take precedence when the CLI left the default.
fn effective_roots(cli_roots: &[PathBuf], config: &IndexerConfig) -> Vec<PathBuf> {
    let cli_is_default = cli_roots.len() == 1 && cli_roots[0] == Path::new(".");
    if cli_is_default && !config.source_roots.is_empty() {
        config.source_roots.clone()
    } else {
        cli_roots.to_vec()
    }
}

fn resolve_version(roots: &[PathBuf], package: &str) -> String {
    package_version(roots, package).unwrap_or_else(|| {
        tracing::warn!("Could not find the installed version of {}", package);
        UNKNOWN_VERSION.to_string()
    })
}

/// Generates every preset target from the config file.
pub fn gen_default(roots: &[PathBuf], config_path: &Path, out_dir: &Path) -> Result<()> {
    let config = IndexerConfig::load_or_default(config_path)?;
    let roots = effective_roots(roots, &config);

    for target in &config.targets {
        let options = GenerateOptions {
            source_roots: roots.clone(),
            index_modules: target.index.clone(),
            scan_modules: target.scan.clone(),
            track_builtins: target.track_builtins,
            track_3rd_party: target.track_3rd_party,
            package_version: Some(resolve_version(&roots, target.package_name())),
        };

        let index = generate(&options)?;
        let out = target.output_path(out_dir);
        index.save(&out)?;

        println!(
            "{}: {} types, {} aliases -> {}",
            target.name,
            index.object_count(),
            index.alias_count(),
            out.display()
        );
    }

    Ok(())
}

/// Generates a single index.
pub fn gen_override(
    roots: &[PathBuf],
    out: &Path,
    index_modules: Vec<String>,
    scan_modules: Vec<String>,
    package: Option<&str>,
    skip_builtins: bool,
    skip_3rd_party: bool,
) -> Result<()> {
    let options = GenerateOptions {
        source_roots: roots.to_vec(),
        index_modules,
        scan_modules,
        track_builtins: !skip_builtins,
        track_3rd_party: !skip_3rd_party,
        package_version: package.map(|p| resolve_version(roots, p)),
    };

    let index = generate(&options)?;
    index.save(out)?;

    println!(
        "Indexed {} types and {} aliases (version {}) -> {}",
        index.object_count(),
        index.alias_count(),
        index.version(),
        out.display()
    );

    Ok(())
}

pub fn search(index_file: &Path, query: &str, all: bool) -> Result<()> {
    let index = IndexArtifact::load(index_file)?;

    if all {
        let paths = index.search_paths(query);
        if paths.is_empty() {
            println!("No type found for query: {}", query);
        }
        for path in paths {
            println!("{}", path);
        }
        return Ok(());
    }

    match index.search(query) {
        Some((path, uses)) => {
            println!("{}", path);
            if uses.is_empty() {
                println!("  (no references)");
            }
            for usage in uses {
                println!("  {}", usage);
            }
        }
        None => println!("No type found for query: {}", query),
    }

    Ok(())
}

pub fn references(index_file: &Path, path: &str) -> Result<()> {
    let index = IndexArtifact::load(index_file)?;

    let Some(uses) = index.get_references(path) else {
        println!("No references found for: {}", path);
        return Ok(());
    };

    println!("References to {} ({}):", path, uses.len());
    for usage in uses {
        println!("  {}", usage);
    }

    Ok(())
}
