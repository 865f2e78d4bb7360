mod cli;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::{Cli, Commands, GenCommands};

// Re-export from lib for internal use
use pyref_index::{config, dist, error, index, indexer};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pyref_index=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Gen { command } => match command {
            GenCommands::Default { out_dir } => {
                cli::gen_default(&cli.roots, &cli.config, &out_dir)?;
            }
            GenCommands::Override {
                out,
                index,
                scan,
                package,
                skip_builtins,
                skip_3rd_party,
            } => {
                cli::gen_override(
                    &cli.roots,
                    &out,
                    index,
                    scan,
                    package.as_deref(),
                    skip_builtins,
                    skip_3rd_party,
                )?;
            }
        },
        Commands::Search { index_file, query, all } => {
            cli::search(&index_file, &query, all)?;
        }
        Commands::References { index_file, path } => {
            cli::references(&index_file, &path)?;
        }
    }

    Ok(())
}
