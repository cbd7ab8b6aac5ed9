use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tocmatch_etl::Config;

mod commands;
mod server;

#[derive(Debug, Parser)]
#[command(name = "tocmatch", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the catalog database (default: ~/.local/share/tocmatch/catalog.db)
    #[arg(long, global = true)]
    db: Option<PathBuf>,
}

#[derive(Debug, clap::Subcommand)]
enum Commands {
    /// Import catalog rows from a text file
    ///
    /// Each non-blank line holds three whitespace-separated integers:
    ///
    ///   tracklist_id position duration_ms
    ///
    /// Lines starting with '#' are ignored. A duration of 0 marks a track
    /// whose length is unknown; such tracklists are kept in the catalog but
    /// never indexed. Re-importing a (tracklist_id, position) pair replaces
    /// its duration.
    Import {
        /// Path to the rows file
        file: PathBuf,
    },
    /// Build the index from the catalog and report statistics
    Build,
    /// Build the index and look up a single TOC
    Lookup {
        /// TOC as "1 <num_tracks> <leadout> <offset_1> ... <offset_n>"
        toc: String,

        /// Match distance in milliseconds (default: from config)
        #[arg(long)]
        distance: Option<u64>,
    },
    /// Serve lookups over HTTP at /ws/1/toc/<toc>
    ///
    /// The server starts listening straight away and answers 503 until the
    /// first index build finishes. With rebuild_interval_secs configured,
    /// the index is rebuilt periodically and swapped in atomically; a failed
    /// rebuild leaves the previous index serving.
    Serve {
        /// Address to bind (default: from config)
        #[arg(long)]
        bind: Option<String>,

        /// Port to listen on (default: from config)
        #[arg(long)]
        port: Option<u16>,
    },
    /// Show catalog statistics
    Status,
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Debug, clap::Subcommand)]
enum ConfigAction {
    /// Show the effective configuration
    Show,
    /// Print the config file path
    Path,
    /// Print an example config file
    Example,
    /// Create the config file with defaults
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match cli.db {
        Some(db_path) => Config::load_with_db_path(db_path)?,
        None => Config::load()?,
    };

    let _logger = twyg::setup(config.logging.clone())
        .map_err(|e| anyhow::anyhow!("Failed to set up logging: {e}"))?;

    let command = match cli.command {
        Commands::Config { action } => {
            return match action {
                ConfigAction::Show => commands::config::show_config(&config),
                ConfigAction::Path => commands::config::show_path(),
                ConfigAction::Example => commands::config::show_example(),
                ConfigAction::Init => commands::config::init_config(),
            };
        }
        command => command,
    };

    // Ensure database directory exists
    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    match command {
        Commands::Import { file } => {
            commands::run_import(&config, &file)?;
        }
        Commands::Build => {
            commands::run_build(&config)?;
        }
        Commands::Lookup { toc, distance } => {
            commands::run_lookup(&config, &toc, distance)?;
        }
        Commands::Serve { bind, port } => {
            if let Some(bind) = bind {
                config.bind = bind;
            }
            if let Some(port) = port {
                config.port = port;
            }
            commands::run_serve(config).await?;
        }
        Commands::Status => {
            commands::show_status(&config)?;
        }
        Commands::Config { .. } => {}
    }

    Ok(())
}
