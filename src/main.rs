//! # Coin Import CLI (`coins`)
//!
//! Imports a Numista collection into a local SQLite store and inspects the
//! result.
//!
//! ## Usage
//!
//! ```bash
//! coins --config ./config/coins.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `coins init` | Create the SQLite database and run schema migrations |
//! | `coins auth-url` | Print the authorization URL for the configured locale |
//! | `coins import` | Authorize and import the collection |
//! | `coins list` | List imported coins |
//! | `coins get <id>` | Show every stored field of one coin |
//! | `coins completions <shell>` | Print a shell completion script |
//!
//! ## Examples
//!
//! ```bash
//! # Initialize the database
//! coins init --config ./config/coins.toml
//!
//! # Authorize in a browser, paste the redirected URL when asked
//! coins import --config ./config/coins.toml
//!
//! # Reuse a code obtained elsewhere, skip pictures
//! coins import --code abc123 --no-images
//!
//! # Count items without writing anything
//! coins import --dry-run
//! ```

use clap::{CommandFactory, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use coin_import::auth::{
    AuthorizationSession, AuthorizationSurface, ConsoleSurface, ReplaySurface,
};
use coin_import::import::{self, ImportOptions};
use coin_import::progress::ProgressMode;
use coin_import::{config, get, list, migrate};

/// Coin Import CLI: bring a Numista collection into a local SQLite store.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/coins.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "coins",
    about = "Import a Numista coin collection into a local SQLite store",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/coins.toml")]
    config: PathBuf,

    /// Log debug output to stderr (overridden by RUST_LOG).
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and the `coins`, `coin_images` and
    /// `import_runs` tables. Running it again is safe.
    Init,

    /// Print the authorization URL for the configured locale.
    AuthUrl,

    /// Authorize against Numista and import the collection.
    Import {
        /// Authorization code obtained elsewhere; skips the interactive step.
        #[arg(long)]
        code: Option<String>,

        /// Authenticate and count items without writing to the database.
        #[arg(long)]
        dry_run: bool,

        /// Maximum number of items to import.
        #[arg(long)]
        limit: Option<usize>,

        /// Do not download obverse, reverse and edge pictures.
        #[arg(long)]
        no_images: bool,

        /// Progress output on stderr. Defaults to `human` on a TTY, `off` otherwise.
        #[arg(long, value_enum)]
        progress: Option<ProgressMode>,
    },

    /// List imported coins.
    List {
        /// Maximum number of coins to show.
        #[arg(long)]
        limit: Option<i64>,
    },

    /// Show every stored field of one coin.
    Get {
        /// Coin row id, as shown by `coins list`.
        id: i64,
    },

    /// Print a shell completion script.
    Completions {
        shell: clap_complete::Shell,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "coin_import=debug" } else { "coin_import=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    // Commands that don't require config
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = Cli::command();
        clap_complete::generate(*shell, &mut cmd, "coins", &mut std::io::stdout());
        return Ok(());
    }

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::AuthUrl => {
            let session = AuthorizationSession::new(&cfg.numista)?;
            println!("{}", session.authorization_url());
        }
        Commands::Import {
            code,
            dry_run,
            limit,
            no_images,
            progress,
        } => {
            let options = ImportOptions {
                dry_run,
                limit,
                no_images,
            };
            let reporter = progress
                .unwrap_or_else(ProgressMode::default_for_tty)
                .reporter();
            let mut surface: Box<dyn AuthorizationSurface> = match code {
                Some(code) => Box::new(ReplaySurface::with_code(code)),
                None => Box::new(ConsoleSurface::stdio()),
            };
            import::run_import(&cfg, surface.as_mut(), &options, reporter.as_ref()).await?;
        }
        Commands::List { limit } => {
            list::run_list(&cfg, limit).await?;
        }
        Commands::Get { id } => {
            get::run_get(&cfg, id).await?;
        }
        Commands::Completions { .. } => {
            // Handled above (before config loading)
            unreachable!()
        }
    }

    Ok(())
}
