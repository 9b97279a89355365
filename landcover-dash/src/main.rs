//! Point d'entrée CLI pour landcover-dash

use anyhow::Result;
use clap::Parser;
use tracing::{debug, Level};
use tracing_subscriber::{fmt, EnvFilter};

use landcover_dash::cli::{self, Commands, PathArgs};

// Charger .env au démarrage
fn load_env() {
    if dotenvy::dotenv().is_err() {
        // Essayer depuis le répertoire du binaire
        if let Ok(exe) = std::env::current_exe() {
            if let Some(dir) = exe.parent() {
                let _ = dotenvy::from_path(dir.join(".env"));
            }
        }
    }
}

/// Explorer les statistiques de couverture du sol par territoire
#[derive(Parser)]
#[command(name = "landcover-dash")]
#[command(author, version)]
#[command(about = "Tableau de bord des statistiques de couverture du sol")]
struct Cli {
    /// Augmenter la verbosité (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Mode silencieux
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(flatten)]
    paths: PathArgs,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    load_env();

    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let paths = cli.paths.resolve();
    debug!(?paths, "Resolved paths");

    match cli.command {
        Commands::Sources { check } => cli::cmd_sources(&paths, check).await?,
        Commands::Summary {
            source,
            filters,
            json,
            report,
        } => cli::cmd_summary(&paths, source.as_deref(), &filters, json, report.as_ref()).await?,
        Commands::Legend { source, json } => {
            cli::cmd_legend(&paths, source.as_deref(), json).await?
        }
        Commands::Map {
            source,
            filters,
            json,
            output,
        } => cli::cmd_map(&paths, source.as_deref(), &filters, json, output.as_ref()).await?,
        Commands::Session { source, json } => {
            cli::cmd_session(&paths, source.as_deref(), json).await?
        }
    }

    Ok(())
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => Level::WARN,
        (_, 0) => Level::INFO,
        (_, 1) => Level::DEBUG,
        (_, _) => Level::TRACE,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .init();
}
