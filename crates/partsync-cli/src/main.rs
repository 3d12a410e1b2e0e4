mod import;
mod prune;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use partsync_source::WiperLayout;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "partsync")]
#[command(about = "Reconcile supplier extracts into the parts catalog")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Import a source file into the catalog
    Import {
        /// Kind of source file
        kind: ImportKind,

        /// Path to the source file
        path: PathBuf,

        /// Stage every write against a snapshot of the catalog instead
        #[arg(long)]
        dry_run: bool,

        /// Write the run report as JSON to this path
        #[arg(long)]
        report: Option<PathBuf>,

        /// Column layout of a wipers sheet
        #[arg(long, default_value = "perfectvision-2025-05")]
        layout: WiperLayout,
    },
    /// Merge drive-side variants of a wipers sheet into a JSON file
    ConsolidateWipers {
        /// Path to the wipers sheet
        path: PathBuf,

        /// Where to write the consolidated vehicles
        #[arg(long)]
        out: PathBuf,

        /// Column layout of the wipers sheet
        #[arg(long, default_value = "perfectvision-2025-05")]
        layout: WiperLayout,
    },
    /// List duplicate catalog models and optionally delete them
    PruneModels {
        /// Delete unreferenced duplicates instead of only listing them
        #[arg(long)]
        apply: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ImportKind {
    Brands,
    Models,
    Products,
    Wipers,
}

fn init_tracing() {
    let fallback = std::env::var("PARTSYNC_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&fallback))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    match cli.command {
        Commands::Import {
            kind,
            path,
            dry_run,
            report,
            layout,
        } => {
            let config = partsync_core::load_app_config()?;
            import::run_import(&config, kind, &path, layout, dry_run, report.as_deref()).await
        }
        Commands::ConsolidateWipers { path, out, layout } => {
            import::run_consolidate_wipers(&path, layout, &out)
        }
        Commands::PruneModels { apply } => {
            let config = partsync_core::load_app_config()?;
            prune::run_prune_models(&config, apply).await
        }
    }
}

#[cfg(test)]
mod tests;
