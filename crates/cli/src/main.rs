use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use searchsync_config::{load_document, SearchConfiguration, Settings, SETTINGS_FILE_NAME};
use searchsync_reconciler::{
    reconcile, reconcile_content_sources, reconcile_metadata, InMemorySearchService,
    ReconcileError, ReconcileSummary, SiteContext, TracingSink,
};

mod tracing_setup;

use tracing_setup::Verbosity;

const DEFAULT_DOCUMENT: &str = "SearchConfiguration.xml";
const DEFAULT_STATE: &str = "searchsync-state.json";

#[derive(Parser)]
#[command(
    name = "searchsync",
    version,
    about = "Applies a declarative search configuration to a search service"
)]
struct Cli {
    /// Settings file (default: ./.searchsync.toml if present)
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// Debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Errors only
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the metadata pass and then the content source pass
    Apply(PassArgs),
    /// Reconcile crawled properties, managed properties and mappings only
    Metadata(PassArgs),
    /// Reconcile content sources only
    ContentSources(PassArgs),
    /// Print the parsed configuration document as JSON
    Show {
        /// Search configuration document (XML)
        #[arg(long)]
        document: Option<PathBuf>,
    },
}

#[derive(Args)]
struct PassArgs {
    /// Search configuration document (XML)
    #[arg(long)]
    document: Option<PathBuf>,
    /// Service state snapshot (JSON); created if missing
    #[arg(long)]
    state: Option<PathBuf>,
    /// Site collection URL substituted for {sitecollection}
    #[arg(long)]
    site: Option<String>,
    /// Reconcile without writing the state back
    #[arg(long)]
    dry_run: bool,
}

#[derive(Clone, Copy)]
enum Pass {
    All,
    Metadata,
    ContentSources,
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    tracing_setup::init_subscriber(Verbosity::from_flags(cli.verbose, cli.quiet));

    let settings = load_settings(cli.settings.as_deref())?;

    match cli.command {
        Commands::Apply(args) => run_pass(Pass::All, args, &settings).await,
        Commands::Metadata(args) => run_pass(Pass::Metadata, args, &settings).await,
        Commands::ContentSources(args) => run_pass(Pass::ContentSources, args, &settings).await,
        Commands::Show { document } => {
            let path = document_path(document, &settings);
            let config = read_document(&path)?;
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn load_settings(path: Option<&Path>) -> anyhow::Result<Settings> {
    match path {
        Some(path) => Settings::load(path)
            .with_context(|| format!("Failed to load settings from {}", path.display())),
        None => Settings::load_from_dir(Path::new("."))
            .with_context(|| format!("Failed to load {SETTINGS_FILE_NAME}")),
    }
}

fn document_path(flag: Option<PathBuf>, settings: &Settings) -> PathBuf {
    flag.or_else(|| settings.document.clone())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DOCUMENT))
}

fn read_document(path: &Path) -> anyhow::Result<SearchConfiguration> {
    load_document(path).with_context(|| format!("Failed to load {}", path.display()))
}

async fn run_pass(pass: Pass, args: PassArgs, settings: &Settings) -> anyhow::Result<ExitCode> {
    let document = document_path(args.document, settings);
    let state = args
        .state
        .or_else(|| settings.state.clone())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_STATE));
    let site = args
        .site
        .or_else(|| settings.site_url.clone())
        .map(SiteContext::new);

    let config = read_document(&document)?;
    if config.is_empty() {
        tracing::warn!(document = %document.display(), "configuration document has no directives");
    }

    let service = InMemorySearchService::load(&state)
        .with_context(|| format!("Failed to load state from {}", state.display()))?;

    let mut sink = TracingSink;
    let result: Result<ReconcileSummary, ReconcileError> = match pass {
        Pass::All => reconcile(&config, &service, site.as_ref(), &mut sink).await,
        Pass::Metadata => reconcile_metadata(&config, &service, &mut sink).await,
        Pass::ContentSources => {
            reconcile_content_sources(&config, &service, site.as_ref(), &mut sink).await
        }
    };

    // A failed pass is not rolled back; whatever it applied is persisted.
    if args.dry_run {
        tracing::info!("dry run, state not written");
    } else {
        service
            .save(&state)
            .with_context(|| format!("Failed to write state to {}", state.display()))?;
    }

    let summary = result?;
    println!("{}: {summary}", document.display());
    if !summary.has_changes() {
        println!("Nothing to do.");
    }
    Ok(ExitCode::SUCCESS)
}
