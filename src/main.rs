use anyhow::Context;
use api_client::MfApiClient;
use clap::{Parser, Subcommand};
use comfy_table::{presets::UTF8_FULL, Table};
use configuration::{init_tracing, Config, LoadOverrides};
use database::{connect, run_migrations, DbRepository, FundStore, InMemoryStore};
use loader::{LoadPipeline, LoadReport};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// The main entry point for the navloader application.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file, if there is one.
    dotenvy::dotenv().ok();

    // Parse command-line arguments
    let cli = Cli::parse();

    let config = configuration::load_config(cli.config.as_deref())?;
    // Held until exit so the file writer flushes.
    let _log_guard = init_tracing(&config.logging)?;

    // Execute the appropriate command
    match cli.command {
        Commands::Load(args) => handle_load(args, config).await,
        Commands::Reset => handle_reset(config).await,
        Commands::Export(args) => handle_export(args, config).await,
    }
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// Loads a fund's NAV history into PostgreSQL with bounded, batched transactions.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to a TOML configuration file (defaults to ./navloader.toml if present).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch a scheme from the NAV API and store it.
    Load(LoadArgs),
    /// Truncate the funds and nav_records tables.
    Reset,
    /// Write a stored fund back out in the API's JSON shape.
    Export(ExportArgs),
}

#[derive(Parser)]
struct LoadArgs {
    #[command(flatten)]
    overrides: LoadOverrides,

    /// Truncate both tables before loading.
    #[arg(long)]
    truncate_first: bool,

    /// Load into an in-memory store instead of the database.
    #[arg(long)]
    dry_run: bool,
}

#[derive(Parser)]
struct ExportArgs {
    /// The id of the fund to export.
    #[arg(long)]
    fund_id: i64,

    /// Output file; stdout when omitted.
    #[arg(long)]
    output: Option<PathBuf>,
}

// ==============================================================================
// Command Logic
// ==============================================================================

async fn open_store(config: &Config) -> anyhow::Result<DbRepository> {
    let pool = connect(&config.database).await?;
    run_migrations(&pool).await?;
    Ok(DbRepository::new(pool))
}

/// Handles the orchestration of a load run.
async fn handle_load(args: LoadArgs, mut config: Config) -> anyhow::Result<()> {
    config.apply_overrides(&args.overrides);
    config.validate()?;
    let scheme_code = config
        .source
        .scheme_code
        .context("no scheme code: pass --scheme-code or set source.scheme_code")?;

    let start = Instant::now();
    let store: Arc<dyn FundStore> = if args.dry_run {
        info!("Dry run: loading into an in-memory store");
        Arc::new(InMemoryStore::new())
    } else {
        Arc::new(open_store(&config).await?)
    };
    let connection_time = start.elapsed();

    if args.truncate_first {
        loader::reset(store.as_ref()).await?;
    }

    let source = Arc::new(MfApiClient::new(&config.source)?);

    // Ctrl-C stops new batches; the ones already running finish.
    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupt received; waiting for in-flight batches");
                cancel.cancel();
            }
        }
    });

    // The batch progress bar is drawn by the tracing layer installed above.
    let pipeline = LoadPipeline::new(&config.load, source, store)?.with_cancellation(cancel);
    let report = pipeline.run(scheme_code).await?;

    let total = start.elapsed();
    info!(
        "Connection: {:?} Insertion: {:?} Total: {:?}",
        connection_time,
        total.saturating_sub(connection_time),
        total
    );
    print_summary(&report);

    if !report.is_success() {
        anyhow::bail!(
            "{} of {} batches were not persisted",
            report.batches.failed_count() + report.batches.skipped_count(),
            report.batches.total_batches
        );
    }
    Ok(())
}

fn print_summary(report: &LoadReport) {
    let batches = &report.batches;

    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec!["Fund", "Records", "Skipped", "Batches", "Committed", "Failed", "Not dispatched", "Rows"]);
    table.add_row(vec![
        report.fund_id.to_string(),
        report.records_received.to_string(),
        report.records_skipped.to_string(),
        batches.total_batches.to_string(),
        batches.committed_count().to_string(),
        batches.failed_count().to_string(),
        batches.skipped_count().to_string(),
        batches.rows_committed().to_string(),
    ]);
    println!("{table}");

    if !batches.failed.is_empty() {
        let mut failures = Table::new();
        failures.load_preset(UTF8_FULL).set_header(vec!["Batch", "Records", "Reason"]);
        for failed in &batches.failed {
            failures.add_row(vec![
                failed.range.index.to_string(),
                format!("{}..{}", failed.range.start, failed.range.end),
                failed.error.to_string(),
            ]);
        }
        println!("{failures}");
    }
}

async fn handle_reset(config: Config) -> anyhow::Result<()> {
    let store = open_store(&config).await?;
    loader::reset(&store).await?;
    Ok(())
}

async fn handle_export(args: ExportArgs, config: Config) -> anyhow::Result<()> {
    let store = open_store(&config).await?;
    let json = loader::export_json(&store, args.fund_id).await?;

    match args.output {
        Some(path) => {
            std::fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;
            info!(path = %path.display(), "Export written");
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(json.as_bytes())?;
            stdout.write_all(b"\n")?;
        }
    }
    Ok(())
}
