use anyhow::{Context, Result};
use clap::Parser;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::level_filters::LevelFilter;
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use sentinel_get::copernicus::Provider;
use sentinel_get::manager::GetManager;

/// Download Sentinel-2 and Sentinel-3 products from the Copernicus Data Space.
#[derive(Parser, Debug)]
#[command(name = "sentinel-get", version)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, short)]
    config: PathBuf,

    /// Only search for products without downloading
    #[arg(long)]
    search_only: bool,

    /// Path to the named regions file
    #[arg(long, default_value = "regions.toml")]
    regions: PathBuf,

    /// Directory receiving one DEBUG log file per run
    #[arg(long, default_value = "logs")]
    log_dir: PathBuf,
}

/// Console output at `info` (or `RUST_LOG`), plus everything from `debug` up
/// in a timestamped file under `log_dir`.
fn init_tracing(log_dir: &Path) -> Result<WorkerGuard> {
    fs::create_dir_all(log_dir)
        .with_context(|| format!("Unable to create log directory '{}'", log_dir.display()))?;
    let log_file = log_dir.join(format!(
        "sentinel_get_{}.log",
        chrono::Local::now().format("%Y%m%d_%H%M%S")
    ));
    let file = File::create(&log_file)
        .with_context(|| format!("Unable to create log file '{}'", log_file.display()))?;
    let (writer, guard) = tracing_appender::non_blocking(file);

    let console = tracing_subscriber::fmt::layer().with_filter(
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    );
    let file = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_writer(writer)
        .with_filter(LevelFilter::DEBUG);
    tracing_subscriber::registry().with(console).with(file).init();

    info!(log_file = %log_file.display(), "Logging initialized");
    Ok(guard)
}

async fn run(cli: Cli) -> Result<()> {
    let provider = Provider::from_defaults()?;
    let manager = GetManager::from_file(&cli.config, &cli.regions, provider)?;

    if cli.search_only {
        for record in manager.search().await? {
            let status = if record.online { "online" } else { "offline" };
            println!("{}\t{}\t{status}", record.id, record.name);
        }
    } else {
        let outcome = manager.download().await?;
        println!("downloaded: {:?}", outcome.downloaded);
        println!("pending: {:?}", outcome.pending);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let _guard = match init_tracing(&cli.log_dir) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("{e:#}");
            return ExitCode::FAILURE;
        }
    };

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("An error occurred: {e:#}");
            ExitCode::FAILURE
        }
    }
}
