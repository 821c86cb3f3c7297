use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use catalog_watcher::config::LoggingConfig;
use catalog_watcher::models::SnapshotDocument;
use catalog_watcher::plugins::build_channel;
use catalog_watcher::{AppConfig, AppError, JsonFileStore, Notifier, SnapshotStore, Watcher};

#[derive(Parser)]
#[command(name = "catalog-watcher", version, about)]
struct Cli {
    /// Configuration file layered over config/default
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Site selector file (JSON), overrides site_config
    #[arg(short, long, global = true)]
    site: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch, diff, notify and save once
    Run {
        /// Print messages to stdout and leave the snapshot untouched
        #[arg(long)]
        dry_run: bool,
    },
    /// Check the messaging channel and send a test message
    TestChannel,
    /// Print the stored snapshot as JSON
    ShowSnapshot,
}

fn init_tracing(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&config.filter))?;

    let (file_layer, guard) = match &config.file {
        Some(path) => {
            let dir = path.parent().filter(|p| !p.as_os_str().is_empty());
            let dir = dir.map(PathBuf::from).unwrap_or_else(|| PathBuf::from("."));
            let file_name = path.file_name().context("logging.file has no file name")?;
            std::fs::create_dir_all(&dir).with_context(|| format!("creating log directory {}", dir.display()))?;

            let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(dir, file_name));
            (Some(fmt::layer().with_writer(writer).with_ansi(false)), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(file_layer)
        .try_init()?;

    Ok(guard)
}

fn exit_code(err: &anyhow::Error) -> ExitCode {
    let code = err.downcast_ref::<AppError>().map_or(1, AppError::exit_code);
    ExitCode::from(code)
}

async fn run_once(config: &AppConfig, dry_run: bool) -> Result<ExitCode> {
    let watcher = Watcher::from_config(config, dry_run)?;
    let report = watcher.run().await;

    if let Some(err) = &report.error {
        error!(
            run_id = %report.run_id,
            state = %report.state(),
            transient = err.is_transient(),
            error = %err,
            "run did not complete"
        );

        if config.notifications.notify_on_error && !dry_run {
            if let Err(e) = watcher.notifier().send_error(&err.to_string()).await {
                warn!(error = %e, "failed to send error notification");
            }
        }
    } else {
        info!(
            run_id = %report.run_id,
            summary = %report.changes.summary(),
            sent = report.delivery.sent,
            failed = report.delivery.failed,
            "run finished"
        );
    }

    Ok(ExitCode::from(report.exit_code()))
}

async fn test_channel(config: &AppConfig) -> Result<ExitCode> {
    let channel = build_channel(&config.notifications)?;
    let destination = config.notifications.destination.clone().unwrap_or_default();
    let notifier = Notifier::new(Arc::clone(&channel), destination, &config.site.name);

    notifier.send_test().await?;
    info!(channel = channel.name(), "channel test passed");
    Ok(ExitCode::SUCCESS)
}

fn show_snapshot(config: &AppConfig) -> Result<ExitCode> {
    let snapshot = JsonFileStore::new(&config.storage.state_file).load()?;
    println!("{}", serde_json::to_string_pretty(&SnapshotDocument::from(&snapshot))?);
    Ok(ExitCode::SUCCESS)
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = match AppConfig::load(cli.config.as_deref(), cli.site.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            let _ = init_tracing(&LoggingConfig::default());
            error!(error = %e, "failed to load configuration");
            return ExitCode::from(1);
        }
    };

    let _guard = match init_tracing(&config.logging) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("failed to initialise logging: {:#}", e);
            return ExitCode::from(1);
        }
    };

    info!(site = %config.site.name, "Starting catalog watcher");

    let result = match cli.command.unwrap_or(Command::Run { dry_run: false }) {
        Command::Run { dry_run } => run_once(&config, dry_run).await,
        Command::TestChannel => test_channel(&config).await,
        Command::ShowSnapshot => show_snapshot(&config),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            error!(error = %format!("{:#}", e), "command failed");
            exit_code(&e)
        }
    }
}
