mod cli;
mod error;

use crate::cli::{Cli, Command};
use crate::error::{ErrorKind, Result};
use clap::Parser;
use exn::ResultExt;
use modsync_config::Config;
use modsync_library::{ModService, RefreshOutcome};
use modsync_source::{CurseForgeSource, SourceHandle};
use modsync_storage::BackendHandle;
use modsync_storage::backend::{LocalBackend, ReadOnlyBackend};
use serde::Serialize;
use std::io::Write;
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "MODSYNC_LOG";

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.json_logs);
    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::FAILURE
        },
    }
}

/// Logs go to stderr so that stdout only ever carries command output.
fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let config = Config::load(cli.config.as_deref()).or_raise(|| ErrorKind::Config)?;
    tracing::debug!(?config, "Loaded configuration");
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .or_raise(|| ErrorKind::Runtime)?;
    runtime.block_on(execute(cli.command, config))
}

fn build_service(config: &Config) -> Result<ModService> {
    let source: SourceHandle = Arc::new(CurseForgeSource::new(config.source_options()).or_raise(|| ErrorKind::Source)?);
    let local: BackendHandle =
        Arc::new(LocalBackend::new("mods", &config.mods.directory).or_raise(|| ErrorKind::Storage)?);
    let backend: BackendHandle = if config.mods.dry_run {
        tracing::info!(directory = %config.mods.directory.display(), "Dry run, the mods directory will not be modified");
        Arc::new(ReadOnlyBackend::new(local))
    } else {
        local
    };
    Ok(ModService::new(source, backend, config.service_options()))
}

async fn execute(command: Command, config: Config) -> Result<ExitCode> {
    let service = build_service(&config)?;
    match command {
        Command::Serve => serve(&service, &config).await,
        Command::Refresh => {
            let outcome = service.refresh_now().await;
            print_json(&outcome)?;
            Ok(exit_code(!matches!(outcome, RefreshOutcome::Failed { .. })))
        },
        Command::Status => {
            warm(&service).await;
            print_json(&service.refresh_status())?;
            Ok(ExitCode::SUCCESS)
        },
        Command::Search { term } => {
            print_json(&service.search_catalog(&term).await)?;
            Ok(ExitCode::SUCCESS)
        },
        Command::Catalog { offset } => {
            warm(&service).await;
            print_json(&service.cached_catalog_page(offset))?;
            Ok(ExitCode::SUCCESS)
        },
        Command::Match => {
            warm(&service).await;
            print_json(&service.match_installed().await)?;
            Ok(ExitCode::SUCCESS)
        },
        Command::Update { file } => {
            warm(&service).await;
            let outcome = service.trigger_update(&file).await;
            print_json(&outcome)?;
            Ok(exit_code(outcome.success()))
        },
    }
}

/// One-shot commands start with an empty cache.
async fn warm(service: &ModService) {
    if let RefreshOutcome::Failed { reason } = service.refresh_now().await {
        tracing::warn!(%reason, "Catalog refresh failed, continuing with an empty catalog");
    }
}

async fn serve(service: &ModService, config: &Config) -> Result<ExitCode> {
    let cancel = CancellationToken::new();
    let scheduler = service.spawn_refresh(config.refresh.interval(), cancel.clone());
    tracing::info!(
        interval_secs = config.refresh.interval_secs,
        allowed_origins = ?service.allowed_origins(),
        "Serving, press Ctrl-C to stop"
    );
    let mut commits = service.cache().subscribe();
    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                if let Err(err) = signal {
                    tracing::error!(error = %err, "Could not listen for Ctrl-C, stopping");
                }
                break;
            },
            changed = commits.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = commits.borrow_and_update().clone();
                tracing::info!(entries = snapshot.len(), refreshed_at = ?snapshot.refreshed_at(), "Catalog snapshot replaced");
            },
        }
    }
    cancel.cancel();
    if let Err(err) = scheduler.await {
        tracing::error!(error = %err, "Refresh scheduler panicked");
    }
    Ok(ExitCode::SUCCESS)
}

fn print_json(value: &impl Serialize) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, value).or_raise(|| ErrorKind::Output)?;
    writeln!(stdout).or_raise(|| ErrorKind::Output)?;
    Ok(())
}

fn exit_code(success: bool) -> ExitCode {
    if success { ExitCode::SUCCESS } else { ExitCode::FAILURE }
}
