use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Parser;
use ferry_store::SledStore;
use ferry_transfer::{
    DestinationDescriptor, Progress, ReqwestClient, SourceDescriptor, Transfer, TransferOptions,
    TransferOutcome, TransferSpec, plan_chunks,
};
use serde_json::{Value, json};

use crate::cli::{App, Commands, PlanArg, RunArg};
use crate::config::Settings;

mod cli;
mod config;

/// Exit status telling the caller to invoke `ferry run` again.
const EXIT_SUSPENDED: u8 = 75;

#[tokio::main]
async fn main() -> ExitCode {
    let app = App::parse();
    match run(app).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{e:#}");
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(app: App) -> Result<ExitCode> {
    let settings = Settings::load(app.config.as_deref(), &app.overrides())
        .context("Failed to load configuration")?;
    init_logging(&settings.log);

    match app.cmd {
        Commands::Run(arg) => transfer(&settings, arg).await,
        Commands::Status => status(&settings),
        Commands::Clear => clear(&settings),
        Commands::Plan(arg) => plan(&settings, arg),
    }
}

fn init_logging(directive: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| directive.into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn engine(settings: &Settings) -> Result<Transfer<ReqwestClient, SledStore>> {
    let store = SledStore::open(&settings.state_dir).with_context(|| {
        format!("Failed to open checkpoint store at {}", settings.state_dir.display())
    })?;
    let client = ReqwestClient::new().context("Failed to build HTTP client")?;
    let options = TransferOptions::default()
        .checkpoint_key(settings.checkpoint_key.as_str())
        .managed_files_url(settings.managed_files_url.as_str())
        .on_progress(Arc::new(|p: &Progress| {
            if let Some(pct) = p.percentage() {
                tracing::debug!(phase = %p.phase, "{pct:.1}% of {} bytes", p.total_bytes.unwrap_or(0));
            }
        }));
    Ok(Transfer::new(client, store).with_options(options))
}

fn spec_from(settings: &Settings, arg: RunArg) -> Result<Option<TransferSpec>> {
    let source = match (arg.source_id, arg.source_url) {
        (Some(id), _) => SourceDescriptor::managed(id),
        (None, Some(url)) => SourceDescriptor::remote(url),
        (None, None) if arg.dest.is_none() => return Ok(None),
        (None, None) => bail!("--dest needs --source-id or --source-url"),
    };
    let Some(dest) = arg.dest else {
        bail!("a source needs --dest");
    };
    let metadata: Value =
        serde_json::from_str(&arg.metadata).context("--metadata is not valid JSON")?;

    let mut spec = TransferSpec::new(source, DestinationDescriptor::new(dest, metadata))
        .config(settings.transfer_config());
    if let Some(token) = &settings.token {
        spec = spec.token(token.as_str());
    }
    Ok(Some(spec))
}

async fn transfer(settings: &Settings, arg: RunArg) -> Result<ExitCode> {
    let spec = spec_from(settings, arg)?;
    let engine = engine(settings)?;
    let outcome = engine.run(spec).await?;

    let code = match outcome {
        TransferOutcome::Completed(_) => ExitCode::SUCCESS,
        TransferOutcome::Suspended { .. } => ExitCode::from(EXIT_SUSPENDED),
    };
    println!("{}", serde_json::to_string_pretty(&outcome.into_json())?);
    Ok(code)
}

fn status(settings: &Settings) -> Result<ExitCode> {
    let engine = engine(settings)?;
    let report = match engine.pending()? {
        Some(cp) => json!({
            "key": settings.checkpoint_key,
            "source": cp.spec.source,
            "file_name": cp.source.file_name,
            "size_bytes": cp.source.size_bytes,
            "next_chunk_index": cp.next_chunk_index,
            "chunk_count": cp.plan.len(),
            "bytes_transferred": cp.bytes_transferred(),
            "started_at": cp.started_at,
            "suspended_at": cp.suspended_at,
        }),
        None => json!({ "key": settings.checkpoint_key, "pending": false }),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);

    let others: Vec<_> = engine
        .store()
        .keys()?
        .into_iter()
        .filter(|k| *k != settings.checkpoint_key)
        .collect();
    if !others.is_empty() {
        tracing::info!("other pending keys: {}", others.join(", "));
    }
    Ok(ExitCode::SUCCESS)
}

fn clear(settings: &Settings) -> Result<ExitCode> {
    if engine(settings)?.discard()? {
        tracing::info!(key = %settings.checkpoint_key, "discarded pending transfer");
    } else {
        tracing::info!(key = %settings.checkpoint_key, "nothing pending");
    }
    Ok(ExitCode::SUCCESS)
}

fn plan(settings: &Settings, arg: PlanArg) -> Result<ExitCode> {
    let plan = plan_chunks(arg.size, settings.chunk_size)?;
    println!("{}", serde_json::to_string(&plan)?);
    Ok(ExitCode::SUCCESS)
}
