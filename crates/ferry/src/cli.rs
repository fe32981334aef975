use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::Overrides;

#[derive(Clone, Debug, Parser)]
#[command(name = "ferry", version = env!("CARGO_PKG_VERSION"), about, long_about = None, propagate_version = true)]
pub struct App {
    /// Configuration file [default: ./ferry.toml]
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory holding the checkpoint database
    #[arg(long, global = true)]
    pub state_dir: Option<PathBuf>,

    /// Checkpoint slot; one transfer can be pending per key
    #[arg(long, global = true)]
    pub key: Option<String>,

    /// Log filter directive, used when RUST_LOG is unset
    #[arg(long, global = true)]
    pub log: Option<String>,

    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Clone, Debug, Subcommand)]
pub enum Commands {
    /// Start a transfer, or continue the pending one
    #[command(alias = "r", name = "run")]
    Run(RunArg),
    /// Show the pending transfer, if any
    #[command(alias = "st", name = "status")]
    Status,
    /// Forget the pending transfer
    #[command(alias = "rm", name = "clear")]
    Clear,
    /// Print the chunk plan for an object size
    #[command(alias = "p", name = "plan")]
    Plan(PlanArg),
}

#[derive(Args, Clone, Debug)]
pub struct RunArg {
    /// Managed file id to read from
    #[arg(long, conflicts_with = "source_url")]
    pub source_id: Option<String>,

    /// Ranged-GET URL to read from
    #[arg(long)]
    pub source_url: Option<String>,

    /// Resumable-upload endpoint; must carry uploadType=resumable
    #[arg(long)]
    pub dest: Option<String>,

    /// JSON metadata sent when opening the upload session
    #[arg(long, default_value = "{}")]
    pub metadata: String,

    /// Credential token
    #[arg(long)]
    pub token: Option<String>,

    /// Chunk size in bytes
    #[arg(long)]
    pub chunk_size: Option<u64>,

    /// Wall-clock budget for this invocation, in seconds
    #[arg(long)]
    pub time_budget: Option<u64>,
}

#[derive(Args, Clone, Debug)]
pub struct PlanArg {
    /// Object size in bytes
    pub size: u64,

    /// Chunk size in bytes
    #[arg(long)]
    pub chunk_size: Option<u64>,
}

impl App {
    pub fn overrides(&self) -> Overrides {
        let mut overrides = Overrides {
            state_dir: self.state_dir.clone(),
            checkpoint_key: self.key.clone(),
            log: self.log.clone(),
            ..Overrides::default()
        };
        match &self.cmd {
            Commands::Run(arg) => {
                overrides.chunk_size = arg.chunk_size;
                overrides.time_budget_secs = arg.time_budget;
                overrides.token = arg.token.clone();
            }
            Commands::Plan(arg) => overrides.chunk_size = arg.chunk_size,
            Commands::Status | Commands::Clear => {}
        }
        overrides
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_is_well_formed() {
        App::command().debug_assert();
    }

    #[test]
    fn run_flags_become_overrides() {
        let app = App::parse_from([
            "ferry",
            "--key",
            "nightly",
            "run",
            "--source-url",
            "https://cdn.example.com/a.bin",
            "--dest",
            "https://upload.example.com/files?uploadType=resumable",
            "--chunk-size",
            "262144",
        ]);
        let overrides = app.overrides();
        assert_eq!(overrides.chunk_size, Some(262_144));
        assert_eq!(overrides.checkpoint_key.as_deref(), Some("nightly"));
        assert_eq!(overrides.time_budget_secs, None);
    }

    #[test]
    fn bare_run_resumes() {
        let app = App::parse_from(["ferry", "run"]);
        let Commands::Run(arg) = app.cmd else {
            panic!("expected run");
        };
        assert!(arg.source_id.is_none() && arg.source_url.is_none() && arg.dest.is_none());
    }

    #[test]
    fn source_ids_and_urls_conflict() {
        let parsed = App::try_parse_from([
            "ferry",
            "run",
            "--source-id",
            "abc",
            "--source-url",
            "https://cdn.example.com/a.bin",
        ]);
        assert!(parsed.is_err());
    }
}
