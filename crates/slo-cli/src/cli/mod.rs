//! CLI for the SLO uploader.

mod commands;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use slo_core::config;
use std::path::PathBuf;

use commands::{run_completions, run_upload};

/// Top-level CLI for the SLO uploader.
#[derive(Debug, Parser)]
#[command(name = "slo-upload")]
#[command(
    about = "Upload large files to OpenStack Swift as Static Large Objects",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Split a file into segments, upload them in parallel, then write the manifest.
    Upload(UploadArgs),

    /// Print shell completions to stdout.
    Completions {
        /// Target shell.
        shell: Shell,
    },
}

/// Arguments of `slo-upload upload`. Unset sizes and counts fall back to config.toml.
#[derive(Debug, Args)]
pub struct UploadArgs {
    /// File to be uploaded.
    pub file: PathBuf,

    /// Container to place the file in.
    #[arg(long)]
    pub container: String,

    /// Object name of the manifest (default: the file name).
    #[arg(long, value_name = "NAME")]
    pub object_name: Option<String>,

    /// Container for the segments (default: <container>_segments).
    #[arg(long, value_name = "NAME")]
    pub segments_container: Option<String>,

    /// Segment size in MiB. Minimum 1; enlarged automatically if the file would need too many segments.
    #[arg(long, value_name = "MB")]
    pub segment_size: Option<u64>,

    /// Number of segments uploaded in parallel.
    #[arg(long, value_name = "N")]
    pub concurrency: Option<usize>,

    /// Upper bound in MiB on local disk used by segment files at any moment (0 = no limit).
    #[arg(long, value_name = "MB")]
    pub max_disk_space: Option<u64>,

    /// Directory under which segment files are staged.
    #[arg(long, value_name = "DIR")]
    pub temp_dir: Option<PathBuf>,

    /// Provider limit on segments per manifest.
    #[arg(long, value_name = "N")]
    pub max_segments: Option<usize>,

    /// Storage URL, as shown by `swift stat -v`.
    #[arg(long, env = "OS_STORAGE_URL", hide_env_values = true)]
    pub storage_url: String,

    /// Swift auth token, as shown by `swift stat -v`.
    #[arg(long, env = "OS_AUTH_TOKEN", hide_env_values = true)]
    pub auth_token: String,

    /// Do not HEAD the container before uploading.
    #[arg(long)]
    pub skip_auth_check: bool,

    /// Start without asking for confirmation.
    #[arg(long, short)]
    pub yes: bool,

    /// Do not print the upload summary or progress.
    #[arg(long, short)]
    pub quiet: bool,
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();

        match cli.command {
            CliCommand::Upload(args) => {
                let cfg = config::load_or_init()?;
                tracing::debug!("loaded config: {:?}", cfg);
                run_upload(&cfg, args).await?;
            }
            CliCommand::Completions { shell } => run_completions(shell)?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
