//! sftp-batch entry point.

mod config;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::bail;
use clap::{Parser, Subcommand};
use sftp_batch_client::TransferClient;
use sftp_batch_transfer::{FilePair, LocalDirBackend};
use tracing_subscriber::EnvFilter;

/// Batched remote file operations against a configured mirror root.
#[derive(Parser, Debug)]
#[command(name = "sftp-batch", version, about)]
struct Cli {
    /// Config file (defaults to ~/.config/sftp-batch/config.json)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, PartialEq)]
enum Command {
    /// Write a default config file
    Init,

    /// Upload in batches under the configured deadline
    Upload {
        #[arg(value_name = "LOCAL:REMOTE", required = true, value_parser = parse_pair)]
        pairs: Vec<FilePair>,
    },

    /// Download every pair
    Download {
        #[arg(value_name = "LOCAL:REMOTE", required = true, value_parser = parse_pair)]
        pairs: Vec<FilePair>,
    },

    /// Rename remote files
    Rename {
        #[arg(value_name = "FROM:TO", required = true, value_parser = parse_pair)]
        pairs: Vec<FilePair>,
    },

    /// Succeed if every remote path exists
    Check {
        #[arg(value_name = "PATH", required = true)]
        paths: Vec<String>,
    },

    /// Delete remote files
    Delete {
        #[arg(value_name = "PATH", required = true)]
        paths: Vec<String>,
    },
}

/// Splits `LOCAL:REMOTE` at the last colon so Windows drive letters survive.
fn parse_pair(arg: &str) -> Result<FilePair, String> {
    match arg.rsplit_once(':') {
        Some((local, remote)) if !local.is_empty() && !remote.is_empty() => {
            Ok(FilePair::new(local, remote))
        }
        _ => Err(format!("expected LOCAL:REMOTE, got {arg:?}")),
    }
}

fn main() -> anyhow::Result<ExitCode> {
    // Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting sftp-batch");

    let cli = Cli::parse();
    let config = config::Config::load(cli.config.as_deref())?;

    if cli.command == Command::Init {
        let path = cli.config.unwrap_or_else(config::default_config_path);
        config.save(&path)?;
        tracing::info!(path = %path.display(), "config written");
        return Ok(ExitCode::SUCCESS);
    }

    if config.mirror_root.is_empty() {
        bail!("mirror_root is not set in the config file");
    }

    let rt = tokio::runtime::Runtime::new()?;
    let ok = rt.block_on(run(config, cli.command))?;
    Ok(if ok { ExitCode::SUCCESS } else { ExitCode::from(1) })
}

async fn run(config: config::Config, command: Command) -> anyhow::Result<bool> {
    let backend = Arc::new(LocalDirBackend::new(&config.mirror_root));
    let client = TransferClient::new(backend, config.connection.clone())
        .with_max_workers(config.max_workers);

    let interrupt = client.interrupt_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, cancelling transfers");
            interrupt.cancel();
        }
    });

    let ok = match command {
        Command::Init => true,
        Command::Upload { pairs } => {
            client
                .upload_batched(pairs, config.batch_size, config.timeout())
                .await?
        }
        Command::Download { pairs } => client.download_all(pairs).await?,
        Command::Rename { pairs } => client.rename_all(pairs).await?,
        Command::Check { paths } => client.check_files(paths).await?,
        Command::Delete { paths } => client.delete_all(paths).await?,
    };

    tracing::info!(success = ok, "done");
    Ok(ok)
}
