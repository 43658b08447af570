// SPDX-License-Identifier: AGPL-3.0-or-later
//! Namespace Gateway CLI
//!
//! Browse and transfer files on a remote namespace from the shell.

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "nsg")]
#[command(author, version, about = "Namespace Gateway - remote file tree operations", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (defaults to the per-user config location)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Print operation results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List one directory level
    #[command(alias = "dir")]
    Ls {
        /// Remote directory to list
        #[arg(default_value = "/")]
        path: String,
    },

    /// Create a directory and its parents
    Mkdir {
        /// Remote directory to create
        path: String,
    },

    /// Remove a file or directory
    Rm {
        /// Remote path to remove
        path: String,

        /// Remove non-empty directories
        #[arg(short, long)]
        recursive: bool,
    },

    /// Find entries whose name contains a substring
    Search {
        /// Substring to look for (case-sensitive)
        name: String,

        /// Directory to start from
        #[arg(short, long, default_value = "/")]
        start: String,
    },

    /// Upload a local file into a remote directory
    Put {
        /// Local file to upload
        local: PathBuf,

        /// Remote directory receiving the file
        remote_dir: String,

        /// Content-disposition header naming the remote file,
        /// e.g. 'attachment; filename="a.txt"'
        #[arg(short, long)]
        disposition: Option<String>,
    },

    /// Download a remote file
    Get {
        /// Remote file to download
        remote: String,

        /// Local destination (defaults to the remote file name)
        local: Option<PathBuf>,
    },

    /// Show the configured namespace and whether it is reachable
    Status,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let session = match commands::Session::open(cli.config.as_deref(), cli.json) {
        Ok(session) => session,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let result = match cli.command {
        Commands::Ls { path } => session.ls(&path).await,
        Commands::Mkdir { path } => session.mkdir(&path).await,
        Commands::Rm { path, recursive } => session.rm(&path, recursive).await,
        Commands::Search { name, start } => session.search(&name, &start).await,
        Commands::Put { local, remote_dir, disposition } => {
            session.put(&local, &remote_dir, disposition.as_deref()).await
        }
        Commands::Get { remote, local } => session.get(&remote, local.as_deref()).await,
        Commands::Status => session.status().await,
    };

    if let Err(e) = session.close().await {
        tracing::warn!(error = %e, "failed to close namespace handle");
    }

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
