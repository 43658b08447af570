// SPDX-License-Identifier: AGPL-3.0-or-later
//! CLI command implementations

use bytes::Bytes;
use console::style;
use nsg_core::{GatewayConfig, NsgError, NsgResult, RemotePath};
use nsg_gateway::response::ListItem;
use nsg_gateway::{ByteStream, Gateway, OperationResult, SizedWriter};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tabled::{Table, Tabled};
use tokio::fs;
use tokio::io::AsyncReadExt;

/// Everything a command needs: the gateway over the configured namespace
pub struct Session {
    gateway: Gateway,
    config: GatewayConfig,
    json: bool,
}

/// Normalize a user-supplied remote path to its absolute form
fn remote(path: &str) -> String {
    RemotePath::new(path).to_path_string()
}

/// Format entry kind
fn format_kind(item: &ListItem) -> String {
    if item.is_directory {
        style("d").cyan().to_string()
    } else {
        "-".to_string()
    }
}

#[derive(Tabled)]
struct LsEntry {
    #[tabled(rename = "Type")]
    kind: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Path")]
    path: String,
}

/// Read a local file as an inbound body, one block at a time
fn file_stream(file: fs::File, block_size: usize) -> ByteStream {
    Box::pin(futures::stream::try_unfold(file, move |mut file| async move {
        let mut block = vec![0u8; block_size];
        let n = file.read(&mut block).await?;
        block.truncate(n);
        Ok::<_, NsgError>((n > 0).then(|| (Bytes::from(block), file)))
    }))
}

impl Session {
    pub fn open(config_path: Option<&Path>, json: bool) -> NsgResult<Self> {
        let config = GatewayConfig::load_or_default(config_path)?;
        let client = nsg_providers::open(&config.namespace)?;
        tracing::debug!(client = client.id(), "opened namespace");
        let gateway = Gateway::from_config(client, &config);
        Ok(Self::with_gateway(gateway, config, json))
    }

    pub fn with_gateway(gateway: Gateway, config: GatewayConfig, json: bool) -> Self {
        Self { gateway, config, json }
    }

    pub async fn close(&self) -> NsgResult<()> {
        self.gateway.close().await
    }

    /// Print `result`, rendering the payload with `render` unless JSON was
    /// requested. Returns whether the operation succeeded.
    fn report<T: Serialize>(&self, result: &OperationResult<T>, render: impl FnOnce(&T)) -> NsgResult<bool> {
        if self.json {
            let text = serde_json::to_string_pretty(result).map_err(|e| NsgError::LocalIo(e.into()))?;
            println!("{text}");
            return Ok(result.success);
        }

        match &result.payload {
            Some(payload) if result.success => render(payload),
            _ => eprintln!(
                "{} {} (status {})",
                style("Error:").red().bold(),
                result.message,
                self.gateway.status_for(result)
            ),
        }
        Ok(result.success)
    }

    /// List directory contents
    pub async fn ls(&self, path: &str) -> NsgResult<bool> {
        let result = self.gateway.list(&remote(path)).await;

        self.report(&result, |listing| {
            if listing.items.is_empty() {
                println!("(empty directory)");
                return;
            }
            let entries: Vec<LsEntry> = listing
                .items
                .iter()
                .map(|item| LsEntry {
                    kind: format_kind(item),
                    name: item.name.clone(),
                    path: item.path.clone(),
                })
                .collect();
            println!("{}", Table::new(entries));
        })
    }

    /// Create a directory
    pub async fn mkdir(&self, path: &str) -> NsgResult<bool> {
        let path = remote(path);
        let result = self.gateway.create(&path).await;

        self.report(&result, |created| {
            if created.created {
                println!("Created {path}");
            } else {
                println!("{} {path} already exists", style("Note:").yellow());
            }
        })
    }

    /// Remove a file or directory
    pub async fn rm(&self, path: &str, recursive: bool) -> NsgResult<bool> {
        let path = remote(path);
        let result = self.gateway.delete(&path, recursive).await;

        self.report(&result, |deleted| {
            if deleted.deleted {
                println!("Removed {path}");
            } else {
                println!("{} {path} does not exist", style("Note:").yellow());
            }
        })
    }

    /// Recursive name search
    pub async fn search(&self, name: &str, start: &str) -> NsgResult<bool> {
        let result = self.gateway.search(&remote(start), name).await;

        self.report(&result, |found| {
            for path in &found.results {
                println!("{path}");
            }
            eprintln!("{} match(es)", found.count);
            if found.stats.directories_skipped > 0 {
                eprintln!(
                    "{} {} of {} directories could not be read",
                    style("Warning:").yellow(),
                    found.stats.directories_skipped,
                    found.stats.directories_listed + found.stats.directories_skipped
                );
            }
        })
    }

    /// Upload a local file. The remote name comes from `disposition` when
    /// given, else from the local file name.
    pub async fn put(&self, local: &Path, remote_dir: &str, disposition: Option<&str>) -> NsgResult<bool> {
        let file_name = match disposition {
            Some(header) => nsg_gateway::disposition::file_name(Some(header)),
            None => local
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .ok_or_else(|| NsgError::InvalidArgument(format!("{} has no file name", local.display())))?,
        };
        let file = fs::File::open(local).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => NsgError::NotFound(local.display().to_string()),
            _ => NsgError::LocalIo(e),
        })?;
        let size = file.metadata().await?.len();

        tracing::debug!(local = %local.display(), size, "uploading");
        let inbound = file_stream(file, self.gateway.staging().block_size());
        let result = self.gateway.upload(&remote(remote_dir), inbound, &file_name).await;

        self.report(&result, |uploaded| {
            println!("Uploaded {} ({}) -> {}", local.display(), bytesize::ByteSize(size), uploaded.path);
        })
    }

    /// Download a remote file
    pub async fn get(&self, remote_path: &str, local: Option<&Path>) -> NsgResult<bool> {
        let remote_path = remote(remote_path);
        let target: PathBuf = match local {
            Some(p) => p.to_path_buf(),
            None => PathBuf::from(nsg_core::path::file_name(&remote_path)),
        };
        if target.as_os_str().is_empty() {
            return Err(NsgError::InvalidArgument("no local destination for the root directory".into()));
        }

        // Download next to the target and replace it only once complete
        let dir = match target.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let partial = tempfile::Builder::new().prefix(".nsg-get-").suffix(".part").tempfile_in(&dir)?;
        let (file, partial_path) = partial.into_parts();

        let mut outbound = SizedWriter::new(fs::File::from_std(file));
        let result = self.gateway.download(&remote_path, &mut outbound).await;
        let complete = result.success && outbound.is_complete();
        drop(outbound);

        if complete {
            partial_path.persist(&target).map_err(|e| NsgError::LocalIo(e.error))?;
        } else if let Err(e) = partial_path.close() {
            tracing::warn!(dir = %dir.display(), error = %e, "failed to remove partial download");
        }

        self.report(&result, |downloaded| {
            println!(
                "Downloaded {} ({}) -> {}",
                downloaded.path,
                bytesize::ByteSize(downloaded.bytes),
                target.display()
            );
        })
    }

    /// Show the configured namespace and whether it answers
    pub async fn status(&self) -> NsgResult<bool> {
        let client = self.gateway.client();
        let available = client.is_available().await;

        if self.json {
            let status = serde_json::json!({
                "id": client.id(),
                "displayName": client.display_name(),
                "available": available,
                "stagingDir": self.gateway.staging().dir().display().to_string(),
                "strictStatus": self.config.errors.strict_status,
            });
            println!("{status:#}");
            return Ok(available);
        }

        let shown = if available {
            style("available").green()
        } else {
            style("unavailable").red()
        };
        println!("Namespace: {} ({}) - {}", client.id(), client.display_name(), shown);
        println!("  Staging dir: {}", self.gateway.staging().dir().display());
        println!("  Block size:  {}", bytesize::ByteSize(self.gateway.staging().block_size() as u64));
        println!(
            "  Status codes: {}",
            if self.config.errors.strict_status { "strict" } else { "uniform" }
        );
        Ok(available)
    }
}
