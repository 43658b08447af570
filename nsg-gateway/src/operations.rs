// SPDX-License-Identifier: AGPL-3.0-or-later
//! Gateway operations
//!
//! Each operation validates its arguments, runs against the shared namespace
//! handle and folds every error into an [`OperationResult`]. Nothing here
//! returns a bare error to the transport.

use nsg_core::path::file_name as remote_file_name;
use nsg_core::{entry, GatewayConfig, NamespaceClient, NsgError, NsgResult};
use nsg_search::TreeWalker;
use std::sync::Arc;

use crate::response::{Created, Deleted, Downloaded, Listing, OperationResult, SearchResults, Uploaded};
use crate::staging::{ByteStream, OutboundChannel, StagingArea};

/// Directory used when a listing or search names none
pub const DEFAULT_DIR: &str = "/";

/// Entry point for the transport layer.
///
/// Holds the process-wide namespace handle; share the gateway itself behind
/// an `Arc` to serve concurrent requests.
pub struct Gateway {
    client: Arc<dyn NamespaceClient>,
    walker: TreeWalker,
    staging: StagingArea,
    strict_status: bool,
}

fn require<'a>(name: &str, value: &'a str) -> NsgResult<&'a str> {
    if value.is_empty() {
        return Err(NsgError::InvalidArgument(format!("{name} parameter is required")));
    }
    Ok(value)
}

fn or_default_dir(path: &str) -> &str {
    if path.is_empty() {
        DEFAULT_DIR
    } else {
        path
    }
}

impl Gateway {
    pub fn new(client: Arc<dyn NamespaceClient>, staging: StagingArea) -> Self {
        Self {
            walker: TreeWalker::new(Arc::clone(&client)),
            client,
            staging,
            strict_status: false,
        }
    }

    pub fn from_config(client: Arc<dyn NamespaceClient>, config: &GatewayConfig) -> Self {
        Self::new(client, StagingArea::from_config(&config.staging)).with_strict_status(config.errors.strict_status)
    }

    pub fn with_strict_status(mut self, strict: bool) -> Self {
        self.strict_status = strict;
        self
    }

    pub fn client(&self) -> &Arc<dyn NamespaceClient> {
        &self.client
    }

    pub fn staging(&self) -> &StagingArea {
        &self.staging
    }

    /// Status code the transport should send for `result`
    pub fn status_for<T>(&self, result: &OperationResult<T>) -> u16 {
        result.status_code(self.strict_status)
    }

    /// List one directory level. An empty path lists the root.
    pub async fn list(&self, path: &str) -> OperationResult<Listing> {
        let path = or_default_dir(path);
        tracing::debug!(path, "list");

        match self.client.list_entries(path).await {
            Ok(raw) => {
                let items = entry::decode_all(&raw).into_iter().map(Into::into).collect();
                OperationResult::ok("Directory listed", Listing { path: path.to_string(), items })
            }
            Err(e) => OperationResult::failure("Failed to list directory", &e),
        }
    }

    /// Create a directory and its parents
    pub async fn create(&self, path: &str) -> OperationResult<Created> {
        tracing::debug!(path, "create");
        let result = async {
            let path = require("Path", path)?;
            self.client.make_directories(path).await
        }
        .await;

        match result {
            Ok(true) => OperationResult::ok("Directory created successfully", Created { created: true }),
            Ok(false) => OperationResult::ok("Directory already exists", Created { created: false }),
            Err(e) => OperationResult::failure("Failed to create directory", &e),
        }
    }

    /// Delete a file or directory. A missing path is a successful `false`.
    pub async fn delete(&self, path: &str, recursive: bool) -> OperationResult<Deleted> {
        tracing::debug!(path, recursive, "delete");
        let result = async {
            let path = require("Path", path)?;
            self.client.delete(path, recursive).await
        }
        .await;

        match result {
            Ok(true) => OperationResult::ok("Deleted successfully", Deleted { deleted: true }),
            Ok(false) => OperationResult::ok("Path not found", Deleted { deleted: false }),
            Err(e) => OperationResult::failure("Failed to delete", &e),
        }
    }

    /// Recursive name search below `start_dir` (the root when empty)
    pub async fn search(&self, start_dir: &str, name_contains: &str) -> OperationResult<SearchResults> {
        let start_dir = or_default_dir(start_dir);
        tracing::debug!(start_dir, name_contains, "search");

        if name_contains.is_empty() {
            let err = NsgError::InvalidArgument("Name parameter is required for search".into());
            return OperationResult::failure("Search failed", &err);
        }

        let outcome = self.walker.search_with_stats(start_dir, name_contains).await;
        let message = if outcome.is_degraded() {
            format!(
                "Search completed; {} director{} could not be read",
                outcome.stats.directories_skipped,
                if outcome.stats.directories_skipped == 1 { "y" } else { "ies" }
            )
        } else {
            "Search completed".to_string()
        };
        OperationResult::ok(
            message,
            SearchResults { count: outcome.paths.len(), results: outcome.paths, stats: outcome.stats },
        )
    }

    /// Store `inbound` as `<remote_dir>/<file_name>`
    pub async fn upload(&self, remote_dir: &str, inbound: ByteStream, file_name: &str) -> OperationResult<Uploaded> {
        tracing::debug!(remote_dir, file_name, "upload");
        let result = async {
            let remote_dir = require("Path", remote_dir)?;
            if file_name.is_empty() || file_name.contains('/') {
                return Err(NsgError::InvalidArgument(format!("invalid file name '{file_name}'")));
            }
            self.staging.upload(self.client.as_ref(), remote_dir, inbound, file_name).await
        }
        .await;

        match result {
            Ok(path) => OperationResult::ok("File uploaded successfully", Uploaded { path }),
            Err(e) => OperationResult::failure("Upload failed", &e),
        }
    }

    /// Stream the remote file at `remote_path` into `outbound`
    pub async fn download<W>(&self, remote_path: &str, outbound: &mut W) -> OperationResult<Downloaded>
    where
        W: OutboundChannel + ?Sized,
    {
        tracing::debug!(remote_path, "download");
        let result = async move {
            let remote_path = require("Path", remote_path)?;
            self.staging.download(self.client.as_ref(), remote_path, outbound).await
        }
        .await;

        match result {
            Ok(bytes) => OperationResult::ok(
                "File downloaded successfully",
                Downloaded {
                    path: remote_path.to_string(),
                    file_name: remote_file_name(remote_path).to_string(),
                    bytes,
                },
            ),
            Err(e) => OperationResult::failure("Download failed", &e),
        }
    }

    /// Release the namespace handle
    pub async fn close(&self) -> NsgResult<()> {
        self.client.close().await
    }
}
