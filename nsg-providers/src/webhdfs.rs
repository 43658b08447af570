//! WebHDFS namespace client
//!
//! Talks to an HDFS namenode over its REST API
//! (`http://<namenode>:9870/webhdfs/v1<path>?op=...`). Uploads and
//! downloads follow the two-step protocol: the namenode answers with a
//! redirect to a datanode, which then receives or serves the bytes.

use async_trait::async_trait;
use futures::StreamExt;
use nsg_core::{
    entry::{encode, EntryKind, RawDescriptor},
    error::{NsgError, NsgResult},
    NamespaceClient, RemotePath,
};
use reqwest::{header, redirect::Policy, Body, Client, Method, Response, StatusCode, Url};
use serde::Deserialize;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::io::AsyncWriteExt;

/// WebHDFS client configuration
#[derive(Debug, Clone)]
pub struct WebHdfsConfig {
    /// Namenode HTTP address, e.g. `http://node1:9870`
    pub url: String,
    /// Passed as `user.name` (simple authentication)
    pub user: String,
    /// Deadline for namenode calls; idle limit for datanode transfers
    pub timeout: Duration,
}

/// HDFS namespace reached through WebHDFS
pub struct WebHdfsNamespace {
    id: String,
    base: Url,
    user: String,
    http: Client,
    timeout: Duration,
    closed: AtomicBool,
}

#[derive(Debug, Deserialize)]
struct FileStatusesResponse {
    #[serde(rename = "FileStatuses")]
    file_statuses: FileStatuses,
}

#[derive(Debug, Deserialize)]
struct FileStatuses {
    #[serde(rename = "FileStatus")]
    file_status: Vec<FileStatus>,
}

#[derive(Debug, Deserialize)]
struct FileStatusResponse {
    #[serde(rename = "FileStatus")]
    file_status: FileStatus,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileStatus {
    #[serde(default)]
    path_suffix: String,
    #[serde(rename = "type")]
    kind: String,
}

impl FileStatus {
    fn is_directory(&self) -> bool {
        self.kind == "DIRECTORY"
    }
}

#[derive(Debug, Deserialize)]
struct BooleanResponse {
    boolean: bool,
}

#[derive(Debug, Deserialize)]
struct RemoteExceptionResponse {
    #[serde(rename = "RemoteException")]
    remote_exception: RemoteException,
}

#[derive(Debug, Deserialize)]
struct RemoteException {
    exception: String,
    #[serde(default)]
    message: String,
}

impl WebHdfsNamespace {
    pub fn new(id: impl Into<String>, config: WebHdfsConfig) -> NsgResult<Self> {
        let base = Url::parse(&config.url)
            .map_err(|e| NsgError::Config(format!("invalid WebHDFS url '{}': {e}", config.url)))?;
        // Datanode bodies are bounded by idle time only, never total time
        let http = Client::builder()
            .connect_timeout(config.timeout)
            .read_timeout(config.timeout)
            .redirect(Policy::none())
            .build()
            .map_err(NsgError::remote)?;

        tracing::info!(url = %base, user = %config.user, "opened WebHDFS namespace");
        Ok(Self {
            id: id.into(),
            base,
            user: config.user,
            http,
            timeout: config.timeout,
            closed: AtomicBool::new(false),
        })
    }

    fn ensure_open(&self) -> NsgResult<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(NsgError::RemoteIo(format!("namespace '{}' is closed", self.id)));
        }
        Ok(())
    }

    /// Build `<base>/webhdfs/v1/<segments>?op=<op>&user.name=<user>&<extra>`
    fn op_url(&self, path: &RemotePath, op: &str, extra: &[(&str, &str)]) -> NsgResult<Url> {
        let mut url = self.base.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| NsgError::Config(format!("'{}' cannot be a base url", self.base)))?;
            segments.pop_if_empty().push("webhdfs").push("v1");
            for seg in path.segments() {
                segments.push(seg);
            }
            if path.is_root() {
                segments.push("");
            }
        }
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("op", op).append_pair("user.name", &self.user);
            for (key, value) in extra {
                query.append_pair(key, value);
            }
        }
        Ok(url)
    }

    /// Namenode call, bounded by the configured deadline
    async fn send(&self, method: Method, url: Url) -> NsgResult<Response> {
        self.http
            .request(method, url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(NsgError::remote)
    }

    async fn get_status(&self, path: &RemotePath) -> NsgResult<Option<FileStatus>> {
        let shown = path.to_path_string();
        let url = self.op_url(path, "GETFILESTATUS", &[])?;
        let response = self.send(Method::GET, url).await?;
        match check(&shown, response).await {
            Ok(response) => {
                let status: FileStatusResponse = response.json().await.map_err(NsgError::remote)?;
                Ok(Some(status.file_status))
            }
            Err(NsgError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Issue a namenode request that answers with a datanode redirect
    async fn datanode_location(&self, method: Method, url: Url, shown: &str) -> NsgResult<Url> {
        let response = self.send(method, url).await?;
        if !response.status().is_redirection() {
            check(shown, response).await?;
            return Err(NsgError::RemoteIo(format!("{shown}: namenode did not redirect to a datanode")));
        }
        let location = response
            .headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| NsgError::RemoteIo(format!("{shown}: redirect without location")))?;
        Url::parse(location).map_err(NsgError::remote)
    }
}

/// Pass successful responses through, turn failures into errors
async fn check(shown: &str, response: Response) -> NsgResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let text = response.text().await.unwrap_or_default();
    if let Ok(body) = serde_json::from_str::<RemoteExceptionResponse>(&text) {
        return Err(map_exception(shown, &body.remote_exception));
    }
    if status == StatusCode::NOT_FOUND {
        return Err(NsgError::NotFound(shown.to_string()));
    }
    Err(NsgError::RemoteIo(format!("{shown}: {status}: {text}")))
}

fn map_exception(shown: &str, ex: &RemoteException) -> NsgError {
    match ex.exception.as_str() {
        "FileNotFoundException" => NsgError::NotFound(shown.to_string()),
        "PathIsNotEmptyDirectoryException" => NsgError::NotEmpty(shown.to_string()),
        "FileAlreadyExistsException" | "ParentNotDirectoryException" => {
            NsgError::PathConflict(format!("{shown}: {}", ex.message))
        }
        // Older namenodes report non-empty deletes as a plain IOException
        _ if ex.message.contains("non empty") || ex.message.contains("not empty") => {
            NsgError::NotEmpty(shown.to_string())
        }
        _ => NsgError::RemoteIo(format!("{shown}: {}: {}", ex.exception, ex.message)),
    }
}

fn listing_to_descriptors(dir: &RemotePath, statuses: &[FileStatus]) -> NsgResult<Vec<RawDescriptor>> {
    // LISTSTATUS on a file answers with the file's own status
    if let [only] = statuses {
        if only.path_suffix.is_empty() && !only.is_directory() {
            return Err(NsgError::NotADirectory(dir.to_path_string()));
        }
    }
    Ok(statuses
        .iter()
        .map(|s| {
            let kind = if s.is_directory() { EntryKind::Directory } else { EntryKind::File };
            encode(kind, &dir.join(&s.path_suffix).to_path_string())
        })
        .collect())
}

#[async_trait]
impl NamespaceClient for WebHdfsNamespace {
    fn id(&self) -> &str {
        &self.id
    }

    fn display_name(&self) -> &str {
        "HDFS (WebHDFS)"
    }

    async fn is_available(&self) -> bool {
        self.ensure_open().is_ok() && self.get_status(&RemotePath::root()).await.is_ok()
    }

    async fn list_entries(&self, path: &str) -> NsgResult<Vec<RawDescriptor>> {
        self.ensure_open()?;
        let vpath = RemotePath::new(path);
        let url = self.op_url(&vpath, "LISTSTATUS", &[])?;
        let response = check(path, self.send(Method::GET, url).await?).await?;
        let listing: FileStatusesResponse = response.json().await.map_err(NsgError::remote)?;
        listing_to_descriptors(&vpath, &listing.file_statuses.file_status)
    }

    async fn make_directories(&self, path: &str) -> NsgResult<bool> {
        self.ensure_open()?;
        let vpath = RemotePath::new(path);
        match self.get_status(&vpath).await? {
            Some(status) if status.is_directory() => return Ok(false),
            Some(_) => return Err(NsgError::PathConflict(path.to_string())),
            None => {}
        }

        let url = self.op_url(&vpath, "MKDIRS", &[])?;
        let response = check(path, self.send(Method::PUT, url).await?).await?;
        let result: BooleanResponse = response.json().await.map_err(NsgError::remote)?;
        Ok(result.boolean)
    }

    async fn delete(&self, path: &str, recursive: bool) -> NsgResult<bool> {
        self.ensure_open()?;
        let vpath = RemotePath::new(path);
        let recursive = if recursive { "true" } else { "false" };
        let url = self.op_url(&vpath, "DELETE", &[("recursive", recursive)])?;
        let response = check(path, self.send(Method::DELETE, url).await?).await?;
        let result: BooleanResponse = response.json().await.map_err(NsgError::remote)?;
        Ok(result.boolean)
    }

    async fn copy_in(&self, local: &Path, remote_path: &str) -> NsgResult<()> {
        self.ensure_open()?;
        let file = tokio::fs::File::open(local).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => NsgError::NotFound(local.display().to_string()),
            _ => NsgError::LocalIo(e),
        })?;
        let len = file.metadata().await?.len();

        let vpath = RemotePath::new(remote_path);
        let url = self.op_url(&vpath, "CREATE", &[("overwrite", "true")])?;
        let datanode = self.datanode_location(Method::PUT, url, remote_path).await?;

        let response = self
            .http
            .put(datanode)
            .header(header::CONTENT_TYPE, "application/octet-stream")
            .header(header::CONTENT_LENGTH, len)
            .body(Body::from(file))
            .send()
            .await
            .map_err(NsgError::remote)?;
        check(remote_path, response).await?;
        Ok(())
    }

    async fn copy_out(&self, remote_path: &str, local: &Path) -> NsgResult<()> {
        self.ensure_open()?;
        let vpath = RemotePath::new(remote_path);
        let url = self.op_url(&vpath, "OPEN", &[])?;
        let datanode = self.datanode_location(Method::GET, url, remote_path).await?;

        let response = self.http.get(datanode).send().await.map_err(NsgError::remote)?;
        let response = check(remote_path, response).await?;
        let mut out = tokio::fs::File::create(local).await?;
        let mut body = response.bytes_stream();
        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(NsgError::remote)?;
            out.write_all(&chunk).await?;
        }
        out.flush().await?;
        Ok(())
    }

    async fn close(&self) -> NsgResult<()> {
        if !self.closed.swap(true, Ordering::AcqRel) {
            tracing::info!(id = %self.id, "closed WebHDFS namespace");
        }
        Ok(())
    }
}
