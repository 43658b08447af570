//! Shared helpers for gateway integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use nsg_core::{NamespaceClient, NsgError, NsgResult, RawDescriptor};
use nsg_gateway::{ByteStream, Gateway, OutboundChannel, StagingArea};
use nsg_providers::LocalNamespace;
use std::collections::HashSet;
use std::io;
use std::path::Path;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use tempfile::TempDir;
use tokio::io::AsyncWrite;

/// Local namespace that can be told to fail specific calls
pub struct FlakyNamespace {
    inner: LocalNamespace,
    failing_lists: HashSet<String>,
    fail_copy_in: AtomicBool,
}

impl FlakyNamespace {
    pub fn new(root: &Path) -> Self {
        Self {
            inner: LocalNamespace::new("flaky", root),
            failing_lists: HashSet::new(),
            fail_copy_in: AtomicBool::new(false),
        }
    }

    pub fn failing_list(mut self, path: &str) -> Self {
        self.failing_lists.insert(path.to_string());
        self
    }

    pub fn fail_copy_in(self) -> Self {
        self.fail_copy_in.store(true, Ordering::SeqCst);
        self
    }
}

#[async_trait]
impl NamespaceClient for FlakyNamespace {
    fn id(&self) -> &str {
        "flaky"
    }

    fn display_name(&self) -> &str {
        "Flaky local namespace"
    }

    async fn is_available(&self) -> bool {
        self.inner.is_available().await
    }

    async fn list_entries(&self, path: &str) -> NsgResult<Vec<RawDescriptor>> {
        if self.failing_lists.contains(path) {
            return Err(NsgError::RemoteIo(format!("{path}: lease expired")));
        }
        self.inner.list_entries(path).await
    }

    async fn make_directories(&self, path: &str) -> NsgResult<bool> {
        self.inner.make_directories(path).await
    }

    async fn delete(&self, path: &str, recursive: bool) -> NsgResult<bool> {
        self.inner.delete(path, recursive).await
    }

    async fn copy_in(&self, local: &Path, remote_path: &str) -> NsgResult<()> {
        if self.fail_copy_in.load(Ordering::SeqCst) {
            return Err(NsgError::RemoteIo("datanode connection refused".into()));
        }
        self.inner.copy_in(local, remote_path).await
    }

    async fn copy_out(&self, remote_path: &str, local: &Path) -> NsgResult<()> {
        self.inner.copy_out(remote_path, local).await
    }

    async fn close(&self) -> NsgResult<()> {
        self.inner.close().await
    }
}

/// A gateway over a scratch namespace with its own scratch staging dir
pub struct Fixture {
    pub remote: TempDir,
    pub staging: TempDir,
    pub gateway: Gateway,
}

impl Fixture {
    pub fn local() -> Self {
        Self::with(|root| Arc::new(LocalNamespace::new("local", root)))
    }

    pub fn with(make: impl FnOnce(&Path) -> Arc<dyn NamespaceClient>) -> Self {
        let remote = tempfile::tempdir().unwrap();
        let staging = tempfile::tempdir().unwrap();
        let client = make(remote.path());
        let gateway = Gateway::new(client, StagingArea::new(staging.path(), 16));
        Self { remote, staging, gateway }
    }

    /// Create a file inside the namespace, parents included
    pub fn put_file(&self, path: &str, contents: &[u8]) {
        let real = self.remote.path().join(path.trim_start_matches('/'));
        std::fs::create_dir_all(real.parent().unwrap()).unwrap();
        std::fs::write(real, contents).unwrap();
    }

    pub fn read_file(&self, path: &str) -> Option<Vec<u8>> {
        std::fs::read(self.remote.path().join(path.trim_start_matches('/'))).ok()
    }

    pub fn staged_buffers(&self) -> usize {
        std::fs::read_dir(self.staging.path()).unwrap().count()
    }
}

/// Inbound body delivering `data` in small chunks
pub fn body(data: &[u8]) -> ByteStream {
    let chunks: Vec<NsgResult<Bytes>> = data.chunks(7).map(|c| Ok(Bytes::copy_from_slice(c))).collect();
    Box::pin(futures::stream::iter(chunks))
}

/// Inbound body that delivers `data` and then loses the connection
pub fn broken_body(data: &[u8]) -> ByteStream {
    let chunks: Vec<NsgResult<Bytes>> = vec![
        Ok(Bytes::copy_from_slice(data)),
        Err(NsgError::LocalIo(std::io::Error::new(
            std::io::ErrorKind::ConnectionAborted,
            "client disconnected",
        ))),
    ];
    Box::pin(futures::stream::iter(chunks))
}

/// Outbound channel whose peer goes away after a number of writes
pub struct DroppingSink {
    writes_left: usize,
    pub content_length: Option<u64>,
    pub received: Vec<u8>,
}

impl DroppingSink {
    pub fn after_writes(writes: usize) -> Self {
        Self { writes_left: writes, content_length: None, received: Vec::new() }
    }
}

impl AsyncWrite for DroppingSink {
    fn poll_write(mut self: Pin<&mut Self>, _cx: &mut Context<'_>, buf: &[u8]) -> Poll<io::Result<usize>> {
        if self.writes_left == 0 {
            return Poll::Ready(Err(io::Error::new(io::ErrorKind::BrokenPipe, "peer closed connection")));
        }
        self.writes_left -= 1;
        self.received.extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

impl OutboundChannel for DroppingSink {
    fn set_content_length(&mut self, len: u64) {
        self.content_length = Some(len);
    }
}
