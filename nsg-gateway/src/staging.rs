// SPDX-License-Identifier: AGPL-3.0-or-later
//! Transfer staging
//!
//! Namespace clients copy whole files between local paths and the remote
//! namespace. Request and response bodies are streams, so every transfer
//! goes through a short-lived local file: the staged buffer.
//!
//! A buffer belongs to exactly one transfer. It is released explicitly once
//! the transfer finishes, and dropping it (for instance when the request
//! future is cancelled) removes the file as well. Failing to remove a buffer
//! is logged and never replaces the transfer's own error.

use bytes::Bytes;
use futures::{Stream, StreamExt};
use nsg_core::config::StagingConfig;
use nsg_core::path::join_child;
use nsg_core::{NamespaceClient, NsgError, NsgResult};
use std::io;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::task::{Context, Poll};
use tempfile::TempPath;
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Inbound request body
pub type ByteStream = Pin<Box<dyn Stream<Item = NsgResult<Bytes>> + Send>>;

/// Outbound response body.
///
/// The transfer length is announced once, before the first byte, so the
/// receiver can detect truncation.
pub trait OutboundChannel: AsyncWrite + Unpin + Send {
    fn set_content_length(&mut self, len: u64);
}

/// [`OutboundChannel`] over any writer, recording the announced length
#[derive(Debug)]
pub struct SizedWriter<W> {
    inner: W,
    content_length: Option<u64>,
    written: u64,
}

impl<W> SizedWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner, content_length: None, written: 0 }
    }

    pub fn content_length(&self) -> Option<u64> {
        self.content_length
    }

    pub fn written(&self) -> u64 {
        self.written
    }

    /// True once exactly the announced number of bytes went through
    pub fn is_complete(&self) -> bool {
        self.content_length == Some(self.written)
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: AsyncWrite + Unpin> AsyncWrite for SizedWriter<W> {
    fn poll_write(mut self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &[u8]) -> Poll<io::Result<usize>> {
        let poll = Pin::new(&mut self.inner).poll_write(cx, buf);
        if let Poll::Ready(Ok(n)) = poll {
            self.written += n as u64;
        }
        poll
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_shutdown(cx)
    }
}

impl<W: AsyncWrite + Unpin + Send> OutboundChannel for SizedWriter<W> {
    fn set_content_length(&mut self, len: u64) {
        self.content_length = Some(len);
    }
}

/// Transfer direction, reflected in the buffer's file name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Upload,
    Download,
}

impl Direction {
    fn prefix(&self) -> &'static str {
        match self {
            Direction::Upload => "nsg-upload-",
            Direction::Download => "nsg-download-",
        }
    }
}

/// A uniquely named local file owned by one transfer
#[derive(Debug)]
pub struct StagedBuffer {
    path: Option<TempPath>,
}

impl StagedBuffer {
    pub fn path(&self) -> &Path {
        match &self.path {
            Some(p) => &**p,
            None => Path::new(""),
        }
    }

    pub async fn len(&self) -> NsgResult<u64> {
        Ok(fs::metadata(self.path()).await?.len())
    }

    /// Delete the buffer. Failures are logged, not returned.
    pub async fn release(mut self) {
        let Some(temp) = self.path.take() else { return };
        let shown = temp.to_path_buf();
        match tokio::task::spawn_blocking(move || temp.close()).await {
            Ok(Ok(())) => tracing::debug!(path = %shown.display(), "released staged buffer"),
            Ok(Err(e)) => tracing::warn!(path = %shown.display(), error = %e, "failed to remove staged buffer"),
            Err(e) => tracing::warn!(path = %shown.display(), error = %e, "staged buffer cleanup task failed"),
        }
    }
}

impl Drop for StagedBuffer {
    fn drop(&mut self) {
        if let Some(temp) = self.path.take() {
            let shown = temp.to_path_buf();
            match temp.close() {
                Ok(()) => tracing::debug!(path = %shown.display(), "staged buffer removed on drop"),
                Err(e) => tracing::warn!(path = %shown.display(), error = %e, "failed to remove staged buffer"),
            }
        }
    }
}

/// Allocates staged buffers and runs transfers through them
#[derive(Debug, Clone)]
pub struct StagingArea {
    dir: PathBuf,
    block_size: usize,
}

impl StagingArea {
    pub fn new(dir: impl Into<PathBuf>, block_size: usize) -> Self {
        Self { dir: dir.into(), block_size: block_size.max(1) }
    }

    pub fn from_config(config: &StagingConfig) -> Self {
        Self::new(config.resolved_dir(), config.block_size)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Create an empty buffer with a collision-free name
    pub async fn allocate(&self, direction: Direction) -> NsgResult<StagedBuffer> {
        let dir = self.dir.clone();
        let prefix = direction.prefix();
        let file = tokio::task::spawn_blocking(move || {
            tempfile::Builder::new().prefix(prefix).suffix(".tmp").tempfile_in(dir)
        })
        .await
        .map_err(|e| NsgError::LocalIo(io::Error::new(io::ErrorKind::Other, e)))??;

        let temp = file.into_temp_path();
        tracing::debug!(path = %temp.display(), "allocated staged buffer");
        Ok(StagedBuffer { path: Some(temp) })
    }

    /// Stage `inbound` locally, then copy it to `<remote_dir>/<file_name>`.
    ///
    /// Returns the remote target path.
    pub async fn upload(
        &self,
        client: &dyn NamespaceClient,
        remote_dir: &str,
        inbound: ByteStream,
        file_name: &str,
    ) -> NsgResult<String> {
        let target = join_child(remote_dir, file_name);
        let buffer = self.allocate(Direction::Upload).await?;

        let result = async {
            let staged = fill_buffer(buffer.path(), inbound).await?;
            tracing::debug!(remote = %target, bytes = staged, "copying staged upload");
            client.copy_in(buffer.path(), &target).await
        }
        .await;

        buffer.release().await;
        result.map(|()| target)
    }

    /// Copy `remote_path` into a buffer, then stream it to `outbound`.
    ///
    /// Returns the number of bytes sent.
    pub async fn download<W>(&self, client: &dyn NamespaceClient, remote_path: &str, outbound: &mut W) -> NsgResult<u64>
    where
        W: OutboundChannel + ?Sized,
    {
        let buffer = self.allocate(Direction::Download).await?;

        let result = async {
            client.copy_out(remote_path, buffer.path()).await?;
            self.drain_buffer(buffer.path(), outbound).await
        }
        .await;

        buffer.release().await;
        result
    }

    async fn drain_buffer<W>(&self, path: &Path, outbound: &mut W) -> NsgResult<u64>
    where
        W: OutboundChannel + ?Sized,
    {
        let mut file = fs::File::open(path).await?;
        let len = file.metadata().await?.len();
        outbound.set_content_length(len);

        let mut block = vec![0u8; self.block_size];
        let mut sent = 0u64;
        loop {
            let n = file.read(&mut block).await?;
            if n == 0 {
                break;
            }
            outbound.write_all(&block[..n]).await?;
            sent += n as u64;
        }
        outbound.flush().await?;

        if sent != len {
            return Err(NsgError::LocalIo(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("staged buffer changed size: announced {len} bytes, sent {sent}"),
            )));
        }
        Ok(sent)
    }
}

/// Copy the whole inbound stream into `path`; returns the byte count
async fn fill_buffer(path: &Path, mut inbound: ByteStream) -> NsgResult<u64> {
    let mut file = fs::OpenOptions::new().write(true).truncate(true).open(path).await?;
    let mut staged = 0u64;
    while let Some(chunk) = inbound.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        staged += chunk.len() as u64;
    }
    file.flush().await?;
    file.sync_all().await?;
    Ok(staged)
}
