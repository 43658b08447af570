//! Local directory namespace
//!
//! Serves a local directory tree as if it were the remote namespace. Used
//! for development, single-host deployments and the integration tests.

use async_trait::async_trait;
use nsg_core::{
    entry::{encode, EntryKind, RawDescriptor},
    error::{NsgError, NsgResult},
    NamespaceClient, RemotePath,
};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::fs;

/// Namespace rooted at a local directory
pub struct LocalNamespace {
    id: String,
    root: PathBuf,
    closed: AtomicBool,
}

impl LocalNamespace {
    pub fn new(id: impl Into<String>, root: impl AsRef<Path>) -> Self {
        Self {
            id: id.into(),
            root: root.as_ref().to_path_buf(),
            closed: AtomicBool::new(false),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn to_real_path(&self, path: &RemotePath) -> PathBuf {
        let mut real = self.root.clone();
        for seg in path.segments() {
            real.push(seg);
        }
        real
    }

    fn ensure_open(&self) -> NsgResult<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(NsgError::RemoteIo(format!("namespace '{}' is closed", self.id)));
        }
        Ok(())
    }

    /// First existing ancestor of `path` (or `path` itself) that is a file
    async fn file_in_the_way(&self, path: &RemotePath) -> Option<RemotePath> {
        let mut prefix = RemotePath::root();
        for seg in path.segments() {
            prefix = prefix.join(seg);
            match fs::metadata(self.to_real_path(&prefix)).await {
                Ok(meta) if !meta.is_dir() => return Some(prefix),
                Ok(_) => continue,
                Err(_) => return None,
            }
        }
        None
    }
}

fn map_io(path: &str, err: io::Error) -> NsgError {
    match err.kind() {
        io::ErrorKind::NotFound => NsgError::NotFound(path.to_string()),
        _ => NsgError::RemoteIo(format!("{path}: {err}")),
    }
}

#[async_trait]
impl NamespaceClient for LocalNamespace {
    fn id(&self) -> &str {
        &self.id
    }

    fn display_name(&self) -> &str {
        "Local Directory"
    }

    async fn is_available(&self) -> bool {
        !self.closed.load(Ordering::Acquire) && self.root.is_dir()
    }

    async fn list_entries(&self, path: &str) -> NsgResult<Vec<RawDescriptor>> {
        self.ensure_open()?;
        let vpath = RemotePath::new(path);
        let real = self.to_real_path(&vpath);

        let meta = fs::metadata(&real).await.map_err(|e| map_io(path, e))?;
        if !meta.is_dir() {
            return Err(NsgError::NotADirectory(path.to_string()));
        }

        let mut children = Vec::new();
        let mut read_dir = fs::read_dir(&real).await.map_err(|e| map_io(path, e))?;
        while let Some(entry) = read_dir.next_entry().await.map_err(|e| map_io(path, e))? {
            let name = entry.file_name().to_string_lossy().into_owned();
            // Follow symlinks so a linked directory lists as a directory
            let kind = match fs::metadata(entry.path()).await {
                Ok(m) if m.is_dir() => EntryKind::Directory,
                _ => EntryKind::File,
            };
            children.push((name, kind));
        }

        // HDFS lists children in name order
        children.sort_by(|a, b| a.0.cmp(&b.0));

        Ok(children
            .into_iter()
            .map(|(name, kind)| encode(kind, &vpath.join(&name).to_path_string()))
            .collect())
    }

    async fn make_directories(&self, path: &str) -> NsgResult<bool> {
        self.ensure_open()?;
        let vpath = RemotePath::new(path);
        let real = self.to_real_path(&vpath);

        match fs::metadata(&real).await {
            Ok(meta) if meta.is_dir() => return Ok(false),
            Ok(_) => return Err(NsgError::PathConflict(path.to_string())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(map_io(path, e)),
        }

        if let Some(blocker) = self.file_in_the_way(&vpath).await {
            return Err(NsgError::PathConflict(format!("{blocker} is a file")));
        }

        fs::create_dir_all(&real).await.map_err(|e| map_io(path, e))?;
        Ok(true)
    }

    async fn delete(&self, path: &str, recursive: bool) -> NsgResult<bool> {
        self.ensure_open()?;
        let vpath = RemotePath::new(path);
        if vpath.is_root() {
            return Err(NsgError::PathConflict("refusing to delete the namespace root".into()));
        }
        let real = self.to_real_path(&vpath);

        let meta = match fs::symlink_metadata(&real).await {
            Ok(meta) => meta,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(map_io(path, e)),
        };

        if meta.is_dir() {
            if recursive {
                fs::remove_dir_all(&real).await.map_err(|e| map_io(path, e))?;
            } else {
                let mut read_dir = fs::read_dir(&real).await.map_err(|e| map_io(path, e))?;
                if read_dir.next_entry().await.map_err(|e| map_io(path, e))?.is_some() {
                    return Err(NsgError::NotEmpty(path.to_string()));
                }
                fs::remove_dir(&real).await.map_err(|e| map_io(path, e))?;
            }
        } else {
            fs::remove_file(&real).await.map_err(|e| map_io(path, e))?;
        }
        Ok(true)
    }

    async fn copy_in(&self, local: &Path, remote_path: &str) -> NsgResult<()> {
        self.ensure_open()?;
        let vpath = RemotePath::new(remote_path);
        let real = self.to_real_path(&vpath);

        if fs::metadata(&real).await.map(|m| m.is_dir()).unwrap_or(false) {
            return Err(NsgError::PathConflict(format!("{remote_path} is a directory")));
        }
        if let Some(parent) = vpath.parent() {
            if let Some(blocker) = self.file_in_the_way(&parent).await {
                return Err(NsgError::PathConflict(format!("{blocker} is a file")));
            }
            fs::create_dir_all(self.to_real_path(&parent))
                .await
                .map_err(|e| map_io(remote_path, e))?;
        }

        fs::copy(local, &real).await.map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => NsgError::NotFound(local.display().to_string()),
            _ => NsgError::RemoteIo(format!("{remote_path}: {e}")),
        })?;
        Ok(())
    }

    async fn copy_out(&self, remote_path: &str, local: &Path) -> NsgResult<()> {
        self.ensure_open()?;
        let real = self.to_real_path(&RemotePath::new(remote_path));

        let meta = fs::metadata(&real).await.map_err(|e| map_io(remote_path, e))?;
        if meta.is_dir() {
            return Err(NsgError::PathConflict(format!("{remote_path} is a directory")));
        }

        fs::copy(&real, local).await.map_err(|e| map_io(remote_path, e))?;
        Ok(())
    }

    async fn close(&self) -> NsgResult<()> {
        if !self.closed.swap(true, Ordering::AcqRel) {
            tracing::info!(id = %self.id, "closed local namespace");
        }
        Ok(())
    }
}
