//! Namespace client trait

use async_trait::async_trait;
use std::path::Path;

use crate::{entry::RawDescriptor, error::NsgResult};

/// Connection to a remote hierarchical filesystem.
///
/// One handle is opened per process and shared by every in-flight
/// operation, so implementations must accept concurrent calls. No locking is
/// done on top of whatever the remote filesystem guarantees.
#[async_trait]
pub trait NamespaceClient: Send + Sync {
    fn id(&self) -> &str;
    fn display_name(&self) -> &str;

    async fn is_available(&self) -> bool;

    /// List the entries directly under `path` as raw descriptors.
    ///
    /// Fails with `NotFound` if the path is absent and `NotADirectory` if it
    /// names a file.
    async fn list_entries(&self, path: &str) -> NsgResult<Vec<RawDescriptor>>;

    /// Create `path` and any missing parents.
    ///
    /// Returns `false` when the directory already exists; fails with
    /// `PathConflict` when a file sits at `path`.
    async fn make_directories(&self, path: &str) -> NsgResult<bool>;

    /// Delete `path`. Returns `false` when nothing exists there; fails with
    /// `NotEmpty` on a non-empty directory unless `recursive` is set.
    async fn delete(&self, path: &str, recursive: bool) -> NsgResult<bool>;

    /// Copy a whole local file to `remote_path`, replacing it if present.
    async fn copy_in(&self, local: &Path, remote_path: &str) -> NsgResult<()>;

    /// Copy a whole remote file into `local`, replacing its contents.
    async fn copy_out(&self, remote_path: &str, local: &Path) -> NsgResult<()>;

    /// Release the handle. Calling it more than once is harmless.
    async fn close(&self) -> NsgResult<()>;
}
