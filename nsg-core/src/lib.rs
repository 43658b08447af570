//! Namespace Gateway Core
//!
//! Core traits, types, and the listing codec shared by every gateway crate.

pub mod config;
pub mod entry;
pub mod error;
pub mod namespace;
pub mod path;

pub use config::GatewayConfig;
pub use entry::{Entry, EntryKind, RawDescriptor};
pub use error::{ErrorKind, NsgError, NsgResult};
pub use namespace::NamespaceClient;
pub use path::RemotePath;
