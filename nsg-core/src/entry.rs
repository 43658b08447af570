//! Namespace entries and the raw listing descriptor codec
//!
//! Namespace clients report directory contents as tagged strings: a kind
//! marker, a `:` delimiter, then the absolute path.
//!
//! ```text
//! DIR :/data/logs
//! FILE:/data/logs/app.log
//! ```

use serde::{Deserialize, Serialize};

/// Marker for directory descriptors, including the delimiter
pub const DIR_MARKER: &str = "DIR :";

/// Marker for file descriptors, including the delimiter
pub const FILE_MARKER: &str = "FILE:";

/// A raw listing line as produced by a namespace client
pub type RawDescriptor = String;

/// Entry kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Directory,
}

impl EntryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryKind::File => "file",
            EntryKind::Directory => "directory",
        }
    }
}

/// A decoded namespace entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    name: String,
    full_path: String,
    kind: EntryKind,
}

impl Entry {
    pub fn new(full_path: impl Into<String>, kind: EntryKind) -> Self {
        let full_path = full_path.into();
        let name = last_segment(&full_path).to_string();
        Self { name, full_path, kind }
    }

    pub fn file(full_path: impl Into<String>) -> Self {
        Self::new(full_path, EntryKind::File)
    }

    pub fn directory(full_path: impl Into<String>) -> Self {
        Self::new(full_path, EntryKind::Directory)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn full_path(&self) -> &str {
        &self.full_path
    }

    pub fn kind(&self) -> EntryKind {
        self.kind
    }

    pub fn is_directory(&self) -> bool {
        self.kind == EntryKind::Directory
    }

    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }

    pub fn into_full_path(self) -> String {
        self.full_path
    }
}

/// Decode one raw descriptor.
///
/// Anything not starting with [`DIR_MARKER`] is treated as a file. The path
/// is everything after the first `:`; a descriptor without a delimiter is
/// taken whole.
pub fn decode(descriptor: &str) -> Entry {
    let kind = if descriptor.starts_with(DIR_MARKER) {
        EntryKind::Directory
    } else {
        EntryKind::File
    };
    let path = descriptor
        .split_once(':')
        .map(|(_, rest)| rest)
        .unwrap_or(descriptor)
        .trim();
    Entry::new(path, kind)
}

/// Decode a whole listing, preserving order
pub fn decode_all<I, S>(descriptors: I) -> Vec<Entry>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    descriptors.into_iter().map(|d| decode(d.as_ref())).collect()
}

/// Encode an entry kind and absolute path as a raw descriptor
pub fn encode(kind: EntryKind, full_path: &str) -> RawDescriptor {
    match kind {
        EntryKind::Directory => format!("{DIR_MARKER}{full_path}"),
        EntryKind::File => format!("{FILE_MARKER}{full_path}"),
    }
}

fn last_segment(path: &str) -> &str {
    path.rsplit_once('/').map(|(_, name)| name).unwrap_or(path)
}
