//! Operation results handed back to the transport layer

use nsg_core::{Entry, EntryKind, ErrorKind, NsgError};
use nsg_search::SearchStats;
use serde::{Deserialize, Serialize};

/// Outcome of one gateway operation.
///
/// Failures always carry a message and an [`ErrorKind`]; successes carry the
/// operation's payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationResult<T> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorKind>,
}

impl<T> OperationResult<T> {
    pub fn ok(message: impl Into<String>, payload: T) -> Self {
        Self { success: true, message: message.into(), payload: Some(payload), error: None }
    }

    /// Failure prefixed with what was being attempted
    pub fn failure(context: &str, err: &NsgError) -> Self {
        Self {
            success: false,
            message: format!("{context}: {err}"),
            payload: None,
            error: Some(err.kind()),
        }
    }

    /// Status code for the transport; `strict` distinguishes failure kinds
    pub fn status_code(&self, strict: bool) -> u16 {
        match self.error {
            None => 200,
            Some(kind) if strict => kind.strict_status(),
            Some(kind) => kind.uniform_status(),
        }
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.error
    }
}

/// One item of a directory listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListItem {
    pub name: String,
    pub path: String,
    #[serde(rename = "isDirectory")]
    pub is_directory: bool,
    #[serde(rename = "type")]
    pub kind: EntryKind,
}

impl From<Entry> for ListItem {
    fn from(entry: Entry) -> Self {
        Self {
            name: entry.name().to_string(),
            is_directory: entry.is_directory(),
            kind: entry.kind(),
            path: entry.into_full_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Listing {
    pub path: String,
    pub items: Vec<ListItem>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Created {
    pub created: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deleted {
    pub deleted: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResults {
    pub results: Vec<String>,
    pub count: usize,
    pub stats: SearchStats,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Uploaded {
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Downloaded {
    pub path: String,
    /// Suggested attachment name for the transport
    pub file_name: String,
    pub bytes: u64,
}
