// SPDX-License-Identifier: AGPL-3.0-or-later
//! Recursive name search over a remote namespace
//!
//! The walker lists directories through a [`NamespaceClient`], decodes the
//! raw descriptors and visits the tree depth-first in pre-order. Matches are
//! collected at the point of visit, siblings in the order the namespace
//! listed them.
//!
//! A directory that cannot be listed counts as an empty subtree. The search
//! keeps going and the skipped directory is reported in [`SearchStats`].

use nsg_core::{entry, Entry, NamespaceClient};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Counters describing how complete a search was
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchStats {
    /// Directories listed successfully
    pub directories_listed: u64,
    /// Directories whose listing failed and were treated as empty
    pub directories_skipped: u64,
}

/// Matched paths plus traversal statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchOutcome {
    pub paths: Vec<String>,
    pub stats: SearchStats,
}

impl SearchOutcome {
    /// True when at least one subtree could not be searched
    pub fn is_degraded(&self) -> bool {
        self.stats.directories_skipped > 0
    }
}

/// Case-sensitive substring match on an entry name
pub fn matches_name(name: &str, needle: &str) -> bool {
    name.contains(needle)
}

/// Depth-first, pre-order name search
pub struct TreeWalker {
    client: Arc<dyn NamespaceClient>,
}

impl TreeWalker {
    pub fn new(client: Arc<dyn NamespaceClient>) -> Self {
        Self { client }
    }

    /// Full paths of every entry below `start_dir` whose name contains
    /// `name_contains`, in pre-order.
    pub async fn search(&self, start_dir: &str, name_contains: &str) -> Vec<String> {
        self.search_with_stats(start_dir, name_contains).await.paths
    }

    pub async fn search_with_stats(&self, start_dir: &str, name_contains: &str) -> SearchOutcome {
        let mut outcome = SearchOutcome::default();

        // One frame per open directory; the top frame is the directory being
        // visited, so descending before the next sibling keeps pre-order.
        let mut stack: Vec<std::vec::IntoIter<Entry>> = Vec::new();
        if let Some(entries) = self.list_or_skip(start_dir, &mut outcome.stats).await {
            stack.push(entries.into_iter());
        }

        while let Some(frame) = stack.last_mut() {
            let Some(entry) = frame.next() else {
                stack.pop();
                continue;
            };

            if matches_name(entry.name(), name_contains) {
                outcome.paths.push(entry.full_path().to_string());
            }

            if entry.is_directory() {
                if let Some(children) = self.list_or_skip(entry.full_path(), &mut outcome.stats).await {
                    stack.push(children.into_iter());
                }
            }
        }

        outcome
    }

    async fn list_or_skip(&self, dir: &str, stats: &mut SearchStats) -> Option<Vec<Entry>> {
        match self.client.list_entries(dir).await {
            Ok(raw) => {
                stats.directories_listed += 1;
                Some(entry::decode_all(&raw))
            }
            Err(e) => {
                tracing::warn!(path = dir, error = %e, "skipping unreadable directory during search");
                stats.directories_skipped += 1;
                None
            }
        }
    }
}
