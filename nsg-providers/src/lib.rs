//! Namespace clients for Namespace Gateway
//!
//! - `local`: a local directory served as the namespace (default)
//! - `webhdfs`: HDFS through the namenode's REST API

#[cfg(feature = "local")]
mod local;

#[cfg(feature = "webhdfs")]
pub mod webhdfs;

#[cfg(all(test, feature = "webhdfs"))]
mod fake_hdfs;

#[cfg(feature = "local")]
pub use local::LocalNamespace;

#[cfg(feature = "webhdfs")]
pub use webhdfs::{WebHdfsConfig, WebHdfsNamespace};

use nsg_core::config::{BackendKind, NamespaceConfig};
use nsg_core::{NamespaceClient, NsgError, NsgResult};
use std::collections::HashMap;
use std::sync::Arc;

/// Registry of open namespace clients
pub struct ClientRegistry {
    clients: HashMap<String, Arc<dyn NamespaceClient>>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self { clients: HashMap::new() }
    }

    pub fn register(&mut self, client: Arc<dyn NamespaceClient>) {
        self.clients.insert(client.id().to_string(), client);
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn NamespaceClient>> {
        self.clients.get(id).cloned()
    }

    pub fn get_or_err(&self, id: &str) -> NsgResult<Arc<dyn NamespaceClient>> {
        self.get(id)
            .ok_or_else(|| NsgError::Config(format!("no namespace client registered as '{id}'")))
    }

    pub fn list(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.clients.keys().map(|s| s.as_str()).collect();
        ids.sort_unstable();
        ids
    }

    pub fn remove(&mut self, id: &str) -> Option<Arc<dyn NamespaceClient>> {
        self.clients.remove(id)
    }

    /// Close every registered client, reporting the first failure
    pub async fn close_all(&self) -> NsgResult<()> {
        let mut first_err = None;
        for client in self.clients.values() {
            if let Err(e) = client.close().await {
                tracing::warn!(id = client.id(), error = %e, "failed to close namespace client");
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }
}

impl Default for ClientRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Open the namespace client described by `config`
pub fn open(config: &NamespaceConfig) -> NsgResult<Arc<dyn NamespaceClient>> {
    match config.backend {
        #[cfg(feature = "local")]
        BackendKind::Local => Ok(Arc::new(LocalNamespace::new("local", &config.root))),

        #[cfg(feature = "webhdfs")]
        BackendKind::WebHdfs => {
            let client = WebHdfsNamespace::new(
                "webhdfs",
                WebHdfsConfig {
                    url: config.url.clone(),
                    user: config.user.clone(),
                    timeout: std::time::Duration::from_secs(config.timeout_secs),
                },
            )?;
            Ok(Arc::new(client))
        }

        #[allow(unreachable_patterns)]
        other => Err(NsgError::Config(format!(
            "namespace backend {other:?} is not compiled into this build"
        ))),
    }
}

#[cfg(all(test, feature = "local"))]
mod tests {
    use super::*;

    #[test]
    fn test_registry() {
        let mut registry = ClientRegistry::new();
        registry.register(Arc::new(LocalNamespace::new("b", "/tmp")));
        registry.register(Arc::new(LocalNamespace::new("a", "/tmp")));

        assert_eq!(registry.list(), vec!["a", "b"]);
        assert!(registry.get("a").is_some());
        assert!(registry.get_or_err("missing").is_err());
        assert!(registry.remove("a").is_some());
        assert_eq!(registry.list(), vec!["b"]);
    }

    #[test]
    fn test_open_local_from_config() {
        let config = NamespaceConfig::default();
        let client = open(&config).unwrap();
        assert_eq!(client.id(), "local");
    }

    #[tokio::test]
    async fn test_close_all() {
        let mut registry = ClientRegistry::new();
        registry.register(Arc::new(LocalNamespace::new("local", "/tmp")));
        registry.close_all().await.unwrap();
        assert!(!registry.get("local").unwrap().is_available().await);
    }
}
