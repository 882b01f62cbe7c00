//! Registry of named stores.
//!
//! Applications usually run several stores side by side (a local
//! scratch store, an archive bucket, a cluster share). The registry
//! owns all of them, built once at startup from configuration and
//! queried by name wherever a store is needed.

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;

use crate::error::{StorageError, StorageResult};
use crate::factory::StoreFactory;
use crate::traits::SharedStore;
use crate::types::{StoreConfig, StoreKind};

/// Summary of one registered store.
#[derive(Debug, Clone, Serialize)]
pub struct StoreInfo {
    /// Name the store was registered under.
    pub name: String,
    /// Backend kind.
    pub kind: StoreKind,
    /// Human-readable backend description.
    pub description: String,
}

/// Holds every configured store under its registered name.
#[derive(Default)]
pub struct StoreRegistry {
    stores: HashMap<String, SharedStore>,
}

impl StoreRegistry {
    pub fn new() -> Self {
        Self {
            stores: HashMap::new(),
        }
    }

    /// Build a registry from configuration, constructing every store
    /// through [`StoreFactory`].
    pub async fn from_configs(configs: &[StoreConfig]) -> StorageResult<Self> {
        let mut registry = Self::new();
        for config in configs {
            let store = StoreFactory::create(config).await?;
            registry.register(&config.name, store)?;
        }
        Ok(registry)
    }

    /// Build a registry from a JSON list of store configurations.
    pub async fn from_json(json: &str) -> StorageResult<Self> {
        let configs = StoreConfig::parse_json(json)?;
        Self::from_configs(&configs).await
    }

    /// Register a store under a name. Duplicate names are rejected.
    pub fn register(&mut self, name: &str, store: SharedStore) -> StorageResult<()> {
        if self.stores.contains_key(name) {
            return Err(StorageError::invalid_config(format!(
                "duplicate store name: {name}"
            )));
        }
        self.stores.insert(name.to_string(), store);
        Ok(())
    }

    /// Look up a store by its registered name.
    pub fn get(&self, name: &str) -> Option<SharedStore> {
        self.stores.get(name).cloned()
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.stores.keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of registered stores.
    pub fn len(&self) -> usize {
        self.stores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stores.is_empty()
    }

    /// Summaries of every registered store, sorted by name. This is
    /// the listing surface for health and admin endpoints.
    pub fn describe(&self) -> Vec<StoreInfo> {
        let mut infos: Vec<StoreInfo> = self
            .stores
            .iter()
            .map(|(name, store)| StoreInfo {
                name: name.clone(),
                kind: store.kind(),
                description: store.description().to_string(),
            })
            .collect();
        infos.sort_by(|a, b| a.name.cmp(&b.name));
        infos
    }
}

impl fmt::Debug for StoreRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreRegistry")
            .field("stores", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::StoreParams;

    #[tokio::test]
    async fn builds_every_configured_store() {
        let dir = tempfile::tempdir().unwrap();
        let configs = vec![
            StoreConfig::new("scratch", StoreParams::InMemory),
            StoreConfig::new("archive", StoreParams::fs(dir.path())),
        ];

        let registry = StoreRegistry::from_configs(&configs).await.unwrap();
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.names(), vec!["archive", "scratch"]);
        assert!(registry.get("scratch").is_some());
        assert!(registry.get("missing").is_none());
    }

    #[tokio::test]
    async fn rejects_duplicate_names() {
        let configs = vec![
            StoreConfig::new("same", StoreParams::InMemory),
            StoreConfig::new("same", StoreParams::InMemory),
        ];

        let err = StoreRegistry::from_configs(&configs).await.unwrap_err();
        assert!(matches!(err, StorageError::InvalidConfig(_)));
        assert!(err.to_string().contains("same"));
    }

    #[tokio::test]
    async fn describe_lists_registered_stores() {
        let configs = vec![
            StoreConfig::new("scratch", StoreParams::InMemory),
            StoreConfig::new("docs", StoreParams::s3("bucket", "us-east-1")),
        ];

        let registry = StoreRegistry::from_configs(&configs).await.unwrap();
        let infos = registry.describe();
        assert_eq!(infos.len(), 2);
        assert_eq!(infos[0].name, "docs");
        assert_eq!(infos[0].kind, StoreKind::S3);
        assert_eq!(infos[0].description, "S3 object storage");
        assert_eq!(infos[1].name, "scratch");
        assert_eq!(infos[1].kind, StoreKind::InMemory);
    }

    #[tokio::test]
    async fn empty_registry_reports_empty() {
        let registry = StoreRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.describe().is_empty());
    }
}
