//! Store construction from configuration.
//!
//! The factory is the one place a configuration turns into a running
//! store: an explicit match from parameter kind to constructor, with
//! validation up front so a bad config fails at startup rather than on
//! first use.

use std::sync::Arc;

use crate::azure::AzureStore;
use crate::error::StorageResult;
use crate::gcs::GcsStore;
use crate::hdfs::HdfsStore;
use crate::local_fs::FsStore;
use crate::logging::LoggingStore;
use crate::memory::MemoryStore;
use crate::s3::S3Store;
use crate::sftp::SftpStore;
use crate::traits::{BlobStore, SharedStore};
use crate::types::{StoreConfig, StoreParams};

/// Factory for creating stores based on configuration.
pub struct StoreFactory;

impl StoreFactory {
    /// Create the store described by `config`.
    ///
    /// The configuration is validated first and the returned store is
    /// ready for use. With `config.logging` set, the store is wrapped
    /// in [`LoggingStore`].
    pub async fn create(config: &StoreConfig) -> StorageResult<SharedStore> {
        config.validate()?;

        match &config.params {
            StoreParams::Fs { root } => {
                let store = FsStore::open(root.clone()).await?;
                Ok(Self::finish(store, config))
            }
            StoreParams::InMemory => Ok(Self::finish(MemoryStore::new(), config)),
            StoreParams::S3 { .. } => Ok(Self::finish(S3Store::new(&config.params)?, config)),
            StoreParams::Gcs { .. } => Ok(Self::finish(GcsStore::new(&config.params)?, config)),
            StoreParams::Azure { .. } => Ok(Self::finish(AzureStore::new(&config.params)?, config)),
            StoreParams::Hdfs { .. } => Ok(Self::finish(HdfsStore::new(&config.params)?, config)),
            StoreParams::Sftp { .. } => Ok(Self::finish(SftpStore::new(&config.params)?, config)),
        }
    }

    fn finish<S: BlobStore + 'static>(store: S, config: &StoreConfig) -> SharedStore {
        if config.logging {
            Arc::new(LoggingStore::new(store))
        } else {
            Arc::new(store)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StorageError;
    use crate::id::UuidId;
    use crate::types::StoreKind;
    use bytes::Bytes;

    #[tokio::test]
    async fn creates_an_in_memory_store() {
        let config = StoreConfig::new("scratch", StoreParams::InMemory);
        let store = StoreFactory::create(&config).await.unwrap();
        assert_eq!(store.kind(), StoreKind::InMemory);
        assert_eq!(store.description(), "In-memory storage");
    }

    #[tokio::test]
    async fn creates_a_filesystem_store() {
        let dir = tempfile::tempdir().unwrap();
        let config = StoreConfig::new("local", StoreParams::fs(dir.path()));
        let store = StoreFactory::create(&config).await.unwrap();
        assert_eq!(store.kind(), StoreKind::Fs);

        let id = UuidId::random();
        store.create(&id, Bytes::from_static(b"made by factory")).await.unwrap();
        assert!(store.exists(&id).await.unwrap());
    }

    #[tokio::test]
    async fn creates_an_s3_store() {
        let config = StoreConfig::new("docs", StoreParams::s3("my-bucket", "us-east-1"));
        let store = StoreFactory::create(&config).await.unwrap();
        assert_eq!(store.kind(), StoreKind::S3);
    }

    #[tokio::test]
    async fn logging_flag_wraps_the_store() {
        let config = StoreConfig::new("scratch", StoreParams::InMemory).with_logging();
        let store = StoreFactory::create(&config).await.unwrap();

        // Wrapper is transparent: kind and behavior are the inner store's.
        assert_eq!(store.kind(), StoreKind::InMemory);
        let id = UuidId::random();
        store.create(&id, Bytes::from_static(b"x")).await.unwrap();
        assert_eq!(store.get_bytes(&id).await.unwrap().as_ref(), b"x");
    }

    #[tokio::test]
    async fn rejects_invalid_configs() {
        let config = StoreConfig::new("docs", StoreParams::s3("", "us-east-1"));
        let err = match StoreFactory::create(&config).await {
            Err(e) => e,
            Ok(_) => panic!("factory must reject an invalid config"),
        };
        assert!(matches!(err, StorageError::InvalidConfig(_)));
    }
}
