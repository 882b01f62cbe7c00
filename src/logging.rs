//! Logging decorator for blob stores.

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::StorageResult;
use crate::id::StorageId;
use crate::traits::{BlobStore, ByteStream};
use crate::types::StoreKind;

/// Wraps any store and logs each operation at debug level, with the
/// identifier and its mapped path.
///
/// Purely observational: results and errors pass through unchanged.
pub struct LoggingStore<S> {
    inner: S,
}

impl<S: BlobStore> LoggingStore<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    pub fn get_ref(&self) -> &S {
        &self.inner
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

#[async_trait]
impl<S: BlobStore> BlobStore for LoggingStore<S> {
    fn kind(&self) -> StoreKind {
        self.inner.kind()
    }

    fn description(&self) -> &'static str {
        self.inner.description()
    }

    async fn exists(&self, id: &dyn StorageId) -> StorageResult<bool> {
        tracing::debug!("exists('{}' -> '{}')", id, id.storage_path());
        self.inner.exists(id).await
    }

    async fn size(&self, id: &dyn StorageId) -> StorageResult<u64> {
        tracing::debug!("size('{}' -> '{}')", id, id.storage_path());
        self.inner.size(id).await
    }

    async fn create(&self, id: &dyn StorageId, data: Bytes) -> StorageResult<()> {
        tracing::debug!(
            "create('{}' -> '{}', {} bytes)",
            id,
            id.storage_path(),
            data.len()
        );
        self.inner.create(id, data).await
    }

    async fn create_stream(
        &self,
        id: &dyn StorageId,
        data: ByteStream,
        len: u64,
    ) -> StorageResult<()> {
        tracing::debug!(
            "create_stream('{}' -> '{}', {} bytes)",
            id,
            id.storage_path(),
            len
        );
        self.inner.create_stream(id, data, len).await
    }

    async fn delete(&self, id: &dyn StorageId) -> StorageResult<()> {
        tracing::debug!("delete('{}' -> '{}')", id, id.storage_path());
        self.inner.delete(id).await
    }

    async fn get_bytes(&self, id: &dyn StorageId) -> StorageResult<Bytes> {
        tracing::debug!("get_bytes('{}' -> '{}')", id, id.storage_path());
        self.inner.get_bytes(id).await
    }

    async fn get_range(&self, id: &dyn StorageId, start: u64, end: u64) -> StorageResult<Bytes> {
        tracing::debug!(
            "get_range('{}' -> '{}', {}..{})",
            id,
            id.storage_path(),
            start,
            end
        );
        self.inner.get_range(id, start, end).await
    }

    async fn get_stream(&self, id: &dyn StorageId) -> StorageResult<ByteStream> {
        tracing::debug!("get_stream('{}' -> '{}')", id, id.storage_path());
        self.inner.get_stream(id).await
    }

    async fn delete_all(&self) -> StorageResult<()> {
        tracing::debug!("delete_all ({})", self.inner.description());
        self.inner.delete_all().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StorageError;
    use crate::id::UuidId;
    use crate::memory::MemoryStore;

    /// Installs a subscriber so `RUST_LOG=debug cargo test` shows the
    /// emitted lines. Safe to call from every test.
    fn init_logs() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
    }

    #[tokio::test]
    async fn results_pass_through_unchanged() {
        init_logs();
        let store = LoggingStore::new(MemoryStore::new());
        let id = UuidId::random();
        let payload = Bytes::from_static(b"logged");

        store.create(&id, payload.clone()).await.unwrap();
        assert!(store.exists(&id).await.unwrap());
        assert_eq!(store.size(&id).await.unwrap(), payload.len() as u64);
        assert_eq!(store.get_bytes(&id).await.unwrap(), payload);
        assert_eq!(store.get_range(&id, 0, 3).await.unwrap().as_ref(), b"log");

        store.delete(&id).await.unwrap();
        assert!(!store.exists(&id).await.unwrap());
        assert_eq!(store.get_ref().len(), 0);
    }

    #[tokio::test]
    async fn errors_pass_through_unchanged() {
        init_logs();
        let store = LoggingStore::new(MemoryStore::new());
        let id = UuidId::random();

        let err = store.get_bytes(&id).await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound { .. }));

        store.create(&id, Bytes::from_static(b"x")).await.unwrap();
        let err = store.create(&id, Bytes::from_static(b"y")).await.unwrap_err();
        assert!(matches!(err, StorageError::AlreadyExists { .. }));
    }

    #[tokio::test]
    async fn kind_and_description_delegate() {
        let store = LoggingStore::new(MemoryStore::new());
        assert_eq!(store.kind(), StoreKind::InMemory);
        assert_eq!(store.description(), "In-memory storage");
    }
}
