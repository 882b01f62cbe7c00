//! In-memory storage backed by a concurrent map.

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures::StreamExt;
use futures::stream;

use crate::error::{StorageError, StorageResult};
use crate::id::StorageId;
use crate::traits::{BlobStore, ByteStream};
use crate::types::StoreKind;

/// Process-local store keyed by mapped path.
///
/// Blobs live for the lifetime of the instance. Useful for tests and
/// as the reference implementation of the contract.
#[derive(Debug, Default)]
pub struct MemoryStore {
    blobs: DashMap<String, Bytes>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            blobs: DashMap::new(),
        }
    }

    /// Number of blobs currently held.
    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }
}

#[async_trait]
impl BlobStore for MemoryStore {
    fn kind(&self) -> StoreKind {
        StoreKind::InMemory
    }

    async fn exists(&self, id: &dyn StorageId) -> StorageResult<bool> {
        Ok(self.blobs.contains_key(&id.storage_path()))
    }

    async fn size(&self, id: &dyn StorageId) -> StorageResult<u64> {
        self.blobs
            .get(&id.storage_path())
            .map(|blob| blob.len() as u64)
            .ok_or_else(|| StorageError::not_found("size", id))
    }

    async fn create(&self, id: &dyn StorageId, data: Bytes) -> StorageResult<()> {
        match self.blobs.entry(id.storage_path()) {
            Entry::Occupied(_) => Err(StorageError::already_exists("create", id)),
            Entry::Vacant(slot) => {
                slot.insert(data);
                Ok(())
            }
        }
    }

    async fn create_stream(
        &self,
        id: &dyn StorageId,
        mut data: ByteStream,
        len: u64,
    ) -> StorageResult<()> {
        let mut buf = BytesMut::with_capacity(len as usize);
        while let Some(chunk) = data.next().await {
            buf.extend_from_slice(&chunk?);
        }
        self.create(id, buf.freeze()).await
    }

    async fn delete(&self, id: &dyn StorageId) -> StorageResult<()> {
        self.blobs
            .remove(&id.storage_path())
            .map(|_| ())
            .ok_or_else(|| StorageError::not_found("delete", id))
    }

    async fn get_bytes(&self, id: &dyn StorageId) -> StorageResult<Bytes> {
        self.blobs
            .get(&id.storage_path())
            .map(|blob| blob.clone())
            .ok_or_else(|| StorageError::not_found("get_bytes", id))
    }

    async fn get_range(&self, id: &dyn StorageId, start: u64, end: u64) -> StorageResult<Bytes> {
        if start > end {
            return Err(StorageError::invalid_range("get_range", id, start, end));
        }
        let blob = self
            .blobs
            .get(&id.storage_path())
            .map(|blob| blob.clone())
            .ok_or_else(|| StorageError::not_found("get_range", id))?;
        if end > blob.len() as u64 {
            return Err(StorageError::backend(
                "get_range",
                id,
                std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    format!("range {start}..{end} exceeds blob of {} bytes", blob.len()),
                ),
            ));
        }
        Ok(blob.slice(start as usize..end as usize))
    }

    async fn get_stream(&self, id: &dyn StorageId) -> StorageResult<ByteStream> {
        let blob = self.get_bytes(id).await?;
        let chunks: Vec<StorageResult<Bytes>> = vec![Ok(blob)];
        Ok(Box::pin(stream::iter(chunks)))
    }

    async fn delete_all(&self) -> StorageResult<()> {
        self.blobs.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::UuidId;

    #[tokio::test]
    async fn create_then_read_round_trips() {
        let store = MemoryStore::new();
        let id = UuidId::random();
        let payload = Bytes::from_static(b"hello blob");

        store.create(&id, payload.clone()).await.unwrap();
        assert!(store.exists(&id).await.unwrap());
        assert_eq!(store.size(&id).await.unwrap(), payload.len() as u64);
        assert_eq!(store.get_bytes(&id).await.unwrap(), payload);
    }

    #[tokio::test]
    async fn create_refuses_existing_blobs() {
        let store = MemoryStore::new();
        let id = UuidId::random();

        store.create(&id, Bytes::from_static(b"first")).await.unwrap();
        let err = store
            .create(&id, Bytes::from_static(b"second"))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::AlreadyExists { .. }));
        assert_eq!(store.get_bytes(&id).await.unwrap().as_ref(), b"first");
    }

    #[tokio::test]
    async fn range_reads_slice_the_blob() {
        let store = MemoryStore::new();
        let id = UuidId::random();
        store
            .create(&id, Bytes::from_static(b"0123456789"))
            .await
            .unwrap();

        assert_eq!(store.get_range(&id, 2, 6).await.unwrap().as_ref(), b"2345");
        assert_eq!(store.get_range(&id, 0, 10).await.unwrap().as_ref(), b"0123456789");
        assert!(store.get_range(&id, 4, 4).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn out_of_bounds_ranges_error() {
        let store = MemoryStore::new();
        let id = UuidId::random();
        store.create(&id, Bytes::from_static(b"short")).await.unwrap();

        assert!(store.get_range(&id, 0, 6).await.is_err());
        assert!(store.get_range(&id, 4, 2).await.is_err());
    }

    #[tokio::test]
    async fn missing_blobs_surface_not_found() {
        let store = MemoryStore::new();
        let id = UuidId::random();

        assert!(!store.exists(&id).await.unwrap());
        assert!(store.size(&id).await.unwrap_err().is_not_found());
        assert!(store.get_bytes(&id).await.unwrap_err().is_not_found());
        assert!(store.delete(&id).await.unwrap_err().is_not_found());
        assert!(store.get_range(&id, 0, 1).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn streams_round_trip() {
        let store = MemoryStore::new();
        let id = UuidId::random();
        let chunks: Vec<StorageResult<Bytes>> = vec![
            Ok(Bytes::from_static(b"part one ")),
            Ok(Bytes::from_static(b"part two")),
        ];

        store
            .create_stream(&id, Box::pin(stream::iter(chunks)), 17)
            .await
            .unwrap();
        assert_eq!(
            store.get_bytes(&id).await.unwrap().as_ref(),
            b"part one part two"
        );

        let mut collected = Vec::new();
        let mut stream = store.get_stream(&id).await.unwrap();
        while let Some(chunk) = stream.next().await {
            collected.extend_from_slice(&chunk.unwrap());
        }
        assert_eq!(collected, b"part one part two");
    }

    #[tokio::test]
    async fn delete_all_clears_the_map() {
        let store = MemoryStore::new();
        let a = UuidId::random();
        let b = UuidId::random();
        store.create(&a, Bytes::from_static(b"a")).await.unwrap();
        store.create(&b, Bytes::from_static(b"b")).await.unwrap();
        assert_eq!(store.len(), 2);

        store.delete_all().await.unwrap();
        assert!(store.is_empty());
        assert!(!store.exists(&a).await.unwrap());
        assert!(!store.exists(&b).await.unwrap());
    }
}
