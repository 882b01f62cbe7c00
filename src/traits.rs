//! The blob store contract.
//!
//! [`BlobStore`] is the one interface every backend implements. All
//! operations address blobs through a [`StorageId`], whose
//! [`storage_path`](StorageId::storage_path) decides where the blob
//! lives inside the backend.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;

use crate::error::StorageResult;
use crate::id::StorageId;
use crate::types::StoreKind;

/// Stream of blob payload chunks.
pub type ByteStream = BoxStream<'static, StorageResult<Bytes>>;

/// A shared, dynamically typed blob store.
pub type SharedStore = Arc<dyn BlobStore>;

/// Uniform contract implemented by every storage backend.
///
/// Operations are individually atomic at best; the contract gives no
/// cross-operation guarantees, so check-then-act sequences such as
/// [`exists`](BlobStore::exists) followed by
/// [`create`](BlobStore::create) can race with concurrent writers.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// The backend kind serving this store.
    fn kind(&self) -> StoreKind;

    /// Human-readable description of the backend.
    fn description(&self) -> &'static str {
        self.kind().display_name()
    }

    /// Check whether a blob exists.
    ///
    /// Absence is `Ok(false)`, never an error; only a failure to query
    /// the backend errors.
    async fn exists(&self, id: &dyn StorageId) -> StorageResult<bool>;

    /// Size of a blob in bytes.
    async fn size(&self, id: &dyn StorageId) -> StorageResult<u64>;

    /// Store a new blob.
    ///
    /// This is a create, not an upsert: an existing blob under the
    /// same identifier fails with [`StorageError::AlreadyExists`] and
    /// is left untouched.
    ///
    /// [`StorageError::AlreadyExists`]: crate::StorageError::AlreadyExists
    async fn create(&self, id: &dyn StorageId, data: Bytes) -> StorageResult<()>;

    /// Store a new blob from a stream of chunks.
    ///
    /// Same semantics as [`create`](BlobStore::create). `len` is the
    /// total payload length in bytes; backends may use it to size
    /// buffers. The stream is fully consumed before the call returns.
    async fn create_stream(
        &self,
        id: &dyn StorageId,
        data: ByteStream,
        len: u64,
    ) -> StorageResult<()>;

    /// Delete a blob.
    ///
    /// Deleting an absent blob fails with [`StorageError::NotFound`];
    /// see [`delete_if_exists`](BlobStore::delete_if_exists) for the
    /// idempotent variant.
    ///
    /// [`StorageError::NotFound`]: crate::StorageError::NotFound
    async fn delete(&self, id: &dyn StorageId) -> StorageResult<()>;

    /// Read the full contents of a blob.
    async fn get_bytes(&self, id: &dyn StorageId) -> StorageResult<Bytes>;

    /// Read the byte range `start..end` (end exclusive) of a blob.
    ///
    /// Backends without partial reads fail with
    /// [`StorageError::Unsupported`].
    ///
    /// [`StorageError::Unsupported`]: crate::StorageError::Unsupported
    async fn get_range(&self, id: &dyn StorageId, start: u64, end: u64) -> StorageResult<Bytes>;

    /// Read a blob as a stream of chunks.
    async fn get_stream(&self, id: &dyn StorageId) -> StorageResult<ByteStream>;

    /// Delete every blob held by this store, best effort.
    async fn delete_all(&self) -> StorageResult<()>;

    /// Negation of [`exists`](BlobStore::exists).
    async fn does_not_exist(&self, id: &dyn StorageId) -> StorageResult<bool> {
        Ok(!self.exists(id).await?)
    }

    /// Store a blob, optionally replacing an existing one.
    ///
    /// With `overwrite` unset this is a plain
    /// [`create`](BlobStore::create).
    async fn create_overwrite(
        &self,
        id: &dyn StorageId,
        data: Bytes,
        overwrite: bool,
    ) -> StorageResult<()> {
        if overwrite {
            self.delete_if_exists(id).await?;
        }
        self.create(id, data).await
    }

    /// Streaming variant of
    /// [`create_overwrite`](BlobStore::create_overwrite).
    async fn create_stream_overwrite(
        &self,
        id: &dyn StorageId,
        data: ByteStream,
        len: u64,
        overwrite: bool,
    ) -> StorageResult<()> {
        if overwrite {
            self.delete_if_exists(id).await?;
        }
        self.create_stream(id, data, len).await
    }

    /// Delete a blob if present; absence is not an error.
    async fn delete_if_exists(&self, id: &dyn StorageId) -> StorageResult<()> {
        match self.delete(id).await {
            Err(e) if e.is_not_found() => Ok(()),
            other => other,
        }
    }
}
